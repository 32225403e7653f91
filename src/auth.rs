use crate::api::client::send_with_retry;
use crate::api::scrub::sanitize_api_error;
use crate::api::types::TokenResponse;
use crate::config::{CredentialsConfig, ReliabilityConfig};
use crate::error::{ApiError, AuthError};
use reqwest::Client;
use tokio_util::sync::CancellationToken;

/// Exchange the long-lived refresh token for a bearer access token.
///
/// Runs under the same bounded-retry policy as every other outbound call,
/// so a transient 429/5xx from the auth endpoint does not cost a cycle.
/// No expiry is assumed on the returned token; callers fetch a fresh one
/// at the start of every cycle.
pub async fn refresh_access_token(
    http: &Client,
    auth_base: &str,
    credentials: &CredentialsConfig,
    reliability: &ReliabilityConfig,
    cancel: &CancellationToken,
) -> Result<String, AuthError> {
    let url = format!(
        "{}/login/oauth2/access_token",
        auth_base.trim_end_matches('/')
    );
    let form = [
        ("client_id", credentials.client_id.as_str()),
        ("client_secret", credentials.client_secret.as_str()),
        ("grant_type", "refresh_token"),
        ("refresh_token", credentials.refresh_token.as_str()),
    ];

    let response = send_with_retry(
        "token refresh",
        reliability.http_retries,
        reliability.http_backoff_ms,
        cancel,
        || http.post(&url).form(&form),
    )
    .await
    .map_err(|e| match e {
        ApiError::Transport { message, .. } => AuthError::Transport(message),
        other => AuthError::Transport(other.to_string()),
    })?;

    let status = response.status();
    let body = response.text().await.unwrap_or_default();

    if !status.is_success() {
        return Err(AuthError::Refresh {
            status: status.as_u16(),
            body: sanitize_api_error(&body),
        });
    }

    let token: TokenResponse =
        serde_json::from_str(&body).map_err(|_| AuthError::MissingToken)?;
    token
        .access_token
        .filter(|t| !t.is_empty())
        .ok_or(AuthError::MissingToken)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn credentials() -> CredentialsConfig {
        CredentialsConfig {
            client_id: "client-1".into(),
            client_secret: "secret-1".into(),
            refresh_token: "refresh-1".into(),
        }
    }

    fn reliability(retries: u32) -> ReliabilityConfig {
        ReliabilityConfig {
            http_retries: retries,
            http_backoff_ms: 1,
            http_timeout_secs: 5,
        }
    }

    #[tokio::test]
    async fn exchanges_refresh_token_for_access_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/login/oauth2/access_token"))
            .and(body_string_contains("grant_type=refresh_token"))
            .and(body_string_contains("client_id=client-1"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(r#"{"access_token":"tok-99","expires_in":1800}"#),
            )
            .mount(&server)
            .await;

        let token = refresh_access_token(
            &Client::new(),
            &server.uri(),
            &credentials(),
            &reliability(0),
            &CancellationToken::new(),
        )
        .await
        .unwrap();
        assert_eq!(token, "tok-99");
    }

    #[tokio::test]
    async fn transient_failure_is_retried_before_giving_up() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/login/oauth2/access_token"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/login/oauth2/access_token"))
            .respond_with(
                ResponseTemplate::new(200).set_body_string(r#"{"access_token":"tok-99"}"#),
            )
            .mount(&server)
            .await;

        let token = refresh_access_token(
            &Client::new(),
            &server.uri(),
            &credentials(),
            &reliability(2),
            &CancellationToken::new(),
        )
        .await
        .unwrap();
        assert_eq!(token, "tok-99");
    }

    #[tokio::test]
    async fn rejected_refresh_surfaces_status_and_scrubbed_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/login/oauth2/access_token"))
            .respond_with(ResponseTemplate::new(401).set_body_string(
                r#"{"error":"invalid_grant","refresh_token":"rt-leaked-123"}"#,
            ))
            .mount(&server)
            .await;

        let err = refresh_access_token(
            &Client::new(),
            &server.uri(),
            &credentials(),
            &reliability(0),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

        match err {
            AuthError::Refresh { status, body } => {
                assert_eq!(status, 401);
                assert!(body.contains("invalid_grant"));
                assert!(!body.contains("rt-leaked-123"));
            }
            other => panic!("expected refresh error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_access_token_field_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/login/oauth2/access_token"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"token_type":"Bearer"}"#))
            .mount(&server)
            .await;

        let err = refresh_access_token(
            &Client::new(),
            &server.uri(),
            &credentials(),
            &reliability(0),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, AuthError::MissingToken));
    }
}
