use super::scrub::sanitize_api_error;
use super::types::{
    Ad, AdListResponse, Creative, CreativeListResponse, CreativeUpdateRequest, UpdateResponse,
};
use crate::config::{Config, ReliabilityConfig};
use crate::error::ApiError;
use chrono::Utc;
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const RETRYABLE_STATUS: [u16; 5] = [429, 500, 502, 503, 504];
const MAX_BACKOFF_MS: u64 = 30_000;

pub fn build_api_client(timeout_secs: u64) -> Client {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .connect_timeout(Duration::from_secs(10))
        .pool_max_idle_per_host(10)
        .pool_idle_timeout(Duration::from_secs(90))
        .tcp_keepalive(Duration::from_secs(60))
        .build()
        .unwrap_or_else(|_| Client::new())
}

/// Send a request with bounded retry on transient failure, doubling the
/// delay between attempts. One policy covers every outbound call, the
/// token refresh included.
pub(crate) async fn send_with_retry<F>(
    endpoint: &'static str,
    retries: u32,
    initial_backoff_ms: u64,
    cancel: &CancellationToken,
    build: F,
) -> Result<reqwest::Response, ApiError>
where
    F: Fn() -> reqwest::RequestBuilder,
{
    let mut attempt: u32 = 0;
    let mut backoff_ms = initial_backoff_ms.max(200);

    loop {
        if cancel.is_cancelled() {
            return Err(ApiError::Cancelled { endpoint });
        }

        match build().send().await {
            Ok(response) => {
                let status = response.status().as_u16();
                if !RETRYABLE_STATUS.contains(&status) || attempt >= retries {
                    return Ok(response);
                }
                tracing::warn!(
                    "{endpoint} returned {status}, retrying ({}/{})",
                    attempt + 1,
                    retries
                );
            }
            Err(e) => {
                if attempt >= retries {
                    return Err(ApiError::Transport {
                        endpoint,
                        message: e.to_string(),
                    });
                }
                tracing::warn!(
                    "{endpoint} transport error, retrying ({}/{}): {e}",
                    attempt + 1,
                    retries
                );
            }
        }

        attempt += 1;
        let jitter_ms = u64::from(Utc::now().timestamp_subsec_millis() % 250);
        tokio::time::sleep(Duration::from_millis(backoff_ms + jitter_ms)).await;
        backoff_ms = (backoff_ms.saturating_mul(2)).min(MAX_BACKOFF_MS);
    }
}

/// Snapchat Ads API client scoped to one ad account.
///
/// Transient failures (429/5xx, transport errors) are retried with doubling
/// backoff before any error is surfaced to the caller.
pub struct AdsClient {
    http: Client,
    api_base: String,
    account_id: String,
    retries: u32,
    backoff_ms: u64,
}

impl AdsClient {
    pub fn new(config: &Config) -> Self {
        Self::with_base(&config.api_base, &config.account_id, &config.reliability)
    }

    pub fn with_base(api_base: &str, account_id: &str, reliability: &ReliabilityConfig) -> Self {
        Self {
            http: build_api_client(reliability.http_timeout_secs),
            api_base: api_base.trim_end_matches('/').to_string(),
            account_id: account_id.to_string(),
            retries: reliability.http_retries,
            backoff_ms: reliability.http_backoff_ms,
        }
    }

    /// Shared HTTP client, reused for the token refresh call.
    pub fn http(&self) -> &Client {
        &self.http
    }

    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    pub async fn list_active_ads(
        &self,
        token: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<Ad>, ApiError> {
        let endpoint = "ad listing";
        let url = format!("{}/v1/adaccounts/{}/ads", self.api_base, self.account_id);
        let response = self
            .send_with_retry(endpoint, cancel, || {
                self.http
                    .get(&url)
                    .bearer_auth(token)
                    .query(&[("status", "ACTIVE")])
            })
            .await?;

        let body = Self::expect_success(endpoint, response).await?;
        let listing: AdListResponse = Self::decode(endpoint, &body)?;
        Ok(listing.ads.into_iter().map(|entry| entry.ad).collect())
    }

    pub async fn get_creative(
        &self,
        token: &str,
        creative_id: &str,
        cancel: &CancellationToken,
    ) -> Result<Creative, ApiError> {
        let endpoint = "creative fetch";
        let url = format!("{}/v1/creatives/{creative_id}", self.api_base);
        let response = self
            .send_with_retry(endpoint, cancel, || self.http.get(&url).bearer_auth(token))
            .await?;

        let body = Self::expect_success(endpoint, response).await?;
        let listing: CreativeListResponse = Self::decode(endpoint, &body)?;
        listing
            .creatives
            .into_iter()
            .next()
            .map(|entry| entry.creative)
            .ok_or(ApiError::Decode {
                endpoint,
                message: "response contained no creative".to_string(),
            })
    }

    /// Submit a full-object creative update. Returns the decoded verdict
    /// together with the raw body so callers can fall back to it when the
    /// response carries no structured reason.
    pub async fn update_creative(
        &self,
        token: &str,
        request: &CreativeUpdateRequest,
        cancel: &CancellationToken,
    ) -> Result<(UpdateResponse, String), ApiError> {
        let endpoint = "creative update";
        let url = format!(
            "{}/v1/adaccounts/{}/creatives",
            self.api_base, self.account_id
        );
        let response = self
            .send_with_retry(endpoint, cancel, || {
                self.http.put(&url).bearer_auth(token).json(request)
            })
            .await?;

        let body = Self::expect_success(endpoint, response).await?;
        let verdict: UpdateResponse = Self::decode(endpoint, &body)?;
        Ok((verdict, body))
    }

    async fn send_with_retry<F>(
        &self,
        endpoint: &'static str,
        cancel: &CancellationToken,
        build: F,
    ) -> Result<reqwest::Response, ApiError>
    where
        F: Fn() -> reqwest::RequestBuilder,
    {
        send_with_retry(endpoint, self.retries, self.backoff_ms, cancel, build).await
    }

    async fn expect_success(
        endpoint: &'static str,
        response: reqwest::Response,
    ) -> Result<String, ApiError> {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if !status.is_success() {
            return Err(ApiError::Status {
                endpoint,
                status: status.as_u16(),
                body: sanitize_api_error(&body),
            });
        }
        Ok(body)
    }

    fn decode<T: DeserializeOwned>(endpoint: &'static str, body: &str) -> Result<T, ApiError> {
        serde_json::from_str(body).map_err(|e| ApiError::Decode {
            endpoint,
            message: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::types::AdStatus;
    use wiremock::matchers::{header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn reliability(retries: u32) -> ReliabilityConfig {
        ReliabilityConfig {
            http_retries: retries,
            http_backoff_ms: 1,
            http_timeout_secs: 5,
        }
    }

    fn client(server: &MockServer, retries: u32) -> AdsClient {
        AdsClient::with_base(&server.uri(), "acc-1", &reliability(retries))
    }

    #[test]
    fn strips_trailing_slash() {
        let ads = AdsClient::with_base("https://example.com/", "acc-1", &reliability(0));
        assert_eq!(ads.api_base, "https://example.com");
    }

    #[tokio::test]
    async fn list_ads_sends_bearer_and_status_filter() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/adaccounts/acc-1/ads"))
            .and(query_param("status", "ACTIVE"))
            .and(header("authorization", "Bearer tok-1"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"ads":[{"ad":{"id":"ad-1","creative_id":"cre-1","status":"ACTIVE","review_status":"REJECTED"}}]}"#,
            ))
            .mount(&server)
            .await;

        let ads = client(&server, 0)
            .list_active_ads("tok-1", &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(ads.len(), 1);
        assert_eq!(ads[0].status, AdStatus::Active);
    }

    #[tokio::test]
    async fn retries_on_503_then_succeeds() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/adaccounts/acc-1/ads"))
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/adaccounts/acc-1/ads"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"ads":[]}"#))
            .mount(&server)
            .await;

        let ads = client(&server, 2)
            .list_active_ads("tok-1", &CancellationToken::new())
            .await
            .unwrap();

        assert!(ads.is_empty());
    }

    #[tokio::test]
    async fn non_retryable_status_becomes_status_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/creatives/cre-1"))
            .respond_with(ResponseTemplate::new(404).set_body_string("not found"))
            .mount(&server)
            .await;

        let err = client(&server, 2)
            .get_creative("tok-1", "cre-1", &CancellationToken::new())
            .await
            .unwrap_err();

        match err {
            ApiError::Status { status, body, .. } => {
                assert_eq!(status, 404);
                assert!(body.contains("not found"));
            }
            other => panic!("expected status error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn cancelled_token_short_circuits() {
        let server = MockServer::start().await;
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = client(&server, 2)
            .list_active_ads("tok-1", &cancel)
            .await
            .unwrap_err();

        assert!(matches!(err, ApiError::Cancelled { .. }));
    }

    #[tokio::test]
    async fn update_returns_verdict_and_raw_body() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/v1/adaccounts/acc-1/creatives"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"request_status":"FAILED","creatives":[{"sub_request_error_reason":"INVALID_MEDIA"}]}"#,
            ))
            .mount(&server)
            .await;

        let request = CreativeUpdateRequest { creatives: vec![] };
        let (verdict, raw) = client(&server, 0)
            .update_creative("tok-1", &request, &CancellationToken::new())
            .await
            .unwrap();

        assert!(!verdict.is_success());
        assert_eq!(verdict.rejection_reason(), Some("INVALID_MEDIA"));
        assert!(raw.contains("INVALID_MEDIA"));
    }
}
