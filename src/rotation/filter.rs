use crate::api::AdsClient;
use crate::api::types::{Ad, AdStatus, Creative, ReviewStatus};
use crate::config::DefaultsConfig;
use tokio_util::sync::CancellationToken;
use url::Url;

/// A creative with every optional field defaulted, ready for validation
/// and the full-object update payload.
#[derive(Debug, Clone)]
pub struct PreparedCreative {
    pub id: String,
    pub headline: Option<String>,
    pub name: String,
    pub top_snap_media_id: String,
    pub web_view_url: String,
    pub block_preload: bool,
    pub call_to_action: String,
    pub top_snap_crop_position: String,
    pub shareable: bool,
    pub kind: String,
    pub ad_product: String,
    pub profile_id: String,
}

impl PreparedCreative {
    /// Mandatory delivery fields still empty (or unusable) after
    /// defaulting. An update must not be submitted while this is
    /// non-empty.
    pub fn missing_mandatory(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.top_snap_media_id.is_empty() {
            missing.push("top_snap_media_id");
        }
        // A landing page that does not parse as a URL is as unusable as a
        // missing one.
        if self.web_view_url.is_empty() || Url::parse(&self.web_view_url).is_err() {
            missing.push("web_view_url");
        }
        if self.profile_id.is_empty() {
            missing.push("profile_id");
        }
        missing
    }

    /// Headline currently on the creative, falling back to its name when
    /// none is set.
    pub fn prior_headline(&self) -> String {
        self.headline
            .clone()
            .unwrap_or_else(|| self.name.clone())
    }
}

/// Rotation-eligible means: linked to a creative, lifecycle exactly ACTIVE
/// and review exactly REJECTED.
pub fn is_eligible(ad: &Ad) -> bool {
    !ad.creative_id.is_empty()
        && ad.status == AdStatus::Active
        && ad.review_status == ReviewStatus::Rejected
}

fn non_empty_or(value: String, fallback: &str) -> String {
    if value.is_empty() {
        fallback.to_string()
    } else {
        value
    }
}

/// Flatten a fetched creative and fill absent optional fields. Mandatory
/// fields only ever come from the API response or the configured defaults.
pub fn prepare(creative: Creative, defaults: &DefaultsConfig) -> PreparedCreative {
    let short_id: String = creative.id.chars().take(8).collect();

    PreparedCreative {
        headline: creative.headline,
        name: non_empty_or(creative.name, &format!("Creative_{short_id}")),
        top_snap_media_id: non_empty_or(creative.top_snap_media_id, &defaults.top_snap_media_id),
        web_view_url: non_empty_or(creative.web_view_properties.url, &defaults.web_view_url),
        block_preload: creative.web_view_properties.block_preload.unwrap_or(true),
        call_to_action: non_empty_or(creative.call_to_action, "LEARN_MORE"),
        top_snap_crop_position: non_empty_or(creative.top_snap_crop_position, "MIDDLE"),
        shareable: creative.shareable.unwrap_or(true),
        kind: non_empty_or(creative.kind, "WEB_VIEW"),
        ad_product: non_empty_or(creative.ad_product, "SNAP_AD"),
        profile_id: non_empty_or(creative.profile_properties.profile_id, &defaults.profile_id),
        id: creative.id,
    }
}

/// Fetch and prepare every rotation-eligible (ad, creative) pair.
///
/// A listing failure yields an empty set (nothing to do this cycle); a
/// single creative's fetch failure skips that creative only. Ineligible
/// ads are dropped silently, with aggregate counts logged.
pub async fn select_eligible(
    client: &AdsClient,
    token: &str,
    defaults: &DefaultsConfig,
    cancel: &CancellationToken,
) -> Vec<(Ad, PreparedCreative)> {
    let ads = match client.list_active_ads(token, cancel).await {
        Ok(ads) => ads,
        Err(e) => {
            tracing::warn!("ad listing failed, nothing to do this cycle: {e}");
            return Vec::new();
        }
    };
    tracing::info!("fetched {} ads with status=ACTIVE", ads.len());

    let eligible: Vec<Ad> = ads.into_iter().filter(is_eligible).collect();
    tracing::info!(
        "{} ads are ACTIVE with review_status=REJECTED",
        eligible.len()
    );

    let mut pairs = Vec::new();
    for ad in eligible {
        if cancel.is_cancelled() {
            tracing::info!("eligibility filtering interrupted");
            break;
        }

        let creative = match client.get_creative(token, &ad.creative_id, cancel).await {
            Ok(creative) => creative,
            Err(e) => {
                tracing::warn!("failed to fetch creative {}: {e}", ad.creative_id);
                continue;
            }
        };

        let prepared = prepare(creative, defaults);
        if prepared.id.is_empty() {
            tracing::warn!("creative without a valid id skipped (ad {})", ad.id);
            continue;
        }

        let missing = prepared.missing_mandatory();
        if !missing.is_empty() {
            tracing::warn!(
                "creative {} skipped, missing mandatory fields: {}",
                prepared.id,
                missing.join(", ")
            );
            continue;
        }

        tracing::debug!("prepared creative {} for update (ad {})", prepared.id, ad.id);
        pairs.push((ad, prepared));
    }

    tracing::info!("prepared {} creatives for headline update", pairs.len());
    pairs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReliabilityConfig;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn ad(creative_id: &str, status: AdStatus, review: ReviewStatus) -> Ad {
        Ad {
            id: "ad-1".into(),
            creative_id: creative_id.into(),
            status,
            review_status: review,
        }
    }

    fn full_creative() -> Creative {
        serde_json::from_str(
            r#"{
                "id":"cre-1",
                "name":"Creative One",
                "headline":"Old",
                "top_snap_media_id":"media-1",
                "web_view_properties":{"url":"https://example.com"},
                "profile_properties":{"profile_id":"prof-1"}
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn only_active_rejected_ads_with_creatives_are_eligible() {
        assert!(is_eligible(&ad(
            "cre-1",
            AdStatus::Active,
            ReviewStatus::Rejected
        )));
        assert!(!is_eligible(&ad(
            "cre-1",
            AdStatus::Active,
            ReviewStatus::Approved
        )));
        assert!(!is_eligible(&ad(
            "cre-1",
            AdStatus::Paused,
            ReviewStatus::Rejected
        )));
        assert!(!is_eligible(&ad(
            "",
            AdStatus::Active,
            ReviewStatus::Rejected
        )));
        assert!(!is_eligible(&ad(
            "cre-1",
            AdStatus::Active,
            ReviewStatus::Pending
        )));
    }

    #[test]
    fn prepare_fills_optional_fields_from_static_defaults() {
        let creative: Creative = serde_json::from_str(r#"{"id":"cre-12345678-rest"}"#).unwrap();
        let prepared = prepare(creative, &DefaultsConfig::default());

        assert_eq!(prepared.name, "Creative_cre-1234");
        assert_eq!(prepared.call_to_action, "LEARN_MORE");
        assert_eq!(prepared.top_snap_crop_position, "MIDDLE");
        assert_eq!(prepared.kind, "WEB_VIEW");
        assert_eq!(prepared.ad_product, "SNAP_AD");
        assert!(prepared.shareable);
        assert!(prepared.block_preload);
    }

    #[test]
    fn prepare_sources_mandatory_fields_from_config_only() {
        let creative: Creative = serde_json::from_str(r#"{"id":"cre-1"}"#).unwrap();
        let defaults = DefaultsConfig {
            top_snap_media_id: "media-default".into(),
            web_view_url: "https://default.example.com".into(),
            profile_id: "prof-default".into(),
        };

        let prepared = prepare(creative, &defaults);
        assert_eq!(prepared.top_snap_media_id, "media-default");
        assert_eq!(prepared.web_view_url, "https://default.example.com");
        assert_eq!(prepared.profile_id, "prof-default");
        assert!(prepared.missing_mandatory().is_empty());
    }

    #[test]
    fn missing_mandatory_names_every_empty_field() {
        let creative: Creative = serde_json::from_str(r#"{"id":"cre-1"}"#).unwrap();
        let prepared = prepare(creative, &DefaultsConfig::default());

        let missing = prepared.missing_mandatory();
        assert_eq!(
            missing,
            vec!["top_snap_media_id", "web_view_url", "profile_id"]
        );
    }

    #[test]
    fn unparseable_landing_url_counts_as_missing() {
        let mut prepared = prepare(full_creative(), &DefaultsConfig::default());
        prepared.web_view_url = "not a url".into();
        assert_eq!(prepared.missing_mandatory(), vec!["web_view_url"]);
    }

    #[test]
    fn prior_headline_falls_back_to_name() {
        let mut prepared = prepare(full_creative(), &DefaultsConfig::default());
        assert_eq!(prepared.prior_headline(), "Old");

        prepared.headline = None;
        assert_eq!(prepared.prior_headline(), "Creative One");
    }

    #[tokio::test]
    async fn one_failing_creative_fetch_does_not_abort_the_rest() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/adaccounts/acc-1/ads"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"ads":[
                    {"ad":{"id":"ad-1","creative_id":"cre-broken","status":"ACTIVE","review_status":"REJECTED"}},
                    {"ad":{"id":"ad-2","creative_id":"cre-1","status":"ACTIVE","review_status":"REJECTED"}}
                ]}"#,
            ))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/creatives/cre-broken"))
            .respond_with(ResponseTemplate::new(404).set_body_string("gone"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/v1/creatives/cre-1"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"creatives":[{"creative":{
                    "id":"cre-1",
                    "name":"Creative One",
                    "top_snap_media_id":"media-1",
                    "web_view_properties":{"url":"https://example.com"},
                    "profile_properties":{"profile_id":"prof-1"}
                }}]}"#,
            ))
            .mount(&server)
            .await;

        let client = AdsClient::with_base(
            &server.uri(),
            "acc-1",
            &ReliabilityConfig {
                http_retries: 0,
                http_backoff_ms: 1,
                http_timeout_secs: 5,
            },
        );

        let pairs = select_eligible(
            &client,
            "tok-1",
            &DefaultsConfig::default(),
            &CancellationToken::new(),
        )
        .await;

        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].1.id, "cre-1");
    }

    #[tokio::test]
    async fn listing_failure_yields_empty_set() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/adaccounts/acc-1/ads"))
            .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
            .mount(&server)
            .await;

        let client = AdsClient::with_base(
            &server.uri(),
            "acc-1",
            &ReliabilityConfig {
                http_retries: 0,
                http_backoff_ms: 1,
                http_timeout_secs: 5,
            },
        );

        let pairs = select_eligible(
            &client,
            "tok-1",
            &DefaultsConfig::default(),
            &CancellationToken::new(),
        )
        .await;
        assert!(pairs.is_empty());
    }
}
