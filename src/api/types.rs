use serde::{Deserialize, Serialize};
use strum::Display;

// ─── Ad listing ─────────────────────────────────────────────────────────────

/// Lifecycle status reported on an ad. Unknown values deserialize to
/// `Unknown` rather than failing the whole listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum AdStatus {
    Active,
    Paused,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum ReviewStatus {
    Approved,
    Rejected,
    Pending,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Ad {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub creative_id: String,
    #[serde(default = "unknown_ad_status")]
    pub status: AdStatus,
    #[serde(default = "unknown_review_status")]
    pub review_status: ReviewStatus,
}

fn unknown_ad_status() -> AdStatus {
    AdStatus::Unknown
}

fn unknown_review_status() -> ReviewStatus {
    ReviewStatus::Unknown
}

/// The listing response wraps each ad object under an `"ad"` key.
#[derive(Debug, Deserialize)]
pub struct AdEnvelope {
    pub ad: Ad,
}

#[derive(Debug, Deserialize)]
pub struct AdListResponse {
    #[serde(default)]
    pub ads: Vec<AdEnvelope>,
}

// ─── Creative fetch ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WebViewProperties {
    #[serde(default)]
    pub url: String,
    pub block_preload: Option<bool>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileProperties {
    #[serde(default)]
    pub profile_id: String,
}

/// Mutable creative record as returned by the API. Optional presentation
/// fields may be absent and are defaulted before validation.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Creative {
    #[serde(default)]
    pub id: String,
    pub headline: Option<String>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub top_snap_media_id: String,
    #[serde(default)]
    pub call_to_action: String,
    #[serde(default)]
    pub top_snap_crop_position: String,
    pub shareable: Option<bool>,
    #[serde(default, rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub ad_product: String,
    #[serde(default)]
    pub web_view_properties: WebViewProperties,
    #[serde(default)]
    pub profile_properties: ProfileProperties,
}

#[derive(Debug, Deserialize)]
pub struct CreativeEnvelope {
    pub creative: Creative,
}

#[derive(Debug, Deserialize)]
pub struct CreativeListResponse {
    #[serde(default)]
    pub creatives: Vec<CreativeEnvelope>,
}

// ─── Creative update ────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct UpdateWebViewProperties {
    pub url: String,
    pub block_preload: bool,
}

#[derive(Debug, Serialize)]
pub struct UpdateProfileProperties {
    pub profile_id: String,
}

/// One creative in the update payload. The API requires the complete
/// object, not a partial patch.
#[derive(Debug, Serialize)]
pub struct CreativeUpdateItem {
    pub ad_account_id: String,
    pub id: String,
    pub headline: String,
    pub web_view_properties: UpdateWebViewProperties,
    #[serde(rename = "type")]
    pub kind: String,
    pub ad_product: String,
    pub top_snap_media_id: String,
    pub top_snap_crop_position: String,
    pub name: String,
    pub call_to_action: String,
    pub shareable: bool,
    pub profile_properties: UpdateProfileProperties,
}

#[derive(Debug, Serialize)]
pub struct CreativeUpdateRequest {
    pub creatives: Vec<CreativeUpdateItem>,
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateResponseItem {
    #[serde(default)]
    pub sub_request_status: Option<String>,
    #[serde(default)]
    pub sub_request_error_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateResponse {
    #[serde(default)]
    pub request_status: String,
    #[serde(default)]
    pub creatives: Vec<UpdateResponseItem>,
}

impl UpdateResponse {
    pub fn is_success(&self) -> bool {
        self.request_status == "SUCCESS"
    }

    /// Most specific rejection reason the response carries, if any.
    pub fn rejection_reason(&self) -> Option<&str> {
        self.creatives
            .iter()
            .find_map(|item| item.sub_request_error_reason.as_deref())
    }
}

// ─── Token refresh ──────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    #[serde(default)]
    pub access_token: Option<String>,
}
