pub mod client;
pub mod scrub;
pub mod types;

pub use client::AdsClient;
pub use types::{
    Ad, AdStatus, Creative, CreativeUpdateItem, CreativeUpdateRequest, ProfileProperties,
    ReviewStatus, UpdateResponse, WebViewProperties,
};
