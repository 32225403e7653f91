use super::filter::PreparedCreative;
use crate::api::AdsClient;
use crate::api::types::{
    CreativeUpdateItem, CreativeUpdateRequest, UpdateProfileProperties, UpdateWebViewProperties,
};
use crate::selector::HeadlineSelector;
use crate::store::{OutcomeRecord, OutcomeStore};
use tokio_util::sync::CancellationToken;

/// Run the headline-update transaction for one creative and report the
/// outcome. Persisting the outcome is the caller's job.
pub async fn apply(
    client: &AdsClient,
    token: &str,
    selector: &mut HeadlineSelector,
    store: &OutcomeStore,
    creative: &PreparedCreative,
    cancel: &CancellationToken,
) -> OutcomeRecord {
    let prior = creative.prior_headline();

    // Known-invalid input never reaches the network.
    let missing = creative.missing_mandatory();
    if !missing.is_empty() {
        let message = format!("Missing required fields: {}", missing.join(", "));
        tracing::error!("creative {} not submitted: {message}", creative.id);
        return OutcomeRecord::failed(&creative.id, &prior, "", message);
    }

    let new_headline = selector
        .select(store, &creative.id, Some(prior.as_str()))
        .await;

    let request = CreativeUpdateRequest {
        creatives: vec![CreativeUpdateItem {
            ad_account_id: client.account_id().to_string(),
            id: creative.id.clone(),
            headline: new_headline.clone(),
            web_view_properties: UpdateWebViewProperties {
                url: creative.web_view_url.clone(),
                block_preload: creative.block_preload,
            },
            kind: creative.kind.clone(),
            ad_product: creative.ad_product.clone(),
            top_snap_media_id: creative.top_snap_media_id.clone(),
            top_snap_crop_position: creative.top_snap_crop_position.clone(),
            name: creative.name.clone(),
            call_to_action: creative.call_to_action.clone(),
            shareable: creative.shareable,
            profile_properties: UpdateProfileProperties {
                profile_id: creative.profile_id.clone(),
            },
        }],
    };

    match client.update_creative(token, &request, cancel).await {
        Ok((verdict, raw)) => {
            if verdict.is_success() {
                tracing::info!(
                    "updated creative {} with new headline: {new_headline}",
                    creative.id
                );
                OutcomeRecord::success(&creative.id, &prior, &new_headline)
            } else {
                let reason = verdict.rejection_reason().map_or_else(
                    || format!("Unexpected response: {raw}"),
                    ToString::to_string,
                );
                tracing::error!("creative update rejected for {}: {reason}", creative.id);
                OutcomeRecord::failed(&creative.id, &prior, &new_headline, reason)
            }
        }
        Err(e) => {
            tracing::error!("creative update failed for {}: {e}", creative.id);
            OutcomeRecord::failed(&creative.id, &prior, &new_headline, e.to_string())
        }
    }
}
