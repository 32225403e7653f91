use super::{filter, transactor};
use crate::api::AdsClient;
use crate::auth;
use crate::config::Config;
use crate::selector::HeadlineSelector;
use crate::store::OutcomeStore;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// One full sweep over the account: refresh credentials, collect eligible
/// creatives, update each in fetch order and record the outcome.
///
/// Never raises out of the cycle; the next scheduled cycle is the retry
/// mechanism for anything that goes wrong here.
pub async fn run_cycle(
    config: &Config,
    client: &AdsClient,
    store: &OutcomeStore,
    selector: &mut HeadlineSelector,
    cancel: &CancellationToken,
) {
    let token = match auth::refresh_access_token(
        client.http(),
        &config.auth_base,
        &config.credentials,
        &config.reliability,
        cancel,
    )
    .await
    {
        Ok(token) => token,
        Err(e) => {
            tracing::error!("access token refresh failed, skipping cycle: {e}");
            return;
        }
    };
    tracing::info!("access token refreshed");

    let pairs = filter::select_eligible(client, &token, &config.defaults, cancel).await;
    if pairs.is_empty() {
        tracing::info!("no eligible creatives this cycle");
        return;
    }

    let pace = Duration::from_secs(config.scheduler.pace_secs);
    let mut attempts = 0usize;

    for (ad, creative) in pairs {
        if cancel.is_cancelled() {
            tracing::info!("cycle interrupted before creative {}", creative.id);
            break;
        }

        let outcome = transactor::apply(client, &token, selector, store, &creative, cancel).await;
        tracing::info!(
            "update attempt for creative {} (ad {}): {}",
            creative.id,
            ad.id,
            outcome.status
        );

        if let Err(e) = store.append(&outcome).await {
            tracing::warn!("failed to record outcome for creative {}: {e}", creative.id);
        }
        attempts += 1;

        // Pause between updates to respect the remote rate limit.
        tokio::select! {
            () = cancel.cancelled() => break,
            () = tokio::time::sleep(pace) => {}
        }
    }

    tracing::info!("cycle complete: {attempts} update attempts");
}
