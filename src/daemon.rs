use crate::api::AdsClient;
use crate::config::Config;
use crate::rotation;
use crate::selector::HeadlineSelector;
use crate::store::OutcomeStore;
use anyhow::Result;
use tokio::time::{self, Duration};
use tokio_util::sync::CancellationToken;

const MIN_INTERVAL_SECONDS: u64 = 60;

/// Fixed-interval rotation loop. Each cycle completes before the next
/// starts; ctrl-c stops the loop at the next safe point.
pub async fn run(config: Config) -> Result<()> {
    config.validate()?;

    let client = AdsClient::new(&config);
    let store = OutcomeStore::open(&config.store_path()).await?;
    let mut selector = HeadlineSelector::new(config.corpus_path());

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("shutdown signal received, finishing current work");
                cancel.cancel();
            }
        });
    }

    let interval_secs = config.scheduler.interval_secs.max(MIN_INTERVAL_SECONDS);
    let mut interval = time::interval(Duration::from_secs(interval_secs));
    tracing::info!("daemon started, one cycle every {interval_secs}s");

    loop {
        tokio::select! {
            () = cancel.cancelled() => break,
            _ = interval.tick() => {}
        }

        rotation::cycle::run_cycle(&config, &client, &store, &mut selector, &cancel).await;

        if cancel.is_cancelled() {
            break;
        }
    }

    tracing::info!("daemon stopped");
    Ok(())
}
