//! Tally Sync Daemon
//!
//! Headless driver for the sync core: warms the rate cache from disk,
//! runs an initial sync, and keeps rates fresh on the configured interval
//! until interrupted.

use std::sync::Arc;

use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tally_rates::{AggregatorConfig, RateAggregator, RateTable};
use tally_sync::signal::AlwaysReachable;
use tally_sync::{SyncConfig, SyncCoordinator, SyncEvent, SyncOptions};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    info!("Starting tally sync daemon");

    let rates_config = AggregatorConfig::from_env();
    if let Err(e) = rates_config.validate() {
        error!(error = %e, "Invalid rates configuration");
        return Err(anyhow::anyhow!("configuration error: {}", e));
    }

    let sync_config = SyncConfig::from_env();
    if let Err(e) = sync_config.validate() {
        error!(error = %e, "Invalid sync configuration");
        return Err(anyhow::anyhow!("configuration error: {}", e));
    }

    let table = Arc::new(RateTable::new());
    let aggregator = Arc::new(RateAggregator::from_config(rates_config, table.clone())?);

    // Warm the cache from the last persisted payload; missing is normal on
    // first launch.
    if let Err(e) = aggregator.load_cached() {
        warn!(error = %e, "No persisted rates to warm from");
    }

    let coordinator = SyncCoordinator::new(
        sync_config,
        aggregator,
        Vec::new(),
        Arc::new(AlwaysReachable),
        None,
    );

    let mut events = coordinator.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            if let SyncEvent::Completed {
                sync_id,
                success,
                canceled,
                errors,
            } = event
            {
                info!(
                    sync_id = %sync_id,
                    success,
                    canceled,
                    error_count = errors.len(),
                    "Sync cycle completed"
                );
            }
        }
    });

    coordinator.sync(SyncOptions::automatic()).await;
    info!(pairs = table.pair_count(), "Initial sync finished");

    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received");
    coordinator.shutdown();

    Ok(())
}
