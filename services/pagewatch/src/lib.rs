//! Pagewatch - URL change monitoring service
//!
//! Polls tracked URLs on per-tracker intervals, extracts a single value
//! from each response (CSS selector for HTML, dotted key path for JSON),
//! classifies it against the previous observation, and writes the result
//! back to the tracker store.

pub mod classify;
pub mod config;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod pipeline;
pub mod scheduler;
pub mod store;
pub mod tracker;

pub use config::{load_config, Config};
pub use error::{PagewatchError, Result};

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;

use crate::fetch::{Fetcher, HttpClient, ReqwestHttpClient};
use crate::scheduler::{Scheduler, SchedulerConfig};
use crate::store::{MemoryTrackerStore, TrackerStore};
use crate::tracker::Tracker;

/// Build the tracker store, seeded with the configured trackers
///
/// Trackers created later through the store are picked up on the next scan
/// without a restart.
async fn seed_store(config: &Config) -> Result<Arc<dyn TrackerStore>> {
    let store: Arc<dyn TrackerStore> = Arc::new(MemoryTrackerStore::new());
    let now = Utc::now();
    for seed in &config.trackers {
        store.upsert(seed.clone().into_tracker(now)).await?;
    }
    Ok(store)
}

/// Build the scheduler around an existing store
fn build_scheduler(
    config: &Config,
    store: Arc<dyn TrackerStore>,
    cancel: CancellationToken,
) -> Scheduler {
    let http: Arc<dyn HttpClient> = Arc::new(ReqwestHttpClient::new(Duration::from_secs(
        config.fetch.timeout_seconds,
    )));
    let fetcher = Arc::new(Fetcher::new(http, config.fetch.relay_url.clone()));

    let scheduler = Scheduler::new(
        store,
        fetcher,
        SchedulerConfig {
            tick: Duration::from_secs(config.scheduler.tick_seconds),
            stagger: Duration::from_secs(config.scheduler.stagger_seconds),
        },
        cancel,
    );
    scheduler.set_enabled(config.scheduler.autostart);
    scheduler
}

/// Run the pagewatch service with the given configuration
pub async fn run(config: Config) -> Result<()> {
    config.validate()?;

    let cancel = CancellationToken::new();
    let store = seed_store(&config).await?;
    let scheduler = build_scheduler(&config, store, cancel.clone());

    // Setup shutdown handler
    let cancel_for_signal = cancel.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to listen for ctrl-c");
        tracing::info!("Shutdown signal received");
        cancel_for_signal.cancel();
    });

    tracing::info!(
        "Pagewatch engine started ({} trackers)",
        config.trackers.len()
    );

    // Run the scheduler (blocks until cancelled)
    scheduler.run().await;

    tracing::info!("Pagewatch engine stopped");
    Ok(())
}

/// Run one check for a single tracker and return the updated record
///
/// Used by the command line for ad-hoc checks; the scheduling loop never
/// starts.
pub async fn run_single_check(config: Config, tracker_id: &str) -> Result<Tracker> {
    config.validate()?;

    let store = seed_store(&config).await?;
    let scheduler = build_scheduler(&config, store, CancellationToken::new());
    scheduler.check_now(tracker_id).await
}
