//! Tick-driven scheduling of tracker checks

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::Utc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::fetch::Fetcher;
use crate::pipeline;
use crate::store::TrackerStore;
use crate::tracker::Tracker;

/// Consecutive failures after which a tracker gets a louder warning
const FAILURE_WARN_STREAK: u32 = 5;

/// Scheduler timing knobs
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Time between due-tracker scans
    pub tick: Duration,
    /// Delay between dispatches within one scan, spreading load over the tick
    pub stagger: Duration,
}

/// Drives periodic checks for every tracker in the store
///
/// Each tick the scheduler re-reads the tracker set, so created, edited and
/// deleted trackers take effect on the next scan without a restart. Checks
/// run as spawned tasks; a per-tracker guard keeps at most one check in
/// flight per tracker and is released on completion, cancellation or panic.
pub struct Scheduler {
    store: Arc<dyn TrackerStore>,
    fetcher: Arc<Fetcher>,
    config: SchedulerConfig,
    enabled: AtomicBool,
    in_flight: Arc<Mutex<HashSet<String>>>,
    cancel: CancellationToken,
}

impl Scheduler {
    pub fn new(
        store: Arc<dyn TrackerStore>,
        fetcher: Arc<Fetcher>,
        config: SchedulerConfig,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            store,
            fetcher,
            config,
            enabled: AtomicBool::new(true),
            in_flight: Arc::new(Mutex::new(HashSet::new())),
            cancel,
        }
    }

    /// Whether scheduled dispatch is currently on
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::SeqCst)
    }

    /// Turn scheduled dispatch on or off
    ///
    /// Turning it off never cancels checks already in flight; they complete
    /// and persist their results.
    pub fn set_enabled(&self, enabled: bool) {
        let was = self.enabled.swap(enabled, Ordering::SeqCst);
        if was != enabled {
            tracing::info!(
                "Scheduler {}",
                if enabled { "enabled" } else { "disabled" }
            );
        }
    }

    /// Run the scheduling loop until the cancellation token fires
    ///
    /// On cancellation, dispatch stops but in-flight checks are drained so
    /// their results still land in the store.
    pub async fn run(&self) {
        tracing::info!(
            "Scheduler running (tick {:?}, stagger {:?})",
            self.config.tick,
            self.config.stagger
        );

        let mut checks: JoinSet<(String, crate::Result<Tracker>)> = JoinSet::new();
        let mut failure_streaks: HashMap<String, u32> = HashMap::new();
        let mut ticker = tokio::time::interval(self.config.tick);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if self.is_enabled() {
                        self.dispatch_due(&mut checks, &mut failure_streaks).await;
                    }
                }
                Some(joined) = checks.join_next() => {
                    match joined {
                        Ok((id, result)) => {
                            self.note_check_result(&id, &result, &mut failure_streaks);
                        }
                        Err(e) => tracing::error!("Check task panicked: {}", e),
                    }
                }
                _ = self.cancel.cancelled() => {
                    tracing::debug!("Scheduler loop cancelled");
                    break;
                }
            }
        }

        if !checks.is_empty() {
            tracing::info!("Waiting for {} in-flight checks to finish", checks.len());
        }
        while let Some(joined) = checks.join_next().await {
            if let Ok((id, result)) = joined {
                self.note_check_result(&id, &result, &mut failure_streaks);
            }
        }
        tracing::info!("Scheduler stopped");
    }

    /// Run one check immediately, bypassing the due evaluation
    ///
    /// The per-tracker guard still applies: a tracker whose scheduled check
    /// is currently running cannot be checked again concurrently.
    pub async fn check_now(&self, tracker_id: &str) -> crate::Result<Tracker> {
        let tracker = self.store.get(tracker_id).await?;

        let _guard = InFlightGuard::claim(&self.in_flight, &tracker.id)
            .ok_or_else(|| crate::PagewatchError::CheckInFlight(tracker.id.clone()))?;

        tracing::debug!("Manual check for tracker '{}'", tracker.name);
        pipeline::run_check(&tracker, &self.fetcher, self.store.as_ref()).await
    }

    /// Scan the store and spawn a check task for every due tracker
    ///
    /// Failure streaks for trackers no longer in the store are dropped
    /// during the scan.
    async fn dispatch_due(
        &self,
        checks: &mut JoinSet<(String, crate::Result<Tracker>)>,
        failure_streaks: &mut HashMap<String, u32>,
    ) {
        let trackers = match self.store.list().await {
            Ok(trackers) => trackers,
            Err(e) => {
                tracing::warn!("Failed to list trackers: {}", e);
                return;
            }
        };

        failure_streaks.retain(|id, _| trackers.iter().any(|t| t.id == *id));

        let now = Utc::now();
        let total = trackers.len();
        let due: Vec<Tracker> = trackers.into_iter().filter(|t| t.is_due(now)).collect();
        if due.is_empty() {
            return;
        }
        tracing::debug!("{} of {} trackers due", due.len(), total);

        let mut dispatched = 0u32;
        for tracker in due {
            let guard = match InFlightGuard::claim(&self.in_flight, &tracker.id) {
                Some(guard) => guard,
                None => {
                    tracing::debug!(
                        "Tracker '{}' still has a check in flight, skipping",
                        tracker.name
                    );
                    continue;
                }
            };

            let delay = self.config.stagger * dispatched;
            dispatched += 1;

            let store = Arc::clone(&self.store);
            let fetcher = Arc::clone(&self.fetcher);
            checks.spawn(async move {
                let _guard = guard;
                if !delay.is_zero() {
                    tokio::time::sleep(delay).await;
                }
                let result = pipeline::run_check(&tracker, &fetcher, store.as_ref()).await;
                (tracker.id, result)
            });
        }
    }

    /// Record a finished check, tracking consecutive failures per tracker
    fn note_check_result(
        &self,
        id: &str,
        result: &crate::Result<Tracker>,
        failure_streaks: &mut HashMap<String, u32>,
    ) {
        match result {
            Ok(tracker) => {
                failure_streaks.remove(id);
                tracing::debug!("Check '{}' completed with status {}", id, tracker.status);
            }
            Err(e) => {
                let streak = failure_streaks.entry(id.to_string()).or_insert(0);
                *streak += 1;
                if *streak == FAILURE_WARN_STREAK {
                    tracing::warn!("Tracker '{}' has {} consecutive failed checks", id, streak);
                } else {
                    tracing::warn!("Check for tracker '{}' failed: {}", id, e);
                }
            }
        }
    }
}

/// Marks one tracker as having a check in flight
///
/// The marker is removed in `Drop`, so it clears when the check completes,
/// when the owning future is dropped mid-await, and when a check task
/// panics. The lock is never held across an await point.
struct InFlightGuard {
    in_flight: Arc<Mutex<HashSet<String>>>,
    id: String,
}

impl InFlightGuard {
    /// Claim the in-flight slot for a tracker, or `None` if one is taken
    fn claim(in_flight: &Arc<Mutex<HashSet<String>>>, id: &str) -> Option<Self> {
        let claimed = in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(id.to_string());
        if !claimed {
            return None;
        }
        Some(Self {
            in_flight: Arc::clone(in_flight),
            id: id.to_string(),
        })
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.id);
    }
}
