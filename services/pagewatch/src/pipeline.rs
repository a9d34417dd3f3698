//! The per-tracker check pipeline: fetch, extract, classify, persist

use chrono::Utc;

use crate::classify::classify;
use crate::extract::extract;
use crate::fetch::Fetcher;
use crate::store::TrackerStore;
use crate::tracker::{CheckUpdate, Tracker};

/// Run one complete check for a tracker
///
/// On success exactly one store write happens, carrying the new value, the
/// check timestamp and the classified status. A fetch or extraction failure
/// aborts the run before the write, leaving the stored record untouched;
/// the caller decides how loudly to report it. Returns the record as
/// persisted.
pub async fn run_check(
    tracker: &Tracker,
    fetcher: &Fetcher,
    store: &dyn TrackerStore,
) -> crate::Result<Tracker> {
    tracing::debug!("Checking tracker '{}' ({})", tracker.name, tracker.url);

    let raw = fetcher
        .fetch(&tracker.url, tracker.request_body.as_deref())
        .await?;

    let value = extract(&raw, &tracker.selector)?;
    let status = classify(
        tracker.last_value.as_deref(),
        &value,
        tracker.trigger_word.as_deref(),
    );

    tracing::debug!(
        "Check '{}': {} -> {} (value: {})",
        tracker.name,
        tracker.status,
        status,
        value
    );

    let now = Utc::now();
    let update = CheckUpdate {
        last_value: value,
        last_checked: now,
        status,
        updated_at: now,
    };
    store.update_check_result(&tracker.id, update).await
}
