//! Tracker persistence boundary and the in-memory reference store

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::{broadcast, RwLock};

use crate::error::PagewatchError;
use crate::tracker::{CheckUpdate, Tracker};

/// How many store events may queue per subscriber before lagging
const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Change notification pushed to store subscribers
#[derive(Debug, Clone)]
pub enum TrackerEvent {
    Updated(Tracker),
    Removed(String),
}

/// Persistence boundary for tracker records
///
/// The check engine pulls the current set with `list` and writes results
/// back through `update_check_result`; creating, editing and deleting
/// trackers belongs to whatever surface sits on top of the store. That
/// surface observes check results through `subscribe` instead of polling.
#[async_trait]
#[cfg_attr(test, mockall::automock)]
pub trait TrackerStore: Send + Sync {
    /// All known trackers
    async fn list(&self) -> crate::Result<Vec<Tracker>>;

    /// A single tracker by id
    async fn get(&self, id: &str) -> crate::Result<Tracker>;

    /// Merge a completed check's fields into the stored record
    ///
    /// Only the four check-result fields change; everything else on the
    /// record is left as-is. Returns the record after the merge.
    async fn update_check_result(&self, id: &str, update: CheckUpdate) -> crate::Result<Tracker>;

    /// Insert a tracker, replacing any existing record with the same id
    async fn upsert(&self, tracker: Tracker) -> crate::Result<()>;

    /// Delete a tracker by id
    async fn remove(&self, id: &str) -> crate::Result<()>;

    /// Receive a notification for every subsequent store mutation
    fn subscribe(&self) -> broadcast::Receiver<TrackerEvent>;
}

/// In-memory reference implementation of the tracker store
///
/// Holds the whole tracker set behind one RwLock. Writes touch a single
/// record and are last-writer-wins, which is safe because the scheduler
/// keeps at most one check in flight per tracker.
#[derive(Debug)]
pub struct MemoryTrackerStore {
    trackers: RwLock<HashMap<String, Tracker>>,
    events: broadcast::Sender<TrackerEvent>,
}

impl MemoryTrackerStore {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            trackers: RwLock::new(HashMap::new()),
            events,
        }
    }

    /// Send failures only mean nobody is subscribed right now
    fn notify(&self, event: TrackerEvent) {
        let _ = self.events.send(event);
    }
}

impl Default for MemoryTrackerStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TrackerStore for MemoryTrackerStore {
    async fn list(&self) -> crate::Result<Vec<Tracker>> {
        let trackers = self.trackers.read().await;
        Ok(trackers.values().cloned().collect())
    }

    async fn get(&self, id: &str) -> crate::Result<Tracker> {
        let trackers = self.trackers.read().await;
        trackers
            .get(id)
            .cloned()
            .ok_or_else(|| PagewatchError::UnknownTracker(id.to_string()))
    }

    async fn update_check_result(&self, id: &str, update: CheckUpdate) -> crate::Result<Tracker> {
        let updated = {
            let mut trackers = self.trackers.write().await;
            let tracker = trackers
                .get_mut(id)
                .ok_or_else(|| PagewatchError::UnknownTracker(id.to_string()))?;

            tracker.last_value = Some(update.last_value);
            tracker.last_checked = Some(update.last_checked);
            tracker.status = update.status;
            tracker.updated_at = update.updated_at;
            tracker.clone()
        };

        self.notify(TrackerEvent::Updated(updated.clone()));
        Ok(updated)
    }

    async fn upsert(&self, tracker: Tracker) -> crate::Result<()> {
        {
            let mut trackers = self.trackers.write().await;
            trackers.insert(tracker.id.clone(), tracker.clone());
        }
        self.notify(TrackerEvent::Updated(tracker));
        Ok(())
    }

    async fn remove(&self, id: &str) -> crate::Result<()> {
        {
            let mut trackers = self.trackers.write().await;
            trackers
                .remove(id)
                .ok_or_else(|| PagewatchError::UnknownTracker(id.to_string()))?;
        }
        self.notify(TrackerEvent::Removed(id.to_string()));
        Ok(())
    }

    fn subscribe(&self) -> broadcast::Receiver<TrackerEvent> {
        self.events.subscribe()
    }
}
