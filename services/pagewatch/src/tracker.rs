//! Tracker record and status types

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Classification of a tracker's most recent check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TrackerStatus {
    /// Created but never successfully checked
    New,
    Stable,
    Changed,
    Match,
    NoMatch,
}

impl fmt::Display for TrackerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackerStatus::New => write!(f, "new"),
            TrackerStatus::Stable => write!(f, "stable"),
            TrackerStatus::Changed => write!(f, "changed"),
            TrackerStatus::Match => write!(f, "match"),
            TrackerStatus::NoMatch => write!(f, "no-match"),
        }
    }
}

fn default_check_interval() -> u32 {
    15
}

fn default_status() -> TrackerStatus {
    TrackerStatus::New
}

/// A monitored URL plus the locator and schedule for checking it
///
/// `selector` is either a CSS selector (HTML targets) or a dot-separated
/// key path (JSON targets); which one applies is decided per check by
/// sniffing the fetched content, not stored here.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tracker {
    pub id: String,
    pub name: String,
    pub url: String,
    pub selector: String,

    /// When present and non-empty, checks POST this raw JSON body instead
    /// of issuing a GET
    #[serde(default)]
    pub request_body: Option<String>,

    /// When present and non-empty, switches classification from change
    /// detection to case-insensitive keyword matching
    #[serde(default)]
    pub trigger_word: Option<String>,

    #[serde(default = "default_check_interval")]
    pub check_interval_minutes: u32,

    #[serde(default)]
    pub last_value: Option<String>,

    #[serde(default)]
    pub last_checked: Option<DateTime<Utc>>,

    #[serde(default = "default_status")]
    pub status: TrackerStatus,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Tracker {
    /// Whether this tracker is due for a check at `now`
    ///
    /// A tracker that has never been checked is always due. Otherwise the
    /// elapsed time since the last check must meet or exceed the configured
    /// interval; the exact boundary counts as due.
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        match self.last_checked {
            None => true,
            Some(last) => {
                now.signed_duration_since(last)
                    >= Duration::minutes(i64::from(self.check_interval_minutes))
            }
        }
    }
}

/// The tracker fields a completed check is allowed to write back
#[derive(Debug, Clone, PartialEq)]
pub struct CheckUpdate {
    pub last_value: String,
    pub last_checked: DateTime<Utc>,
    pub status: TrackerStatus,
    pub updated_at: DateTime<Utc>,
}
