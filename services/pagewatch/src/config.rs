//! Configuration types for the pagewatch service

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

use crate::tracker::{Tracker, TrackerStatus};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub scheduler: SchedulerSettings,
    #[serde(default)]
    pub fetch: FetchSettings,
    #[serde(default)]
    pub trackers: Vec<TrackerSeed>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            scheduler: SchedulerSettings::default(),
            fetch: FetchSettings::default(),
            trackers: Vec::new(),
        }
    }
}

/// Scheduler timing configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerSettings {
    /// Seconds between due-tracker scans
    #[serde(default = "default_tick_seconds")]
    pub tick_seconds: u64,

    /// Seconds between dispatches within one scan
    #[serde(default = "default_stagger_seconds")]
    pub stagger_seconds: u64,

    /// Whether the scheduler dispatches checks as soon as it starts
    #[serde(default = "default_true")]
    pub autostart: bool,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            tick_seconds: default_tick_seconds(),
            stagger_seconds: default_stagger_seconds(),
            autostart: true,
        }
    }
}

/// HTTP fetch configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchSettings {
    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,

    /// Forwarding relay prefix; targets are percent-encoded and appended.
    /// Unset means targets are fetched directly.
    #[serde(default)]
    pub relay_url: Option<String>,
}

impl Default for FetchSettings {
    fn default() -> Self {
        Self {
            timeout_seconds: default_timeout_seconds(),
            relay_url: None,
        }
    }
}

/// A tracker definition as written in the config file
///
/// Seeds carry only the user-editable fields; check state starts empty.
/// The id defaults to the name, so small configs can omit it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerSeed {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    pub url: String,
    pub selector: String,
    #[serde(default)]
    pub request_body: Option<String>,
    #[serde(default)]
    pub trigger_word: Option<String>,
    #[serde(default = "default_check_interval_minutes")]
    pub check_interval_minutes: u32,
}

impl TrackerSeed {
    pub fn effective_id(&self) -> &str {
        self.id.as_deref().unwrap_or(&self.name)
    }

    /// Build a fresh tracker record from this seed
    pub fn into_tracker(self, now: DateTime<Utc>) -> Tracker {
        Tracker {
            id: self.id.unwrap_or_else(|| self.name.clone()),
            name: self.name,
            url: self.url,
            selector: self.selector,
            request_body: self.request_body,
            trigger_word: self.trigger_word,
            check_interval_minutes: self.check_interval_minutes,
            last_value: None,
            last_checked: None,
            status: TrackerStatus::New,
            created_at: now,
            updated_at: now,
        }
    }
}

impl Config {
    /// Reject configurations the engine cannot run
    pub fn validate(&self) -> crate::Result<()> {
        if self.scheduler.tick_seconds == 0 {
            return Err(crate::PagewatchError::Config(
                "scheduler.tick_seconds must be at least 1".to_string(),
            ));
        }
        if self.fetch.timeout_seconds == 0 {
            return Err(crate::PagewatchError::Config(
                "fetch.timeout_seconds must be at least 1".to_string(),
            ));
        }

        let mut seen_ids = HashSet::new();
        for seed in &self.trackers {
            let id = seed.effective_id();
            if !seen_ids.insert(id.to_string()) {
                return Err(crate::PagewatchError::Config(format!(
                    "Duplicate tracker id '{}'",
                    id
                )));
            }

            let url = reqwest::Url::parse(&seed.url).map_err(|e| {
                crate::PagewatchError::Config(format!(
                    "Tracker '{}' has an invalid url '{}': {}",
                    seed.name, seed.url, e
                ))
            })?;
            if !matches!(url.scheme(), "http" | "https") {
                return Err(crate::PagewatchError::Config(format!(
                    "Tracker '{}' has unsupported url scheme '{}'",
                    seed.name,
                    url.scheme()
                )));
            }

            if seed.selector.trim().is_empty() {
                return Err(crate::PagewatchError::Config(format!(
                    "Tracker '{}' has an empty selector",
                    seed.name
                )));
            }

            if seed.check_interval_minutes == 0 {
                return Err(crate::PagewatchError::Config(format!(
                    "Tracker '{}' must have a check interval of at least one minute",
                    seed.name
                )));
            }
        }
        Ok(())
    }
}

fn default_tick_seconds() -> u64 {
    60
}

fn default_stagger_seconds() -> u64 {
    2
}

fn default_timeout_seconds() -> u64 {
    15
}

fn default_check_interval_minutes() -> u32 {
    15
}

fn default_true() -> bool {
    true
}

/// Load and validate configuration from a JSON file
pub fn load_config(path: &Path) -> crate::Result<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        crate::PagewatchError::Config(format!("Failed to read config file {:?}: {}", path, e))
    })?;
    let config: Config = serde_json::from_str(&content)?;
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_full_config() {
        let json = r#"{
            "scheduler": {
                "tick_seconds": 30,
                "stagger_seconds": 1,
                "autostart": false
            },
            "fetch": {
                "timeout_seconds": 10,
                "relay_url": "https://relay.example.com/fetch?url="
            },
            "trackers": [
                {
                    "id": "price-1",
                    "name": "Example price",
                    "url": "https://shop.example.com/item/7",
                    "selector": ".price",
                    "check_interval_minutes": 30
                },
                {
                    "name": "Deal status",
                    "url": "https://api.example.com/deals/42",
                    "selector": "dealing.status",
                    "request_body": "{\"region\":\"eu\"}",
                    "trigger_word": "closed"
                }
            ]
        }"#;

        let config: Config = serde_json::from_str(json).unwrap();
        config.validate().unwrap();

        assert_eq!(config.scheduler.tick_seconds, 30);
        assert_eq!(config.scheduler.stagger_seconds, 1);
        assert!(!config.scheduler.autostart);
        assert_eq!(config.fetch.timeout_seconds, 10);
        assert_eq!(
            config.fetch.relay_url.as_deref(),
            Some("https://relay.example.com/fetch?url=")
        );

        assert_eq!(config.trackers.len(), 2);
        assert_eq!(config.trackers[0].effective_id(), "price-1");
        assert_eq!(config.trackers[0].check_interval_minutes, 30);
        assert_eq!(config.trackers[1].effective_id(), "Deal status");
        assert_eq!(config.trackers[1].check_interval_minutes, 15);
        assert_eq!(config.trackers[1].trigger_word.as_deref(), Some("closed"));
    }

    #[test]
    fn parse_minimal_config() {
        let json = r#"{}"#;
        let config: Config = serde_json::from_str(json).unwrap();

        assert_eq!(config.scheduler.tick_seconds, 60);
        assert_eq!(config.scheduler.stagger_seconds, 2);
        assert!(config.scheduler.autostart);
        assert_eq!(config.fetch.timeout_seconds, 15);
        assert!(config.fetch.relay_url.is_none());
        assert!(config.trackers.is_empty());
    }

    #[test]
    fn seed_becomes_a_new_tracker() {
        let seed = TrackerSeed {
            id: None,
            name: "Deal status".to_string(),
            url: "https://api.example.com/deals/42".to_string(),
            selector: "dealing.status".to_string(),
            request_body: None,
            trigger_word: Some("closed".to_string()),
            check_interval_minutes: 30,
        };

        let now = Utc::now();
        let tracker = seed.into_tracker(now);

        assert_eq!(tracker.id, "Deal status");
        assert_eq!(tracker.status, TrackerStatus::New);
        assert!(tracker.last_value.is_none());
        assert!(tracker.last_checked.is_none());
        assert_eq!(tracker.created_at, now);
        assert_eq!(tracker.updated_at, now);
    }

    #[test]
    fn explicit_id_wins_over_name() {
        let json = r#"{
            "trackers": [{
                "id": "t-7",
                "name": "Anything",
                "url": "https://example.com",
                "selector": "h1"
            }]
        }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        let tracker = config.trackers[0].clone().into_tracker(Utc::now());
        assert_eq!(tracker.id, "t-7");
    }

    #[test]
    fn validate_rejects_zero_check_interval() {
        let json = r#"{
            "trackers": [{
                "name": "Bad",
                "url": "https://example.com",
                "selector": "h1",
                "check_interval_minutes": 0
            }]
        }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("at least one minute"));
    }

    #[test]
    fn validate_rejects_invalid_url() {
        let json = r#"{
            "trackers": [{
                "name": "Bad",
                "url": "not a url",
                "selector": "h1"
            }]
        }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("invalid url"));
    }

    #[test]
    fn validate_rejects_non_http_scheme() {
        let json = r#"{
            "trackers": [{
                "name": "Bad",
                "url": "ftp://example.com/file",
                "selector": "h1"
            }]
        }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("unsupported url scheme"));
    }

    #[test]
    fn validate_rejects_duplicate_ids() {
        let json = r#"{
            "trackers": [
                {"name": "Same", "url": "https://example.com/a", "selector": "h1"},
                {"name": "Same", "url": "https://example.com/b", "selector": "h2"}
            ]
        }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("Duplicate tracker id"));
    }

    #[test]
    fn validate_rejects_blank_selector() {
        let json = r#"{
            "trackers": [{
                "name": "Bad",
                "url": "https://example.com",
                "selector": "   "
            }]
        }"#;
        let config: Config = serde_json::from_str(json).unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("empty selector"));
    }

    #[test]
    fn validate_rejects_zero_tick() {
        let json = r#"{"scheduler": {"tick_seconds": 0}}"#;
        let config: Config = serde_json::from_str(json).unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("tick_seconds"));
    }

    #[test]
    fn load_config_missing_file() {
        let result = load_config(Path::new("/nonexistent/config.json"));
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }

    #[test]
    fn load_config_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("config.json");
        std::fs::write(
            &config_path,
            r#"{"trackers": [{"name": "T", "url": "https://example.com", "selector": "h1"}]}"#,
        )
        .unwrap();

        let config = load_config(&config_path).unwrap();
        assert_eq!(config.trackers.len(), 1);
    }

    #[test]
    fn load_config_invalid_json() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("config.json");
        std::fs::write(&config_path, "not json").unwrap();

        let result = load_config(&config_path);
        assert!(result.is_err());
    }

    #[test]
    fn load_config_rejects_invalid_trackers() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("config.json");
        std::fs::write(
            &config_path,
            r#"{"trackers": [{"name": "T", "url": "nope", "selector": "h1"}]}"#,
        )
        .unwrap();

        let result = load_config(&config_path);
        assert!(result.is_err());
    }

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(config.scheduler.tick_seconds, 60);
        assert!(config.scheduler.autostart);
        assert_eq!(config.fetch.timeout_seconds, 15);
        assert!(config.trackers.is_empty());
        config.validate().unwrap();
    }
}
