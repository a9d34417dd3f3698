//! Error types for the pagewatch service

/// Errors raised while fetching a tracker's target
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("HTTP status {0}")]
    Status(u16),

    #[error("Request timed out")]
    Timeout,

    #[error("Network error: {0}")]
    Network(String),
}

/// Errors raised while extracting a value from fetched content
#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    #[error("Key not found: {0}")]
    KeyNotFound(String),

    #[error("Element not found: {0}")]
    ElementNotFound(String),

    #[error("Invalid selector: {0}")]
    InvalidSelector(String),
}

/// Errors that can occur in the pagewatch service
#[derive(Debug, thiserror::Error)]
pub enum PagewatchError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("Extraction failed: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("Unknown tracker: {0}")]
    UnknownTracker(String),

    #[error("A check is already in flight for tracker '{0}'")]
    CheckInFlight(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for pagewatch operations
pub type Result<T> = std::result::Result<T, PagewatchError>;
