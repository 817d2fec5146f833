use thiserror::Error;

#[derive(Error, Debug)]
pub enum FeedwatchError {
    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    // Feed errors
    #[error("Feed not found: {0}")]
    FeedNotFound(u64),

    // Network errors
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    // Parsing errors
    #[error("Feed parsing failed: {0}")]
    FeedParse(String),

    // State store errors. Load and save failures are distinct, and both are
    // distinct from "no state persisted yet", which is not an error at all.
    #[error("State load failed: {0}")]
    StateLoad(String),

    #[error("State save failed: {0}")]
    StateSave(String),

    #[error("Persisted state is corrupt: {0}")]
    StateCorrupt(#[from] serde_json::Error),

    // Notification errors
    #[error("Notification failed: {0}")]
    Notification(String),

    // IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // User input errors
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

pub type FeedwatchResult<T> = Result<T, FeedwatchError>;
