use std::time::Duration;

use crate::errors::{FeedwatchError, FeedwatchResult};

#[derive(Debug, Clone)]
pub struct Config {
    pub state_path: String,
    pub gotify_url: String,
    pub poll_interval: Duration,
    pub fetch_timeout: Duration,
}

impl Config {
    /// Get the directory where the executable is located
    fn exe_dir() -> Option<std::path::PathBuf> {
        std::env::current_exe()
            .ok()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
    }

    pub fn from_env() -> FeedwatchResult<Self> {
        let exe_dir = Self::exe_dir();

        // Try to load .env from executable's directory first
        if let Some(ref dir) = exe_dir {
            let env_path = dir.join(".env");
            if env_path.exists() {
                dotenvy::from_path(&env_path).ok();
            }
        }
        // Fall back to current directory
        dotenvy::dotenv().ok();

        let gotify_url = std::env::var("GOTIFY_URL")
            .map_err(|_| FeedwatchError::MissingEnvVar("GOTIFY_URL".to_string()))?;

        // Default state path is relative to executable directory
        let state_path = std::env::var("FEEDWATCH_STATE_PATH").unwrap_or_else(|_| {
            exe_dir
                .map(|d| d.join("feedwatch.json").to_string_lossy().into_owned())
                .unwrap_or_else(|| "./feedwatch.json".to_string())
        });

        let poll_interval = duration_var("FEEDWATCH_INTERVAL_SECS", 3600)?;
        let fetch_timeout = duration_var("FEEDWATCH_FETCH_TIMEOUT_SECS", 30)?;

        Ok(Self {
            state_path,
            gotify_url,
            poll_interval,
            fetch_timeout,
        })
    }
}

fn duration_var(name: &str, default_secs: u64) -> FeedwatchResult<Duration> {
    match std::env::var(name) {
        Ok(raw) => raw
            .parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|_| FeedwatchError::Config(format!("{name} must be a number of seconds"))),
        Err(_) => Ok(Duration::from_secs(default_secs)),
    }
}
