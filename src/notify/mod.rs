use std::time::Duration;

use reqwest::blocking::Client;
use serde_json::json;

use crate::domain::Notification;
use crate::errors::{FeedwatchError, FeedwatchResult};

/// Downstream delivery channel. Fire-and-forget from the engine's view:
/// a failed send is logged by the caller and never retried within a cycle.
#[cfg_attr(test, mockall::automock)]
pub trait Notifier: Send + Sync {
    fn send(&self, notification: &Notification) -> FeedwatchResult<()>;
}

/// Pushes messages to a Gotify server's `/message` endpoint, authenticated
/// with the client token kept in the state document.
pub struct GotifyNotifier {
    client: Client,
    base_url: String,
    token: String,
}

impl GotifyNotifier {
    pub fn new(base_url: &str, token: &str, timeout: Duration) -> Self {
        Self {
            client: Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_else(|_| Client::new()),
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
        }
    }
}

impl Notifier for GotifyNotifier {
    fn send(&self, notification: &Notification) -> FeedwatchResult<()> {
        let response = self
            .client
            .post(format!("{}/message", self.base_url))
            .header("X-Gotify-Key", &self.token)
            .json(&json!({
                "title": notification.title,
                "message": notification.message,
            }))
            .send()?;

        if !response.status().is_success() {
            return Err(FeedwatchError::Notification(format!(
                "server returned {}",
                response.status()
            )));
        }
        Ok(())
    }
}
