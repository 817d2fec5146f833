use std::time::Duration;

use feed_rs::parser;
use reqwest::blocking::Client;

use crate::domain::{FeedItem, ParsedFeed};
use crate::errors::{FeedwatchError, FeedwatchResult};

/// Fetches and parses one feed document. A transport failure and an
/// unparseable body are the same thing to the caller: no document, skip the
/// feed this cycle.
#[cfg_attr(test, mockall::automock)]
pub trait FeedFetcher: Send + Sync {
    fn fetch(&self, url: &str) -> FeedwatchResult<ParsedFeed>;
}

pub struct HttpFeedFetcher {
    client: Client,
}

impl HttpFeedFetcher {
    /// `timeout` bounds the whole fetch so one unreachable feed cannot stall
    /// a poll cycle.
    pub fn new(timeout: Duration) -> Self {
        Self {
            client: Client::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_else(|_| Client::new()),
        }
    }

    fn parse_bytes(bytes: &[u8]) -> FeedwatchResult<ParsedFeed> {
        let parsed = parser::parse(bytes).map_err(|e| FeedwatchError::FeedParse(e.to_string()))?;

        let items = parsed
            .entries
            .into_iter()
            .map(|entry| {
                let link = entry
                    .links
                    .into_iter()
                    .next()
                    .map(|l| l.href)
                    .unwrap_or_default();
                let title = entry
                    .title
                    .map(|t| t.content)
                    .unwrap_or_else(|| "Untitled".to_string());

                FeedItem::new(link, title)
                    .with_updated(entry.updated)
                    .with_published(entry.published)
            })
            .collect();

        Ok(ParsedFeed {
            title: parsed.title.map(|t| t.content),
            items,
        })
    }
}

impl Default for HttpFeedFetcher {
    fn default() -> Self {
        Self::new(Duration::from_secs(30))
    }
}

impl FeedFetcher for HttpFeedFetcher {
    fn fetch(&self, url: &str) -> FeedwatchResult<ParsedFeed> {
        let response = self.client.get(url).send()?;
        let bytes = response.error_for_status()?.bytes()?;

        Self::parse_bytes(&bytes)
    }
}
