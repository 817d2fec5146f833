use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::FeedRecord;

/// Persisted aggregate, wire-compatible with the original plugin's JSON
/// blobs: PascalCase field names, feed ids as string-encoded integers and
/// `ItemUrls` as a map-used-as-set.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StateDocument {
    #[serde(rename = "ClientToken", default)]
    pub client_token: String,

    /// Legacy counter from older blobs; accepted on input, never consulted.
    #[serde(rename = "NextID", default)]
    pub next_id: u64,

    #[serde(rename = "Feeds", default)]
    pub feeds: BTreeMap<u64, StoredFeed>,
}

impl StateDocument {
    /// Smallest non-negative id not currently in use, scanning from zero.
    /// Removing a feed frees its slot for the next addition.
    pub fn next_free_id(&self) -> u64 {
        let mut id = 0;
        while self.feeds.contains_key(&id) {
            id += 1;
        }
        id
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct StoredFeed {
    #[serde(rename = "Url")]
    pub url: String,

    #[serde(rename = "LastDate", default)]
    pub last_date: Option<DateTime<Utc>>,

    #[serde(rename = "ItemUrls", default)]
    pub item_urls: BTreeMap<String, bool>,
}

impl StoredFeed {
    pub fn from_record(record: &FeedRecord) -> Self {
        Self {
            url: record.url.clone(),
            last_date: record.last_seen,
            item_urls: record
                .seen_links
                .iter()
                .map(|link| (link.clone(), true))
                .collect(),
        }
    }

    /// Key presence marks a link as seen; the boolean value is ignored, as
    /// the original reader only ever tested membership.
    pub fn to_record(&self, id: u64) -> FeedRecord {
        FeedRecord {
            id,
            url: self.url.clone(),
            last_seen: self.last_date,
            seen_links: self.item_urls.keys().cloned().collect(),
        }
    }
}
