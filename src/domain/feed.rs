use std::collections::HashSet;

use chrono::{DateTime, Utc};

/// Per-feed deduplication state.
///
/// `last_seen` is the high-water mark: the latest effective timestamp among
/// items ever delivered for this feed. `seen_links` records delivered items
/// that carried no usable timestamp; it only ever grows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedRecord {
    pub id: u64,
    pub url: String,
    pub last_seen: Option<DateTime<Utc>>,
    pub seen_links: HashSet<String>,
}

impl FeedRecord {
    pub fn new(id: u64, url: String) -> Self {
        Self {
            id,
            url,
            last_seen: None,
            seen_links: HashSet::new(),
        }
    }

    pub fn has_seen_link(&self, link: &str) -> bool {
        self.seen_links.contains(link)
    }
}
