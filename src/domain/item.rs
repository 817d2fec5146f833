use chrono::{DateTime, Utc};

/// One entry of a fetched feed document, reduced to what the dedup engine
/// needs: link, title and the two candidate timestamps.
#[derive(Debug, Clone)]
pub struct FeedItem {
    pub link: String,
    pub title: String,
    pub updated: Option<DateTime<Utc>>,
    pub published: Option<DateTime<Utc>>,
}

impl FeedItem {
    pub fn new(link: String, title: String) -> Self {
        Self {
            link,
            title,
            updated: None,
            published: None,
        }
    }

    pub fn with_updated(mut self, updated: Option<DateTime<Utc>>) -> Self {
        self.updated = updated;
        self
    }

    pub fn with_published(mut self, published: Option<DateTime<Utc>>) -> Self {
        self.published = published;
        self
    }

    /// The timestamp used for novelty decisions: `updated` wins over
    /// `published`; an item may have neither.
    pub fn effective_timestamp(&self) -> Option<DateTime<Utc>> {
        self.updated.or(self.published)
    }
}

/// A fetched feed document in the order the source published it
/// (typical feed order, newest first).
#[derive(Debug, Clone)]
pub struct ParsedFeed {
    pub title: Option<String>,
    pub items: Vec<FeedItem>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_effective_timestamp_prefers_updated() {
        let updated = Utc.with_ymd_and_hms(2024, 2, 1, 12, 0, 0).unwrap();
        let published = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();

        let item = FeedItem::new("https://example.com/a".into(), "A".into())
            .with_updated(Some(updated))
            .with_published(Some(published));

        assert_eq!(item.effective_timestamp(), Some(updated));
    }

    #[test]
    fn test_effective_timestamp_falls_back_to_published() {
        let published = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();

        let item = FeedItem::new("https://example.com/a".into(), "A".into())
            .with_published(Some(published));

        assert_eq!(item.effective_timestamp(), Some(published));
    }

    #[test]
    fn test_effective_timestamp_absent() {
        let item = FeedItem::new("https://example.com/a".into(), "A".into());
        assert!(item.effective_timestamp().is_none());
    }
}
