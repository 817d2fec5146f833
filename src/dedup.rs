use crate::domain::{FeedItem, FeedRecord};

/// Decide whether `item` is new relative to `record`'s dedup state.
///
/// An item with a usable timestamp is new when it is strictly more recent
/// than the feed's high-water mark (or when no mark exists yet). The
/// comparison is per item: the item does not have to be the single latest in
/// the document, only newer than anything previously delivered.
///
/// An item without any usable timestamp is new when its link has never been
/// recorded. Timestamp freshness dominates: a timestamped-but-old item is
/// never new, even if its link is absent from the set.
pub fn is_new(record: &FeedRecord, item: &FeedItem) -> bool {
    match item.effective_timestamp() {
        Some(ts) => match record.last_seen {
            Some(last_seen) => ts > last_seen,
            None => true,
        },
        None => !record.has_seen_link(&item.link),
    }
}
