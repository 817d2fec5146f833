use super::FeedItem;

/// Message handed to the push transport. The message body is exactly the
/// item's deep-link target so the receiving client can open the post.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub message: String,
}

impl Notification {
    pub fn from_item(item: &FeedItem) -> Self {
        Self {
            title: item.title.clone(),
            message: item.link.clone(),
        }
    }
}
