pub mod feed;
pub mod item;
pub mod notification;

pub use feed::FeedRecord;
pub use item::{FeedItem, ParsedFeed};
pub use notification::Notification;
