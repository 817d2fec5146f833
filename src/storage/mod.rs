pub mod document;
pub mod file;
pub mod memory;
pub mod repository;
pub mod traits;

pub use document::{StateDocument, StoredFeed};
pub use file::FileStateStore;
pub use memory::MemoryStateStore;
pub use repository::FeedStateRepository;
pub use traits::StateStore;
