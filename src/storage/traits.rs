use crate::errors::FeedwatchResult;

/// Whole-document byte-blob persistence. The repository serializes the entire
/// state document on every write and reads it back whole; implementations
/// never see partial updates.
///
/// `load` returning an empty buffer means "nothing persisted yet" and is not
/// an error; an `Err` means the store itself is unreachable.
#[cfg_attr(test, mockall::automock)]
pub trait StateStore: Send + Sync {
    fn load(&self) -> FeedwatchResult<Vec<u8>>;
    fn save(&self, bytes: &[u8]) -> FeedwatchResult<()>;
}
