use std::sync::{Arc, Mutex, PoisonError};

use crate::errors::{FeedwatchError, FeedwatchResult};
use crate::storage::traits::StateStore;

/// In-memory state store for tests. Clones share the same buffer, and load
/// and save failures can be injected to exercise the repository's
/// degraded-store paths.
#[derive(Clone, Default)]
pub struct MemoryStateStore {
    inner: Arc<Mutex<Inner>>,
}

#[derive(Default)]
struct Inner {
    bytes: Vec<u8>,
    fail_loads: bool,
    fail_saves: bool,
    saves: usize,
}

impl MemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_bytes(bytes: Vec<u8>) -> Self {
        let store = Self::new();
        store.lock().bytes = bytes;
        store
    }

    pub fn bytes(&self) -> Vec<u8> {
        self.lock().bytes.clone()
    }

    /// Number of `save` calls observed, including injected failures.
    pub fn save_count(&self) -> usize {
        self.lock().saves
    }

    pub fn set_fail_loads(&self, fail: bool) {
        self.lock().fail_loads = fail;
    }

    pub fn set_fail_saves(&self, fail: bool) {
        self.lock().fail_saves = fail;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl StateStore for MemoryStateStore {
    fn load(&self) -> FeedwatchResult<Vec<u8>> {
        let inner = self.lock();
        if inner.fail_loads {
            return Err(FeedwatchError::StateLoad("injected load failure".into()));
        }
        Ok(inner.bytes.clone())
    }

    fn save(&self, bytes: &[u8]) -> FeedwatchResult<()> {
        let mut inner = self.lock();
        inner.saves += 1;
        if inner.fail_saves {
            return Err(FeedwatchError::StateSave("injected save failure".into()));
        }
        inner.bytes = bytes.to_vec();
        Ok(())
    }
}
