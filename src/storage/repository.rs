use std::collections::{BTreeMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use tracing::warn;

use crate::domain::FeedRecord;
use crate::errors::{FeedwatchError, FeedwatchResult};
use crate::storage::document::{StateDocument, StoredFeed};
use crate::storage::traits::StateStore;

/// CRUD and poll-state commits over the persistent store.
///
/// The whole state document is the unit of durability: every operation
/// reloads it before reading and rewrites it after mutating, all under one
/// mutex so concurrent callers cannot interleave load-modify-save and lose
/// updates.
///
/// A store that fails to load is served from the cached in-memory document
/// (stale but available); a blob that loads but does not parse is a hard
/// `StateCorrupt` error, never silently replaced with an empty document.
pub struct FeedStateRepository<S: StateStore> {
    store: S,
    state: Mutex<StateDocument>,
}

impl<S: StateStore> FeedStateRepository<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            state: Mutex::new(StateDocument::default()),
        }
    }

    pub fn client_token(&self) -> FeedwatchResult<String> {
        let mut state = self.lock_state();
        self.reload(&mut state)?;
        Ok(state.client_token.clone())
    }

    pub fn save_client_token(&self, token: &str) -> FeedwatchResult<()> {
        let mut state = self.lock_state();
        self.reload(&mut state)?;
        state.client_token = token.to_string();
        self.persist(&state)
    }

    /// Create a feed record for `url` under the smallest free id.
    pub fn add_feed(&self, url: &str) -> FeedwatchResult<FeedRecord> {
        let mut state = self.lock_state();
        self.reload(&mut state)?;

        let id = state.next_free_id();
        let record = FeedRecord::new(id, url.to_string());
        state.feeds.insert(id, StoredFeed::from_record(&record));
        self.persist(&state)?;

        Ok(record)
    }

    pub fn feed(&self, id: u64) -> FeedwatchResult<Option<FeedRecord>> {
        let mut state = self.lock_state();
        self.reload(&mut state)?;
        Ok(state.feeds.get(&id).map(|stored| stored.to_record(id)))
    }

    /// No-op when the id is unused.
    pub fn remove_feed(&self, id: u64) -> FeedwatchResult<()> {
        let mut state = self.lock_state();
        self.reload(&mut state)?;

        if state.feeds.remove(&id).is_some() {
            self.persist(&state)?;
        }
        Ok(())
    }

    pub fn feeds(&self) -> FeedwatchResult<BTreeMap<u64, FeedRecord>> {
        let mut state = self.lock_state();
        self.reload(&mut state)?;
        Ok(state
            .feeds
            .iter()
            .map(|(id, stored)| (*id, stored.to_record(*id)))
            .collect())
    }

    /// Fold one poll cycle's observations into the feed's dedup state:
    /// `observed_links` is unioned into the seen set, and the high-water
    /// mark takes the max of its previous value and `latest`, so a cycle
    /// whose upstream omitted older items can never move it backward.
    pub fn commit_poll_result(
        &self,
        id: u64,
        observed_links: HashSet<String>,
        latest: Option<DateTime<Utc>>,
    ) -> FeedwatchResult<()> {
        let mut state = self.lock_state();
        self.reload(&mut state)?;

        let feed = state
            .feeds
            .get_mut(&id)
            .ok_or(FeedwatchError::FeedNotFound(id))?;

        feed.last_date = match (feed.last_date, latest) {
            (Some(prior), Some(observed)) => Some(prior.max(observed)),
            (prior, observed) => prior.or(observed),
        };
        feed.item_urls
            .extend(observed_links.into_iter().map(|link| (link, true)));

        self.persist(&state)
    }

    fn lock_state(&self) -> MutexGuard<'_, StateDocument> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Refresh the cached document from the store. Empty bytes mean a first
    /// run: the default document is persisted immediately so the store is
    /// never observed half-initialized. A load failure keeps the cached
    /// document in place.
    fn reload(&self, state: &mut StateDocument) -> FeedwatchResult<()> {
        match self.store.load() {
            Ok(bytes) if bytes.is_empty() => self.persist(state),
            Ok(bytes) => {
                *state = serde_json::from_slice(&bytes)?;
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "state load failed, serving last known in-memory state");
                Ok(())
            }
        }
    }

    fn persist(&self, state: &StateDocument) -> FeedwatchResult<()> {
        let bytes = serde_json::to_vec(state)
            .map_err(|e| FeedwatchError::StateSave(e.to_string()))?;
        self.store.save(&bytes)
    }
}
