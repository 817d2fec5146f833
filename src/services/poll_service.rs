use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use tracing::{info, warn};

use crate::dedup;
use crate::domain::{FeedRecord, Notification};
use crate::errors::FeedwatchResult;
use crate::fetch::FeedFetcher;
use crate::notify::Notifier;
use crate::storage::{FeedStateRepository, StateStore};

/// Counts for one completed poll cycle.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct CycleSummary {
    pub feeds_polled: usize,
    pub feeds_skipped: usize,
    pub notifications_sent: usize,
}

/// One poll cycle over all subscribed feeds: fetch, decide novelty per item,
/// notify, commit.
///
/// Feeds are independent; a failure in one never blocks the others. Within a
/// feed, items are processed oldest first so notifications go out in original
/// publication order and the running latest-timestamp accumulator is correct.
/// Cycles are serialized by an internal mutex: a manual run overlapping the
/// scheduled one queues instead of racing load-modify-save on the shared
/// state document.
pub struct PollService<S: StateStore, F: FeedFetcher, N: Notifier> {
    repository: Arc<FeedStateRepository<S>>,
    fetcher: F,
    notifier: N,
    cycle_guard: Mutex<()>,
}

impl<S: StateStore, F: FeedFetcher, N: Notifier> PollService<S, F, N> {
    pub fn new(repository: Arc<FeedStateRepository<S>>, fetcher: F, notifier: N) -> Self {
        Self {
            repository,
            fetcher,
            notifier,
            cycle_guard: Mutex::new(()),
        }
    }

    pub fn check_feeds(&self) -> FeedwatchResult<CycleSummary> {
        let _cycle = self.cycle_guard.lock().unwrap_or_else(PoisonError::into_inner);

        let feeds = self.repository.feeds()?;
        let mut summary = CycleSummary::default();

        for (id, record) in feeds {
            match self.poll_feed(&record) {
                Ok(sent) => {
                    summary.feeds_polled += 1;
                    summary.notifications_sent += sent;
                }
                Err(e) => {
                    // Retried whole on the next cycle; no partial state.
                    warn!(feed = id, url = %record.url, error = %e, "skipping feed this cycle");
                    summary.feeds_skipped += 1;
                }
            }
        }

        info!(
            polled = summary.feeds_polled,
            skipped = summary.feeds_skipped,
            sent = summary.notifications_sent,
            "poll cycle complete"
        );
        Ok(summary)
    }

    fn poll_feed(&self, record: &FeedRecord) -> FeedwatchResult<usize> {
        let parsed = self.fetcher.fetch(&record.url)?;

        let mut observed_links: HashSet<String> = HashSet::new();
        let mut latest: Option<DateTime<Utc>> = None;
        let mut sent = 0;

        // Feed documents list newest first; walk them in reverse so novelty
        // decisions and dispatch happen in chronological order. Every
        // decision compares against the pre-cycle record only.
        for item in parsed.items.iter().rev() {
            observed_links.insert(item.link.clone());

            if let Some(ts) = item.effective_timestamp() {
                if latest.map_or(true, |current| ts > current) {
                    latest = Some(ts);
                }
            }

            if dedup::is_new(record, item) {
                match self.notifier.send(&Notification::from_item(item)) {
                    Ok(()) => sent += 1,
                    Err(e) => {
                        // At-least-once gives way here: the item is still
                        // committed as seen below and will not be retried.
                        warn!(feed = record.id, link = %item.link, error = %e, "notification failed");
                    }
                }
            }
        }

        self.repository
            .commit_poll_result(record.id, observed_links, latest)?;
        Ok(sent)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FeedItem, ParsedFeed};
    use crate::errors::FeedwatchError;
    use crate::fetch::MockFeedFetcher;
    use crate::notify::MockNotifier;
    use crate::storage::MemoryStateStore;
    use chrono::TimeZone;
    use std::sync::Mutex as StdMutex;

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, day, hour, 0, 0).unwrap()
    }

    fn dated_item(link: &str, ts: DateTime<Utc>) -> FeedItem {
        FeedItem::new(link.to_string(), format!("Post {link}")).with_published(Some(ts))
    }

    fn dateless_item(link: &str) -> FeedItem {
        FeedItem::new(link.to_string(), format!("Post {link}"))
    }

    /// Newest-first document, as feeds publish them.
    fn document(mut items: Vec<FeedItem>) -> ParsedFeed {
        items.reverse();
        ParsedFeed {
            title: Some("Test Feed".to_string()),
            items,
        }
    }

    /// Notifier that records every delivered message in order.
    #[derive(Default)]
    struct RecordingNotifier {
        sent: StdMutex<Vec<Notification>>,
    }

    impl RecordingNotifier {
        fn messages(&self) -> Vec<Notification> {
            self.sent.lock().unwrap().clone()
        }
    }

    impl Notifier for &RecordingNotifier {
        fn send(&self, notification: &Notification) -> FeedwatchResult<()> {
            self.sent.lock().unwrap().push(notification.clone());
            Ok(())
        }
    }

    fn repository() -> Arc<FeedStateRepository<MemoryStateStore>> {
        Arc::new(FeedStateRepository::new(MemoryStateStore::new()))
    }

    fn fetcher_returning(url: &str, feed: ParsedFeed) -> MockFeedFetcher {
        let url = url.to_string();
        let mut fetcher = MockFeedFetcher::new();
        fetcher
            .expect_fetch()
            .withf(move |u| u == url)
            .returning(move |_| Ok(feed.clone()));
        fetcher
    }

    #[test]
    fn test_scenario_first_item_on_empty_state() {
        let repo = repository();
        let id = repo.add_feed("https://a.example/feed").unwrap().id;

        let now = at(1, 12);
        let fetcher = fetcher_returning(
            "https://a.example/feed",
            document(vec![dated_item("https://a.example/1", now)]),
        );
        let notifier = RecordingNotifier::default();

        let summary = PollService::new(repo.clone(), fetcher, &notifier)
            .check_feeds()
            .unwrap();

        assert_eq!(summary.notifications_sent, 1);
        assert_eq!(notifier.messages()[0].message, "https://a.example/1");

        let record = repo.feed(id).unwrap().unwrap();
        assert_eq!(record.last_seen, Some(now));
        assert!(record.has_seen_link("https://a.example/1"));
    }

    #[test]
    fn test_scenario_only_items_past_mark_notify() {
        let repo = repository();
        let id = repo.add_feed("https://a.example/feed").unwrap().id;
        let mark = at(10, 0);
        repo.commit_poll_result(id, HashSet::new(), Some(mark)).unwrap();

        let fetcher = fetcher_returning(
            "https://a.example/feed",
            document(vec![
                dated_item("https://a.example/old", at(9, 0)),
                dated_item("https://a.example/fresh", at(11, 0)),
            ]),
        );
        let notifier = RecordingNotifier::default();

        let summary = PollService::new(repo.clone(), fetcher, &notifier)
            .check_feeds()
            .unwrap();

        assert_eq!(summary.notifications_sent, 1);
        assert_eq!(notifier.messages()[0].message, "https://a.example/fresh");
        assert_eq!(repo.feed(id).unwrap().unwrap().last_seen, Some(at(11, 0)));
    }

    #[test]
    fn test_scenario_dateless_feed_uses_link_set() {
        let repo = repository();
        let id = repo.add_feed("https://undated.example/feed").unwrap().id;
        let seen: HashSet<String> = ["https://undated.example/a".to_string()].into();
        repo.commit_poll_result(id, seen, None).unwrap();

        let fetcher = fetcher_returning(
            "https://undated.example/feed",
            document(vec![
                dateless_item("https://undated.example/a"),
                dateless_item("https://undated.example/b"),
                dateless_item("https://undated.example/c"),
            ]),
        );
        let notifier = RecordingNotifier::default();

        let summary = PollService::new(repo.clone(), fetcher, &notifier)
            .check_feeds()
            .unwrap();

        assert_eq!(summary.notifications_sent, 2);
        let delivered: Vec<String> =
            notifier.messages().iter().map(|n| n.message.clone()).collect();
        assert_eq!(
            delivered,
            vec!["https://undated.example/b", "https://undated.example/c"]
        );
    }

    #[test]
    fn test_scenario_fetch_failure_isolates_feed() {
        let repo = repository();
        let broken = repo.add_feed("https://broken.example/feed").unwrap().id;
        let healthy = repo.add_feed("https://healthy.example/feed").unwrap().id;

        let healthy_doc = document(vec![dated_item("https://healthy.example/1", at(1, 0))]);
        let mut fetcher = MockFeedFetcher::new();
        fetcher
            .expect_fetch()
            .withf(|u| u == "https://broken.example/feed")
            .returning(|_| Err(FeedwatchError::FeedParse("connection refused".into())));
        fetcher
            .expect_fetch()
            .withf(|u| u == "https://healthy.example/feed")
            .returning(move |_| Ok(healthy_doc.clone()));
        let notifier = RecordingNotifier::default();

        let summary = PollService::new(repo.clone(), fetcher, &notifier)
            .check_feeds()
            .unwrap();

        assert_eq!(summary.feeds_polled, 1);
        assert_eq!(summary.feeds_skipped, 1);
        assert_eq!(summary.notifications_sent, 1);

        // Broken feed untouched, healthy feed committed.
        let broken_record = repo.feed(broken).unwrap().unwrap();
        assert!(broken_record.last_seen.is_none());
        assert!(broken_record.seen_links.is_empty());
        assert!(repo.feed(healthy).unwrap().unwrap().last_seen.is_some());
    }

    #[test]
    fn test_second_cycle_is_idempotent() {
        let repo = repository();
        repo.add_feed("https://a.example/feed").unwrap();

        let doc = document(vec![
            dated_item("https://a.example/1", at(1, 0)),
            dated_item("https://a.example/2", at(2, 0)),
            dateless_item("https://a.example/undated"),
        ]);
        let notifier = RecordingNotifier::default();
        let service = PollService::new(
            repo.clone(),
            fetcher_returning("https://a.example/feed", doc),
            &notifier,
        );

        let first = service.check_feeds().unwrap();
        let second = service.check_feeds().unwrap();

        assert_eq!(first.notifications_sent, 3);
        assert_eq!(second.notifications_sent, 0);
    }

    #[test]
    fn test_notifications_dispatch_oldest_first() {
        let repo = repository();
        repo.add_feed("https://a.example/feed").unwrap();

        let fetcher = fetcher_returning(
            "https://a.example/feed",
            document(vec![
                dated_item("https://a.example/1", at(1, 0)),
                dated_item("https://a.example/2", at(2, 0)),
                dated_item("https://a.example/3", at(3, 0)),
            ]),
        );
        let notifier = RecordingNotifier::default();

        PollService::new(repo, fetcher, &notifier)
            .check_feeds()
            .unwrap();

        let delivered: Vec<String> =
            notifier.messages().iter().map(|n| n.message.clone()).collect();
        assert_eq!(
            delivered,
            vec![
                "https://a.example/1",
                "https://a.example/2",
                "https://a.example/3"
            ]
        );
    }

    #[test]
    fn test_decisions_use_pre_cycle_state_only() {
        let repo = repository();
        repo.add_feed("https://a.example/feed").unwrap();

        // A newer item earlier in chronological order must not suppress a
        // later-processed item through the in-cycle accumulator.
        let fetcher = fetcher_returning(
            "https://a.example/feed",
            document(vec![
                dated_item("https://a.example/early", at(1, 0)),
                dated_item("https://a.example/late", at(2, 0)),
            ]),
        );
        let notifier = RecordingNotifier::default();

        let summary = PollService::new(repo, fetcher, &notifier)
            .check_feeds()
            .unwrap();

        assert_eq!(summary.notifications_sent, 2);
    }

    #[test]
    fn test_notification_failure_still_commits() {
        let repo = repository();
        let id = repo.add_feed("https://a.example/feed").unwrap().id;

        let fetcher = fetcher_returning(
            "https://a.example/feed",
            document(vec![dated_item("https://a.example/1", at(1, 0))]),
        );
        let mut notifier = MockNotifier::new();
        notifier
            .expect_send()
            .returning(|_| Err(FeedwatchError::Notification("server returned 500".into())));

        let summary = PollService::new(repo.clone(), fetcher, notifier)
            .check_feeds()
            .unwrap();

        // The send failed but the item is marked seen: at-least-once gives
        // way once dispatch has been attempted within a committed cycle.
        assert_eq!(summary.notifications_sent, 0);
        assert_eq!(summary.feeds_polled, 1);
        let record = repo.feed(id).unwrap().unwrap();
        assert_eq!(record.last_seen, Some(at(1, 0)));
        assert!(record.has_seen_link("https://a.example/1"));
    }

    #[test]
    fn test_interrupted_commit_renotifies_next_cycle() {
        let store = MemoryStateStore::new();
        let repo = Arc::new(FeedStateRepository::new(store.clone()));
        repo.add_feed("https://a.example/feed").unwrap();

        let doc = document(vec![dated_item("https://a.example/1", at(1, 0))]);
        let notifier = RecordingNotifier::default();
        let service = PollService::new(
            repo,
            fetcher_returning("https://a.example/feed", doc),
            &notifier,
        );

        // Crash between dispatch and commit, simulated as a failing save.
        store.set_fail_saves(true);
        let crashed = service.check_feeds().unwrap();
        assert_eq!(crashed.feeds_skipped, 1);
        assert_eq!(notifier.messages().len(), 1);

        // Accepted at-least-once behavior: the next cycle delivers again.
        store.set_fail_saves(false);
        let recovered = service.check_feeds().unwrap();
        assert_eq!(recovered.notifications_sent, 1);
        assert_eq!(notifier.messages().len(), 2);
    }

    #[test]
    fn test_cycle_with_all_old_items_keeps_mark() {
        let repo = repository();
        let id = repo.add_feed("https://a.example/feed").unwrap().id;
        let mark = at(20, 0);
        repo.commit_poll_result(id, HashSet::new(), Some(mark)).unwrap();

        // Upstream dropped its newest entries; only stale ones remain.
        let fetcher = fetcher_returning(
            "https://a.example/feed",
            document(vec![dated_item("https://a.example/old", at(5, 0))]),
        );
        let notifier = RecordingNotifier::default();

        let summary = PollService::new(repo.clone(), fetcher, &notifier)
            .check_feeds()
            .unwrap();

        assert_eq!(summary.notifications_sent, 0);
        assert_eq!(repo.feed(id).unwrap().unwrap().last_seen, Some(mark));
    }

    #[test]
    fn test_empty_state_polls_nothing() {
        let repo = repository();
        let fetcher = MockFeedFetcher::new();
        let notifier = MockNotifier::new();

        let summary = PollService::new(repo, fetcher, notifier)
            .check_feeds()
            .unwrap();

        assert_eq!(summary, CycleSummary::default());
    }
}
