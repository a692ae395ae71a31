use serenity::async_trait;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::db::models::CorpusMessage;
use crate::db::CorpusManager;

/// Discord returns at most this many messages per history request.
pub const PAGE_SIZE: u8 = 100;

/// One page of channel history at a time.
#[async_trait]
pub trait HistorySource: Send + Sync {
    /// Up to `limit` messages posted after message `after`, in any order.
    async fn page_after(&self, after: u64, limit: u8) -> anyhow::Result<Vec<CorpusMessage>>;
}

/// Receives progress while a scan runs.
#[async_trait]
pub trait StatusSink: Send + Sync {
    async fn update(&self, collected: u64) -> anyhow::Result<()>;
}

/// Walks a channel's history oldest-first, stopping after `limit` messages.
pub struct HistoryPager<H> {
    source: H,
    cursor: u64,
    remaining: usize,
    exhausted: bool,
}

impl<H: HistorySource> HistoryPager<H> {
    pub fn new(source: H, after: u64, limit: usize) -> Self {
        Self { source, cursor: after, remaining: limit, exhausted: false }
    }

    pub async fn next_page(&mut self) -> anyhow::Result<Option<Vec<CorpusMessage>>> {
        if self.exhausted || self.remaining == 0 {
            return Ok(None);
        }
        let want = self.remaining.min(PAGE_SIZE as usize);
        let mut page = self.source.page_after(self.cursor, want as u8).await?;

        let cursor = self.cursor;
        page.retain(|m| m.id > cursor);
        page.sort_unstable_by_key(|m| m.id);
        page.truncate(self.remaining);

        // a short page means we reached the present
        if page.len() < want {
            self.exhausted = true;
        }
        let Some(last) = page.last() else {
            return Ok(None);
        };
        self.cursor = last.id;
        self.remaining -= page.len();
        Ok(Some(page))
    }
}

/// Shared between the crawler and whoever reports on it.
#[derive(Debug)]
pub struct ScanProgress {
    running: AtomicBool,
    scanned: AtomicU64,
    collected: AtomicU64,
    done: Notify,
}

impl ScanProgress {
    fn new() -> Self {
        Self {
            running: AtomicBool::new(true),
            scanned: AtomicU64::new(0),
            collected: AtomicU64::new(0),
            done: Notify::new(),
        }
    }

    pub fn is_running(&self) -> bool { self.running.load(Ordering::Acquire) }

    /// History messages looked at so far, from anyone.
    pub fn scanned(&self) -> u64 { self.scanned.load(Ordering::Relaxed) }

    /// New messages recorded so far.
    pub fn collected(&self) -> u64 { self.collected.load(Ordering::Relaxed) }

    fn finish(&self) {
        self.running.store(false, Ordering::Release);
        self.done.notify_waiters();
    }
}

/// Feeds one user's messages from a channel's history into their corpus.
pub struct ChannelCrawler<H> {
    pager: HistoryPager<H>,
    corpora: CorpusManager,
    user_id: u64,
    progress: Arc<ScanProgress>,
}

impl<H: HistorySource> ChannelCrawler<H> {
    pub fn new(pager: HistoryPager<H>, corpora: CorpusManager, user_id: u64) -> Self {
        Self { pager, corpora, user_id, progress: Arc::new(ScanProgress::new()) }
    }

    pub fn progress(&self) -> Arc<ScanProgress> { Arc::clone(&self.progress) }

    /// Runs to the end of the history. The progress stops reporting as running
    /// once this returns, whether it succeeded or not.
    pub async fn crawl(&mut self) -> anyhow::Result<u64> {
        let res = self.crawl_pages().await;
        self.progress.finish();
        res
    }

    async fn crawl_pages(&mut self) -> anyhow::Result<u64> {
        while let Some(page) = self.pager.next_page().await? {
            self.progress.scanned.fetch_add(page.len() as u64, Ordering::Relaxed);

            let user_id = self.user_id;
            let theirs: Vec<CorpusMessage> = page.into_iter().filter(|m| m.author_id == user_id).collect();
            if theirs.is_empty() {
                continue;
            }
            let added = self.corpora.add(user_id, &theirs).await?;
            self.progress.collected.fetch_add(added, Ordering::Relaxed);
            debug!(user_id, matched = theirs.len(), added, "quickstart page");
        }
        Ok(self.progress.collected())
    }
}

/// Runs the crawler while refreshing `sink` every `interval`, and returns once
/// the crawler is done. Status failures are logged and never stop the crawl.
pub async fn run_with_status<H, S>(crawler: &mut ChannelCrawler<H>, sink: &S, interval: Duration) -> anyhow::Result<u64>
where
    H: HistorySource,
    S: StatusSink,
{
    let progress = crawler.progress();
    let (result, ()) = tokio::join!(crawler.crawl(), live_update_status(&progress, sink, interval));
    result
}

async fn live_update_status<S: StatusSink>(progress: &ScanProgress, sink: &S, interval: Duration) {
    loop {
        // register interest before checking the flag so a finish in between isn't missed
        let finished = progress.done.notified();
        tokio::pin!(finished);
        finished.as_mut().enable();

        if !progress.is_running() {
            break;
        }
        if let Err(e) = sink.update(progress.collected()).await {
            warn!("quickstart status update failed: {e:#}");
        }
        tokio::select! {
            _ = sleep(interval) => {}
            _ = &mut finished => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;
    use chrono::DateTime;
    use std::sync::Mutex;

    /// In-memory channel history.
    struct FakeHistory {
        messages: Vec<CorpusMessage>,
        requests: Mutex<Vec<(u64, u8)>>,
        delay: Duration,
    }

    impl FakeHistory {
        fn new(messages: Vec<CorpusMessage>) -> Self {
            Self { messages, requests: Mutex::new(Vec::new()), delay: Duration::ZERO }
        }
    }

    #[async_trait]
    impl HistorySource for FakeHistory {
        async fn page_after(&self, after: u64, limit: u8) -> anyhow::Result<Vec<CorpusMessage>> {
            self.requests.lock().unwrap().push((after, limit));
            if !self.delay.is_zero() {
                sleep(self.delay).await;
            }
            // Discord hands pages back newest first
            let mut page: Vec<CorpusMessage> = self
                .messages
                .iter()
                .filter(|m| m.id > after)
                .take(limit as usize)
                .cloned()
                .collect();
            page.reverse();
            Ok(page)
        }
    }

    #[async_trait]
    impl<'a> HistorySource for &'a FakeHistory {
        async fn page_after(&self, after: u64, limit: u8) -> anyhow::Result<Vec<CorpusMessage>> {
            (**self).page_after(after, limit).await
        }
    }

    struct FailingHistory;

    #[async_trait]
    impl HistorySource for FailingHistory {
        async fn page_after(&self, _after: u64, _limit: u8) -> anyhow::Result<Vec<CorpusMessage>> {
            anyhow::bail!("missing access")
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        updates: Mutex<Vec<u64>>,
    }

    #[async_trait]
    impl StatusSink for RecordingSink {
        async fn update(&self, collected: u64) -> anyhow::Result<()> {
            self.updates.lock().unwrap().push(collected);
            Ok(())
        }
    }

    struct BrokenSink;

    #[async_trait]
    impl StatusSink for BrokenSink {
        async fn update(&self, _collected: u64) -> anyhow::Result<()> {
            anyhow::bail!("dm channel closed")
        }
    }

    /// Messages 1..=n, alternating between authors 7 and 8.
    fn history(n: u64) -> Vec<CorpusMessage> {
        (1..=n)
            .map(|id| CorpusMessage {
                id,
                author_id: if id % 2 == 0 { 8 } else { 7 },
                timestamp: DateTime::from_timestamp(id as i64, 0).unwrap(),
                content: format!("message {id}"),
            })
            .collect()
    }

    #[tokio::test]
    async fn pager_walks_oldest_first_in_full_pages() {
        let source = FakeHistory::new(history(250));
        let mut pager = HistoryPager::new(&source, 0, 100_000);

        let mut pages = Vec::new();
        while let Some(page) = pager.next_page().await.unwrap() {
            assert!(page.windows(2).all(|w| w[0].id < w[1].id));
            pages.push(page.len());
        }
        assert_eq!(pages, vec![100, 100, 50]);

        let requests = source.requests.lock().unwrap().clone();
        assert_eq!(requests, vec![(0, 100), (100, 100), (200, 100)]);
    }

    #[tokio::test]
    async fn pager_respects_limit_and_start() {
        let source = FakeHistory::new(history(500));
        let mut pager = HistoryPager::new(&source, 40, 150);

        let first = pager.next_page().await.unwrap().unwrap();
        assert_eq!(first.first().unwrap().id, 41);
        let second = pager.next_page().await.unwrap().unwrap();
        assert_eq!(second.len(), 50);
        assert_eq!(second.last().unwrap().id, 190);
        assert!(pager.next_page().await.unwrap().is_none());

        // the second request only asked for what was left
        assert_eq!(source.requests.lock().unwrap()[1], (140, 50));
    }

    #[tokio::test]
    async fn crawler_collects_only_the_target_users_new_messages() {
        let corpora = CorpusManager::new(test_pool().await);
        // pretend one message was already learned
        corpora.add(7, &history(1)).await.unwrap();

        let source = FakeHistory::new(history(230));
        let mut crawler = ChannelCrawler::new(HistoryPager::new(&source, 0, 100_000), corpora.clone(), 7);

        let collected = crawler.crawl().await.unwrap();
        assert_eq!(collected, 114);
        assert_eq!(crawler.progress().scanned(), 230);
        assert!(!crawler.progress().is_running());

        assert_eq!(corpora.get(7).await.unwrap().len(), 115);
        assert!(!corpora.has(8).await.unwrap());
    }

    #[tokio::test]
    async fn failed_crawl_still_stops_running() {
        let corpora = CorpusManager::new(test_pool().await);
        let mut crawler = ChannelCrawler::new(HistoryPager::new(FailingHistory, 0, 10), corpora, 7);
        let sink = RecordingSink::default();

        let err = run_with_status(&mut crawler, &sink, Duration::from_millis(5)).await.unwrap_err();
        assert!(err.to_string().contains("missing access"));
        assert!(!crawler.progress().is_running());
    }

    #[tokio::test]
    async fn status_is_refreshed_while_crawling() {
        let corpora = CorpusManager::new(test_pool().await);
        let mut source = FakeHistory::new(history(600));
        source.delay = Duration::from_millis(20);
        let mut crawler = ChannelCrawler::new(HistoryPager::new(&source, 0, 100_000), corpora, 7);
        let sink = RecordingSink::default();

        let started = tokio::time::Instant::now();
        let collected = run_with_status(&mut crawler, &sink, Duration::from_millis(5)).await.unwrap();
        assert_eq!(collected, 300);

        let updates = sink.updates.lock().unwrap().clone();
        assert!(updates.len() >= 2, "expected several refreshes, got {updates:?}");
        assert_eq!(updates[0], 0);
        assert!(updates.windows(2).all(|w| w[0] <= w[1]));
        // the reporter doesn't keep the scan alive for a whole extra interval
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn long_interval_does_not_delay_completion() {
        let corpora = CorpusManager::new(test_pool().await);
        let source = FakeHistory::new(history(10));
        let mut crawler = ChannelCrawler::new(HistoryPager::new(&source, 0, 100_000), corpora, 7);
        let sink = RecordingSink::default();

        let started = tokio::time::Instant::now();
        run_with_status(&mut crawler, &sink, Duration::from_secs(60)).await.unwrap();
        assert!(started.elapsed() < Duration::from_secs(30));
    }

    #[tokio::test]
    async fn broken_status_sink_does_not_stop_the_crawl() {
        let corpora = CorpusManager::new(test_pool().await);
        let source = FakeHistory::new(history(40));
        let mut crawler = ChannelCrawler::new(HistoryPager::new(&source, 0, 100_000), corpora, 8);

        let collected = run_with_status(&mut crawler, &BrokenSink, Duration::from_millis(1)).await.unwrap();
        assert_eq!(collected, 20);
    }
}
