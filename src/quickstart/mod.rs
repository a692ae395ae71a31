//! Quickstart: learn from a user's past messages in a channel.

use dashmap::DashMap;
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

pub mod crawler;
pub mod discord;

pub use crawler::{run_with_status, ChannelCrawler, HistoryPager, HistorySource, ScanProgress, StatusSink};
pub use discord::{DiscordHistory, DmStatus};

/// Scans in flight, keyed by channel id; the values are the users being scanned for.
#[derive(Clone, Default)]
pub struct ScanRegistry {
    scans: Arc<DashMap<u64, HashSet<u64>>>,
}

impl ScanRegistry {
    pub fn new() -> Self { Self::default() }

    /// Claims the (channel, user) pair. `None` if a scan for it is already running.
    pub fn try_begin(&self, channel_id: u64, user_id: u64) -> Option<ScanGuard> {
        let mut users = self.scans.entry(channel_id).or_default();
        if !users.insert(user_id) {
            return None;
        }
        Some(ScanGuard { scans: Arc::clone(&self.scans), channel_id, user_id })
    }

    pub fn is_scanning(&self, channel_id: u64, user_id: u64) -> bool {
        self.scans.get(&channel_id).is_some_and(|users| users.contains(&user_id))
    }

    pub fn active_channels(&self) -> usize { self.scans.len() }
}

/// Releases its (channel, user) claim when dropped.
pub struct ScanGuard {
    scans: Arc<DashMap<u64, HashSet<u64>>>,
    channel_id: u64,
    user_id: u64,
}

impl Drop for ScanGuard {
    fn drop(&mut self) {
        if let Some(mut users) = self.scans.get_mut(&self.channel_id) {
            users.remove(&self.user_id);
        }
        self.scans.remove_if(&self.channel_id, |_, users| users.is_empty());
    }
}

/// Sliding-window rate limit per user.
pub struct Cooldown {
    rate: usize,
    per: Duration,
    uses: DashMap<u64, VecDeque<Instant>>,
}

impl Cooldown {
    pub fn new(rate: usize, per: Duration) -> Self {
        Self { rate, per, uses: DashMap::new() }
    }

    /// Records a use, or returns how long to wait before the next one is allowed.
    pub fn check(&self, user_id: u64) -> Result<(), Duration> {
        self.check_at(user_id, Instant::now())
    }

    fn check_at(&self, user_id: u64, now: Instant) -> Result<(), Duration> {
        let mut uses = self.uses.entry(user_id).or_default();
        while uses.front().is_some_and(|t| now.duration_since(*t) >= self.per) {
            uses.pop_front();
        }
        if uses.len() >= self.rate {
            let oldest = uses.front().copied().unwrap_or(now);
            return Err(self.per.saturating_sub(now.duration_since(oldest)));
        }
        uses.push_back(now);
        Ok(())
    }
}

impl Default for Cooldown {
    /// Two Quickstarts per four seconds.
    fn default() -> Self { Self::new(2, Duration::from_secs(4)) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_scan_for_same_pair_is_refused() {
        let scans = ScanRegistry::new();
        let guard = scans.try_begin(1, 10).expect("first scan");
        assert!(scans.try_begin(1, 10).is_none());
        assert!(scans.is_scanning(1, 10));

        // other users and other channels are independent
        let other_user = scans.try_begin(1, 11).expect("other user");
        let other_channel = scans.try_begin(2, 10).expect("other channel");
        assert_eq!(scans.active_channels(), 2);

        drop(guard);
        assert!(!scans.is_scanning(1, 10));
        assert!(scans.try_begin(1, 10).is_some());

        drop(other_user);
        drop(other_channel);
        assert_eq!(scans.active_channels(), 0);
    }

    #[test]
    fn guard_releases_on_early_return() {
        fn failing_scan(scans: &ScanRegistry) -> Result<(), &'static str> {
            let _guard = scans.try_begin(5, 50).ok_or("busy")?;
            Err("crawl failed")
        }

        let scans = ScanRegistry::new();
        assert_eq!(failing_scan(&scans), Err("crawl failed"));
        assert!(!scans.is_scanning(5, 50));
        assert_eq!(scans.active_channels(), 0);
    }

    #[test]
    fn cooldown_allows_two_per_window() {
        let cd = Cooldown::default();
        let start = Instant::now();

        assert!(cd.check_at(1, start).is_ok());
        assert!(cd.check_at(1, start + Duration::from_secs(1)).is_ok());
        let wait = cd.check_at(1, start + Duration::from_secs(2)).unwrap_err();
        assert_eq!(wait, Duration::from_secs(2));

        // someone else isn't affected
        assert!(cd.check_at(2, start + Duration::from_secs(2)).is_ok());

        // the first use has aged out
        assert!(cd.check_at(1, start + Duration::from_secs(4)).is_ok());
    }
}
