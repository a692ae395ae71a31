//! One-shot moves of Parrot's data between the legacy Redis layout and SQLite.
//!
//! Each direction is split in two: read everything from the source into a
//! [`Snapshot`], then write the snapshot into the destination. `--dry-run`
//! stops after the first half.

use indicatif::{ProgressBar, ProgressStyle};
use sqlx::SqlitePool;
use std::collections::BTreeMap;
use std::fmt;
use tracing::info;

use crate::db::models::{AvatarLedger, CorpusMessage};
use crate::db::{AvatarManager, ChannelManager, CorpusManager, UserManager};
use crate::redis_ext::{
    RedisAvatarManager, RedisCorpusManager, RedisSet, LEARNING_CHANNELS_KEY, REGISTERED_USERS_KEY,
    SPEAKING_CHANNELS_KEY,
};
use crate::utils::snowflake_time;

pub struct RedisStores {
    pub corpora: RedisCorpusManager,
    pub avatars: RedisAvatarManager,
    pub registered_users: RedisSet,
    pub learning_channels: RedisSet,
    pub speaking_channels: RedisSet,
}

impl RedisStores {
    pub fn new(client: redis::Client) -> Self {
        Self {
            corpora: RedisCorpusManager::new(client.clone()),
            avatars: RedisAvatarManager::new(client.clone()),
            registered_users: RedisSet::new(client.clone(), REGISTERED_USERS_KEY),
            learning_channels: RedisSet::new(client.clone(), LEARNING_CHANNELS_KEY),
            speaking_channels: RedisSet::new(client, SPEAKING_CHANNELS_KEY),
        }
    }
}

pub struct SqliteStores {
    pub users: UserManager,
    pub corpora: CorpusManager,
    pub avatars: AvatarManager,
    pub channels: ChannelManager,
}

impl SqliteStores {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            users: UserManager::new(pool.clone()),
            corpora: CorpusManager::new(pool.clone()),
            avatars: AvatarManager::new(pool.clone()),
            channels: ChannelManager::new(pool),
        }
    }
}

/// Everything Parrot stores, independent of where it came from.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Snapshot {
    pub registered_users: Vec<u64>,
    /// user id → messages, oldest first
    pub corpora: BTreeMap<u64, Vec<CorpusMessage>>,
    pub avatars: Vec<(u64, AvatarLedger)>,
    pub speaking_channels: Vec<u64>,
    pub learning_channels: Vec<u64>,
}

impl Snapshot {
    pub fn message_count(&self) -> usize {
        self.corpora.values().map(Vec::len).sum()
    }
}

impl fmt::Display for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} registered users, {} corpora ({} messages), {} avatars, {} speaking channels, {} learning channels",
            self.registered_users.len(),
            self.corpora.len(),
            self.message_count(),
            self.avatars.len(),
            self.speaking_channels.len(),
            self.learning_channels.len(),
        )
    }
}

/// What a load actually wrote.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct MigrationReport {
    pub registered_users: usize,
    pub corpora: usize,
    /// Messages that weren't in the destination yet.
    pub new_messages: u64,
    pub avatars: usize,
    pub speaking_channels: usize,
    pub learning_channels: usize,
}

impl fmt::Display for MigrationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} registered users, {} corpora ({} new messages), {} avatars, {} speaking channels, {} learning channels",
            self.registered_users,
            self.corpora,
            self.new_messages,
            self.avatars,
            self.speaking_channels,
            self.learning_channels,
        )
    }
}

/// One progress bar per phase, or none at all.
pub struct Progress {
    visible: bool,
}

impl Progress {
    pub fn new(visible: bool) -> Self { Self { visible } }

    pub fn hidden() -> Self { Self::new(false) }

    fn phase(&self, len: usize, label: &'static str) -> ProgressBar {
        if !self.visible {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new(len as u64);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{msg:<22} [{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len}")
        {
            pb.set_style(style.progress_chars("##-"));
        }
        pb.set_message(label);
        pb
    }
}

pub async fn snapshot_from_redis(redis: &RedisStores, progress: &Progress) -> anyhow::Result<Snapshot> {
    let registered_users = redis.registered_users.members().await?;

    let owners = redis.corpora.user_ids().await?;
    info!("collected {} corpus keys", owners.len());

    let bar = progress.phase(owners.len(), "Reading corpora");
    let mut corpora = BTreeMap::new();
    for user_id in owners {
        // Redis never stored timestamps; the snowflake still knows when it was posted.
        let mut messages: Vec<CorpusMessage> = redis
            .corpora
            .get_all(user_id)
            .await?
            .into_iter()
            .map(|(id, content)| CorpusMessage { id, author_id: user_id, timestamp: snowflake_time(id), content })
            .collect();
        messages.sort_unstable_by_key(|m| m.id);
        corpora.insert(user_id, messages);
        bar.inc(1);
    }
    bar.finish();

    Ok(Snapshot {
        registered_users,
        corpora,
        avatars: redis.avatars.all().await?,
        speaking_channels: redis.speaking_channels.members().await?,
        learning_channels: redis.learning_channels.members().await?,
    })
}

pub async fn load_into_sqlite(snapshot: &Snapshot, sqlite: &SqliteStores, progress: &Progress) -> anyhow::Result<MigrationReport> {
    let mut report = MigrationReport::default();

    let bar = progress.phase(snapshot.registered_users.len(), "User registration");
    for &user_id in &snapshot.registered_users {
        sqlite.users.register(user_id).await?;
        report.registered_users += 1;
        bar.inc(1);
    }
    bar.finish();

    // corpus owners who never registered still get a users row; empty messages are kept
    let bar = progress.phase(snapshot.corpora.len(), "Corpora");
    for (&user_id, messages) in &snapshot.corpora {
        report.new_messages += sqlite.corpora.import(user_id, messages).await?;
        report.corpora += 1;
        bar.inc(1);
    }
    bar.finish();

    let bar = progress.phase(snapshot.avatars.len(), "Avatars");
    for (user_id, ledger) in &snapshot.avatars {
        sqlite.avatars.set(*user_id, ledger).await?;
        report.avatars += 1;
        bar.inc(1);
    }
    bar.finish();

    // a channel can be in both sets; each pass only touches its own flag
    let bar = progress.phase(snapshot.speaking_channels.len(), "Speaking permissions");
    for &channel_id in &snapshot.speaking_channels {
        sqlite.channels.set_speaking(channel_id, true).await?;
        report.speaking_channels += 1;
        bar.inc(1);
    }
    bar.finish();

    let bar = progress.phase(snapshot.learning_channels.len(), "Learning permissions");
    for &channel_id in &snapshot.learning_channels {
        sqlite.channels.set_learning(channel_id, true).await?;
        report.learning_channels += 1;
        bar.inc(1);
    }
    bar.finish();

    Ok(report)
}

pub async fn snapshot_from_sqlite(sqlite: &SqliteStores, progress: &Progress) -> anyhow::Result<Snapshot> {
    let owners = sqlite.corpora.user_ids().await?;

    let bar = progress.phase(owners.len(), "Reading corpora");
    let mut corpora = BTreeMap::new();
    for user_id in owners {
        corpora.insert(user_id, sqlite.corpora.messages(user_id).await?);
        bar.inc(1);
    }
    bar.finish();

    Ok(Snapshot {
        registered_users: sqlite.users.registered_users().await?,
        corpora,
        avatars: sqlite.avatars.all().await?,
        speaking_channels: sqlite.channels.speaking_channels().await?,
        learning_channels: sqlite.channels.learning_channels().await?,
    })
}

/// Timestamps are dropped on the way; the Redis layout has nowhere to keep them.
pub async fn load_into_redis(snapshot: &Snapshot, redis: &RedisStores, progress: &Progress) -> anyhow::Result<MigrationReport> {
    let mut report = MigrationReport::default();

    redis.registered_users.add_all(&snapshot.registered_users).await?;
    report.registered_users = snapshot.registered_users.len();

    let bar = progress.phase(snapshot.corpora.len(), "Corpora");
    for (&user_id, messages) in &snapshot.corpora {
        report.new_messages += redis.corpora.add(user_id, messages).await?;
        report.corpora += 1;
        bar.inc(1);
    }
    bar.finish();

    let bar = progress.phase(snapshot.avatars.len(), "Avatars");
    for (user_id, ledger) in &snapshot.avatars {
        redis.avatars.set(*user_id, ledger).await?;
        report.avatars += 1;
        bar.inc(1);
    }
    bar.finish();

    redis.speaking_channels.add_all(&snapshot.speaking_channels).await?;
    report.speaking_channels = snapshot.speaking_channels.len();
    redis.learning_channels.add_all(&snapshot.learning_channels).await?;
    report.learning_channels = snapshot.learning_channels.len();

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;
    use chrono::DateTime;

    fn msg(id: u64, author_id: u64, content: &str) -> CorpusMessage {
        CorpusMessage {
            id,
            author_id,
            timestamp: DateTime::from_timestamp(1_500_000_000 + id as i64, 0).unwrap(),
            content: content.to_string(),
        }
    }

    fn ledger(n: u64) -> AvatarLedger {
        AvatarLedger {
            original_avatar_url: format!("https://cdn.example/o/{n}.png"),
            modified_avatar_url: format!("https://cdn.example/m/{n}.png"),
            source_message_id: 9000 + n,
        }
    }

    /// Shaped like a real legacy dump: user 3 has a corpus but never
    /// registered, user 4 has only an avatar, channel 20 both speaks and learns.
    fn legacy() -> Snapshot {
        Snapshot {
            registered_users: vec![1, 2],
            corpora: BTreeMap::from([
                (1, vec![msg(100, 1, "first"), msg(101, 1, "second")]),
                (3, vec![msg(300, 3, "bot output")]),
            ]),
            avatars: vec![(1, ledger(1)), (4, ledger(4))],
            speaking_channels: vec![10, 20],
            learning_channels: vec![20, 30],
        }
    }

    #[tokio::test]
    async fn load_into_sqlite_then_read_back() {
        let sqlite = SqliteStores::new(test_pool().await);
        let snapshot = legacy();

        let report = load_into_sqlite(&snapshot, &sqlite, &Progress::hidden()).await.unwrap();
        assert_eq!(report.registered_users, 2);
        assert_eq!(report.new_messages, 3);
        assert_eq!(report.avatars, 2);

        // unregistered owners and avatar-only users exist but stay unregistered
        assert!(!sqlite.users.is_registered(3).await.unwrap());
        assert!(!sqlite.users.is_registered(4).await.unwrap());

        let perms = sqlite.channels.permissions(20).await.unwrap();
        assert!(perms.can_speak_here && perms.can_learn_here);
        assert!(!sqlite.channels.permissions(10).await.unwrap().can_learn_here);

        let back = snapshot_from_sqlite(&sqlite, &Progress::hidden()).await.unwrap();
        assert_eq!(back, snapshot);
    }

    #[tokio::test]
    async fn loading_twice_adds_no_messages() {
        let sqlite = SqliteStores::new(test_pool().await);
        let snapshot = legacy();

        load_into_sqlite(&snapshot, &sqlite, &Progress::hidden()).await.unwrap();
        let again = load_into_sqlite(&snapshot, &sqlite, &Progress::hidden()).await.unwrap();
        assert_eq!(again.new_messages, 0);
        assert_eq!(sqlite.corpora.get(1).await.unwrap(), vec!["first", "second"]);
    }

    #[tokio::test]
    async fn empty_messages_survive_the_move() {
        let sqlite = SqliteStores::new(test_pool().await);
        let snapshot = Snapshot {
            corpora: BTreeMap::from([(1, vec![msg(100, 1, "hi"), msg(101, 1, "")])]),
            ..Snapshot::default()
        };

        let report = load_into_sqlite(&snapshot, &sqlite, &Progress::hidden()).await.unwrap();
        assert_eq!(report.new_messages, 2);

        let back = snapshot_from_sqlite(&sqlite, &Progress::hidden()).await.unwrap();
        assert_eq!(back.message_count(), 2);
        assert_eq!(back, snapshot);
    }

    #[test]
    fn snapshot_summary() {
        let text = legacy().to_string();
        assert!(text.starts_with("2 registered users, 2 corpora (3 messages), 2 avatars"));
    }
}
