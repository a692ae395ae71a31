//! The legacy Redis layout Parrot used before moving to SQLite.

use anyhow::Context;
use redis::aio::MultiplexedConnection;

pub mod avatars;
pub mod corpus;
pub mod set;

pub use avatars::RedisAvatarManager;
pub use corpus::RedisCorpusManager;
pub use set::RedisSet;

pub const CORPUS_PREFIX: &str = "corpus:";
pub const AVATARS_KEY: &str = "avatars";
pub const REGISTERED_USERS_KEY: &str = "registered_users";
pub const LEARNING_CHANNELS_KEY: &str = "learning_channels";
pub const SPEAKING_CHANNELS_KEY: &str = "speaking_channels";

pub fn corpus_key(user_id: u64) -> String { format!("{}{}", CORPUS_PREFIX, user_id) }

pub fn parse_corpus_key(key: &str) -> Option<u64> {
    key.strip_prefix(CORPUS_PREFIX)?.parse().ok()
}

pub(crate) async fn connect(client: &redis::Client) -> anyhow::Result<MultiplexedConnection> {
    client
        .get_multiplexed_async_connection()
        .await
        .context("redis connect")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn corpus_keys() {
        assert_eq!(corpus_key(123), "corpus:123");
        assert_eq!(parse_corpus_key("corpus:123"), Some(123));
        assert_eq!(parse_corpus_key("corpus:abc"), None);
        assert_eq!(parse_corpus_key("avatars"), None);
    }
}
