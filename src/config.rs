use anyhow::Context;
use redis::{ConnectionAddr, ConnectionInfo, IntoConnectionInfo, RedisConnectionInfo};
use std::collections::HashSet;
use std::env;
use std::time::Duration;

pub const DEFAULT_DATABASE_URL: &str = "sqlite://parrot.sqlite3";
pub const DEFAULT_QUICKSTART_LIMIT: usize = 100_000;
const DEFAULT_STATUS_INTERVAL_SECS: u64 = 2;

#[derive(Debug, Clone)]
pub struct Config {
    pub discord_token: String,
    pub database_url: String,
    pub admin_user_ids: HashSet<u64>,
    /// How many history messages a single Quickstart scan may walk through.
    pub quickstart_limit: usize,
    pub status_interval: Duration,
}

impl Config {
    /// Reads the bot configuration from the environment (after `.env` was loaded).
    pub fn from_env() -> anyhow::Result<Self> {
        let discord_token = env::var("DISCORD_TOKEN").context("DISCORD_TOKEN not set")?;
        let database_url = env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string());

        let admin_user_ids = match env::var("ADMIN_USER_IDS") {
            Ok(raw) => parse_id_list(&raw).context("ADMIN_USER_IDS")?,
            Err(_) => HashSet::new(),
        };

        let quickstart_limit = match env::var("QUICKSTART_MESSAGE_LIMIT") {
            Ok(raw) => raw.trim().parse().context("QUICKSTART_MESSAGE_LIMIT must be a number")?,
            Err(_) => DEFAULT_QUICKSTART_LIMIT,
        };

        let status_secs = match env::var("QUICKSTART_STATUS_INTERVAL_SECS") {
            Ok(raw) => raw.trim().parse().context("QUICKSTART_STATUS_INTERVAL_SECS must be a number")?,
            Err(_) => DEFAULT_STATUS_INTERVAL_SECS,
        };

        Ok(Self {
            discord_token,
            database_url,
            admin_user_ids,
            quickstart_limit,
            status_interval: Duration::from_secs(status_secs.max(1)),
        })
    }
}

/// Parse "1, 2,3" into a set of snowflakes. Empty entries are ignored.
pub fn parse_id_list(raw: &str) -> anyhow::Result<HashSet<u64>> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<u64>().with_context(|| format!("invalid id `{s}`")))
        .collect()
}

/// `REDIS_URL` wins; otherwise the connection is assembled from `REDIS_HOST`,
/// `REDIS_PORT` and `REDIS_PASSWORD`.
pub fn redis_connection_from_env() -> anyhow::Result<ConnectionInfo> {
    if let Ok(url) = env::var("REDIS_URL") {
        return url.as_str().into_connection_info().context("REDIS_URL");
    }
    let host = env::var("REDIS_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
    let port = match env::var("REDIS_PORT") {
        Ok(raw) => raw.trim().parse().context("REDIS_PORT must be a port number")?,
        Err(_) => 6379,
    };
    let password = env::var("REDIS_PASSWORD").ok().filter(|p| !p.is_empty());
    Ok(redis_connection(&host, port, password.as_deref()))
}

/// The password is passed as is, never through a URL, so it may contain anything.
pub fn redis_connection(host: &str, port: u16, password: Option<&str>) -> ConnectionInfo {
    ConnectionInfo {
        addr: ConnectionAddr::Tcp(host.to_string(), port),
        redis: RedisConnectionInfo {
            password: password.map(str::to_string),
            ..Default::default()
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_list_skips_blanks() {
        let ids = parse_id_list(" 12, ,34,").unwrap();
        assert_eq!(ids, HashSet::from([12, 34]));
        assert!(parse_id_list("").unwrap().is_empty());
    }

    #[test]
    fn id_list_rejects_garbage() {
        let err = parse_id_list("12,abc").unwrap_err();
        assert!(err.to_string().contains("abc"));
    }

    #[test]
    fn redis_connection_with_and_without_password() {
        let plain = redis_connection("cache", 6380, None);
        assert_eq!(plain.addr, ConnectionAddr::Tcp("cache".into(), 6380));
        assert_eq!(plain.redis.password, None);

        let secret = redis_connection("cache", 6379, Some("hunter2"));
        assert_eq!(secret.redis.password.as_deref(), Some("hunter2"));
    }

    #[test]
    fn redis_password_keeps_url_special_characters() {
        for pw in ["ab#cd", "ab/cd", "a@b:c?d%20"] {
            let info = redis_connection("cache", 6379, Some(pw));
            assert_eq!(info.redis.password.as_deref(), Some(pw));
            assert_eq!(info.addr, ConnectionAddr::Tcp("cache".into(), 6379));
            // accepted by the client without going through URL parsing
            assert!(redis::Client::open(info).is_ok());
        }
    }
}
