use anyhow::Context;
use redis::AsyncCommands;
use std::collections::HashMap;
use tracing::warn;

use super::{connect, AVATARS_KEY};
use crate::db::models::AvatarLedger;

/// Avatar ledgers as JSON values in the `avatars` hash, keyed by user id.
#[derive(Clone)]
pub struct RedisAvatarManager {
    client: redis::Client,
}

impl RedisAvatarManager {
    pub fn new(client: redis::Client) -> Self { Self { client } }

    pub async fn get(&self, user_id: u64) -> anyhow::Result<Option<AvatarLedger>> {
        let mut conn = connect(&self.client).await?;
        let raw: Option<String> = conn.hget(AVATARS_KEY, user_id).await.context("redis HGET avatars")?;
        raw.map(|s| serde_json::from_str(&s).context("parse avatar ledger json"))
            .transpose()
    }

    pub async fn set(&self, user_id: u64, ledger: &AvatarLedger) -> anyhow::Result<()> {
        let payload = serde_json::to_string(ledger)?;
        let mut conn = connect(&self.client).await?;
        let _: () = conn.hset(AVATARS_KEY, user_id, payload).await.context("redis HSET avatars")?;
        Ok(())
    }

    pub async fn delete(&self, user_id: u64) -> anyhow::Result<bool> {
        let mut conn = connect(&self.client).await?;
        let deleted: i64 = conn.hdel(AVATARS_KEY, user_id).await.context("redis HDEL avatars")?;
        Ok(deleted > 0)
    }

    /// Every parseable ledger, sorted by user id. Broken entries are logged and skipped.
    pub async fn all(&self) -> anyhow::Result<Vec<(u64, AvatarLedger)>> {
        let mut conn = connect(&self.client).await?;
        let raw: HashMap<String, String> = conn.hgetall(AVATARS_KEY).await.context("redis HGETALL avatars")?;
        let mut out = Vec::with_capacity(raw.len());
        for (user, json) in raw {
            let Ok(user_id) = user.parse::<u64>() else {
                warn!(field = %user, "avatars hash field is not a user id");
                continue;
            };
            match serde_json::from_str::<AvatarLedger>(&json) {
                Ok(ledger) => out.push((user_id, ledger)),
                Err(e) => warn!(user_id, "unreadable avatar ledger: {e}"),
            }
        }
        out.sort_by_key(|(id, _)| *id);
        Ok(out)
    }
}
