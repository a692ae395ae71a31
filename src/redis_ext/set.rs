use anyhow::Context;
use redis::AsyncCommands;

use super::connect;

/// A Redis set of snowflakes under one key.
#[derive(Clone)]
pub struct RedisSet {
    client: redis::Client,
    key: String,
}

impl RedisSet {
    pub fn new(client: redis::Client, key: impl Into<String>) -> Self {
        Self { client, key: key.into() }
    }

    /// Returns false when the id was already a member.
    pub async fn add(&self, id: u64) -> anyhow::Result<bool> {
        let mut conn = connect(&self.client).await?;
        let added: i64 = conn.sadd(&self.key, id).await.with_context(|| format!("redis SADD {}", self.key))?;
        Ok(added > 0)
    }

    pub async fn add_all(&self, ids: &[u64]) -> anyhow::Result<()> {
        if ids.is_empty() {
            return Ok(());
        }
        let mut conn = connect(&self.client).await?;
        let _: () = conn.sadd(&self.key, ids).await.with_context(|| format!("redis SADD {}", self.key))?;
        Ok(())
    }

    pub async fn remove(&self, id: u64) -> anyhow::Result<bool> {
        let mut conn = connect(&self.client).await?;
        let removed: i64 = conn.srem(&self.key, id).await.with_context(|| format!("redis SREM {}", self.key))?;
        Ok(removed > 0)
    }

    pub async fn contains(&self, id: u64) -> anyhow::Result<bool> {
        let mut conn = connect(&self.client).await?;
        let member: bool = conn
            .sismember(&self.key, id)
            .await
            .with_context(|| format!("redis SISMEMBER {}", self.key))?;
        Ok(member)
    }

    pub async fn members(&self) -> anyhow::Result<Vec<u64>> {
        let mut conn = connect(&self.client).await?;
        let mut ids: Vec<u64> = conn.smembers(&self.key).await.with_context(|| format!("redis SMEMBERS {}", self.key))?;
        ids.sort_unstable();
        Ok(ids)
    }

    pub async fn len(&self) -> anyhow::Result<usize> {
        let mut conn = connect(&self.client).await?;
        let n: usize = conn.scard(&self.key).await.with_context(|| format!("redis SCARD {}", self.key))?;
        Ok(n)
    }
}
