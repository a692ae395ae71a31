use anyhow::Context;
use redis::AsyncCommands;
use std::collections::HashMap;

use super::{connect, corpus_key, parse_corpus_key, CORPUS_PREFIX};
use crate::db::models::CorpusMessage;
use crate::error::ParrotError;

/// Corpora stored as one hash per user: `corpus:<user_id>` → { message_id: content }.
/// Redis never kept timestamps.
#[derive(Clone)]
pub struct RedisCorpusManager {
    client: redis::Client,
}

impl RedisCorpusManager {
    pub fn new(client: redis::Client) -> Self { Self { client } }

    /// Stores every message as given, empty ones included. Returns the number
    /// of messages that weren't on record yet.
    pub async fn add(&self, user_id: u64, messages: &[CorpusMessage]) -> anyhow::Result<u64> {
        if messages.is_empty() {
            return Ok(0);
        }
        let mut pipe = redis::pipe();
        let key = corpus_key(user_id);
        for message in messages {
            pipe.hset(&key, message.id, &message.content);
        }
        let mut conn = connect(&self.client).await?;
        let added: Vec<i64> = pipe.query_async(&mut conn).await.context("redis HSET corpus")?;
        Ok(added.into_iter().map(|n| n.max(0) as u64).sum())
    }

    pub async fn get(&self, user_id: u64) -> anyhow::Result<Vec<String>> {
        let mut conn = connect(&self.client).await?;
        let corpus: Vec<String> = conn.hvals(corpus_key(user_id)).await.context("redis HVALS corpus")?;
        if corpus.is_empty() {
            return Err(ParrotError::NoData(user_id).into());
        }
        Ok(corpus)
    }

    /// message id → content. Fields that aren't snowflakes are dropped.
    pub async fn get_all(&self, user_id: u64) -> anyhow::Result<HashMap<u64, String>> {
        let mut conn = connect(&self.client).await?;
        let raw: HashMap<String, String> = conn.hgetall(corpus_key(user_id)).await.context("redis HGETALL corpus")?;
        Ok(raw
            .into_iter()
            .filter_map(|(id, content)| id.parse().ok().map(|id| (id, content)))
            .collect())
    }

    pub async fn delete(&self, user_id: u64) -> anyhow::Result<()> {
        let mut conn = connect(&self.client).await?;
        let deleted: i64 = conn.del(corpus_key(user_id)).await.context("redis DEL corpus")?;
        if deleted == 0 {
            return Err(ParrotError::NoData(user_id).into());
        }
        Ok(())
    }

    pub async fn delete_message(&self, user_id: u64, message_id: u64) -> anyhow::Result<()> {
        let mut conn = connect(&self.client).await?;
        let deleted: i64 = conn
            .hdel(corpus_key(user_id), message_id)
            .await
            .context("redis HDEL corpus message")?;
        if deleted == 0 {
            return Err(ParrotError::NoData(user_id).into());
        }
        Ok(())
    }

    pub async fn has(&self, user_id: u64) -> anyhow::Result<bool> {
        let mut conn = connect(&self.client).await?;
        let exists: bool = conn.exists(corpus_key(user_id)).await.context("redis EXISTS corpus")?;
        Ok(exists)
    }

    /// Owners of every `corpus:*` hash.
    pub async fn user_ids(&self) -> anyhow::Result<Vec<u64>> {
        let mut conn = connect(&self.client).await?;
        let keys: Vec<String> = conn.keys(format!("{CORPUS_PREFIX}*")).await.context("redis KEYS corpus:*")?;
        let mut ids: Vec<u64> = keys.iter().filter_map(|k| parse_corpus_key(k)).collect();
        ids.sort_unstable();
        Ok(ids)
    }
}
