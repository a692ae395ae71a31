use anyhow::Context;
use sqlx::SqlitePool;

use crate::db::models::{CorpusMessage, MessageRow};
use crate::error::ParrotError;
use crate::utils::{from_db_id, to_db_id};

/// Per-user message corpus in the local database.
#[derive(Clone)]
pub struct CorpusManager {
    pool: SqlitePool,
}

impl CorpusManager {
    pub fn new(pool: SqlitePool) -> Self { Self { pool } }

    /// Record messages for `user_id`. Messages already on record and messages
    /// with no text are skipped, so the return value is the number of *new*
    /// messages, not necessarily `messages.len()`.
    pub async fn add(&self, user_id: u64, messages: &[CorpusMessage]) -> anyhow::Result<u64> {
        let learnable: Vec<&CorpusMessage> = messages.iter().filter(|m| !m.content.is_empty()).collect();
        self.insert(user_id, &learnable).await
    }

    /// Like [`add`](Self::add) but keeps empty messages. Used when copying a
    /// corpus from another store, where every record has to survive.
    pub async fn import(&self, user_id: u64, messages: &[CorpusMessage]) -> anyhow::Result<u64> {
        let all: Vec<&CorpusMessage> = messages.iter().collect();
        self.insert(user_id, &all).await
    }

    async fn insert(&self, user_id: u64, messages: &[&CorpusMessage]) -> anyhow::Result<u64> {
        if messages.is_empty() {
            return Ok(0);
        }
        let uid = to_db_id(user_id);
        let mut tx = self.pool.begin().await.context("begin corpus insert")?;

        sqlx::query("INSERT OR IGNORE INTO users (id) VALUES (?)")
            .bind(uid)
            .execute(&mut *tx)
            .await
            .context("ensure corpus owner")?;

        let mut added = 0;
        for message in messages {
            added += sqlx::query(
                r#"
                INSERT OR IGNORE INTO messages (id, user_id, timestamp, content)
                VALUES (?, ?, ?, ?)
                "#,
            )
            .bind(to_db_id(message.id))
            .bind(uid)
            .bind(message.timestamp.timestamp())
            .bind(&message.content)
            .execute(&mut *tx)
            .await
            .context("insert message")?
            .rows_affected();
        }

        tx.commit().await.context("commit corpus insert")?;
        Ok(added)
    }

    pub async fn get(&self, user_id: u64) -> anyhow::Result<Vec<String>> {
        let corpus: Vec<String> = sqlx::query_scalar("SELECT content FROM messages WHERE user_id = ? ORDER BY id")
            .bind(to_db_id(user_id))
            .fetch_all(&self.pool)
            .await
            .context("load corpus")?;
        if corpus.is_empty() {
            return Err(ParrotError::NoData(user_id).into());
        }
        Ok(corpus)
    }

    /// Full records, oldest first. Empty when the user has no corpus.
    pub async fn messages(&self, user_id: u64) -> anyhow::Result<Vec<CorpusMessage>> {
        let rows = sqlx::query_as::<_, MessageRow>(
            "SELECT id, user_id, timestamp, content FROM messages WHERE user_id = ? ORDER BY id",
        )
        .bind(to_db_id(user_id))
        .fetch_all(&self.pool)
        .await
        .context("load corpus messages")?;
        Ok(rows.into_iter().map(CorpusMessage::from).collect())
    }

    pub async fn delete(&self, user_id: u64) -> anyhow::Result<()> {
        let res = sqlx::query("DELETE FROM messages WHERE user_id = ?")
            .bind(to_db_id(user_id))
            .execute(&self.pool)
            .await
            .context("delete corpus")?;
        if res.rows_affected() == 0 {
            return Err(ParrotError::NoData(user_id).into());
        }
        Ok(())
    }

    pub async fn delete_message(&self, message_id: u64) -> anyhow::Result<()> {
        let res = sqlx::query("DELETE FROM messages WHERE id = ?")
            .bind(to_db_id(message_id))
            .execute(&self.pool)
            .await
            .context("delete message")?;
        if res.rows_affected() == 0 {
            return Err(ParrotError::MessageNotFound(message_id).into());
        }
        Ok(())
    }

    pub async fn has(&self, user_id: u64) -> anyhow::Result<bool> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM messages WHERE user_id = ?")
            .bind(to_db_id(user_id))
            .fetch_one(&self.pool)
            .await
            .context("count corpus")?;
        Ok(count > 0)
    }

    /// Everyone with at least one recorded message.
    pub async fn user_ids(&self) -> anyhow::Result<Vec<u64>> {
        let ids: Vec<i64> = sqlx::query_scalar("SELECT DISTINCT user_id FROM messages ORDER BY user_id")
            .fetch_all(&self.pool)
            .await
            .context("list corpus owners")?;
        Ok(ids.into_iter().map(from_db_id).collect())
    }
}
