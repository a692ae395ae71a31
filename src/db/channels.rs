use anyhow::Context;
use sqlx::SqlitePool;

use crate::db::models::{ChannelPermissions, ChannelRow};
use crate::utils::{from_db_id, to_db_id};

/// Where Parrot may learn and where it may speak.
#[derive(Clone)]
pub struct ChannelManager {
    pool: SqlitePool,
}

impl ChannelManager {
    pub fn new(pool: SqlitePool) -> Self { Self { pool } }

    /// Unknown channels have every permission off.
    pub async fn permissions(&self, channel_id: u64) -> anyhow::Result<ChannelPermissions> {
        let row = sqlx::query_as::<_, ChannelRow>(
            "SELECT can_speak_here, can_learn_here, webhook_id FROM channels WHERE id = ?",
        )
        .bind(to_db_id(channel_id))
        .fetch_optional(&self.pool)
        .await
        .context("load channel permissions")?;
        Ok(row.map(ChannelPermissions::from).unwrap_or_default())
    }

    pub async fn set_learning(&self, channel_id: u64, enabled: bool) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO channels (id, can_learn_here) VALUES (?, ?)
            ON CONFLICT(id) DO UPDATE SET can_learn_here = excluded.can_learn_here
            "#,
        )
        .bind(to_db_id(channel_id))
        .bind(enabled)
        .execute(&self.pool)
        .await
        .context("set learning permission")?;
        Ok(())
    }

    pub async fn set_speaking(&self, channel_id: u64, enabled: bool) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO channels (id, can_speak_here) VALUES (?, ?)
            ON CONFLICT(id) DO UPDATE SET can_speak_here = excluded.can_speak_here
            "#,
        )
        .bind(to_db_id(channel_id))
        .bind(enabled)
        .execute(&self.pool)
        .await
        .context("set speaking permission")?;
        Ok(())
    }

    pub async fn can_learn(&self, channel_id: u64) -> anyhow::Result<bool> {
        Ok(self.permissions(channel_id).await?.can_learn_here)
    }

    pub async fn learning_channels(&self) -> anyhow::Result<Vec<u64>> {
        self.channels_where("can_learn_here").await
    }

    pub async fn speaking_channels(&self) -> anyhow::Result<Vec<u64>> {
        self.channels_where("can_speak_here").await
    }

    async fn channels_where(&self, column: &'static str) -> anyhow::Result<Vec<u64>> {
        let sql = format!("SELECT id FROM channels WHERE {column} = 1 ORDER BY id");
        let ids: Vec<i64> = sqlx::query_scalar(&sql)
            .fetch_all(&self.pool)
            .await
            .with_context(|| format!("list channels by {column}"))?;
        Ok(ids.into_iter().map(from_db_id).collect())
    }

    pub async fn set_webhook(&self, channel_id: u64, webhook_id: Option<u64>) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO channels (id, webhook_id) VALUES (?, ?)
            ON CONFLICT(id) DO UPDATE SET webhook_id = excluded.webhook_id
            "#,
        )
        .bind(to_db_id(channel_id))
        .bind(webhook_id.map(to_db_id))
        .execute(&self.pool)
        .await
        .context("set channel webhook")?;
        Ok(())
    }

    pub async fn webhook(&self, channel_id: u64) -> anyhow::Result<Option<u64>> {
        Ok(self.permissions(channel_id).await?.webhook_id)
    }
}
