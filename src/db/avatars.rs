use anyhow::Context;
use sqlx::SqlitePool;

use crate::db::models::{ledger_params, AvatarLedger, AvatarRow};
use crate::utils::to_db_id;

#[derive(Clone)]
pub struct AvatarManager {
    pool: SqlitePool,
}

impl AvatarManager {
    pub fn new(pool: SqlitePool) -> Self { Self { pool } }

    pub async fn get(&self, user_id: u64) -> anyhow::Result<Option<AvatarLedger>> {
        let row = sqlx::query_as::<_, AvatarRow>(
            r#"
            SELECT id, original_avatar_url, modified_avatar_url, modified_avatar_message_id
            FROM users WHERE id = ?
            "#,
        )
        .bind(to_db_id(user_id))
        .fetch_optional(&self.pool)
        .await
        .context("load avatar ledger")?;
        Ok(row.and_then(AvatarRow::into_ledger).map(|(_, ledger)| ledger))
    }

    /// Stores the ledger, creating the user row if needed.
    pub async fn set(&self, user_id: u64, ledger: &AvatarLedger) -> anyhow::Result<()> {
        let (original, modified, message_id) = ledger_params(ledger);
        sqlx::query(
            r#"
            INSERT INTO users (id, original_avatar_url, modified_avatar_url, modified_avatar_message_id)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                original_avatar_url = excluded.original_avatar_url,
                modified_avatar_url = excluded.modified_avatar_url,
                modified_avatar_message_id = excluded.modified_avatar_message_id
            "#,
        )
        .bind(to_db_id(user_id))
        .bind(original)
        .bind(modified)
        .bind(message_id)
        .execute(&self.pool)
        .await
        .context("store avatar ledger")?;
        Ok(())
    }

    /// Returns false when there was no ledger to delete.
    pub async fn delete(&self, user_id: u64) -> anyhow::Result<bool> {
        let res = sqlx::query(
            r#"
            UPDATE users
            SET original_avatar_url = NULL,
                modified_avatar_url = NULL,
                modified_avatar_message_id = NULL
            WHERE id = ? AND modified_avatar_url IS NOT NULL
            "#,
        )
        .bind(to_db_id(user_id))
        .execute(&self.pool)
        .await
        .context("delete avatar ledger")?;
        Ok(res.rows_affected() > 0)
    }

    pub async fn all(&self) -> anyhow::Result<Vec<(u64, AvatarLedger)>> {
        let rows = sqlx::query_as::<_, AvatarRow>(
            r#"
            SELECT id, original_avatar_url, modified_avatar_url, modified_avatar_message_id
            FROM users
            WHERE modified_avatar_url IS NOT NULL
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("list avatar ledgers")?;
        Ok(rows.into_iter().filter_map(AvatarRow::into_ledger).collect())
    }
}
