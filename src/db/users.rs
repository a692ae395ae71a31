use anyhow::Context;
use sqlx::SqlitePool;

use crate::utils::{from_db_id, to_db_id};

/// Tracks who agreed to have their messages recorded.
#[derive(Clone)]
pub struct UserManager {
    pool: SqlitePool,
}

impl UserManager {
    pub fn new(pool: SqlitePool) -> Self { Self { pool } }

    pub async fn register(&self, user_id: u64) -> anyhow::Result<()> {
        sqlx::query(
            r#"
            INSERT INTO users (id, is_registered) VALUES (?, 1)
            ON CONFLICT(id) DO UPDATE SET is_registered = 1
            "#,
        )
        .bind(to_db_id(user_id))
        .execute(&self.pool)
        .await
        .context("register user")?;
        Ok(())
    }

    /// Returns false when the user wasn't registered in the first place.
    pub async fn unregister(&self, user_id: u64) -> anyhow::Result<bool> {
        let res = sqlx::query("UPDATE users SET is_registered = 0 WHERE id = ? AND is_registered = 1")
            .bind(to_db_id(user_id))
            .execute(&self.pool)
            .await
            .context("unregister user")?;
        Ok(res.rows_affected() > 0)
    }

    pub async fn is_registered(&self, user_id: u64) -> anyhow::Result<bool> {
        let registered: Option<bool> = sqlx::query_scalar("SELECT is_registered FROM users WHERE id = ?")
            .bind(to_db_id(user_id))
            .fetch_optional(&self.pool)
            .await
            .context("load registration")?;
        Ok(registered.unwrap_or(false))
    }

    pub async fn registered_users(&self) -> anyhow::Result<Vec<u64>> {
        let ids: Vec<i64> = sqlx::query_scalar("SELECT id FROM users WHERE is_registered = 1 ORDER BY id")
            .fetch_all(&self.pool)
            .await
            .context("list registered users")?;
        Ok(ids.into_iter().map(from_db_id).collect())
    }

    /// Make sure a row exists for this user without touching their registration.
    pub async fn ensure(&self, user_id: u64) -> anyhow::Result<()> {
        sqlx::query("INSERT OR IGNORE INTO users (id) VALUES (?)")
            .bind(to_db_id(user_id))
            .execute(&self.pool)
            .await
            .context("ensure user row")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_pool;

    #[tokio::test]
    async fn register_and_unregister() {
        let users = UserManager::new(test_pool().await);

        assert!(!users.is_registered(1).await.unwrap());
        users.register(1).await.unwrap();
        users.register(1).await.unwrap();
        assert!(users.is_registered(1).await.unwrap());
        assert_eq!(users.registered_users().await.unwrap(), vec![1]);

        assert!(users.unregister(1).await.unwrap());
        assert!(!users.unregister(1).await.unwrap());
        assert!(!users.is_registered(1).await.unwrap());
    }

    #[tokio::test]
    async fn ensure_does_not_register() {
        let users = UserManager::new(test_pool().await);
        users.ensure(5).await.unwrap();
        assert!(!users.is_registered(5).await.unwrap());

        users.register(5).await.unwrap();
        users.ensure(5).await.unwrap();
        assert!(users.is_registered(5).await.unwrap());
    }
}
