use crate::db::models::{DbKey, DbSession, DbUser};
use crate::db::schema::AUTH_INIT;
use crate::error::SesameError;
use sqlx::any::{AnyPoolOptions, install_default_drivers};
use sqlx::{Any, Pool};

pub type AnyPool = Pool<Any>;

/// Process-wide connection pool. Cloning shares the same pool.
#[derive(Clone)]
pub struct Database {
    pool: AnyPool,
}

impl Database {
    /// Connect to `url` (`mysql://…` in production, `sqlite:…` locally).
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self, SesameError> {
        install_default_drivers();
        let pool = AnyPoolOptions::new()
            .max_connections(max_connections.max(1))
            .connect(url)
            .await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &AnyPool {
        &self.pool
    }

    /// Initialize the schema by executing the bundled DDL.
    pub async fn init_schema(&self) -> Result<(), SesameError> {
        // one statement per call; not every driver accepts multi-statement strings
        for stmt in AUTH_INIT.split(';') {
            let s = stmt.trim();
            if s.is_empty() {
                continue;
            }
            sqlx::query(s).execute(&self.pool).await?;
        }
        Ok(())
    }

    pub fn storage(&self) -> AuthStorage {
        AuthStorage::new(self.pool.clone())
    }
}

/// Typed queries over `users`, `user_keys` and `user_sessions`.
#[derive(Clone)]
pub struct AuthStorage {
    pool: AnyPool,
}

impl AuthStorage {
    pub fn new(pool: AnyPool) -> Self {
        Self { pool }
    }

    /// Insert a user and, optionally, its first key in one transaction.
    pub async fn insert_user(&self, user: &DbUser, key: Option<&DbKey>) -> Result<(), SesameError> {
        user.check()?;
        if let Some(key) = key {
            key.check()?;
        }

        let mut tx = self.pool.begin().await?;
        sqlx::query("INSERT INTO users (id, username, email) VALUES (?, ?, ?)")
            .bind(user.id.clone())
            .bind(user.username.clone())
            .bind(user.email.clone())
            .execute(&mut *tx)
            .await?;

        if let Some(key) = key {
            let query = match key.hashed_password.as_deref() {
                Some(hash) => sqlx::query(
                    "INSERT INTO user_keys (id, user_id, hashed_password) VALUES (?, ?, ?)",
                )
                .bind(key.id.clone())
                .bind(key.user_id.clone())
                .bind(hash.to_string()),
                None => sqlx::query(
                    "INSERT INTO user_keys (id, user_id, hashed_password) VALUES (?, ?, NULL)",
                )
                .bind(key.id.clone())
                .bind(key.user_id.clone()),
            };
            query.execute(&mut *tx).await.map_err(map_duplicate_key)?;
        }

        tx.commit().await?;
        Ok(())
    }

    pub async fn get_user(&self, id: &str) -> Result<Option<DbUser>, SesameError> {
        let user = sqlx::query_as::<_, DbUser>("SELECT id, username, email FROM users WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    /// Delete a user together with its keys and sessions. Returns whether the
    /// user row existed.
    pub async fn delete_user(&self, id: &str) -> Result<bool, SesameError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM user_sessions WHERE user_id = ?")
            .bind(id.to_string())
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM user_keys WHERE user_id = ?")
            .bind(id.to_string())
            .execute(&mut *tx)
            .await?;
        let res = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id.to_string())
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(res.rows_affected() > 0)
    }

    pub async fn insert_key(&self, key: &DbKey) -> Result<(), SesameError> {
        key.check()?;
        let query = match key.hashed_password.as_deref() {
            Some(hash) => {
                sqlx::query("INSERT INTO user_keys (id, user_id, hashed_password) VALUES (?, ?, ?)")
                    .bind(key.id.clone())
                    .bind(key.user_id.clone())
                    .bind(hash.to_string())
            }
            None => sqlx::query(
                "INSERT INTO user_keys (id, user_id, hashed_password) VALUES (?, ?, NULL)",
            )
            .bind(key.id.clone())
            .bind(key.user_id.clone()),
        };
        query.execute(&self.pool).await.map_err(map_duplicate_key)?;
        Ok(())
    }

    pub async fn get_key(&self, id: &str) -> Result<Option<DbKey>, SesameError> {
        let key = sqlx::query_as::<_, DbKey>(
            "SELECT id, user_id, hashed_password FROM user_keys WHERE id = ?",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;
        Ok(key)
    }

    pub async fn keys_of_user(&self, user_id: &str) -> Result<Vec<DbKey>, SesameError> {
        let keys = sqlx::query_as::<_, DbKey>(
            "SELECT id, user_id, hashed_password FROM user_keys WHERE user_id = ? ORDER BY id",
        )
        .bind(user_id.to_string())
        .fetch_all(&self.pool)
        .await?;
        Ok(keys)
    }

    /// Set or clear the stored hash. Returns whether the key existed.
    pub async fn update_key_password(
        &self,
        id: &str,
        hashed_password: Option<&str>,
    ) -> Result<bool, SesameError> {
        let query = match hashed_password {
            Some(hash) => sqlx::query("UPDATE user_keys SET hashed_password = ? WHERE id = ?")
                .bind(hash.to_string())
                .bind(id.to_string()),
            None => sqlx::query("UPDATE user_keys SET hashed_password = NULL WHERE id = ?")
                .bind(id.to_string()),
        };
        let res = query.execute(&self.pool).await?;
        Ok(res.rows_affected() > 0)
    }

    pub async fn delete_key(&self, id: &str) -> Result<bool, SesameError> {
        let res = sqlx::query("DELETE FROM user_keys WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    pub async fn insert_session(&self, session: &DbSession) -> Result<(), SesameError> {
        session.check()?;
        sqlx::query(
            r#"INSERT INTO user_sessions (id, user_id, active_expires, idle_expires)
               VALUES (?, ?, ?, ?)"#,
        )
        .bind(session.id.clone())
        .bind(session.user_id.clone())
        .bind(session.active_expires)
        .bind(session.idle_expires)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get_session(&self, id: &str) -> Result<Option<DbSession>, SesameError> {
        let session = sqlx::query_as::<_, DbSession>(
            r#"SELECT id, user_id, active_expires, idle_expires
               FROM user_sessions WHERE id = ?"#,
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await?;
        Ok(session)
    }

    pub async fn sessions_of_user(&self, user_id: &str) -> Result<Vec<DbSession>, SesameError> {
        let sessions = sqlx::query_as::<_, DbSession>(
            r#"SELECT id, user_id, active_expires, idle_expires
               FROM user_sessions WHERE user_id = ? ORDER BY idle_expires"#,
        )
        .bind(user_id.to_string())
        .fetch_all(&self.pool)
        .await?;
        Ok(sessions)
    }

    /// Move both deadlines. Returns whether the session existed.
    pub async fn update_session_expiry(
        &self,
        id: &str,
        active_expires: i64,
        idle_expires: i64,
    ) -> Result<bool, SesameError> {
        let res = sqlx::query(
            "UPDATE user_sessions SET active_expires = ?, idle_expires = ? WHERE id = ?",
        )
        .bind(active_expires)
        .bind(idle_expires)
        .bind(id.to_string())
        .execute(&self.pool)
        .await?;
        Ok(res.rows_affected() > 0)
    }

    pub async fn delete_session(&self, id: &str) -> Result<bool, SesameError> {
        let res = sqlx::query("DELETE FROM user_sessions WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected() > 0)
    }

    pub async fn delete_sessions_of_user(&self, user_id: &str) -> Result<u64, SesameError> {
        let res = sqlx::query("DELETE FROM user_sessions WHERE user_id = ?")
            .bind(user_id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected())
    }

    /// Delete the user's sessions whose idle deadline has passed at `now_ms`.
    pub async fn delete_dead_sessions_of_user(
        &self,
        user_id: &str,
        now_ms: i64,
    ) -> Result<u64, SesameError> {
        let res = sqlx::query("DELETE FROM user_sessions WHERE user_id = ? AND idle_expires <= ?")
            .bind(user_id.to_string())
            .bind(now_ms)
            .execute(&self.pool)
            .await?;
        Ok(res.rows_affected())
    }
}

fn map_duplicate_key(e: sqlx::Error) -> SesameError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => SesameError::DuplicateKeyId,
        _ => SesameError::DatabaseError(e),
    }
}
