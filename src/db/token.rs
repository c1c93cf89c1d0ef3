//! Refresh token storage for revocation and per-user listing.
//!
//! Only refresh tokens are stored. Access tokens are stateless and short-lived.
//! Rows are revoked, never updated otherwise; the cleanup task deletes them
//! once they have expired.

use sqlx::sqlite::SqlitePool;

use super::NOW;

/// A persisted refresh token record.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RefreshToken {
    pub id: i64,
    pub user_id: i64,
    pub token: String,
    pub expires_at: String,
    pub revoked: bool,
    pub created_at: String,
}

/// Store for managing refresh tokens.
pub struct TokenStore {
    pool: SqlitePool,
}

impl TokenStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Persist a freshly issued refresh token.
    pub async fn create(
        &self,
        user_id: i64,
        token: &str,
        expires_at: &str,
    ) -> Result<i64, sqlx::Error> {
        let result =
            sqlx::query("INSERT INTO refresh_tokens (user_id, token, expires_at) VALUES (?, ?, ?)")
                .bind(user_id)
                .bind(token)
                .bind(expires_at)
                .execute(&self.pool)
                .await?;

        Ok(result.last_insert_rowid())
    }

    /// Find the unrevoked, unexpired row matching this token for the user.
    pub async fn find_active(
        &self,
        user_id: i64,
        token: &str,
    ) -> Result<Option<RefreshToken>, sqlx::Error> {
        sqlx::query_as(&format!(
            "SELECT id, user_id, token, expires_at, revoked, created_at
             FROM refresh_tokens
             WHERE user_id = ? AND token = ? AND revoked = 0 AND expires_at > {}
             LIMIT 1",
            NOW
        ))
        .bind(user_id)
        .bind(token)
        .fetch_optional(&self.pool)
        .await
    }

    /// Revoke one token of the user. Returns false if nothing matched.
    pub async fn revoke(&self, user_id: i64, token: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE refresh_tokens SET revoked = 1 WHERE user_id = ? AND token = ? AND revoked = 0",
        )
        .bind(user_id)
        .bind(token)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Revoke every token of the user. Returns the number revoked.
    pub async fn revoke_all(&self, user_id: i64) -> Result<u64, sqlx::Error> {
        let result =
            sqlx::query("UPDATE refresh_tokens SET revoked = 1 WHERE user_id = ? AND revoked = 0")
                .bind(user_id)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected())
    }

    /// List the user's usable tokens, newest first.
    pub async fn list_active_by_user(
        &self,
        user_id: i64,
    ) -> Result<Vec<RefreshToken>, sqlx::Error> {
        sqlx::query_as(&format!(
            "SELECT id, user_id, token, expires_at, revoked, created_at
             FROM refresh_tokens
             WHERE user_id = ? AND revoked = 0 AND expires_at > {}
             ORDER BY created_at DESC, id DESC",
            NOW
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
    }

    /// Delete all expired tokens, revoked or not.
    pub async fn delete_expired(&self) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(&format!(
            "DELETE FROM refresh_tokens WHERE expires_at <= {}",
            NOW
        ))
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }
}
