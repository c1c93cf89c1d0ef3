//! Scheduled cleanup of expired refresh tokens and idle rate-limit buckets.

use crate::db::Database;
use crate::rate_limit::RateLimitConfig;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

/// Interval between cleanup runs.
const CLEANUP_INTERVAL: Duration = Duration::from_secs(60 * 60); // 1 hour

/// Run all cleanup tasks once. Revoked tokens are kept until they expire.
pub async fn run_cleanup(db: &Database, rate_limit: &RateLimitConfig) {
    match db.tokens().delete_expired().await {
        Ok(count) if count > 0 => info!("Cleaned up {} expired refresh tokens", count),
        Ok(_) => {}
        Err(e) => error!("Failed to clean up expired refresh tokens: {}", e),
    }
    rate_limit.retain_recent();
}

/// Spawn a background task that runs cleanup periodically.
/// Returns a handle that can be used to abort the task.
pub fn spawn_cleanup_scheduler(
    db: Database,
    rate_limit: Arc<RateLimitConfig>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(CLEANUP_INTERVAL);
        // The first tick completes immediately and startup already ran a pass
        interval.tick().await;

        loop {
            interval.tick().await;
            run_cleanup(&db, &rate_limit).await;
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{NewUser, UserRole};

    #[tokio::test]
    async fn test_run_cleanup_removes_only_expired() {
        let db = Database::open(":memory:").await.unwrap();
        let user = db
            .users()
            .create(&NewUser {
                email: "a@test.com",
                password_hash: "hash",
                name: "a",
                role: UserRole::User,
            })
            .await
            .unwrap();

        db.tokens()
            .create(user.id, "old", "2000-01-01T00:00:00.000Z")
            .await
            .unwrap();
        db.tokens()
            .create(user.id, "live", "2999-01-01T00:00:00.000Z")
            .await
            .unwrap();

        run_cleanup(&db, &RateLimitConfig::default()).await;

        let active = db.tokens().list_active_by_user(user.id).await.unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].token, "live");
    }
}
