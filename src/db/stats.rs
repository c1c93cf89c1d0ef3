//! Aggregate queries over posts for the admin stats endpoints.

use sqlx::sqlite::SqlitePool;

#[derive(Clone)]
pub struct StatsStore {
    pool: SqlitePool,
}

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct DailyPostCount {
    /// `YYYY-MM-DD` (UTC)
    pub date: String,
    pub count: i64,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AuthorPostCount {
    pub author_id: i64,
    pub name: String,
    pub email: String,
    pub post_count: i64,
}

impl StatsStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Visible posts per UTC day over the trailing `days` days, today included.
    /// Days without posts are absent.
    pub async fn daily_posts(&self, days: i64) -> Result<Vec<DailyPostCount>, sqlx::Error> {
        let offset = format!("-{} days", (days - 1).max(0));
        sqlx::query_as(
            "SELECT substr(created_at, 1, 10) AS date, COUNT(*) AS count
             FROM posts
             WHERE is_deleted = 0
               AND created_at >= strftime('%Y-%m-%dT00:00:00.000Z', 'now', ?)
             GROUP BY date
             ORDER BY date ASC",
        )
        .bind(offset)
        .fetch_all(&self.pool)
        .await
    }

    /// Authors ranked by visible post count.
    pub async fn top_authors(&self, limit: i64) -> Result<Vec<AuthorPostCount>, sqlx::Error> {
        sqlx::query_as(
            "SELECT u.id AS author_id, u.name, u.email, COUNT(p.id) AS post_count
             FROM posts p
             JOIN users u ON u.id = p.author_id
             WHERE p.is_deleted = 0
             GROUP BY u.id
             ORDER BY post_count DESC, u.id ASC
             LIMIT ?",
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await
    }
}
