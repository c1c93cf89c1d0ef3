//! Comment storage. Like posts, comments are soft-deleted.

use sqlx::sqlite::SqlitePool;

use super::NOW;
use crate::pagination::PageRequest;

#[derive(Clone)]
pub struct CommentStore {
    pool: SqlitePool,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Comment {
    pub id: i64,
    pub post_id: i64,
    pub user_id: i64,
    pub content: String,
    pub created_at: String,
    pub updated_at: String,
}

/// A comment with its author's public fields, used in listings.
#[derive(Debug, Clone)]
pub struct CommentWithAuthor {
    pub comment: Comment,
    pub author_email: String,
    pub author_name: String,
}

/// A single comment with author and parent post. `post_title` is `None`
/// when the parent post has been deleted.
#[derive(Debug, Clone)]
pub struct CommentDetail {
    pub comment: Comment,
    pub author_email: String,
    pub author_name: String,
    pub post_title: Option<String>,
}

#[derive(sqlx::FromRow)]
struct CommentJoinRow {
    id: i64,
    post_id: i64,
    user_id: i64,
    content: String,
    created_at: String,
    updated_at: String,
    author_email: String,
    author_name: String,
    post_title: Option<String>,
}

impl CommentJoinRow {
    fn into_parts(self) -> (Comment, String, String, Option<String>) {
        (
            Comment {
                id: self.id,
                post_id: self.post_id,
                user_id: self.user_id,
                content: self.content,
                created_at: self.created_at,
                updated_at: self.updated_at,
            },
            self.author_email,
            self.author_name,
            self.post_title,
        )
    }
}

const COMMENT_COLUMNS: &str = "id, post_id, user_id, content, created_at, updated_at";

const COMMENT_JOIN_SELECT: &str = "SELECT c.id, c.post_id, c.user_id, c.content, c.created_at, c.updated_at,
            u.email AS author_email, u.name AS author_name,
            CASE WHEN p.is_deleted = 0 THEN p.title END AS post_title
     FROM comments c
     JOIN users u ON u.id = c.user_id
     JOIN posts p ON p.id = c.post_id";

impl CommentStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create a comment. The post must exist (foreign key).
    pub async fn create(
        &self,
        post_id: i64,
        user_id: i64,
        content: &str,
    ) -> Result<Comment, sqlx::Error> {
        sqlx::query_as(&format!(
            "INSERT INTO comments (post_id, user_id, content) VALUES (?, ?, ?) RETURNING {}",
            COMMENT_COLUMNS
        ))
        .bind(post_id)
        .bind(user_id)
        .bind(content)
        .fetch_one(&self.pool)
        .await
    }

    /// Get a visible comment.
    pub async fn get(&self, id: i64) -> Result<Option<Comment>, sqlx::Error> {
        sqlx::query_as(&format!(
            "SELECT {} FROM comments WHERE id = ? AND is_deleted = 0",
            COMMENT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    pub async fn get_detail(&self, id: i64) -> Result<Option<CommentDetail>, sqlx::Error> {
        let row: Option<CommentJoinRow> = sqlx::query_as(&format!(
            "{} WHERE c.id = ? AND c.is_deleted = 0",
            COMMENT_JOIN_SELECT
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| {
            let (comment, author_email, author_name, post_title) = row.into_parts();
            CommentDetail {
                comment,
                author_email,
                author_name,
                post_title,
            }
        }))
    }

    pub async fn update(&self, id: i64, content: &str) -> Result<Option<Comment>, sqlx::Error> {
        sqlx::query_as(&format!(
            "UPDATE comments SET content = ?, updated_at = {}
             WHERE id = ? AND is_deleted = 0
             RETURNING {}",
            NOW, COMMENT_COLUMNS
        ))
        .bind(content)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    pub async fn soft_delete(&self, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(&format!(
            "UPDATE comments SET is_deleted = 1, updated_at = {} WHERE id = ? AND is_deleted = 0",
            NOW
        ))
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// One page of visible comments on a post.
    pub async fn list_by_post(
        &self,
        post_id: i64,
        page: &PageRequest,
    ) -> Result<(Vec<CommentWithAuthor>, i64), sqlx::Error> {
        let rows: Vec<CommentJoinRow> = sqlx::query_as(&format!(
            "{} WHERE c.post_id = ? AND c.is_deleted = 0 ORDER BY {} LIMIT ? OFFSET ?",
            COMMENT_JOIN_SELECT,
            page.sort.order_by("c")
        ))
        .bind(post_id)
        .bind(page.size)
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        let total: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM comments WHERE post_id = ? AND is_deleted = 0")
                .bind(post_id)
                .fetch_one(&self.pool)
                .await?;

        let comments = rows
            .into_iter()
            .map(|row| {
                let (comment, author_email, author_name, _) = row.into_parts();
                CommentWithAuthor {
                    comment,
                    author_email,
                    author_name,
                }
            })
            .collect();

        Ok((comments, total.0))
    }
}
