//! Post storage. Deleted posts keep their row but are invisible to every read.

use sqlx::sqlite::SqlitePool;

use super::{NOW, UserRole};
use crate::pagination::PageRequest;

#[derive(Clone)]
pub struct PostStore {
    pool: SqlitePool,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Post {
    pub id: i64,
    pub author_id: i64,
    pub title: String,
    pub content: String,
    pub created_at: String,
    pub updated_at: String,
}

/// A post joined with its author and like count.
#[derive(Debug, Clone)]
pub struct PostWithAuthor {
    pub post: Post,
    pub author_email: String,
    pub author_name: String,
    pub author_role: UserRole,
    pub like_count: i64,
}

#[derive(sqlx::FromRow)]
struct PostWithAuthorRow {
    id: i64,
    author_id: i64,
    title: String,
    content: String,
    created_at: String,
    updated_at: String,
    author_email: String,
    author_name: String,
    author_role: String,
    like_count: i64,
}

impl From<PostWithAuthorRow> for PostWithAuthor {
    fn from(row: PostWithAuthorRow) -> Self {
        Self {
            post: Post {
                id: row.id,
                author_id: row.author_id,
                title: row.title,
                content: row.content,
                created_at: row.created_at,
                updated_at: row.updated_at,
            },
            author_email: row.author_email,
            author_name: row.author_name,
            author_role: UserRole::parse(&row.author_role).unwrap_or(UserRole::User),
            like_count: row.like_count,
        }
    }
}

const POST_COLUMNS: &str = "id, author_id, title, content, created_at, updated_at";

const POST_WITH_AUTHOR_SELECT: &str = "SELECT p.id, p.author_id, p.title, p.content, p.created_at, p.updated_at,
            u.email AS author_email, u.name AS author_name, u.role AS author_role,
            (SELECT COUNT(*) FROM post_likes l WHERE l.post_id = p.id) AS like_count
     FROM posts p
     JOIN users u ON u.id = p.author_id";

impl PostStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        author_id: i64,
        title: &str,
        content: &str,
    ) -> Result<Post, sqlx::Error> {
        sqlx::query_as(&format!(
            "INSERT INTO posts (author_id, title, content) VALUES (?, ?, ?) RETURNING {}",
            POST_COLUMNS
        ))
        .bind(author_id)
        .bind(title)
        .bind(content)
        .fetch_one(&self.pool)
        .await
    }

    /// Get a visible (not deleted) post.
    pub async fn get(&self, id: i64) -> Result<Option<Post>, sqlx::Error> {
        sqlx::query_as(&format!(
            "SELECT {} FROM posts WHERE id = ? AND is_deleted = 0",
            POST_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    /// Get a visible post with author details and like count.
    pub async fn get_with_author(&self, id: i64) -> Result<Option<PostWithAuthor>, sqlx::Error> {
        let row: Option<PostWithAuthorRow> = sqlx::query_as(&format!(
            "{} WHERE p.id = ? AND p.is_deleted = 0",
            POST_WITH_AUTHOR_SELECT
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(PostWithAuthor::from))
    }

    /// Update the provided fields of a visible post.
    pub async fn update(
        &self,
        id: i64,
        title: Option<&str>,
        content: Option<&str>,
    ) -> Result<Option<Post>, sqlx::Error> {
        sqlx::query_as(&format!(
            "UPDATE posts
             SET title = COALESCE(?, title), content = COALESCE(?, content), updated_at = {}
             WHERE id = ? AND is_deleted = 0
             RETURNING {}",
            NOW, POST_COLUMNS
        ))
        .bind(title)
        .bind(content)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    /// Mark a post deleted. Returns false if it was already gone.
    pub async fn soft_delete(&self, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(&format!(
            "UPDATE posts SET is_deleted = 1, updated_at = {} WHERE id = ? AND is_deleted = 0",
            NOW
        ))
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// One page of visible posts, filtered by keyword on title or content.
    pub async fn list(
        &self,
        page: &PageRequest,
    ) -> Result<(Vec<PostWithAuthor>, i64), sqlx::Error> {
        let pattern = page.like_pattern();
        let filter = "p.is_deleted = 0
             AND (? IS NULL OR p.title LIKE ? ESCAPE '\\' OR p.content LIKE ? ESCAPE '\\')";

        let rows: Vec<PostWithAuthorRow> = sqlx::query_as(&format!(
            "{} WHERE {} ORDER BY {} LIMIT ? OFFSET ?",
            POST_WITH_AUTHOR_SELECT,
            filter,
            page.sort.order_by("p")
        ))
        .bind(&pattern)
        .bind(&pattern)
        .bind(&pattern)
        .bind(page.size)
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        let total: (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM posts p WHERE {}", filter))
            .bind(&pattern)
            .bind(&pattern)
            .bind(&pattern)
            .fetch_one(&self.pool)
            .await?;

        Ok((rows.into_iter().map(PostWithAuthor::from).collect(), total.0))
    }
}
