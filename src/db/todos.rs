//! Todo storage. Todos are private to their owner and hard-deleted.

use sqlx::sqlite::SqlitePool;

use super::NOW;
use crate::pagination::PageRequest;

#[derive(Clone)]
pub struct TodoStore {
    pool: SqlitePool,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Todo {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub completed: bool,
    pub created_at: String,
    pub updated_at: String,
}

const TODO_COLUMNS: &str = "id, user_id, title, completed, created_at, updated_at";

impl TodoStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn create(&self, user_id: i64, title: &str) -> Result<Todo, sqlx::Error> {
        sqlx::query_as(&format!(
            "INSERT INTO todos (user_id, title) VALUES (?, ?) RETURNING {}",
            TODO_COLUMNS
        ))
        .bind(user_id)
        .bind(title)
        .fetch_one(&self.pool)
        .await
    }

    /// Get a todo only if it belongs to the given user.
    pub async fn get(&self, id: i64, user_id: i64) -> Result<Option<Todo>, sqlx::Error> {
        sqlx::query_as(&format!(
            "SELECT {} FROM todos WHERE id = ? AND user_id = ?",
            TODO_COLUMNS
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
    }

    /// Update the provided fields of the user's todo.
    pub async fn update(
        &self,
        id: i64,
        user_id: i64,
        title: Option<&str>,
        completed: Option<bool>,
    ) -> Result<Option<Todo>, sqlx::Error> {
        sqlx::query_as(&format!(
            "UPDATE todos
             SET title = COALESCE(?, title), completed = COALESCE(?, completed), updated_at = {}
             WHERE id = ? AND user_id = ?
             RETURNING {}",
            NOW, TODO_COLUMNS
        ))
        .bind(title)
        .bind(completed)
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
    }

    pub async fn delete(&self, id: i64, user_id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM todos WHERE id = ? AND user_id = ?")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// One page of the user's todos, filtered by keyword on the title.
    pub async fn list_by_user(
        &self,
        user_id: i64,
        page: &PageRequest,
    ) -> Result<(Vec<Todo>, i64), sqlx::Error> {
        let pattern = page.like_pattern();
        let filter = "t.user_id = ? AND (? IS NULL OR t.title LIKE ? ESCAPE '\\')";

        let rows: Vec<Todo> = sqlx::query_as(&format!(
            "SELECT t.id, t.user_id, t.title, t.completed, t.created_at, t.updated_at
             FROM todos t WHERE {} ORDER BY {} LIMIT ? OFFSET ?",
            filter,
            page.sort.order_by("t")
        ))
        .bind(user_id)
        .bind(&pattern)
        .bind(&pattern)
        .bind(page.size)
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        let total: (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM todos t WHERE {}", filter))
            .bind(user_id)
            .bind(&pattern)
            .bind(&pattern)
            .fetch_one(&self.pool)
            .await?;

        Ok((rows, total.0))
    }
}
