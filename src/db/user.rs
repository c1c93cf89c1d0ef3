use sqlx::sqlite::SqlitePool;

use super::NOW;
use crate::pagination::PageRequest;

#[derive(Clone)]
pub struct UserStore {
    pool: SqlitePool,
}

/// User role for authorization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum UserRole {
    User,
    Admin,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::User => "USER",
            UserRole::Admin => "ADMIN",
        }
    }

    /// Parse the wire/storage spelling. Exact match only.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "USER" => Some(UserRole::User),
            "ADMIN" => Some(UserRole::Admin),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub password_hash: String,
    pub name: String,
    pub role: UserRole,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(sqlx::FromRow)]
struct UserRow {
    id: i64,
    email: String,
    password_hash: String,
    name: String,
    role: String,
    is_active: bool,
    created_at: String,
    updated_at: String,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        Self {
            id: row.id,
            email: row.email,
            password_hash: row.password_hash,
            name: row.name,
            // The CHECK constraint keeps anything else out of the column
            role: UserRole::parse(&row.role).unwrap_or(UserRole::User),
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Fields for inserting a user. The password must already be hashed.
pub struct NewUser<'a> {
    pub email: &'a str,
    pub password_hash: &'a str,
    pub name: &'a str,
    pub role: UserRole,
}

const USER_COLUMNS: &str =
    "id, email, password_hash, name, role, is_active, created_at, updated_at";

impl UserStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Create an active user. Fails with a unique violation if the email is taken.
    pub async fn create(&self, user: &NewUser<'_>) -> Result<User, sqlx::Error> {
        let row: UserRow = sqlx::query_as(&format!(
            "INSERT INTO users (email, password_hash, name, role, is_active)
             VALUES (?, ?, ?, ?, 1)
             RETURNING {}",
            USER_COLUMNS
        ))
        .bind(user.email)
        .bind(user.password_hash)
        .bind(user.name)
        .bind(user.role.as_str())
        .fetch_one(&self.pool)
        .await?;
        Ok(row.into())
    }

    /// Get a user by ID, active or not.
    pub async fn get_by_id(&self, id: i64) -> Result<Option<User>, sqlx::Error> {
        let row: Option<UserRow> =
            sqlx::query_as(&format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(User::from))
    }

    /// Get an active user by ID.
    pub async fn get_active(&self, id: i64) -> Result<Option<User>, sqlx::Error> {
        Ok(self.get_by_id(id).await?.filter(|u| u.is_active))
    }

    /// Get a user by email, active or not.
    pub async fn get_by_email(&self, email: &str) -> Result<Option<User>, sqlx::Error> {
        let row: Option<UserRow> =
            sqlx::query_as(&format!("SELECT {} FROM users WHERE email = ?", USER_COLUMNS))
                .bind(email)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(User::from))
    }

    pub async fn is_email_taken(&self, email: &str) -> Result<bool, sqlx::Error> {
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users WHERE email = ?")
            .bind(email)
            .fetch_one(&self.pool)
            .await?;
        Ok(count.0 > 0)
    }

    /// Rename a user. Returns the updated row.
    pub async fn update_name(&self, id: i64, name: &str) -> Result<Option<User>, sqlx::Error> {
        let row: Option<UserRow> = sqlx::query_as(&format!(
            "UPDATE users SET name = ?, updated_at = {} WHERE id = ? RETURNING {}",
            NOW, USER_COLUMNS
        ))
        .bind(name)
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(User::from))
    }

    pub async fn update_password(&self, id: i64, password_hash: &str) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(&format!(
            "UPDATE users SET password_hash = ?, updated_at = {} WHERE id = ?",
            NOW
        ))
        .bind(password_hash)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Set the role for a user.
    pub async fn set_role(&self, id: i64, role: UserRole) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(&format!(
            "UPDATE users SET role = ?, updated_at = {} WHERE id = ?",
            NOW
        ))
        .bind(role.as_str())
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Flip the active flag. Users are never hard-deleted by normal flows.
    pub async fn set_active(&self, id: i64, active: bool) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(&format!(
            "UPDATE users SET is_active = ?, updated_at = {} WHERE id = ?",
            NOW
        ))
        .bind(active)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// One page of all users (active and inactive) plus the total count.
    pub async fn list(&self, page: &PageRequest) -> Result<(Vec<User>, i64), sqlx::Error> {
        let rows: Vec<UserRow> = sqlx::query_as(&format!(
            "SELECT {} FROM users u ORDER BY {} LIMIT ? OFFSET ?",
            USER_COLUMNS,
            page.sort.order_by("u")
        ))
        .bind(page.size)
        .bind(page.offset())
        .fetch_all(&self.pool)
        .await?;

        let total: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;

        Ok((rows.into_iter().map(User::from).collect(), total.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::pagination::{CREATED_AT, EMAIL, PageParams, Sort, SortDirection};

    fn new_user<'a>(email: &'a str) -> NewUser<'a> {
        NewUser {
            email,
            password_hash: "hash",
            name: "tester",
            role: UserRole::User,
        }
    }

    #[test]
    fn test_role_parse() {
        assert_eq!(UserRole::parse("ADMIN"), Some(UserRole::Admin));
        assert_eq!(UserRole::parse("USER"), Some(UserRole::User));
        assert_eq!(UserRole::parse("admin"), None);
        assert_eq!(UserRole::parse("ROOT"), None);
    }

    #[test]
    fn test_role_serde() {
        assert_eq!(serde_json::to_string(&UserRole::Admin).unwrap(), "\"ADMIN\"");
        let role: UserRole = serde_json::from_str("\"USER\"").unwrap();
        assert_eq!(role, UserRole::User);
    }

    #[tokio::test]
    async fn test_create_and_get_user() {
        let db = Database::open(":memory:").await.unwrap();

        let user = db.users().create(&new_user("alice@test.com")).await.unwrap();
        assert!(user.is_active);
        assert_eq!(user.role, UserRole::User);
        assert!(user.created_at.ends_with('Z'));

        let by_email = db
            .users()
            .get_by_email("alice@test.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_email.id, user.id);

        let by_id = db.users().get_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(by_id.email, "alice@test.com");

        assert!(db.users().is_email_taken("alice@test.com").await.unwrap());
        assert!(!db.users().is_email_taken("bob@test.com").await.unwrap());
    }

    #[tokio::test]
    async fn test_deactivate_hides_from_get_active() {
        let db = Database::open(":memory:").await.unwrap();
        let user = db.users().create(&new_user("alice@test.com")).await.unwrap();

        assert!(db.users().set_active(user.id, false).await.unwrap());
        assert!(db.users().get_active(user.id).await.unwrap().is_none());

        // Row still exists
        let row = db.users().get_by_id(user.id).await.unwrap().unwrap();
        assert!(!row.is_active);
    }

    #[tokio::test]
    async fn test_set_role_and_rename() {
        let db = Database::open(":memory:").await.unwrap();
        let user = db.users().create(&new_user("alice@test.com")).await.unwrap();

        assert!(db.users().set_role(user.id, UserRole::Admin).await.unwrap());
        let renamed = db
            .users()
            .update_name(user.id, "Alice")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(renamed.role, UserRole::Admin);
        assert_eq!(renamed.name, "Alice");

        assert!(!db.users().set_role(9999, UserRole::Admin).await.unwrap());
    }

    #[tokio::test]
    async fn test_list_pages() {
        let db = Database::open(":memory:").await.unwrap();
        for email in ["c@test.com", "a@test.com", "b@test.com"] {
            db.users().create(&new_user(email)).await.unwrap();
        }

        let request = PageRequest::from_params(
            &PageParams {
                size: Some("2".to_string()),
                sort: Some("email,ASC".to_string()),
                ..PageParams::default()
            },
            &[CREATED_AT, EMAIL],
            Sort::new(CREATED_AT, SortDirection::Desc),
        );

        let (users, total) = db.users().list(&request).await.unwrap();
        assert_eq!(total, 3);
        let emails: Vec<_> = users.iter().map(|u| u.email.as_str()).collect();
        assert_eq!(emails, vec!["a@test.com", "b@test.com"]);
    }
}
