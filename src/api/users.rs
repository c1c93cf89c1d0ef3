//! User endpoints.
//!
//! - POST `/` - Public sign-up
//! - GET/PATCH/DELETE `/me` - The caller's own account
//! - GET `/` - List users (admin)
//! - GET `/{id}` - Get any user (admin)
//! - PATCH `/{id}/role` - Change a user's role (admin)
//! - PATCH `/{id}/deactivate` - Deactivate a user (admin)

use axum::{
    Json, Router,
    extract::{Query, State},
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, patch, post},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use super::auth::{RegisterRequest, create_account};
use super::error::{
    ApiError, JsonBody, ResourceId, ResultExt, max_length, optional_non_blank, required,
};
use crate::auth::{AdminOnly, Auth};
use crate::db::{Database, User, UserRole};
use crate::impl_has_auth_backend;
use crate::jwt::JwtConfig;
use crate::pagination::{
    CREATED_AT, EMAIL, NAME, Page, PageParams, PageRequest, Sort, SortDirection, SortField,
    UPDATED_AT,
};
use crate::rate_limit::{RateLimitConfig, rate_limit_register};

pub(super) const EMAIL_MAX_LEN: usize = 255;
pub(super) const NAME_MAX_LEN: usize = 100;

const SORTABLE: &[SortField] = &[CREATED_AT, UPDATED_AT, EMAIL, NAME];
const DEFAULT_SORT: Sort = Sort::new(CREATED_AT, SortDirection::Desc);

#[derive(Clone)]
pub struct UsersState {
    pub db: Database,
    pub jwt: Arc<JwtConfig>,
    pub rate_limit: Arc<RateLimitConfig>,
}

impl_has_auth_backend!(UsersState);

pub fn router(state: UsersState) -> Router {
    let create_router = Router::new()
        .route("/", post(create_user))
        .with_state(state.clone())
        .layer(middleware::from_fn_with_state(
            state.rate_limit.clone(),
            rate_limit_register,
        ));

    Router::new()
        .route("/", get(list_users))
        .route("/me", get(get_me).patch(update_me).delete(deactivate_me))
        .route("/{id}", get(get_user))
        .route("/{id}/role", patch(set_role))
        .route("/{id}/deactivate", patch(deactivate_user))
        .with_state(state)
        .merge(create_router)
}

/// Minimal shape check: one `@`, non-empty local part, dotted domain, no spaces.
pub(super) fn validate_email(email: &str) -> Result<(), ApiError> {
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.contains('@')
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.chars().any(char::is_whitespace)
        }
        None => false,
    };
    if !valid {
        return Err(ApiError::validation("email must be a valid email address"));
    }
    Ok(())
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UserResponse {
    id: i64,
    email: String,
    name: String,
    role: UserRole,
    is_active: bool,
    created_at: String,
    updated_at: String,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            name: user.name,
            role: user.role,
            is_active: user.is_active,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

#[derive(Serialize)]
struct CreateUserResponse {
    id: i64,
    email: String,
    name: String,
    role: UserRole,
}

async fn create_user(
    State(state): State<UsersState>,
    JsonBody(payload): JsonBody<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let registration = payload.validate()?;
    let user = create_account(&state.db, &registration, "DUPLICATE_RESOURCE").await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateUserResponse {
            id: user.id,
            email: user.email,
            name: user.name,
            role: user.role,
        }),
    ))
}

async fn load_active(db: &Database, id: i64) -> Result<User, ApiError> {
    db.users()
        .get_active(id)
        .await
        .db_err("Failed to get user")?
        .ok_or_else(|| ApiError::not_found("USER_NOT_FOUND", "User not found"))
}

async fn get_me(
    State(state): State<UsersState>,
    auth: Auth,
) -> Result<impl IntoResponse, ApiError> {
    let user = load_active(&state.db, auth.user.id).await?;
    Ok(Json(UserResponse::from(user)))
}

#[derive(Deserialize)]
struct UpdateMeRequest {
    name: Option<String>,
}

async fn update_me(
    State(state): State<UsersState>,
    auth: Auth,
    JsonBody(payload): JsonBody<UpdateMeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = load_active(&state.db, auth.user.id).await?;

    let Some(name) = optional_non_blank(&payload.name, "name")? else {
        return Ok(Json(UserResponse::from(user)));
    };
    let name = name.trim();
    max_length(name, "name", NAME_MAX_LEN)?;

    let updated = state
        .db
        .users()
        .update_name(user.id, name)
        .await
        .db_err("Failed to update user")?
        .ok_or_else(|| ApiError::not_found("USER_NOT_FOUND", "User not found"))?;

    Ok(Json(UserResponse::from(updated)))
}

/// Deactivate the user and revoke their refresh tokens.
async fn deactivate(db: &Database, id: i64) -> Result<bool, ApiError> {
    let found = db
        .users()
        .set_active(id, false)
        .await
        .db_err("Failed to deactivate user")?;
    if found {
        db.tokens()
            .revoke_all(id)
            .await
            .db_err("Failed to revoke refresh tokens")?;
        info!(user_id = id, "Deactivated user");
    }
    Ok(found)
}

async fn deactivate_me(
    State(state): State<UsersState>,
    auth: Auth,
) -> Result<impl IntoResponse, ApiError> {
    let user = load_active(&state.db, auth.user.id).await?;
    deactivate(&state.db, user.id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn list_users(
    State(state): State<UsersState>,
    _auth: Auth<AdminOnly>,
    Query(params): Query<PageParams>,
) -> Result<impl IntoResponse, ApiError> {
    let request = PageRequest::from_params(&params, SORTABLE, DEFAULT_SORT);

    let (users, total) = state
        .db
        .users()
        .list(&request)
        .await
        .db_err("Failed to list users")?;

    let content: Vec<UserResponse> = users.into_iter().map(UserResponse::from).collect();
    Ok(Json(Page::new(content, &request, total)))
}

async fn get_user(
    State(state): State<UsersState>,
    _auth: Auth<AdminOnly>,
    ResourceId(id): ResourceId,
) -> Result<impl IntoResponse, ApiError> {
    let user = state
        .db
        .users()
        .get_by_id(id)
        .await
        .db_err("Failed to get user")?
        .ok_or_else(|| ApiError::not_found("USER_NOT_FOUND", "User not found"))?;

    Ok(Json(UserResponse::from(user)))
}

#[derive(Deserialize)]
struct SetRoleRequest {
    role: Option<String>,
}

async fn set_role(
    State(state): State<UsersState>,
    auth: Auth<AdminOnly>,
    ResourceId(id): ResourceId,
    JsonBody(payload): JsonBody<SetRoleRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let role = required(&payload.role, "role")?;
    let role =
        UserRole::parse(role).ok_or_else(|| ApiError::validation("role must be USER or ADMIN"))?;

    let found = state
        .db
        .users()
        .set_role(id, role)
        .await
        .db_err("Failed to set role")?;
    if !found {
        return Err(ApiError::not_found("USER_NOT_FOUND", "User not found"));
    }

    info!(admin_id = auth.user.id, user_id = id, role = role.as_str(), "Changed user role");

    let user = state
        .db
        .users()
        .get_by_id(id)
        .await
        .db_err("Failed to get user")?
        .ok_or_else(|| ApiError::not_found("USER_NOT_FOUND", "User not found"))?;

    Ok(Json(UserResponse::from(user)))
}

async fn deactivate_user(
    State(state): State<UsersState>,
    _auth: Auth<AdminOnly>,
    ResourceId(id): ResourceId,
) -> Result<impl IntoResponse, ApiError> {
    if !deactivate(&state.db, id).await? {
        return Err(ApiError::not_found("USER_NOT_FOUND", "User not found"));
    }

    let user = state
        .db
        .users()
        .get_by_id(id)
        .await
        .db_err("Failed to get user")?
        .ok_or_else(|| ApiError::not_found("USER_NOT_FOUND", "User not found"))?;

    Ok(Json(UserResponse::from(user)))
}
