//! Authentication endpoints.
//!
//! - POST `/register` - Create an account
//! - POST `/login` - Exchange credentials for an access/refresh token pair
//! - POST `/refresh` - Exchange a refresh token for a new access token
//! - POST `/logout` - Revoke one or all of the caller's refresh tokens
//! - POST `/change-password` - Replace the password and revoke all refresh tokens
//! - GET `/tokens` - List the caller's active refresh tokens

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::{get, post},
};
use chrono::{DateTime, SecondsFormat};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info};

use super::error::{ApiError, JsonBody, ResultExt, max_length, required};
use super::users::{EMAIL_MAX_LEN, NAME_MAX_LEN, validate_email};
use crate::auth::Auth;
use crate::db::{Database, NewUser, User, UserRole, is_unique_violation};
use crate::impl_has_auth_backend;
use crate::jwt::JwtConfig;
use crate::password;
use crate::rate_limit::{RateLimitConfig, rate_limit_login, rate_limit_register};

#[derive(Clone)]
pub struct AuthState {
    pub db: Database,
    pub jwt: Arc<JwtConfig>,
    pub rate_limit: Arc<RateLimitConfig>,
}

impl_has_auth_backend!(AuthState);

pub fn router(state: AuthState) -> Router {
    let login_router = Router::new()
        .route("/login", post(login))
        .with_state(state.clone())
        .layer(middleware::from_fn_with_state(
            state.rate_limit.clone(),
            rate_limit_login,
        ));

    let register_router = Router::new()
        .route("/register", post(register))
        .with_state(state.clone())
        .layer(middleware::from_fn_with_state(
            state.rate_limit.clone(),
            rate_limit_register,
        ));

    Router::new()
        .route("/refresh", post(refresh))
        .route("/logout", post(logout))
        .route("/change-password", post(change_password))
        .route("/tokens", get(list_tokens))
        .with_state(state)
        .merge(login_router)
        .merge(register_router)
}

#[derive(Deserialize)]
pub(super) struct RegisterRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    pub name: Option<String>,
}

/// Validated registration fields.
pub(super) struct Registration<'a> {
    pub email: &'a str,
    pub password: &'a str,
    pub name: &'a str,
}

impl RegisterRequest {
    pub(super) fn validate(&self) -> Result<Registration<'_>, ApiError> {
        let email = required(&self.email, "email")?.trim();
        let password = required(&self.password, "password")?;
        let name = required(&self.name, "name")?.trim();

        max_length(email, "email", EMAIL_MAX_LEN)?;
        validate_email(email)?;
        max_length(name, "name", NAME_MAX_LEN)?;

        Ok(Registration {
            email,
            password,
            name,
        })
    }
}

/// Hash the password and insert an active USER. `conflict_code` is returned
/// when the email is taken.
pub(super) async fn create_account(
    db: &Database,
    registration: &Registration<'_>,
    conflict_code: &'static str,
) -> Result<User, ApiError> {
    let taken = db
        .users()
        .is_email_taken(registration.email)
        .await
        .db_err("Failed to check email")?;
    if taken {
        return Err(ApiError::conflict(conflict_code, "Email is already registered"));
    }

    let password_hash = password::hash_password(registration.password)
        .await
        .map_err(|e| {
            error!("Failed to hash password: {}", e);
            ApiError::internal("Failed to hash password")
        })?;

    let user = db
        .users()
        .create(&NewUser {
            email: registration.email,
            password_hash: &password_hash,
            name: registration.name,
            role: UserRole::User,
        })
        .await
        .map_err(|e| {
            // Lost a race with a concurrent registration
            if is_unique_violation(&e) {
                ApiError::conflict(conflict_code, "Email is already registered")
            } else {
                ApiError::db_error("Failed to create user", e)
            }
        })?;

    info!(user_id = user.id, "Registered user");
    Ok(user)
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RegisterResponse {
    id: i64,
    email: String,
    name: String,
    role: UserRole,
    created_at: String,
}

async fn register(
    State(state): State<AuthState>,
    JsonBody(payload): JsonBody<RegisterRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let registration = payload.validate()?;
    let user = create_account(&state.db, &registration, "DUPLICATE_EMAIL").await?;

    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            id: user.id,
            email: user.email,
            name: user.name,
            role: user.role,
            created_at: user.created_at,
        }),
    ))
}

#[derive(Deserialize)]
struct LoginRequest {
    email: Option<String>,
    password: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TokenPairResponse {
    access_token: String,
    refresh_token: String,
}

async fn login(
    State(state): State<AuthState>,
    JsonBody(payload): JsonBody<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let email = required(&payload.email, "email")?.trim();
    let password = required(&payload.password, "password")?;

    let invalid = || ApiError::unauthorized("Invalid credentials");

    let user = state
        .db
        .users()
        .get_by_email(email)
        .await
        .db_err("Failed to look up user")?
        .filter(|u| u.is_active)
        .ok_or_else(invalid)?;

    let valid = password::verify_password(password, &user.password_hash)
        .await
        .map_err(|e| {
            error!("Failed to verify password: {}", e);
            ApiError::internal("Failed to verify password")
        })?;
    if !valid {
        return Err(invalid());
    }

    let access = state
        .jwt
        .generate_access_token(user.id, user.role)
        .map_err(|e| {
            error!("Failed to generate access token: {}", e);
            ApiError::internal("Failed to generate token")
        })?;

    let refresh = state
        .jwt
        .generate_refresh_token(user.id, user.role)
        .map_err(|e| {
            error!("Failed to generate refresh token: {}", e);
            ApiError::internal("Failed to generate token")
        })?;

    let expires_at = DateTime::from_timestamp(refresh.expires_at as i64, 0)
        .ok_or_else(|| ApiError::internal("Refresh token expiry out of range"))?
        .to_rfc3339_opts(SecondsFormat::Millis, true);

    state
        .db
        .tokens()
        .create(user.id, &refresh.token, &expires_at)
        .await
        .db_err("Failed to store refresh token")?;

    info!(user_id = user.id, "User logged in");

    Ok(Json(TokenPairResponse {
        access_token: access.token,
        refresh_token: refresh.token,
    }))
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RefreshRequest {
    refresh_token: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AccessTokenResponse {
    access_token: String,
}

async fn refresh(
    State(state): State<AuthState>,
    JsonBody(payload): JsonBody<RefreshRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let token = required(&payload.refresh_token, "refreshToken")?;

    let claims = state
        .jwt
        .validate_refresh_token(token)
        .map_err(|_| ApiError::token_expired("Invalid or expired refresh token"))?;

    state
        .db
        .tokens()
        .find_active(claims.sub, token)
        .await
        .db_err("Failed to check refresh token")?
        .ok_or_else(|| ApiError::unauthorized("Refresh token has been revoked"))?;

    let user = state
        .db
        .users()
        .get_active(claims.sub)
        .await
        .db_err("Failed to look up user")?
        .ok_or_else(|| ApiError::unauthorized("User is no longer active"))?;

    // Current role, not the one baked into the refresh token
    let access = state
        .jwt
        .generate_access_token(user.id, user.role)
        .map_err(|e| {
            error!("Failed to generate access token: {}", e);
            ApiError::internal("Failed to generate token")
        })?;

    Ok(Json(AccessTokenResponse {
        access_token: access.token,
    }))
}

async fn logout(
    State(state): State<AuthState>,
    auth: Auth,
    JsonBody(payload): JsonBody<RefreshRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user_id = auth.user.id;

    match payload.refresh_token.as_deref().filter(|t| !t.is_empty()) {
        Some(token) => {
            state
                .db
                .tokens()
                .revoke(user_id, token)
                .await
                .db_err("Failed to revoke refresh token")?;
        }
        None => {
            let revoked = state
                .db
                .tokens()
                .revoke_all(user_id)
                .await
                .db_err("Failed to revoke refresh tokens")?;
            info!(user_id, revoked, "Revoked all refresh tokens");
        }
    }

    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChangePasswordRequest {
    current_password: Option<String>,
    new_password: Option<String>,
}

#[derive(Serialize)]
struct MessageResponse {
    message: &'static str,
}

async fn change_password(
    State(state): State<AuthState>,
    auth: Auth,
    JsonBody(payload): JsonBody<ChangePasswordRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let current = required(&payload.current_password, "currentPassword")?;
    let new = required(&payload.new_password, "newPassword")?;

    let user = state
        .db
        .users()
        .get_active(auth.user.id)
        .await
        .db_err("Failed to look up user")?
        .ok_or_else(|| ApiError::not_found("USER_NOT_FOUND", "User not found"))?;

    let valid = password::verify_password(current, &user.password_hash)
        .await
        .map_err(|e| {
            error!("Failed to verify password: {}", e);
            ApiError::internal("Failed to verify password")
        })?;
    if !valid {
        return Err(ApiError::unauthorized("Current password is incorrect"));
    }

    let password_hash = password::hash_password(new).await.map_err(|e| {
        error!("Failed to hash password: {}", e);
        ApiError::internal("Failed to hash password")
    })?;

    state
        .db
        .users()
        .update_password(user.id, &password_hash)
        .await
        .db_err("Failed to update password")?;

    state
        .db
        .tokens()
        .revoke_all(user.id)
        .await
        .db_err("Failed to revoke refresh tokens")?;

    info!(user_id = user.id, "Password changed");

    Ok(Json(MessageResponse {
        message: "Password changed",
    }))
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TokenInfo {
    id: i64,
    created_at: String,
    expires_at: String,
}

#[derive(Serialize)]
struct ListTokensResponse {
    tokens: Vec<TokenInfo>,
}

async fn list_tokens(
    State(state): State<AuthState>,
    auth: Auth,
) -> Result<impl IntoResponse, ApiError> {
    let tokens = state
        .db
        .tokens()
        .list_active_by_user(auth.user.id)
        .await
        .db_err("Failed to list refresh tokens")?
        .into_iter()
        .map(|t| TokenInfo {
            id: t.id,
            created_at: t.created_at,
            expires_at: t.expires_at,
        })
        .collect();

    Ok(Json(ListTokensResponse { tokens }))
}
