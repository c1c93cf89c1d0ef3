mod auth;
mod comments;
mod error;
mod health;
mod posts;
mod stats;
mod todos;
mod users;

use axum::{Router, middleware};
use std::sync::Arc;

use crate::db::Database;
use crate::jwt::JwtConfig;
use crate::rate_limit::RateLimitConfig;

use error::track_request_path;

pub use error::ApiError;

/// Create the API router.
pub fn create_api_router(
    db: Database,
    jwt: Arc<JwtConfig>,
    rate_limit: Arc<RateLimitConfig>,
    environment: String,
) -> Router {
    let auth_state = auth::AuthState {
        db: db.clone(),
        jwt: jwt.clone(),
        rate_limit: rate_limit.clone(),
    };

    let users_state = users::UsersState {
        db: db.clone(),
        jwt: jwt.clone(),
        rate_limit,
    };

    let posts_state = posts::PostsState {
        db: db.clone(),
        jwt: jwt.clone(),
    };

    let comments_state = comments::CommentsState {
        db: db.clone(),
        jwt: jwt.clone(),
    };

    let todos_state = todos::TodosState {
        db: db.clone(),
        jwt: jwt.clone(),
    };

    let stats_state = stats::StatsState { db, jwt };

    let health_state = health::HealthState { environment };

    Router::new()
        .nest("/health", health::router(health_state))
        .nest("/auth", auth::router(auth_state))
        .nest("/users", users::router(users_state))
        .nest("/posts", posts::router(posts_state))
        .nest("/comments", comments::router(comments_state))
        .nest("/todos", todos::router(todos_state))
        .nest("/stats", stats::router(stats_state))
        .fallback(route_not_found)
        .method_not_allowed_fallback(method_not_allowed)
        .layer(middleware::from_fn(track_request_path))
}

async fn route_not_found() -> ApiError {
    ApiError::not_found("RESOURCE_NOT_FOUND", "Resource not found")
}

async fn method_not_allowed() -> ApiError {
    ApiError::MethodNotAllowed
}
