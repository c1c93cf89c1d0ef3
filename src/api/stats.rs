//! Admin statistics endpoints.

use axum::{
    Json, Router,
    extract::{Query, State},
    response::IntoResponse,
    routing::get,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::error::{ApiError, ResultExt};
use crate::auth::{AdminOnly, Auth};
use crate::db::Database;
use crate::impl_has_auth_backend;
use crate::jwt::JwtConfig;

/// Days covered by the daily post series, today included.
const DAILY_RANGE_DAYS: i64 = 7;

const DEFAULT_TOP_AUTHORS: i64 = 5;
const MAX_TOP_AUTHORS: i64 = 50;

#[derive(Clone)]
pub struct StatsState {
    pub db: Database,
    pub jwt: Arc<JwtConfig>,
}

impl_has_auth_backend!(StatsState);

pub fn router(state: StatsState) -> Router {
    Router::new()
        .route("/posts/daily", get(daily_posts))
        .route("/top-authors", get(top_authors))
        .with_state(state)
}

#[derive(Serialize)]
struct DailyPoint {
    date: String,
    count: i64,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct DailyPostsResponse {
    range_days: i64,
    data: Vec<DailyPoint>,
}

async fn daily_posts(
    State(state): State<StatsState>,
    _auth: Auth<AdminOnly>,
) -> Result<impl IntoResponse, ApiError> {
    let data = state
        .db
        .stats()
        .daily_posts(DAILY_RANGE_DAYS)
        .await
        .db_err("Failed to compute daily post stats")?
        .into_iter()
        .map(|d| DailyPoint {
            date: d.date,
            count: d.count,
        })
        .collect();

    Ok(Json(DailyPostsResponse {
        range_days: DAILY_RANGE_DAYS,
        data,
    }))
}

#[derive(Deserialize)]
struct TopAuthorsParams {
    limit: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct TopAuthor {
    author_id: i64,
    name: String,
    email: String,
    post_count: i64,
}

#[derive(Serialize)]
struct TopAuthorsResponse {
    data: Vec<TopAuthor>,
}

async fn top_authors(
    State(state): State<StatsState>,
    _auth: Auth<AdminOnly>,
    Query(params): Query<TopAuthorsParams>,
) -> Result<impl IntoResponse, ApiError> {
    let limit = params
        .limit
        .as_deref()
        .and_then(|l| l.trim().parse::<i64>().ok())
        .unwrap_or(DEFAULT_TOP_AUTHORS)
        .clamp(1, MAX_TOP_AUTHORS);

    let data = state
        .db
        .stats()
        .top_authors(limit)
        .await
        .db_err("Failed to compute top authors")?
        .into_iter()
        .map(|a| TopAuthor {
            author_id: a.author_id,
            name: a.name,
            email: a.email,
            post_count: a.post_count,
        })
        .collect();

    Ok(Json(TopAuthorsResponse { data }))
}
