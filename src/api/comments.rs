//! Comment endpoints addressed by comment id.
//!
//! Listing and creating comments lives under `/posts/{id}/comments`.

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::get,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::error::{ApiError, JsonBody, ResourceId, ResultExt, required};
use crate::auth::Auth;
use crate::db::{Comment, CommentWithAuthor, Database};
use crate::impl_has_auth_backend;
use crate::jwt::JwtConfig;

#[derive(Clone)]
pub struct CommentsState {
    pub db: Database,
    pub jwt: Arc<JwtConfig>,
}

impl_has_auth_backend!(CommentsState);

pub fn router(state: CommentsState) -> Router {
    Router::new()
        .route(
            "/{id}",
            get(get_comment).patch(update_comment).delete(delete_comment),
        )
        .with_state(state)
}

#[derive(Deserialize)]
pub(super) struct CommentRequest {
    pub content: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct CommentResponse {
    id: i64,
    post_id: i64,
    author_id: i64,
    content: String,
    created_at: String,
    updated_at: String,
}

impl From<Comment> for CommentResponse {
    fn from(comment: Comment) -> Self {
        Self {
            id: comment.id,
            post_id: comment.post_id,
            author_id: comment.user_id,
            content: comment.content,
            created_at: comment.created_at,
            updated_at: comment.updated_at,
        }
    }
}

#[derive(Serialize)]
pub(super) struct CommentAuthor {
    id: i64,
    email: String,
    name: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct CommentListItem {
    id: i64,
    post_id: i64,
    content: String,
    author: CommentAuthor,
    created_at: String,
    updated_at: String,
}

impl From<CommentWithAuthor> for CommentListItem {
    fn from(row: CommentWithAuthor) -> Self {
        Self {
            id: row.comment.id,
            post_id: row.comment.post_id,
            content: row.comment.content,
            author: CommentAuthor {
                id: row.comment.user_id,
                email: row.author_email,
                name: row.author_name,
            },
            created_at: row.comment.created_at,
            updated_at: row.comment.updated_at,
        }
    }
}

#[derive(Serialize)]
struct CommentPost {
    id: i64,
    title: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct CommentDetailResponse {
    id: i64,
    content: String,
    author: CommentAuthor,
    /// `null` once the parent post is deleted
    post: Option<CommentPost>,
    created_at: String,
    updated_at: String,
}

fn comment_not_found() -> ApiError {
    ApiError::not_found("COMMENT_NOT_FOUND", "Comment not found")
}

async fn get_comment(
    State(state): State<CommentsState>,
    _auth: Auth,
    ResourceId(id): ResourceId,
) -> Result<impl IntoResponse, ApiError> {
    let detail = state
        .db
        .comments()
        .get_detail(id)
        .await
        .db_err("Failed to get comment")?
        .ok_or_else(comment_not_found)?;

    let post_id = detail.comment.post_id;
    Ok(Json(CommentDetailResponse {
        id: detail.comment.id,
        content: detail.comment.content,
        author: CommentAuthor {
            id: detail.comment.user_id,
            email: detail.author_email,
            name: detail.author_name,
        },
        post: detail.post_title.map(|title| CommentPost { id: post_id, title }),
        created_at: detail.comment.created_at,
        updated_at: detail.comment.updated_at,
    }))
}

/// Load a visible comment and check the caller wrote it.
async fn load_own_comment(db: &Database, id: i64, user_id: i64) -> Result<Comment, ApiError> {
    let comment = db
        .comments()
        .get(id)
        .await
        .db_err("Failed to get comment")?
        .ok_or_else(comment_not_found)?;

    if comment.user_id != user_id {
        return Err(ApiError::forbidden("Only the author can modify this comment"));
    }
    Ok(comment)
}

async fn update_comment(
    State(state): State<CommentsState>,
    auth: Auth,
    ResourceId(id): ResourceId,
    JsonBody(payload): JsonBody<CommentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    load_own_comment(&state.db, id, auth.user.id).await?;
    let content = required(&payload.content, "content")?;

    let comment = state
        .db
        .comments()
        .update(id, content)
        .await
        .db_err("Failed to update comment")?
        .ok_or_else(comment_not_found)?;

    Ok(Json(CommentResponse::from(comment)))
}

async fn delete_comment(
    State(state): State<CommentsState>,
    auth: Auth,
    ResourceId(id): ResourceId,
) -> Result<impl IntoResponse, ApiError> {
    load_own_comment(&state.db, id, auth.user.id).await?;

    state
        .db
        .comments()
        .soft_delete(id)
        .await
        .db_err("Failed to delete comment")?;

    Ok(StatusCode::NO_CONTENT)
}
