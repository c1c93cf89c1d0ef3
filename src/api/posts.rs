//! Post endpoints, including a post's comments and likes.
//!
//! All endpoints require authentication. Only the author may modify a post.

use axum::{
    Json, Router,
    extract::{Query, State},
    http::{StatusCode, header},
    response::IntoResponse,
    routing::{get, put},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::comments::{CommentListItem, CommentRequest, CommentResponse};
use super::error::{
    ApiError, JsonBody, ResourceId, ResultExt, max_length, optional_non_blank, required,
};
use crate::auth::Auth;
use crate::db::{Database, Post, PostWithAuthor, UserRole};
use crate::impl_has_auth_backend;
use crate::jwt::JwtConfig;
use crate::pagination::{
    CREATED_AT, Page, PageParams, PageRequest, Sort, SortDirection, SortField, TITLE, UPDATED_AT,
};

const TITLE_MAX_LEN: usize = 100;

const SORTABLE: &[SortField] = &[CREATED_AT, UPDATED_AT, TITLE];
const DEFAULT_SORT: Sort = Sort::new(CREATED_AT, SortDirection::Desc);

const COMMENT_SORTABLE: &[SortField] = &[CREATED_AT, UPDATED_AT];
const COMMENT_DEFAULT_SORT: Sort = Sort::new(CREATED_AT, SortDirection::Asc);

/// State for posts endpoints.
#[derive(Clone)]
pub struct PostsState {
    pub db: Database,
    pub jwt: Arc<JwtConfig>,
}

impl_has_auth_backend!(PostsState);

pub fn router(state: PostsState) -> Router {
    Router::new()
        .route("/", get(list_posts).post(create_post))
        .route(
            "/{id}",
            get(get_post).patch(update_post).delete(delete_post),
        )
        .route("/{id}/comments", get(list_comments).post(create_comment))
        .route("/{id}/like", put(like_post).delete(unlike_post))
        .with_state(state)
}

// --- Request/Response types ---

#[derive(Deserialize)]
struct CreatePostRequest {
    title: Option<String>,
    content: Option<String>,
}

#[derive(Deserialize)]
struct UpdatePostRequest {
    title: Option<String>,
    content: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PostResponse {
    id: i64,
    title: String,
    content: String,
    author_id: i64,
    created_at: String,
    updated_at: String,
}

impl From<Post> for PostResponse {
    fn from(post: Post) -> Self {
        Self {
            id: post.id,
            title: post.title,
            content: post.content,
            author_id: post.author_id,
            created_at: post.created_at,
            updated_at: post.updated_at,
        }
    }
}

#[derive(Serialize)]
struct PostAuthor {
    id: i64,
    email: String,
    name: String,
    role: UserRole,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct PostDetailResponse {
    id: i64,
    title: String,
    content: String,
    author: PostAuthor,
    like_count: i64,
    created_at: String,
    updated_at: String,
}

impl From<PostWithAuthor> for PostDetailResponse {
    fn from(row: PostWithAuthor) -> Self {
        Self {
            id: row.post.id,
            title: row.post.title,
            content: row.post.content,
            author: PostAuthor {
                id: row.post.author_id,
                email: row.author_email,
                name: row.author_name,
                role: row.author_role,
            },
            like_count: row.like_count,
            created_at: row.post.created_at,
            updated_at: row.post.updated_at,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LikeResponse {
    post_id: i64,
    liked: bool,
    like_count: i64,
}

fn post_not_found() -> ApiError {
    ApiError::not_found("POST_NOT_FOUND", "Post not found")
}

async fn load_post(db: &Database, id: i64) -> Result<Post, ApiError> {
    db.posts()
        .get(id)
        .await
        .db_err("Failed to get post")?
        .ok_or_else(post_not_found)
}

/// Load a visible post and check the caller wrote it.
async fn load_own_post(db: &Database, id: i64, user_id: i64) -> Result<Post, ApiError> {
    let post = load_post(db, id).await?;
    if post.author_id != user_id {
        return Err(ApiError::forbidden("Only the author can modify this post"));
    }
    Ok(post)
}

// --- Handlers ---

async fn list_posts(
    State(state): State<PostsState>,
    _auth: Auth,
    Query(params): Query<PageParams>,
) -> Result<impl IntoResponse, ApiError> {
    let request = PageRequest::from_params(&params, SORTABLE, DEFAULT_SORT);

    let (posts, total) = state
        .db
        .posts()
        .list(&request)
        .await
        .db_err("Failed to list posts")?;

    let content: Vec<PostDetailResponse> =
        posts.into_iter().map(PostDetailResponse::from).collect();
    Ok(Json(Page::new(content, &request, total).with_keyword(&request)))
}

async fn create_post(
    State(state): State<PostsState>,
    auth: Auth,
    JsonBody(payload): JsonBody<CreatePostRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let title = required(&payload.title, "title")?;
    let content = required(&payload.content, "content")?;
    max_length(title, "title", TITLE_MAX_LEN)?;

    let post = state
        .db
        .posts()
        .create(auth.user.id, title, content)
        .await
        .db_err("Failed to create post")?;

    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, format!("/posts/{}", post.id))],
        Json(PostResponse::from(post)),
    ))
}

async fn get_post(
    State(state): State<PostsState>,
    _auth: Auth,
    ResourceId(id): ResourceId,
) -> Result<impl IntoResponse, ApiError> {
    let post = state
        .db
        .posts()
        .get_with_author(id)
        .await
        .db_err("Failed to get post")?
        .ok_or_else(post_not_found)?;

    Ok(Json(PostDetailResponse::from(post)))
}

async fn update_post(
    State(state): State<PostsState>,
    auth: Auth,
    ResourceId(id): ResourceId,
    JsonBody(payload): JsonBody<UpdatePostRequest>,
) -> Result<impl IntoResponse, ApiError> {
    load_own_post(&state.db, id, auth.user.id).await?;

    let title = optional_non_blank(&payload.title, "title")?;
    let content = optional_non_blank(&payload.content, "content")?;
    if let Some(title) = title {
        max_length(title, "title", TITLE_MAX_LEN)?;
    }

    let post = state
        .db
        .posts()
        .update(id, title, content)
        .await
        .db_err("Failed to update post")?
        .ok_or_else(post_not_found)?;

    Ok(Json(PostResponse::from(post)))
}

async fn delete_post(
    State(state): State<PostsState>,
    auth: Auth,
    ResourceId(id): ResourceId,
) -> Result<impl IntoResponse, ApiError> {
    load_own_post(&state.db, id, auth.user.id).await?;

    state
        .db
        .posts()
        .soft_delete(id)
        .await
        .db_err("Failed to delete post")?;

    Ok(StatusCode::NO_CONTENT)
}

async fn list_comments(
    State(state): State<PostsState>,
    _auth: Auth,
    ResourceId(id): ResourceId,
    Query(params): Query<PageParams>,
) -> Result<impl IntoResponse, ApiError> {
    load_post(&state.db, id).await?;
    let request = PageRequest::from_params(&params, COMMENT_SORTABLE, COMMENT_DEFAULT_SORT);

    let (comments, total) = state
        .db
        .comments()
        .list_by_post(id, &request)
        .await
        .db_err("Failed to list comments")?;

    let content: Vec<CommentListItem> =
        comments.into_iter().map(CommentListItem::from).collect();
    Ok(Json(Page::new(content, &request, total)))
}

async fn create_comment(
    State(state): State<PostsState>,
    auth: Auth,
    ResourceId(id): ResourceId,
    JsonBody(payload): JsonBody<CommentRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let content = required(&payload.content, "content")?;
    load_post(&state.db, id).await?;

    let comment = state
        .db
        .comments()
        .create(id, auth.user.id, content)
        .await
        .db_err("Failed to create comment")?;

    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, format!("/comments/{}", comment.id))],
        Json(CommentResponse::from(comment)),
    ))
}

async fn like_post(
    State(state): State<PostsState>,
    auth: Auth,
    ResourceId(id): ResourceId,
) -> Result<impl IntoResponse, ApiError> {
    load_post(&state.db, id).await?;

    state
        .db
        .likes()
        .like(id, auth.user.id)
        .await
        .db_err("Failed to like post")?;

    let like_count = state.db.likes().count(id).await.db_err("Failed to count likes")?;

    Ok(Json(LikeResponse {
        post_id: id,
        liked: true,
        like_count,
    }))
}

async fn unlike_post(
    State(state): State<PostsState>,
    auth: Auth,
    ResourceId(id): ResourceId,
) -> Result<impl IntoResponse, ApiError> {
    load_post(&state.db, id).await?;

    state
        .db
        .likes()
        .unlike(id, auth.user.id)
        .await
        .db_err("Failed to unlike post")?;

    let like_count = state.db.likes().count(id).await.db_err("Failed to count likes")?;

    Ok(Json(LikeResponse {
        post_id: id,
        liked: false,
        like_count,
    }))
}
