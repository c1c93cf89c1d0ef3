//! Integration tests for comments, both under a post and by comment id.

mod common;

use axum::http::{StatusCode, header};
use common::{assert_error, test_app};
use inkpost::db::UserRole;
use serde_json::json;

#[tokio::test]
async fn test_create_and_list_comments() {
    let app = test_app().await;
    let (author_id, author) = app.create_user("author@example.com", UserRole::User).await;
    let (reader_id, reader) = app.create_user("reader@example.com", UserRole::User).await;
    let post_id = app.create_post(&author, "Post", "Body").await;

    let response = app
        .post(
            &format!("/posts/{}/comments", post_id),
            Some(&reader),
            json!({ "content": "Nice post" }),
        )
        .await;
    assert_eq!(response.status, StatusCode::CREATED);
    let comment_id = response.body["id"].as_i64().unwrap();
    assert_eq!(
        response.headers[header::LOCATION],
        format!("/comments/{}", comment_id).as_str()
    );
    assert_eq!(response.body["postId"], post_id);
    assert_eq!(response.body["authorId"], reader_id);

    app.create_comment(&author, post_id, "Thanks").await;

    let list = app
        .get(&format!("/posts/{}/comments", post_id), &reader)
        .await;
    assert_eq!(list.status, StatusCode::OK);
    assert_eq!(list.body["totalElements"], 2);
    assert_eq!(list.body["sort"], "createdAt,ASC");
    // Oldest first
    let content = list.body["content"].as_array().unwrap();
    assert_eq!(content[0]["content"], "Nice post");
    assert_eq!(content[0]["author"]["id"], reader_id);
    assert_eq!(content[1]["author"]["id"], author_id);
    assert_eq!(content[1]["author"]["email"], "author@example.com");
}

#[tokio::test]
async fn test_comment_on_missing_post() {
    let app = test_app().await;
    let (_, token) = app.create_user("c@example.com", UserRole::User).await;

    let response = app
        .post("/posts/42/comments", Some(&token), json!({ "content": "Hello?" }))
        .await;
    assert_error(&response, StatusCode::NOT_FOUND, "POST_NOT_FOUND");

    let post_id = app.create_post(&token, "Short-lived", "Body").await;
    app.delete(&format!("/posts/{}", post_id), &token).await;

    let response = app
        .post(
            &format!("/posts/{}/comments", post_id),
            Some(&token),
            json!({ "content": "Too late" }),
        )
        .await;
    assert_error(&response, StatusCode::NOT_FOUND, "POST_NOT_FOUND");

    let list = app
        .get(&format!("/posts/{}/comments", post_id), &token)
        .await;
    assert_error(&list, StatusCode::NOT_FOUND, "POST_NOT_FOUND");
}

#[tokio::test]
async fn test_blank_comment_rejected() {
    let app = test_app().await;
    let (_, token) = app.create_user("blank@example.com", UserRole::User).await;
    let post_id = app.create_post(&token, "Post", "Body").await;

    let response = app
        .post(
            &format!("/posts/{}/comments", post_id),
            Some(&token),
            json!({ "content": "  " }),
        )
        .await;
    assert_error(&response, StatusCode::BAD_REQUEST, "VALIDATION_FAILED");
}

#[tokio::test]
async fn test_get_comment_detail() {
    let app = test_app().await;
    let (author_id, token) = app.create_user("detail@example.com", UserRole::User).await;
    let post_id = app.create_post(&token, "Parent", "Body").await;
    let comment_id = app.create_comment(&token, post_id, "Hi").await;

    let response = app.get(&format!("/comments/{}", comment_id), &token).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["content"], "Hi");
    assert_eq!(response.body["author"]["id"], author_id);
    assert_eq!(response.body["post"]["id"], post_id);
    assert_eq!(response.body["post"]["title"], "Parent");

    // The comment outlives its post
    app.delete(&format!("/posts/{}", post_id), &token).await;
    let response = app.get(&format!("/comments/{}", comment_id), &token).await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.body["post"].is_null());
}

#[tokio::test]
async fn test_update_and_delete_comment() {
    let app = test_app().await;
    let (_, author) = app.create_user("owner@example.com", UserRole::User).await;
    let (_, other) = app.create_user("other@example.com", UserRole::User).await;
    let post_id = app.create_post(&author, "Post", "Body").await;
    let comment_id = app.create_comment(&author, post_id, "Draft").await;
    let uri = format!("/comments/{}", comment_id);

    let forbidden = app.patch(&uri, &other, json!({ "content": "Mine now" })).await;
    assert_error(&forbidden, StatusCode::FORBIDDEN, "FORBIDDEN");
    assert_error(&app.delete(&uri, &other).await, StatusCode::FORBIDDEN, "FORBIDDEN");

    let response = app.patch(&uri, &author, json!({ "content": "Final" })).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["content"], "Final");

    let response = app.delete(&uri, &author).await;
    assert_eq!(response.status, StatusCode::NO_CONTENT);

    assert_error(
        &app.get(&uri, &author).await,
        StatusCode::NOT_FOUND,
        "COMMENT_NOT_FOUND",
    );
    let list = app
        .get(&format!("/posts/{}/comments", post_id), &author)
        .await;
    assert_eq!(list.body["totalElements"], 0);
}

#[tokio::test]
async fn test_missing_comment() {
    let app = test_app().await;
    let (_, token) = app.create_user("m@example.com", UserRole::User).await;

    assert_error(
        &app.get("/comments/77", &token).await,
        StatusCode::NOT_FOUND,
        "COMMENT_NOT_FOUND",
    );
    assert_error(
        &app.patch("/comments/77", &token, json!({ "content": "x" })).await,
        StatusCode::NOT_FOUND,
        "COMMENT_NOT_FOUND",
    );
    assert_error(
        &app.patch("/comments/77", &token, json!({ "content": "" })).await,
        StatusCode::NOT_FOUND,
        "COMMENT_NOT_FOUND",
    );
}

#[tokio::test]
async fn test_update_comment_checks_ownership_before_body() {
    let app = test_app().await;
    let (_, author) = app.create_user("owner@example.com", UserRole::User).await;
    let (_, other) = app.create_user("other@example.com", UserRole::User).await;
    let post_id = app.create_post(&author, "Post", "Body").await;
    let comment_id = app.create_comment(&author, post_id, "Draft").await;

    let response = app
        .patch(&format!("/comments/{}", comment_id), &other, json!({ "content": "" }))
        .await;
    assert_error(&response, StatusCode::FORBIDDEN, "FORBIDDEN");
}
