//! Integration tests for todo endpoints.

mod common;

use axum::http::{StatusCode, header};
use common::{assert_error, test_app};
use inkpost::db::UserRole;
use serde_json::json;

#[tokio::test]
async fn test_todo_lifecycle() {
    let app = test_app().await;
    let (_, token) = app.create_user("todo@example.com", UserRole::User).await;

    let response = app
        .post("/todos", Some(&token), json!({ "title": "Buy milk" }))
        .await;
    assert_eq!(response.status, StatusCode::CREATED);
    let id = response.body["id"].as_i64().unwrap();
    assert_eq!(
        response.headers[header::LOCATION],
        format!("/todos/{}", id).as_str()
    );
    assert_eq!(response.body["title"], "Buy milk");
    assert_eq!(response.body["completed"], false);

    let uri = format!("/todos/{}", id);
    let response = app.patch(&uri, &token, json!({ "completed": true })).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["completed"], true);
    assert_eq!(response.body["title"], "Buy milk");

    let response = app.get(&uri, &token).await;
    assert_eq!(response.body["completed"], true);

    assert_eq!(app.delete(&uri, &token).await.status, StatusCode::NO_CONTENT);
    assert_error(&app.get(&uri, &token).await, StatusCode::NOT_FOUND, "TODO_NOT_FOUND");
    assert_error(
        &app.delete(&uri, &token).await,
        StatusCode::NOT_FOUND,
        "TODO_NOT_FOUND",
    );
}

#[tokio::test]
async fn test_todos_are_private() {
    let app = test_app().await;
    let (_, owner) = app.create_user("owner@example.com", UserRole::User).await;
    let (_, other) = app.create_user("other@example.com", UserRole::Admin).await;
    let id = app.create_todo(&owner, "Secret").await;
    let uri = format!("/todos/{}", id);

    assert_error(&app.get(&uri, &other).await, StatusCode::NOT_FOUND, "TODO_NOT_FOUND");
    assert_error(
        &app.patch(&uri, &other, json!({ "completed": true })).await,
        StatusCode::NOT_FOUND,
        "TODO_NOT_FOUND",
    );
    assert_error(
        &app.delete(&uri, &other).await,
        StatusCode::NOT_FOUND,
        "TODO_NOT_FOUND",
    );

    let list = app.get("/todos", &other).await;
    assert_eq!(list.body["totalElements"], 0);
    let list = app.get("/todos", &owner).await;
    assert_eq!(list.body["totalElements"], 1);
}

#[tokio::test]
async fn test_todo_validation() {
    let app = test_app().await;
    let (_, token) = app.create_user("val@example.com", UserRole::User).await;

    let missing = app.post("/todos", Some(&token), json!({})).await;
    assert_error(&missing, StatusCode::BAD_REQUEST, "VALIDATION_FAILED");

    let too_long = app
        .post("/todos", Some(&token), json!({ "title": "x".repeat(256) }))
        .await;
    assert_error(&too_long, StatusCode::BAD_REQUEST, "VALIDATION_FAILED");

    let id = app.create_todo(&token, "Valid").await;
    let blank = app
        .patch(&format!("/todos/{}", id), &token, json!({ "title": " " }))
        .await;
    assert_error(&blank, StatusCode::BAD_REQUEST, "VALIDATION_FAILED");

    let wrong_type = app
        .patch(&format!("/todos/{}", id), &token, json!({ "completed": "yes" }))
        .await;
    assert_error(&wrong_type, StatusCode::BAD_REQUEST, "VALIDATION_FAILED");
}

#[tokio::test]
async fn test_maintenance_title_returns_503() {
    let app = test_app().await;
    let (_, owner) = app.create_user("maint@example.com", UserRole::User).await;
    let (_, other) = app.create_user("nosy@example.com", UserRole::User).await;
    let id = app.create_todo(&owner, "Regular").await;
    let uri = format!("/todos/{}", id);

    let response = app
        .patch(&uri, &owner, json!({ "title": "maintenance" }))
        .await;
    assert_error(&response, StatusCode::SERVICE_UNAVAILABLE, "SERVICE_UNAVAILABLE");
    assert_eq!(response.headers[header::RETRY_AFTER], "10");

    // Title unchanged
    assert_eq!(app.get(&uri, &owner).await.body["title"], "Regular");

    // Ownership is checked first
    let response = app
        .patch(&uri, &other, json!({ "title": "maintenance" }))
        .await;
    assert_error(&response, StatusCode::NOT_FOUND, "TODO_NOT_FOUND");
}

#[tokio::test]
async fn test_list_todos_keyword_and_sort() {
    let app = test_app().await;
    let (_, token) = app.create_user("list@example.com", UserRole::User).await;
    app.create_todo(&token, "Write report").await;
    app.create_todo(&token, "Read book").await;
    app.create_todo(&token, "Rewrite tests").await;

    let response = app.get("/todos?keyword=WRITE", &token).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["totalElements"], 2);
    assert_eq!(response.body["keyword"], "WRITE");

    let response = app.get("/todos?sort=title,asc", &token).await;
    let titles: Vec<&str> = response.body["content"]
        .as_array()
        .unwrap()
        .iter()
        .map(|t| t["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["Read book", "Rewrite tests", "Write report"]);
}
