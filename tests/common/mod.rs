#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{HeaderMap, Method, Request, StatusCode, header},
};
use inkpost::auth::ClientIpHeader;
use inkpost::db::{Database, NewUser, UserRole};
use inkpost::jwt::JwtConfig;
use inkpost::rate_limit::RateLimitConfig;
use inkpost::{ServerConfig, create_app};
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;

pub const ACCESS_SECRET: &[u8] = b"test-access-secret-0123456789abcdef";
pub const REFRESH_SECRET: &[u8] = b"test-refresh-secret-0123456789abcdef";

/// Password of every user made by `TestApp::create_user`.
pub const PASSWORD: &str = "password123";

pub struct TestApp {
    pub app: Router,
    pub db: Database,
    pub jwt: JwtConfig,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

/// Create a test app on a fresh in-memory database.
pub async fn test_app() -> TestApp {
    test_app_with_rate_limit(1000).await
}

pub async fn test_app_with_rate_limit(per_minute: u32) -> TestApp {
    test_app_with_ip_header(per_minute, None).await
}

/// Create a test app that reads the client IP from a proxy header.
pub async fn test_app_with_ip_header(
    per_minute: u32,
    ip_header: Option<ClientIpHeader>,
) -> TestApp {
    let db = Database::open(":memory:")
        .await
        .expect("Failed to open test database");
    let config = ServerConfig {
        db: db.clone(),
        access_secret: ACCESS_SECRET.to_vec(),
        refresh_secret: REFRESH_SECRET.to_vec(),
        access_token_ttl: 900,
        refresh_token_ttl: 3600,
        environment: "test".to_string(),
        rate_limit: Arc::new(RateLimitConfig::new(per_minute, ip_header)),
    };
    TestApp {
        app: create_app(&config),
        db,
        jwt: JwtConfig::new(ACCESS_SECRET, REFRESH_SECRET),
    }
}

impl TestApp {
    /// Send a request. The response body is parsed as JSON, `Null` when empty.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> TestResponse {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let body = match body {
            Some(json) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };
        self.send(builder.body(body).unwrap()).await
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        TestResponse {
            status,
            headers,
            body,
        }
    }

    pub async fn get(&self, uri: &str, token: &str) -> TestResponse {
        self.request(Method::GET, uri, Some(token), None).await
    }

    pub async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> TestResponse {
        self.request(Method::POST, uri, token, Some(body)).await
    }

    pub async fn put(&self, uri: &str, token: &str) -> TestResponse {
        self.request(Method::PUT, uri, Some(token), None).await
    }

    pub async fn patch(&self, uri: &str, token: &str, body: Value) -> TestResponse {
        self.request(Method::PATCH, uri, Some(token), Some(body)).await
    }

    pub async fn delete(&self, uri: &str, token: &str) -> TestResponse {
        self.request(Method::DELETE, uri, Some(token), None).await
    }

    /// Insert an active user with `PASSWORD` and return (id, access token).
    pub async fn create_user(&self, email: &str, role: UserRole) -> (i64, String) {
        let password_hash = inkpost::password::hash_password(PASSWORD).await.unwrap();
        let user = self
            .db
            .users()
            .create(&NewUser {
                email,
                password_hash: &password_hash,
                name: "Test User",
                role,
            })
            .await
            .unwrap();
        let token = self.jwt.generate_access_token(user.id, role).unwrap().token;
        (user.id, token)
    }

    /// Log in through the API and return (access token, refresh token).
    pub async fn login(&self, email: &str, password: &str) -> (String, String) {
        let response = self
            .post(
                "/auth/login",
                None,
                json!({ "email": email, "password": password }),
            )
            .await;
        assert_eq!(response.status, StatusCode::OK, "login failed: {}", response.body);
        (
            response.body["accessToken"].as_str().unwrap().to_string(),
            response.body["refreshToken"].as_str().unwrap().to_string(),
        )
    }

    pub async fn create_post(&self, token: &str, title: &str, content: &str) -> i64 {
        let response = self
            .post(
                "/posts",
                Some(token),
                json!({ "title": title, "content": content }),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "body: {}", response.body);
        response.body["id"].as_i64().unwrap()
    }

    pub async fn create_comment(&self, token: &str, post_id: i64, content: &str) -> i64 {
        let response = self
            .post(
                &format!("/posts/{}/comments", post_id),
                Some(token),
                json!({ "content": content }),
            )
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "body: {}", response.body);
        response.body["id"].as_i64().unwrap()
    }

    pub async fn create_todo(&self, token: &str, title: &str) -> i64 {
        let response = self
            .post("/todos", Some(token), json!({ "title": title }))
            .await;
        assert_eq!(response.status, StatusCode::CREATED, "body: {}", response.body);
        response.body["id"].as_i64().unwrap()
    }
}

/// Assert the response is an error with the given status and code.
pub fn assert_error(response: &TestResponse, status: StatusCode, code: &str) {
    assert_eq!(response.status, status, "body: {}", response.body);
    assert_eq!(response.body["status"], status.as_u16());
    assert_eq!(response.body["code"], code);
    assert!(response.body["message"].is_string());
    assert!(response.body["timestamp"].is_string());
    assert!(response.body["path"].is_string());
}
