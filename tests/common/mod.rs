#![allow(dead_code)]

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use rayat::{AppState, config::Config, create_app, database::create_memory_pool};
use serde_json::Value;
use tower::ServiceExt;

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
}

impl TestApp {
    pub async fn new() -> Self {
        let db = create_memory_pool().await.expect("in-memory database");
        let state = AppState::new(db, Config::for_tests());
        let router = create_app(state.clone());

        Self { router, state }
    }

    pub async fn request(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let (status, bytes) = self.raw(method, uri, token, body).await;
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };

        (status, json)
    }

    pub async fn raw(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Vec<u8>) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }

        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();

        (status, bytes.to_vec())
    }

    /// Registers a user and returns their bearer token.
    pub async fn register(&self, username: &str) -> String {
        self.register_with_email(username, None).await
    }

    pub async fn register_with_email(&self, username: &str, email: Option<&str>) -> String {
        let (status, body) = self
            .request(
                "POST",
                "/api/auth/register",
                None,
                Some(serde_json::json!({
                    "username": username,
                    "password": "password123",
                    "email": email,
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "register failed: {body}");

        body["token"].as_str().unwrap().to_string()
    }

    /// Creates a community as `token` and returns its id.
    pub async fn create_community(&self, token: &str, name: &str) -> i64 {
        let (status, body) = self
            .request(
                "POST",
                "/api/communities",
                Some(token),
                Some(serde_json::json!({ "name": name })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create community failed: {body}");

        body["id"].as_i64().unwrap()
    }

    pub async fn create_post(&self, token: &str, community_id: i64, title: &str) -> i64 {
        let (status, body) = self
            .request(
                "POST",
                &format!("/api/communities/{community_id}/posts"),
                Some(token),
                Some(serde_json::json!({ "title": title, "body": "نص المنشور" })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "create post failed: {body}");

        body["id"].as_i64().unwrap()
    }

    pub async fn comment(&self, token: &str, post_id: i64, body: &str, parent: Option<i64>) -> i64 {
        let (status, response) = self
            .request(
                "POST",
                &format!("/api/posts/{post_id}/comments"),
                Some(token),
                Some(serde_json::json!({ "body": body, "parent_comment_id": parent })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "comment failed: {response}");

        response["id"].as_i64().unwrap()
    }
}
