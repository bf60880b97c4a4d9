//! HTTP-level tests for both transport adapters.
//!
//! These drive the real router over the in-memory store: JWT authentication,
//! the REST resource API, the GraphQL endpoint and their agreement with each
//! other.

use std::sync::Arc;

use argon2::Params;
use axum::body::Body;
use comments_core::memory::MemoryStore;
use comments_core::service::{CommentService, CommentServiceImpl};
use comments_server::middleware::jwt::JwtConfig;
use comments_server::password::Argon2Hasher;
use comments_server::router::build_router;
use http_body_util::BodyExt;
use hyper::{Request, StatusCode};
use serde_json::{json, Value};
use tower::ServiceExt;

const TEST_JWT_SECRET: &[u8] = b"test-secret-for-http-tests";

// ── Test app builder ───────────────────────────────────────────

fn build_test_app() -> axum::Router {
    let hasher = Argon2Hasher::with_params(Params::new(Params::MIN_M_COST, 1, 1, None).unwrap());
    let service: Arc<dyn CommentService> = Arc::new(CommentServiceImpl::new(
        Arc::new(MemoryStore::new()),
        Arc::new(hasher),
    ));
    build_router(service, JwtConfig::from_secret(TEST_JWT_SECRET), None)
}

async fn body_json(resp: axum::response::Response) -> Value {
    let bytes = resp.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes)
        .unwrap_or_else(|_| json!({ "raw": String::from_utf8_lossy(&bytes).to_string() }))
}

async fn send(app: &axum::Router, req: Request<Body>) -> (StatusCode, Value) {
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    (status, body_json(resp).await)
}

fn json_request(method: &str, uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn get(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header("authorization", format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap()
}

fn delete(uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method("DELETE")
        .uri(uri)
        .header("authorization", format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap()
}

/// Register through REST and log in; returns (user id, token).
async fn sign_up(app: &axum::Router, username: &str, group: &str) -> (i64, String) {
    let (status, user) = send(
        app,
        json_request(
            "POST",
            "/api/v1/auth/register",
            None,
            json!({ "username": username, "password": "pw-123", "group": group }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "register: {user}");

    let login = Request::builder()
        .method("POST")
        .uri("/api/v1/auth/login")
        .header("content-type", "application/x-www-form-urlencoded")
        .body(Body::from(format!("username={username}&password=pw-123")))
        .unwrap();
    let (status, token) = send(app, login).await;
    assert_eq!(status, StatusCode::OK, "login: {token}");
    assert_eq!(token["token_type"], "bearer");
    (
        user["id"].as_i64().unwrap(),
        token["access_token"].as_str().unwrap().to_string(),
    )
}

async fn graphql(app: &axum::Router, token: Option<&str>, query: &str, variables: Value) -> Value {
    let (status, body) = send(
        app,
        json_request(
            "POST",
            "/graphql",
            token,
            json!({ "query": query, "variables": variables }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body
}

fn gql_code(body: &Value) -> &str {
    body["errors"][0]["extensions"]["code"].as_str().unwrap_or("")
}

// ── Public surface ─────────────────────────────────────────────

#[tokio::test]
async fn test_health_no_auth() {
    let app = build_test_app();
    for path in ["/health", "/api/v1/health"] {
        let req = Request::builder().uri(path).body(Body::empty()).unwrap();
        let resp = app.clone().oneshot(req).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert!(resp.headers().contains_key("x-request-id"));
        assert!(resp.headers().contains_key("x-process-time"));
        assert_eq!(body_json(resp).await["status"], "healthy");
    }
}

#[tokio::test]
async fn test_protected_routes_require_token() {
    let app = build_test_app();
    let req = Request::builder()
        .uri("/api/v1/comments")
        .body(Body::empty())
        .unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(resp.headers()["www-authenticate"], "Bearer");

    let (status, body) = send(&app, get("/api/v1/comments", "garbage")).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Could not validate credentials");
}

#[tokio::test]
async fn test_login_rejects_bad_password() {
    let app = build_test_app();
    sign_up(&app, "alice", "g1").await;
    let req = Request::builder()
        .method("POST")
        .uri("/api/v1/auth/login")
        .header("content-type", "application/x-www-form-urlencoded")
        .body(Body::from("username=alice&password=nope"))
        .unwrap();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Incorrect username or password");
}

#[tokio::test]
async fn test_duplicate_registration_is_conflict() {
    let app = build_test_app();
    sign_up(&app, "alice", "g1").await;
    let (status, body) = send(
        &app,
        json_request(
            "POST",
            "/api/v1/auth/register",
            None,
            json!({ "username": "alice", "password": "x", "group": "g2" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].as_str().unwrap().contains("already exists"));
}

#[tokio::test]
async fn test_malformed_requests_get_json_errors() {
    let app = build_test_app();
    let (status, body) = send(
        &app,
        json_request("POST", "/api/v1/auth/register", None, json!({ "username": "a" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"].as_str().unwrap().contains("password"), "{body}");

    let login = Request::builder()
        .method("POST")
        .uri("/api/v1/auth/login")
        .header("content-type", "application/x-www-form-urlencoded")
        .body(Body::from("username=a"))
        .unwrap();
    let (status, body) = send(&app, login).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"].is_string(), "{body}");

    let (_, token) = sign_up(&app, "alice", "g1").await;
    let (status, body) = send(&app, get("/api/v1/comments/abc", &token)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"].is_string(), "{body}");

    let (status, body) = send(&app, get("/api/v1/comments?skip=many", &token)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"].is_string(), "{body}");
}

// ── REST lifecycle ─────────────────────────────────────────────

#[tokio::test]
async fn test_rest_comment_lifecycle() {
    let app = build_test_app();
    let (a_id, a) = sign_up(&app, "a", "g1").await;
    let (_, b) = sign_up(&app, "b", "g2").await;

    let (status, created) = send(
        &app,
        json_request("POST", "/api/v1/comments", Some(&a), json!({ "content": "hello" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["user_id"], a_id);
    assert_eq!(created["user"]["group"], "g1");
    assert!(created["updated_at"].is_null());
    let id = created["id"].as_i64().unwrap();

    let (status, updated) = send(
        &app,
        json_request(
            "PUT",
            &format!("/api/v1/comments/{id}"),
            Some(&a),
            json!({ "content": "hello v2" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["content"], "hello v2");
    assert!(!updated["updated_at"].is_null());

    let (status, history) = send(&app, get(&format!("/api/v1/comments/{id}/history"), &a)).await;
    assert_eq!(status, StatusCode::OK);
    let history = history.as_array().unwrap().clone();
    assert_eq!(history.len(), 2);
    assert!(history[0]["old_value"].is_null());
    assert_eq!(history[0]["new_value"], "hello");
    assert_eq!(history[1]["old_value"], "hello");
    assert_eq!(history[1]["new_value"], "hello v2");

    let entry_id = history[1]["id"].as_i64().unwrap();
    let (status, entry) = send(&app, get(&format!("/api/v1/history/{entry_id}"), &a)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(entry["comment_id"], id);

    let (status, body) = send(&app, get(&format!("/api/v1/comments/{id}"), &b)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(
        body["error"],
        "Not enough permissions. You can only access comments from users in your group."
    );

    let (status, snapshot) = send(&app, delete(&format!("/api/v1/comments/{id}"), &a)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(snapshot["content"], "hello v2");

    let (status, _) = send(&app, get(&format!("/api/v1/comments/{id}"), &a)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(&app, get(&format!("/api/v1/comments/{id}/history"), &a)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = send(&app, get(&format!("/api/v1/history/{entry_id}"), &a)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_peer_cannot_modify_comment() {
    let app = build_test_app();
    let (_, a) = sign_up(&app, "a", "g1").await;
    let (_, peer) = sign_up(&app, "peer", "g1").await;

    let (_, created) = send(
        &app,
        json_request("POST", "/api/v1/comments", Some(&a), json!({ "content": "mine" })),
    )
    .await;
    let id = created["id"].as_i64().unwrap();

    let (status, read) = send(&app, get(&format!("/api/v1/comments/{id}"), &peer)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(read["content"], "mine");

    let (status, body) = send(
        &app,
        json_request(
            "PUT",
            &format!("/api/v1/comments/{id}"),
            Some(&peer),
            json!({ "content": "theirs" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(
        body["error"],
        "Not enough permissions. You can only modify your own comments."
    );

    let (status, _) = send(&app, delete(&format!("/api/v1/comments/{id}"), &peer)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_validation_and_noop_update() {
    let app = build_test_app();
    let (_, a) = sign_up(&app, "a", "g1").await;

    let (status, _) = send(
        &app,
        json_request("POST", "/api/v1/comments", Some(&a), json!({ "content": "  " })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (_, created) = send(
        &app,
        json_request("POST", "/api/v1/comments", Some(&a), json!({ "content": "same" })),
    )
    .await;
    let id = created["id"].as_i64().unwrap();

    for body in [json!({ "content": "same" }), json!({})] {
        let (status, unchanged) = send(
            &app,
            json_request("PUT", &format!("/api/v1/comments/{id}"), Some(&a), body),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(unchanged["updated_at"].is_null());
    }

    let (_, history) = send(&app, get(&format!("/api/v1/comments/{id}/history"), &a)).await;
    assert_eq!(history.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_listing_is_group_scoped_and_paginated() {
    let app = build_test_app();
    let (_, a) = sign_up(&app, "a", "g1").await;
    let (_, b) = sign_up(&app, "b", "g2").await;

    for i in 0..5 {
        send(
            &app,
            json_request("POST", "/api/v1/comments", Some(&a), json!({ "content": format!("a{i}") })),
        )
        .await;
    }
    send(
        &app,
        json_request("POST", "/api/v1/comments", Some(&b), json!({ "content": "b0" })),
    )
    .await;

    let (_, page) = send(&app, get("/api/v1/comments?skip=1&limit=2", &a)).await;
    let contents: Vec<_> = page
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["content"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(contents, vec!["a1", "a2"]);

    let (_, visible_to_b) = send(&app, get("/api/v1/comments", &b)).await;
    assert_eq!(visible_to_b.as_array().unwrap().len(), 1);
    assert_eq!(visible_to_b[0]["content"], "b0");
}

// ── Accounts ───────────────────────────────────────────────────

#[tokio::test]
async fn test_account_management() {
    let app = build_test_app();
    let (a_id, a) = sign_up(&app, "a", "g1").await;
    let (b_id, b) = sign_up(&app, "b", "g1").await;

    let (status, users) = send(&app, get("/api/v1/users?limit=1", &a)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(users.as_array().unwrap().len(), 1);

    let (status, profile) = send(&app, get(&format!("/api/v1/users/{b_id}"), &a)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(profile["username"], "b");

    let (status, body) = send(
        &app,
        json_request(
            "PUT",
            &format!("/api/v1/users/{b_id}"),
            Some(&a),
            json!({ "group": "g9" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(
        body["error"],
        "Not enough permissions. You can only modify your own account."
    );

    let (status, moved) = send(
        &app,
        json_request(
            "PUT",
            &format!("/api/v1/users/{a_id}"),
            Some(&a),
            json!({ "group": "g2" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(moved["group"], "g2");

    let (status, _) = send(&app, delete(&format!("/api/v1/users/{b_id}"), &b)).await;
    assert_eq!(status, StatusCode::OK);
    // The account is gone, so its token no longer resolves.
    let (status, _) = send(&app, get("/api/v1/users", &b)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

// ── GraphQL ────────────────────────────────────────────────────

const CREATE_COMMENT: &str = r#"
    mutation($content: String!) {
        createComment(input: { content: $content }) {
            id content userId createdAt updatedAt user { id username group }
        }
    }
"#;

#[tokio::test]
async fn test_graphql_requires_identity_except_create_user() {
    let app = build_test_app();

    let body = graphql(&app, None, "{ comments { id } }", json!({})).await;
    assert_eq!(gql_code(&body), "UNAUTHENTICATED");

    let body = graphql(
        &app,
        None,
        r#"mutation { createUser(input: { username: "gql", password: "pw", group: "g1" }) { id username group } }"#,
        json!({}),
    )
    .await;
    assert!(body["errors"].is_null(), "{body}");
    assert_eq!(body["data"]["createUser"]["group"], "g1");
}

#[tokio::test]
async fn test_graphql_lifecycle_and_errors() {
    let app = build_test_app();
    let (_, a) = sign_up(&app, "a", "g1").await;
    let (_, b) = sign_up(&app, "b", "g2").await;

    let body = graphql(&app, Some(&a), CREATE_COMMENT, json!({ "content": "hello" })).await;
    let id = body["data"]["createComment"]["id"].as_i64().unwrap();

    let body = graphql(
        &app,
        Some(&a),
        r#"mutation($id: Int!) { updateComment(commentId: $id, input: { content: "hello v2" }) { content updatedAt } }"#,
        json!({ "id": id }),
    )
    .await;
    assert_eq!(body["data"]["updateComment"]["content"], "hello v2");
    assert!(!body["data"]["updateComment"]["updatedAt"].is_null());

    let body = graphql(
        &app,
        Some(&a),
        r#"query($id: Int!) { commentHistory(commentId: $id) { oldValue newValue } }"#,
        json!({ "id": id }),
    )
    .await;
    assert_eq!(
        body["data"]["commentHistory"],
        json!([
            { "oldValue": null, "newValue": "hello" },
            { "oldValue": "hello", "newValue": "hello v2" }
        ])
    );

    let body = graphql(
        &app,
        Some(&b),
        r#"query($id: Int!) { comment(id: $id) { content } }"#,
        json!({ "id": id }),
    )
    .await;
    assert_eq!(gql_code(&body), "PERMISSION_DENIED");

    let body = graphql(
        &app,
        Some(&b),
        r#"mutation($id: Int!) { deleteComment(commentId: $id) { id } }"#,
        json!({ "id": id }),
    )
    .await;
    assert_eq!(gql_code(&body), "PERMISSION_DENIED");

    let body = graphql(
        &app,
        Some(&a),
        r#"mutation($id: Int!) { deleteComment(commentId: $id) { content } }"#,
        json!({ "id": id }),
    )
    .await;
    assert_eq!(body["data"]["deleteComment"]["content"], "hello v2");

    let body = graphql(
        &app,
        Some(&a),
        r#"query($id: Int!) { comment(id: $id) { id } }"#,
        json!({ "id": id }),
    )
    .await;
    assert_eq!(gql_code(&body), "NOT_FOUND");

    let body = graphql(&app, Some(&a), CREATE_COMMENT, json!({ "content": "" })).await;
    assert_eq!(gql_code(&body), "VALIDATION_FAILED");
}

// ── Cross-surface agreement ────────────────────────────────────

#[tokio::test]
async fn test_graphql_created_comment_reads_identically_over_rest() {
    let app = build_test_app();
    let (a_id, a) = sign_up(&app, "a", "g1").await;

    let body = graphql(&app, Some(&a), CREATE_COMMENT, json!({ "content": "via graph" })).await;
    let gql = &body["data"]["createComment"];
    let id = gql["id"].as_i64().unwrap();

    let (status, rest) = send(&app, get(&format!("/api/v1/comments/{id}"), &a)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(rest["content"], gql["content"]);
    assert_eq!(rest["user_id"], gql["userId"]);
    assert_eq!(rest["user_id"], a_id);
    assert_eq!(rest["user"]["group"], gql["user"]["group"]);
}

#[tokio::test]
async fn test_rest_created_comment_reads_identically_over_graphql() {
    let app = build_test_app();
    let (_, a) = sign_up(&app, "a", "g1").await;

    let (_, rest) = send(
        &app,
        json_request("POST", "/api/v1/comments", Some(&a), json!({ "content": "via rest" })),
    )
    .await;
    let id = rest["id"].as_i64().unwrap();

    let body = graphql(
        &app,
        Some(&a),
        r#"query($id: Int!) { comment(id: $id) { content userId user { group } } }"#,
        json!({ "id": id }),
    )
    .await;
    let gql = &body["data"]["comment"];
    assert_eq!(gql["content"], rest["content"]);
    assert_eq!(gql["userId"], rest["user_id"]);
    assert_eq!(gql["user"]["group"], rest["user"]["group"]);

    let body = graphql(&app, Some(&a), "{ comments(limit: 10) { id } }", json!({})).await;
    assert_eq!(body["data"]["comments"][0]["id"], id);
}
