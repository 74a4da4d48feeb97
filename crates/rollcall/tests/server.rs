//! Integration tests for the HTTP surface: routing, validation, auth,
//! and the full start → rotate → verify → expire flow.
//!
//! Requests go straight into the axum `Router` with `oneshot`; no socket
//! is bound except in the `build` test.

use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use rollcall::prelude::*;
use serde_json::{Value, json};
use tokio::time::advance;
use tower::ServiceExt;

// =========================================================================
// Helpers
// =========================================================================

const CLIENT: &str = "http://localhost:5173";
const SVG_PREFIX: &str = "data:image/svg+xml;base64,";

fn app() -> Router {
    RollcallServer::builder()
        .client_url(CLIENT)
        .into_router(OpenAccess)
        .unwrap()
}

fn app_with<A: Authenticator>(auth: A) -> Router {
    RollcallServer::builder()
        .client_url(CLIENT)
        .into_router(auth)
        .unwrap()
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let res = app.clone().oneshot(req).await.unwrap();
    let status = res.status();
    let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn post(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn post_with_bearer(uri: &str, body: Value, token: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn start(app: &Router, class_id: i64) -> Value {
    let (status, body) = send(app, post("/api/qr/start", json!({ "classId": class_id }))).await;
    assert_eq!(status, StatusCode::OK, "start failed: {body}");
    body
}

async fn verify(app: &Router, session_id: &Value, token: &Value, student: &str) -> (StatusCode, Value) {
    send(
        app,
        post(
            "/api/qr/verify",
            json!({ "sessionId": session_id, "token": token, "studentId": student }),
        ),
    )
    .await
}

/// Everyone authenticates, nobody is a teacher.
struct StudentsOnly;

impl Authenticator for StudentsOnly {
    async fn authenticate(&self, _bearer: Option<&str>) -> Result<Identity, SessionError> {
        Ok(Identity {
            subject: "student-1".into(),
            role: Role::Student,
        })
    }
}

// =========================================================================
// Health and routing
// =========================================================================

#[tokio::test]
async fn test_health_reports_ok() {
    let (status, body) = send(&app(), get("/")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let (status, body) = send(&app(), get("/api/qr/nope")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({ "error": "Route not found" }));
}

#[tokio::test]
async fn test_cors_preflight_allows_client_origin() {
    let req = Request::builder()
        .method("OPTIONS")
        .uri("/api/qr/start")
        .header(header::ORIGIN, CLIENT)
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
        .body(Body::empty())
        .unwrap();
    let res = app().oneshot(req).await.unwrap();

    assert_eq!(
        res.headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .and_then(|v| v.to_str().ok()),
        Some(CLIENT)
    );
    assert_eq!(
        res.headers()
            .get(header::ACCESS_CONTROL_ALLOW_CREDENTIALS)
            .and_then(|v| v.to_str().ok()),
        Some("true")
    );
}

// =========================================================================
// POST /api/qr/start
// =========================================================================

#[tokio::test]
async fn test_start_returns_session_fields() {
    let app = app();
    let before = chrono::Utc::now().timestamp_millis();

    let body = start(&app, 7).await;

    assert!(body["sessionId"].as_str().is_some_and(|s| !s.is_empty()));
    assert_eq!(body["classId"], 7);
    assert_eq!(body["rotation"], 0);
    let token = body["currentToken"].as_str().unwrap();
    assert_eq!(token.len(), 32);
    assert!(body["qrPayload"].as_str().unwrap().starts_with(SVG_PREFIX));

    let expires_at = body["expiresAt"].as_i64().unwrap();
    let lifetime_ms = expires_at - before;
    assert!(
        (29_000..=31_000).contains(&lifetime_ms),
        "expiresAt is {lifetime_ms}ms out"
    );
}

#[tokio::test]
async fn test_start_rejects_missing_class_id() {
    let (status, body) = send(&app(), post("/api/qr/start", json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "INVALID_REQUEST");
}

#[tokio::test]
async fn test_start_rejects_non_positive_class_id() {
    for class_id in [0, -3] {
        let (status, body) =
            send(&app(), post("/api/qr/start", json!({ "classId": class_id }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "INVALID_REQUEST");
    }
}

#[tokio::test]
async fn test_start_rejects_non_json_body() {
    let req = Request::builder()
        .method("POST")
        .uri("/api/qr/start")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("classId=7"))
        .unwrap();
    let (status, body) = send(&app(), req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "INVALID_REQUEST");
}

#[tokio::test]
async fn test_start_supersedes_previous_session() {
    let app = app();
    let first = start(&app, 1).await;
    let second = start(&app, 2).await;

    let (_, active) = send(&app, get("/api/qr/active")).await;
    assert_eq!(active["sessionId"], second["sessionId"]);

    let (status, body) = verify(&app, &first["sessionId"], &first["currentToken"], "s1").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "SESSION_MISMATCH");
}

// =========================================================================
// GET /api/qr/active
// =========================================================================

#[tokio::test]
async fn test_active_is_null_without_session() {
    let (status, body) = send(&app(), get("/api/qr/active")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, Value::Null);
}

#[tokio::test]
async fn test_active_returns_started_session() {
    let app = app();
    let started = start(&app, 7).await;

    let (status, active) = send(&app, get("/api/qr/active")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(active, started);
}

// =========================================================================
// POST /api/qr/stop
// =========================================================================

#[tokio::test]
async fn test_stop_matching_session_clears_it() {
    let app = app();
    let started = start(&app, 7).await;

    let (status, body) = send(
        &app,
        post("/api/qr/stop", json!({ "sessionId": started["sessionId"] })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "success": true }));

    let (_, active) = send(&app, get("/api/qr/active")).await;
    assert_eq!(active, Value::Null);
}

#[tokio::test]
async fn test_stop_other_session_still_succeeds_and_keeps_active() {
    let app = app();
    let started = start(&app, 7).await;

    let (status, body) =
        send(&app, post("/api/qr/stop", json!({ "sessionId": "someone-else" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let (_, active) = send(&app, get("/api/qr/active")).await;
    assert_eq!(active["sessionId"], started["sessionId"]);
}

#[tokio::test]
async fn test_stop_rejects_empty_session_id() {
    let (status, body) = send(&app(), post("/api/qr/stop", json!({ "sessionId": "" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "INVALID_REQUEST");
}

// =========================================================================
// POST /api/qr/verify
// =========================================================================

#[tokio::test]
async fn test_verify_current_token_succeeds() {
    let app = app();
    let started = start(&app, 7).await;

    let (status, body) =
        verify(&app, &started["sessionId"], &started["currentToken"], "alice").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["studentId"], "alice");
    assert_eq!(body["sessionId"], started["sessionId"]);
    assert_eq!(body["classId"], 7);
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn test_verify_without_session_fails() {
    let (status, body) = verify(&app(), &json!("s-1"), &json!("t-1"), "alice").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "NO_ACTIVE_SESSION");
    assert!(body["message"].is_string());
}

#[tokio::test]
async fn test_verify_wrong_token_fails() {
    let app = app();
    let started = start(&app, 7).await;

    let (status, body) = verify(&app, &started["sessionId"], &json!("forged"), "alice").await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "TOKEN_MISMATCH");
}

#[tokio::test]
async fn test_verify_rejects_missing_fields() {
    let app = app();
    start(&app, 7).await;

    let (status, body) = send(
        &app,
        post("/api/qr/verify", json!({ "sessionId": "s", "token": "t" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "INVALID_REQUEST");

    let (status, body) = verify(&app, &json!("s"), &json!("t"), "  ").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "INVALID_REQUEST");
}

// =========================================================================
// Rotation and expiry over HTTP (paused clock)
// =========================================================================

#[tokio::test(start_paused = true)]
async fn test_rotation_and_expiry_flow() {
    let app = app();
    let started = start(&app, 7).await;
    let first_token = started["currentToken"].clone();

    advance(Duration::from_secs(5)).await;
    let (_, active) = send(&app, get("/api/qr/active")).await;
    assert_eq!(active["rotation"], 1);
    assert_eq!(active["expiresAt"], started["expiresAt"]);
    assert_ne!(active["currentToken"], first_token);
    assert_ne!(active["qrPayload"], started["qrPayload"]);

    let (status, body) = verify(&app, &started["sessionId"], &first_token, "s1").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "TOKEN_MISMATCH");

    let (status, _) = verify(&app, &started["sessionId"], &active["currentToken"], "s1").await;
    assert_eq!(status, StatusCode::OK);

    advance(Duration::from_secs(26)).await;
    let (_, active) = send(&app, get("/api/qr/active")).await;
    assert_eq!(active, Value::Null);

    let (_, body) = verify(&app, &started["sessionId"], &first_token, "s1").await;
    assert_eq!(body["error"], "NO_ACTIVE_SESSION");
}

#[tokio::test(start_paused = true)]
async fn test_custom_session_config_applies() {
    let app = RollcallServer::builder()
        .client_url(CLIENT)
        .session_config(SessionConfig {
            lifetime: Duration::from_secs(10),
            rotation_period: Duration::from_secs(2),
            ..SessionConfig::default()
        })
        .into_router(OpenAccess)
        .unwrap();
    start(&app, 7).await;

    advance(Duration::from_secs(4)).await;
    let (_, active) = send(&app, get("/api/qr/active")).await;
    assert_eq!(active["rotation"], 2);

    advance(Duration::from_secs(6)).await;
    let (_, active) = send(&app, get("/api/qr/active")).await;
    assert_eq!(active, Value::Null);
}

// =========================================================================
// Authentication
// =========================================================================

#[tokio::test]
async fn test_teacher_routes_require_bearer_token() {
    let app = app_with(StaticTokenAuthenticator::new("s3cret"));

    let (status, body) = send(&app, post("/api/qr/start", json!({ "classId": 7 }))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "UNAUTHORIZED");

    let (status, _) = send(
        &app,
        post_with_bearer("/api/qr/start", json!({ "classId": 7 }), "guess"),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send(
        &app,
        post_with_bearer("/api/qr/start", json!({ "classId": 7 }), "s3cret"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["classId"], 7);
}

#[tokio::test]
async fn test_stop_requires_bearer_token() {
    let app = app_with(StaticTokenAuthenticator::new("s3cret"));
    let (_, started) = send(
        &app,
        post_with_bearer("/api/qr/start", json!({ "classId": 7 }), "s3cret"),
    )
    .await;

    let (status, _) = send(
        &app,
        post("/api/qr/stop", json!({ "sessionId": started["sessionId"] })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (_, active) = send(&app, get("/api/qr/active")).await;
    assert_eq!(active["sessionId"], started["sessionId"]);
}

#[tokio::test]
async fn test_student_routes_need_no_token() {
    let app = app_with(StaticTokenAuthenticator::new("s3cret"));
    let (_, started) = send(
        &app,
        post_with_bearer("/api/qr/start", json!({ "classId": 7 }), "s3cret"),
    )
    .await;

    let (status, _) = send(&app, get("/api/qr/active")).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = verify(&app, &started["sessionId"], &started["currentToken"], "s1").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_non_teacher_is_forbidden() {
    let app = app_with(StudentsOnly);

    let (status, body) = send(&app, post("/api/qr/start", json!({ "classId": 7 }))).await;

    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "FORBIDDEN");
}

// =========================================================================
// Server builder
// =========================================================================

#[tokio::test]
async fn test_build_binds_ephemeral_port() {
    let server = RollcallServer::builder()
        .bind("127.0.0.1:0".parse().unwrap())
        .build(OpenAccess)
        .await
        .unwrap();

    assert_ne!(server.local_addr().unwrap().port(), 0);
}

#[tokio::test]
async fn test_run_until_returns_on_shutdown() {
    let server = RollcallServer::builder()
        .bind("127.0.0.1:0".parse().unwrap())
        .build(OpenAccess)
        .await
        .unwrap();

    let result = server.run_until(async {}).await;

    assert!(result.is_ok());
}

#[tokio::test]
async fn test_build_rejects_invalid_client_url() {
    let result = RollcallServer::builder()
        .client_url("http://bad\norigin")
        .into_router(OpenAccess);

    assert!(matches!(result, Err(RollcallError::Config(_))));
}
