//! End-to-end tests of the HTTP surface against the in-memory directory

use adgate_api::{build_router, AppState, MetricsRecorder};
use adgate_auth::HmacAuth;
use adgate_core::config::DirectoryBackend;
use adgate_core::{AdgateConfig, Directory};
use adgate_directory::MemoryDirectory;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use chrono::Utc;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

const SECRET: &str = "gateway-test-secret";

fn config() -> AdgateConfig {
    let mut config = AdgateConfig::default();
    config.auth.secret = SECRET.to_string();
    config.directory.backend = DirectoryBackend::Memory;
    config
}

fn signer() -> HmacAuth {
    HmacAuth::from_config(&config().auth).unwrap()
}

fn app() -> (Router, Arc<MemoryDirectory>) {
    let directory = Arc::new(MemoryDirectory::default());
    let state = AppState::new(config(), directory.clone()).unwrap();
    (build_router(state), directory)
}

fn signed_at(timestamp_ms: i64, method: &str, uri: &str, body: Option<Value>) -> Request<Body> {
    let header = signer().sign(timestamp_ms, method, uri, body.as_ref());
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("authorization", header);

    match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

fn signed(method: &str, uri: &str, body: Option<Value>) -> Request<Body> {
    signed_at(Utc::now().timestamp_millis(), method, uri, body)
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

async fn create_user(app: &Router, name: &str, password: &str) {
    let (status, _) = send(
        app,
        signed(
            "POST",
            "/users",
            Some(json!({ "userName": name, "firstName": "Jane", "lastName": "Doe", "password": password })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_status_needs_no_signature() {
    let (app, _) = app();
    let request = Request::get("/status").body(Body::empty()).unwrap();
    let (status, body) = send(&app, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["online"], json!(true));
    assert!(body["uptime"].is_u64());
}

#[tokio::test]
async fn test_missing_signature_is_rejected() {
    let (app, _) = app();
    let request = Request::get("/users").body(Body::empty()).unwrap();
    let (status, body) = send(&app, request).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], json!("Invalid request"));
    assert_eq!(body["info"], json!("Signature header 'authorization' is missing"));
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let (app, _) = app();
    let request = Request::get("/nowhere").body(Body::empty()).unwrap();
    let (status, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unsigned_write_never_reaches_directory() {
    let (app, directory) = app();
    let request = Request::post("/users")
        .header("content-type", "application/json")
        .body(Body::from(r#"{"userName":"jdoe"}"#))
        .unwrap();
    let (status, _) = send(&app, request).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(!directory.user_exists("jdoe").await.unwrap());
}

#[tokio::test]
async fn test_signed_create_and_read_user() {
    let (app, directory) = app();
    create_user(&app, "jdoe", "Secret1!").await;
    assert!(directory.user_exists("jdoe").await.unwrap());

    let (status, body) = send(&app, signed("GET", "/users/jdoe?fields=sAMAccountName,cn", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["sAMAccountName"], json!("jdoe"));
    assert_eq!(body["cn"], json!("Jane Doe"));
    assert!(body.get("mail").is_none());

    let (status, body) = send(&app, signed("GET", "/users", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn test_duplicate_user_conflicts() {
    let (app, _) = app();
    create_user(&app, "jdoe", "Secret1!").await;

    let (status, body) = send(
        &app,
        signed("POST", "/users", Some(json!({ "userName": "jdoe" }))),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], json!(true));

    // same common name in the same container
    let (status, _) = send(
        &app,
        signed(
            "POST",
            "/users",
            Some(json!({ "userName": "jane.doe", "firstName": "Jane", "lastName": "Doe" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_tampered_body_is_rejected() {
    let (app, directory) = app();
    let header = signer().sign(
        Utc::now().timestamp_millis(),
        "POST",
        "/users",
        Some(&json!({ "userName": "jdoe" })),
    );
    let request = Request::post("/users")
        .header("authorization", header)
        .header("content-type", "application/json")
        .body(Body::from(r#"{"userName":"mallory"}"#))
        .unwrap();
    let (status, body) = send(&app, request).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["info"], json!("Signature does not match"));
    assert!(!directory.user_exists("mallory").await.unwrap());
}

#[tokio::test]
async fn test_stale_signature_is_rejected() {
    let (app, _) = app();
    let eleven_minutes_ago = Utc::now().timestamp_millis() - 11 * 60 * 1000;
    let (status, body) = send(&app, signed_at(eleven_minutes_ago, "GET", "/users", None)).await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], json!("Invalid request"));
}

#[tokio::test]
async fn test_exists_wraps_boolean() {
    let (app, _) = app();
    create_user(&app, "jdoe", "Secret1!").await;

    let (status, body) = send(&app, signed("GET", "/users/jdoe/exists", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "data": true }));

    let (status, body) = send(&app, signed("GET", "/users/nobody/exists", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "data": false }));
}

#[tokio::test]
async fn test_missing_user_is_not_found() {
    let (app, _) = app();
    let (status, body) = send(&app, signed("GET", "/users/nobody", None)).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], json!(true));
    assert_eq!(body["message"], json!("user 'nobody' does not exist"));
    assert!(body.get("success").is_none());
}

#[tokio::test]
async fn test_update_failure_reports_unsuccessful() {
    let (app, _) = app();
    let (status, body) = send(
        &app,
        signed("PUT", "/users/nobody", Some(json!({ "title": "CTO" }))),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["success"], json!(false));
    assert_eq!(body["error"], json!(true));

    let (status, body) = send(&app, signed("PUT", "/users/nobody/enable", None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body.get("success").is_none());
}

#[tokio::test]
async fn test_authenticate_and_account_state() {
    let (app, _) = app();
    create_user(&app, "jdoe", "Secret1!").await;

    let login = || signed("POST", "/users/jdoe/authenticate", Some(json!({ "pass": "Secret1!" })));

    let (status, body) = send(&app, login()).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "data": true }));

    let (_, body) = send(&app, signed("PUT", "/users/jdoe/disable", None)).await;
    assert_eq!(body, json!({ "success": true }));
    let (_, body) = send(&app, login()).await;
    assert_eq!(body, json!({ "data": false }));

    send(&app, signed("PUT", "/users/jdoe/enable", None)).await;
    let (_, body) = send(
        &app,
        signed("POST", "/users/jdoe/authenticate", Some(json!({ "password": "wrong" }))),
    )
    .await;
    assert_eq!(body, json!({ "data": false }));

    let (_, body) = send(&app, signed("PUT", "/users/jdoe/password", Some(json!({ "password": "Changed2!" })))).await;
    assert_eq!(body, json!({ "success": true }));
    let (_, body) = send(
        &app,
        signed("POST", "/users/jdoe/authenticate", Some(json!({ "pass": "Changed2!" }))),
    )
    .await;
    assert_eq!(body, json!({ "data": true }));
}

#[tokio::test]
async fn test_form_body_booleans_are_coerced() {
    let (app, directory) = app();
    let form = "userName=jdoe&password=Secret1%21&enabled=false&passwordExpires=false";
    let signed_body = json!({
        "userName": "jdoe",
        "password": "Secret1!",
        "enabled": "false",
        "passwordExpires": "false",
    });
    let header = signer().sign(Utc::now().timestamp_millis(), "POST", "/users", Some(&signed_body));
    let request = Request::post("/users")
        .header("authorization", header)
        .header("content-type", "application/x-www-form-urlencoded")
        .body(Body::from(form))
        .unwrap();
    let (status, body) = send(&app, request).await;

    assert_eq!(status, StatusCode::OK);
    // NORMAL_ACCOUNT | ACCOUNTDISABLE | DONT_EXPIRE_PASSWORD
    assert_eq!(body["userAccountControl"], json!("66050"));
    assert!(!directory.authenticate("jdoe", "Secret1!").await.unwrap());
}

#[tokio::test]
async fn test_invalid_body_is_bad_request() {
    let (app, _) = app();
    let (status, body) = send(
        &app,
        signed("POST", "/users", Some(json!({ "enabled": "maybe" }))),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], json!(true));
}

#[tokio::test]
async fn test_group_membership() {
    let (app, _) = app();
    create_user(&app, "jdoe", "Secret1!").await;
    let (status, _) = send(&app, signed("POST", "/group", Some(json!({ "name": "Ops" })))).await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = send(&app, signed("GET", "/users/jdoe/member-of/Ops", None)).await;
    assert_eq!(body, json!({ "data": false }));

    let (_, body) = send(&app, signed("POST", "/group/Ops/users/jdoe", None)).await;
    assert_eq!(body, json!({ "success": true }));
    // adding twice is harmless
    let (status, _) = send(&app, signed("POST", "/group/Ops/users/jdoe", None)).await;
    assert_eq!(status, StatusCode::OK);

    let (_, body) = send(&app, signed("GET", "/users/jdoe/member-of/Ops", None)).await;
    assert_eq!(body, json!({ "data": true }));

    let (_, body) = send(&app, signed("DELETE", "/group/Ops/users/jdoe", None)).await;
    assert_eq!(body, json!({ "success": true }));

    let (status, body) = send(&app, signed("POST", "/group/Nope/users/jdoe", None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body.get("success").is_none());
}

#[tokio::test]
async fn test_ous_and_move() {
    let (app, _) = app();
    create_user(&app, "jdoe", "Secret1!").await;

    let (status, body) = send(&app, signed("POST", "/ou", Some(json!({ "name": "Sales" })))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["dn"], json!("OU=Sales,DC=adgate,DC=local"));

    let (_, body) = send(&app, signed("GET", "/ou/Sales/exists", None)).await;
    assert_eq!(body, json!({ "data": true }));

    let (_, body) = send(&app, signed("PUT", "/users/jdoe/move", Some(json!({ "location": "Sales" })))).await;
    assert_eq!(body, json!({ "success": true }));

    let (_, body) = send(&app, signed("GET", "/users/jdoe", None)).await;
    assert_eq!(body["dn"], json!("CN=Jane Doe,OU=Sales,DC=adgate,DC=local"));

    let (status, _) = send(&app, signed("DELETE", "/ou/Sales", None)).await;
    assert_eq!(status, StatusCode::CONFLICT);

    send(&app, signed("DELETE", "/users/jdoe", None)).await;
    let (_, body) = send(&app, signed("DELETE", "/ou/Sales", None)).await;
    assert_eq!(body, json!({ "success": true }));
}

#[tokio::test]
async fn test_all_and_find() {
    let (app, _) = app();
    create_user(&app, "jdoe", "Secret1!").await;
    let (status, _) = send(
        &app,
        signed(
            "POST",
            "/users",
            Some(json!({ "userName": "asmith", "firstName": "Anna", "lastName": "Smith", "pass": "Secret1!", "password": "Secret1!" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    send(&app, signed("POST", "/group", Some(json!({ "name": "Ops" })))).await;

    let (status, body) = send(&app, signed("GET", "/all", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["users"].as_array().map(Vec::len), Some(2));
    assert_eq!(body["groups"].as_array().map(Vec::len), Some(1));
    assert_eq!(body["ous"], json!([]));
    assert_eq!(body["other"], json!([]));

    // a filter the in-memory directory cannot evaluate must not match everything
    let (status, _) = send(&app, signed("GET", "/find/(cn%3E=zzz)", None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = send(&app, signed("GET", "/find/(sAMAccountName=jdoe)", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().map(Vec::len), Some(1));
    assert_eq!(body[0]["sAMAccountName"], json!("jdoe"));

    let (status, _) = send(&app, signed("GET", "/find/%28%7C%28cn%3Da%29%28cn%3Db%29%29", None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_metrics_endpoint_when_enabled() {
    let directory = Arc::new(MemoryDirectory::default());
    let recorder = Arc::new(MetricsRecorder::install().unwrap());
    let state = AppState::new(config(), directory).unwrap().with_metrics(recorder);
    let app = build_router(state);

    send(&app, Request::get("/users").body(Body::empty()).unwrap()).await;

    let response = app
        .clone()
        .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.contains("adgate_auth_rejections_total"));
    assert!(text.contains("adgate_http_requests_total"));
}
