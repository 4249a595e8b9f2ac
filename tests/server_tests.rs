//! HTTP service and enforcement middleware tests

use axum::{
    Extension, Router,
    body::Body,
    http::{Request, StatusCode},
    routing::get,
};
use resguard::access_control::{AccessResolver, Decision, IntentSet, PermissionTable};
use resguard::metrics::DecisionMetrics;
use resguard::server::{AppState, protect, router};
use serde_json::{Value, json};
use std::sync::Arc;
use tower::ServiceExt;

fn test_state() -> AppState {
    let table = PermissionTable::new()
        .with_grant("admin", "/course", IntentSet::parse("crud").unwrap())
        .with_grant(
            "admin",
            "/course/{course_id}/unit",
            IntentSet::parse("cr").unwrap(),
        )
        .with_grant("admin", "/unit", IntentSet::parse("rud").unwrap());

    AppState::new(
        Arc::new(AccessResolver::new(table, "/api/v1/")),
        Arc::new(DecisionMetrics::new()),
        "x-role",
    )
    .unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

fn check_request(body: Value) -> Request<Body> {
    Request::builder()
        .uri("/v1/check")
        .method("POST")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Application routes guarded by the middleware
fn protected_app(state: AppState) -> Router {
    let routes = Router::new()
        .route(
            "/api/v1/course",
            get(|| async { "courses" }).post(|| async { "created" }),
        )
        .route(
            "/api/v1/course/{id}",
            get(|Extension(decision): Extension<Decision>| async move {
                decision.template.to_string()
            })
            .delete(|| async { "deleted" }),
        )
        .route("/api/v1/course/{id}/unit", get(|| async { "units" }));

    protect(routes, state)
}

// =============================================================================
// Decision endpoint
// =============================================================================

#[tokio::test]
async fn test_check_allowed() {
    let app = router(test_state());
    let response = app
        .oneshot(check_request(json!({
            "role": "admin",
            "method": "POST",
            "path": "/api/v1/course"
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["allowed"], true);
    assert_eq!(body["template"], "/course");
    assert_eq!(body["intent"], "create");
    assert!(body.get("reason").is_none());
}

#[tokio::test]
async fn test_check_denied_is_ok_response() {
    let app = router(test_state());
    let response = app
        .oneshot(check_request(json!({
            "role": "admin",
            "method": "DELETE",
            "path": "/api/v1/course/20/unit"
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["allowed"], false);
    assert_eq!(body["template"], "/course/{course_id}/unit");
    assert_eq!(body["reason"], "intent_not_granted");
}

#[tokio::test]
async fn test_check_delete_on_collection_denied() {
    let app = router(test_state());
    let response = app
        .oneshot(check_request(json!({
            "role": "admin",
            "method": "DELETE",
            "path": "/api/v1/course"
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["allowed"], false);
    assert_eq!(body["template"], "/course");
    assert_eq!(body["reason"], "collection_target");
}

#[tokio::test]
async fn test_check_unknown_role() {
    let app = router(test_state());
    let response = app
        .oneshot(check_request(json!({
            "role": "guest",
            "method": "GET",
            "path": "/api/v1/unit/7"
        })))
        .await
        .unwrap();

    let body = body_json(response).await;
    assert_eq!(body["allowed"], false);
    assert_eq!(body["reason"], "unknown_role");
}

#[tokio::test]
async fn test_check_unsupported_method() {
    let app = router(test_state());
    let response = app
        .oneshot(check_request(json!({
            "role": "admin",
            "method": "TRACE",
            "path": "/api/v1/course"
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert!(body["error"].as_str().unwrap().contains("TRACE"));
}

#[tokio::test]
async fn test_canonicalize_endpoint() {
    let app = router(test_state());
    let request = Request::builder()
        .uri("/v1/canonicalize")
        .method("POST")
        .header("content-type", "application/json")
        .body(Body::from(json!({"path": "/api/v1/course/10/unit/5"}).to_string()))
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["template"], "/course/{course_id}/unit");
}

#[tokio::test]
async fn test_health() {
    let app = router(test_state());
    let request = Request::builder()
        .uri("/healthz")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

// =============================================================================
// Forward auth
// =============================================================================

fn forward_auth(role: Option<&str>, method: &str, uri: &str) -> Request<Body> {
    let mut builder = Request::builder()
        .uri("/v1/authorize")
        .header("x-forwarded-method", method)
        .header("x-forwarded-uri", uri);
    if let Some(role) = role {
        builder = builder.header("x-role", role);
    }
    builder.body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_forward_auth_outcomes() {
    let cases = [
        (Some("admin"), "GET", "/api/v1/unit/7?expand=true", StatusCode::NO_CONTENT),
        (Some("admin"), "POST", "/api/v1/unit", StatusCode::FORBIDDEN),
        (Some("guest"), "GET", "/api/v1/course", StatusCode::FORBIDDEN),
        (None, "GET", "/api/v1/course", StatusCode::UNAUTHORIZED),
        (Some("admin"), "OPTIONS", "/api/v1/course", StatusCode::METHOD_NOT_ALLOWED),
    ];

    let app = router(test_state());
    for (role, method, uri, expected) in cases {
        let response = app
            .clone()
            .oneshot(forward_auth(role, method, uri))
            .await
            .unwrap();
        assert_eq!(response.status(), expected, "{:?} {} {}", role, method, uri);
    }
}

#[tokio::test]
async fn test_forward_auth_missing_headers() {
    let app = router(test_state());
    let request = Request::builder()
        .uri("/v1/authorize")
        .header("x-role", "admin")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// =============================================================================
// Enforcement middleware
// =============================================================================

#[tokio::test]
async fn test_middleware_allows_granted_request() {
    let app = protected_app(test_state());
    let request = Request::builder()
        .uri("/api/v1/course")
        .method("POST")
        .header("x-role", "admin")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_middleware_exposes_decision_to_handler() {
    let app = protected_app(test_state());
    let request = Request::builder()
        .uri("/api/v1/course/42")
        .header("x-role", "admin")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&body[..], b"/course");
}

#[tokio::test]
async fn test_middleware_rejects_missing_role() {
    let app = protected_app(test_state());
    let request = Request::builder()
        .uri("/api/v1/course")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_middleware_rejects_blank_role() {
    let app = protected_app(test_state());
    let request = Request::builder()
        .uri("/api/v1/course")
        .header("x-role", "   ")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_middleware_forbids_denied_request() {
    let app = protected_app(test_state());
    let request = Request::builder()
        .uri("/api/v1/course/3/unit")
        .method("GET")
        .header("x-role", "viewer")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = body_json(response).await;
    assert!(body["error"].as_str().unwrap().contains("viewer"));
}

#[tokio::test]
async fn test_middleware_rejects_unsupported_method() {
    let app = protected_app(test_state());
    let request = Request::builder()
        .uri("/api/v1/course")
        .method("HEAD")
        .header("x-role", "admin")
        .body(Body::empty())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}

#[tokio::test]
async fn test_middleware_evaluates_full_path_when_nested() {
    let state = test_state();
    let inner = protect(
        Router::new().route("/unit/{id}", get(|| async { "unit" }).post(|| async { "x" })),
        state,
    );
    let app = Router::new().nest("/api/v1", inner);

    let request = Request::builder()
        .uri("/api/v1/unit/7")
        .header("x-role", "admin")
        .body(Body::empty())
        .unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let request = Request::builder()
        .uri("/api/v1/unit/7")
        .method("POST")
        .header("x-role", "admin")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

// =============================================================================
// Metrics
// =============================================================================

#[tokio::test]
async fn test_metrics_record_every_outcome() {
    let state = test_state();
    let metrics = state.metrics.clone();
    let app = router(state);

    for (role, method, uri) in [
        (Some("admin"), "GET", "/api/v1/course"),
        (Some("admin"), "POST", "/api/v1/unit"),
        (None, "GET", "/api/v1/course"),
    ] {
        app.clone()
            .oneshot(forward_auth(role, method, uri))
            .await
            .unwrap();
    }

    assert_eq!(metrics.total_checks(), 3);
    assert_eq!(metrics.total_allowed(), 1);
    assert_eq!(metrics.total_denied(), 1);
    assert_eq!(metrics.total_errors(), 1);

    let request = Request::builder()
        .uri("/api/metrics")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["total_checks"], 3);
    assert_eq!(body["recent"].as_array().unwrap().len(), 3);
    assert_eq!(body["denial_reasons"][0]["reason"], "intent_not_granted");
}

#[tokio::test]
async fn test_unsupported_method_counted_as_error_on_every_surface() {
    let state = test_state();
    let metrics = state.metrics.clone();

    let response = router(state.clone())
        .oneshot(check_request(json!({
            "role": "admin",
            "method": "CONNECT",
            "path": "/api/v1/course"
        })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert!(body["error"].as_str().unwrap().contains("CONNECT"));

    let request = Request::builder()
        .uri("/api/v1/course")
        .method("HEAD")
        .header("x-role", "admin")
        .body(Body::empty())
        .unwrap();
    let response = protected_app(state).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    let body = body_json(response).await;
    assert!(body["error"].as_str().unwrap().contains("HEAD"));

    assert_eq!(metrics.total_errors(), 2);
    assert_eq!(metrics.total_denied(), 0);
}

#[test]
fn test_invalid_role_header_rejected() {
    let result = AppState::new(
        Arc::new(AccessResolver::deny_all()),
        Arc::new(DecisionMetrics::new()),
        "bad header",
    );
    assert!(result.is_err());
}
