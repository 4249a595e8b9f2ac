//! Decision service routes
//!
//! JSON endpoints for querying the resolver, a forward-auth endpoint for
//! reverse proxies, metrics and health.

use crate::access_control::{AccessIntent, CanonicalTemplate, DenialReason};
use crate::metrics::MetricsSnapshot;
use crate::server::AppState;
use crate::server::enforce::{authorize, error_response, role_from_headers};
use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

/// Header carrying the original request method in forward-auth mode
pub const FORWARDED_METHOD_HEADER: &str = "x-forwarded-method";

/// Header carrying the original request URI in forward-auth mode
pub const FORWARDED_URI_HEADER: &str = "x-forwarded-uri";

#[derive(Debug, Deserialize)]
pub struct CheckRequest {
    pub role: String,
    pub method: String,
    pub path: String,
}

#[derive(Debug, Serialize)]
pub struct CheckResponse {
    pub allowed: bool,
    pub template: CanonicalTemplate,
    pub intent: AccessIntent,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<DenialReason>,
}

#[derive(Debug, Deserialize)]
pub struct CanonicalizeRequest {
    pub path: String,
}

#[derive(Debug, Serialize)]
pub struct CanonicalizeResponse {
    pub template: CanonicalTemplate,
}

/// Build the decision service router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/v1/check", post(handle_check))
        .route("/v1/canonicalize", post(handle_canonicalize))
        .route("/v1/authorize", get(handle_forward_auth))
        .route("/api/metrics", get(api_metrics))
        .route("/healthz", get(health))
        .layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
        .with_state(state)
}

/// Evaluate an explicit `{role, method, path}` triple
///
/// A denial is a successful query (`200` with `allowed: false`). An
/// unsupported method in the body is a bad request.
async fn handle_check(State(state): State<AppState>, Json(req): Json<CheckRequest>) -> Response {
    match state.resolver.evaluate(&req.role, &req.method, &req.path) {
        Ok(decision) => {
            state
                .metrics
                .record_decision(&req.role, &req.method, &decision);
            Json(CheckResponse {
                allowed: decision.is_allowed(),
                reason: decision.denial_reason(),
                template: decision.template,
                intent: decision.intent,
            })
            .into_response()
        }
        // `evaluate` fails only on an unsupported method
        Err(e) => {
            state
                .metrics
                .record_error(Some(&req.role), &req.method, &e.to_string());
            error_response(StatusCode::BAD_REQUEST, e.to_string())
        }
    }
}

async fn handle_canonicalize(
    State(state): State<AppState>,
    Json(req): Json<CanonicalizeRequest>,
) -> Json<CanonicalizeResponse> {
    Json(CanonicalizeResponse {
        template: state.resolver.canonicalize(&req.path),
    })
}

/// Forward-auth endpoint for reverse proxies
///
/// The proxy passes the original method and URI in `X-Forwarded-Method` and
/// `X-Forwarded-Uri` along with the role header. Answers `204` to let the
/// request through, otherwise the same rejection statuses as the middleware.
async fn handle_forward_auth(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let forwarded = |name: &str| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned)
    };

    let (Some(method), Some(uri)) = (
        forwarded(FORWARDED_METHOD_HEADER),
        forwarded(FORWARDED_URI_HEADER),
    ) else {
        return error_response(
            StatusCode::BAD_REQUEST,
            "missing X-Forwarded-Method or X-Forwarded-Uri",
        );
    };

    let role = role_from_headers(&state, &headers);
    match authorize(&state, role, &method, &uri) {
        Ok(_) => StatusCode::NO_CONTENT.into_response(),
        Err(response) => response,
    }
}

async fn api_metrics(State(state): State<AppState>) -> Json<MetricsSnapshot> {
    Json(state.metrics.snapshot())
}

async fn health() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}
