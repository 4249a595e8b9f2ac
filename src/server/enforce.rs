//! Request enforcement
//!
//! Turns a resolver decision into an HTTP outcome. The role is read from a
//! header set by an upstream authenticator; this crate never authenticates.
//!
//! | Outcome | Status |
//! |---|---|
//! | no role header | 401 |
//! | unsupported method | 405 |
//! | denied | 403 |
//! | allowed | request proceeds |

use crate::access_control::Decision;
use crate::server::AppState;
use axum::{
    Json, Router,
    extract::{OriginalUri, Request, State},
    http::{HeaderMap, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::{debug, warn};

/// JSON error body returned on rejection
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

pub(crate) fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (
        status,
        Json(ErrorBody {
            error: message.into(),
        }),
    )
        .into_response()
}

/// Extract the role from the configured header
///
/// Missing, non-UTF-8 and blank values all count as "no role".
pub(crate) fn role_from_headers<'a>(
    state: &AppState,
    headers: &'a HeaderMap,
) -> Option<&'a str> {
    headers
        .get(&state.role_header)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|role| !role.is_empty())
}

/// Decide a request and record the outcome
///
/// Returns the allowing decision, or the rejection response to send.
pub(crate) fn authorize(
    state: &AppState,
    role: Option<&str>,
    method: &str,
    path: &str,
) -> Result<Decision, Response> {
    let Some(role) = role else {
        warn!(method, path, header = %state.role_header, "Request carried no role");
        state.metrics.record_error(None, method, "missing role");
        return Err(error_response(StatusCode::UNAUTHORIZED, "missing role"));
    };

    let decision = match state.resolver.evaluate(role, method, path) {
        Ok(decision) => decision,
        // `evaluate` fails only on an unsupported method
        Err(e) => {
            warn!(role, method, path, "Rejecting unsupported method");
            state.metrics.record_error(Some(role), method, &e.to_string());
            return Err(error_response(StatusCode::METHOD_NOT_ALLOWED, e.to_string()));
        }
    };

    state.metrics.record_decision(role, method, &decision);

    match decision.into_result(role) {
        Ok(decision) => {
            debug!(role, method, template = %decision.template, "Access granted");
            Ok(decision)
        }
        Err(denied) => {
            debug!(
                role,
                method,
                template = %denied.template,
                reason = %denied.reason,
                "Access denied"
            );
            Err(error_response(StatusCode::FORBIDDEN, denied.to_string()))
        }
    }
}

/// Middleware enforcing the permission table on every request
///
/// Use with [`axum::middleware::from_fn_with_state`], or via [`protect`].
/// On success the [`Decision`] is available to handlers as a request extension.
/// Under [`Router::nest`] the full original path is evaluated, not the
/// nested remainder.
pub async fn enforce_access(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let method = request.method().as_str().to_owned();
    let path = request
        .extensions()
        .get::<OriginalUri>()
        .map(|uri| uri.0.path())
        .unwrap_or_else(|| request.uri().path())
        .to_owned();

    let role = role_from_headers(&state, request.headers()).map(str::to_owned);

    match authorize(&state, role.as_deref(), &method, &path) {
        Ok(decision) => {
            request.extensions_mut().insert(decision);
            next.run(request).await
        }
        Err(response) => response,
    }
}

/// Wrap every route of `router` with [`enforce_access`]
pub fn protect<S>(router: Router<S>, state: AppState) -> Router<S>
where
    S: Clone + Send + Sync + 'static,
{
    router.layer(middleware::from_fn_with_state(state, enforce_access))
}
