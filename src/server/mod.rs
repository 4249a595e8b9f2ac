//! HTTP service
//!
//! Exposes the resolver over HTTP and provides the enforcement middleware for
//! embedding in other `axum` applications.

pub mod enforce;
pub mod routes;

pub use enforce::{ErrorBody, enforce_access, protect};
pub use routes::{
    CanonicalizeRequest, CanonicalizeResponse, CheckRequest, CheckResponse,
    FORWARDED_METHOD_HEADER, FORWARDED_URI_HEADER, router,
};

use crate::access_control::AccessResolver;
use crate::config::AppConfig;
use crate::error::{ConfigError, ServerError};
use crate::metrics::DecisionMetrics;
use axum::http::HeaderName;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

/// Shared state for handlers and the enforcement middleware
#[derive(Clone)]
pub struct AppState {
    pub resolver: Arc<AccessResolver>,
    pub metrics: Arc<DecisionMetrics>,
    pub role_header: HeaderName,
}

impl AppState {
    pub fn new(
        resolver: Arc<AccessResolver>,
        metrics: Arc<DecisionMetrics>,
        role_header: &str,
    ) -> Result<Self, ConfigError> {
        let role_header =
            HeaderName::from_bytes(role_header.as_bytes()).map_err(|e| ConfigError::Invalid {
                message: format!("invalid role header '{}': {}", role_header, e),
            })?;

        Ok(Self {
            resolver,
            metrics,
            role_header,
        })
    }

    /// Build state from loaded configuration
    pub fn from_config(config: &AppConfig) -> Result<Self, ConfigError> {
        let resolver = Arc::new(AccessResolver::from_config(&config.access_control)?);
        let metrics = Arc::new(DecisionMetrics::with_capacity(
            config.server.recent_decisions,
        ));
        Self::new(resolver, metrics, &config.server.role_header)
    }
}

/// Run the decision service until Ctrl+C
pub async fn run_server(state: AppState, bind: SocketAddr) -> Result<(), ServerError> {
    let listener = TcpListener::bind(bind)
        .await
        .map_err(|source| ServerError::Bind {
            addr: bind.to_string(),
            source,
        })?;

    info!(
        addr = %listener.local_addr()?,
        roles = state.resolver.table().roles().len(),
        base_path = state.resolver.base_path(),
        "Decision service listening"
    );

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Decision service stopped");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Received shutdown signal");
    }
}
