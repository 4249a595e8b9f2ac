//! Error types for resguard
//!
//! This module defines the error hierarchy used throughout the crate.
//! We use `thiserror` for library-style errors that are part of the API,
//! and convert to HTTP status codes at the server boundary.

use crate::access_control::AccessIntent;
use thiserror::Error;

/// Top-level application error
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Access control error: {0}")]
    Access(#[from] AccessError),

    #[error("Server error: {0}")]
    Server(#[from] ServerError),
}

/// Configuration-related errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(String),

    #[error("Invalid configuration: {message}")]
    Invalid { message: String },

    #[error("Missing required configuration: {field}")]
    Missing { field: String },

    #[error("Invalid grant '{code}' for role '{role}' on '{template}': expected only c, r, u, d")]
    InvalidGrant {
        role: String,
        template: String,
        code: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors raised while resolving an access decision
///
/// A plain denial is not an error for [`decide`](crate::access_control::AccessResolver::decide);
/// only [`require`](crate::access_control::AccessResolver::require) turns it into
/// [`AccessError::Denied`].
#[derive(Error, Debug)]
pub enum AccessError {
    #[error("Unsupported HTTP method '{method}'")]
    UnsupportedMethod { method: String },

    #[error("Access denied: {0}")]
    Denied(#[from] AccessDeniedError),
}

impl AccessError {
    pub fn unsupported_method(method: impl Into<String>) -> Self {
        AccessError::UnsupportedMethod {
            method: method.into(),
        }
    }

    pub fn is_denied(&self) -> bool {
        matches!(self, AccessError::Denied(_))
    }
}

/// A negative access decision surfaced as an error
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("role '{role}' may not {intent} '{template}': {reason}")]
pub struct AccessDeniedError {
    pub role: String,
    pub template: String,
    pub intent: AccessIntent,
    pub reason: String,
}

impl AccessDeniedError {
    pub fn new(
        role: impl Into<String>,
        template: impl Into<String>,
        intent: AccessIntent,
        reason: impl Into<String>,
    ) -> Self {
        Self {
            role: role.into(),
            template: template.into(),
            intent,
            reason: reason.into(),
        }
    }

    pub fn empty_table(
        role: impl Into<String>,
        template: impl Into<String>,
        intent: AccessIntent,
    ) -> Self {
        Self::new(role, template, intent, "no permissions are configured")
    }

    pub fn unknown_role(
        role: impl Into<String>,
        template: impl Into<String>,
        intent: AccessIntent,
    ) -> Self {
        let role = role.into();
        let reason = format!("role '{}' has no grants", role);
        Self::new(role, template, intent, reason)
    }

    pub fn unmapped_resource(
        role: impl Into<String>,
        template: impl Into<String>,
        intent: AccessIntent,
    ) -> Self {
        let template = template.into();
        let reason = format!("no grant for resource '{}'", template);
        Self::new(role, template, intent, reason)
    }

    pub fn intent_not_granted(
        role: impl Into<String>,
        template: impl Into<String>,
        intent: AccessIntent,
    ) -> Self {
        Self::new(
            role,
            template,
            intent,
            format!("'{}' is not among the granted operations", intent.code()),
        )
    }

    pub fn collection_target(
        role: impl Into<String>,
        template: impl Into<String>,
        intent: AccessIntent,
    ) -> Self {
        Self::new(
            role,
            template,
            intent,
            format!("{} needs a resource id, the path names a collection", intent),
        )
    }
}

/// HTTP service errors
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for the application
pub type Result<T> = std::result::Result<T, AppError>;

/// Result type alias for access checks
pub type AccessResult<T> = std::result::Result<T, AccessError>;
