//! Configuration types for resguard
//!
//! This module defines the configuration structure that can be loaded from
//! TOML files and/or environment variables.

use serde::Deserialize;
use std::collections::HashMap;

/// Default base path stripped from request paths before canonicalization
pub const DEFAULT_BASE_PATH: &str = "/api/v1/";

/// Default port for the decision service
pub const DEFAULT_HTTP_PORT: u16 = 20390;

/// Default header carrying the authenticated role
pub const DEFAULT_ROLE_HEADER: &str = "x-role";

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// HTTP service settings
    pub server: ServerConfig,

    /// Permission table and path conventions
    pub access_control: AccessControlConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// HTTP service configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind host
    pub host: String,

    /// Bind port
    pub port: u16,

    /// Request header an upstream authenticator sets to the subject's role
    pub role_header: String,

    /// Size of the recent decisions ring kept for `/api/metrics`
    pub recent_decisions: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_HTTP_PORT,
            role_header: DEFAULT_ROLE_HEADER.to_string(),
            recent_decisions: 100,
        }
    }
}

/// Access control configuration
///
/// `roles` maps a role name to its grants. Each grant maps a canonical
/// template to a string of intent codes: `c`reate, `r`ead, `u`pdate, `d`elete.
///
/// ```toml
/// [access_control.roles.admin]
/// "/course" = "crud"
/// "/course/{course_id}/unit" = "cr"
/// ```
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AccessControlConfig {
    /// Prefix replaced by `/` before canonicalization
    pub base_path: String,

    /// Role → canonical template → intent codes
    #[serde(default)]
    pub roles: HashMap<String, HashMap<String, String>>,
}

impl Default for AccessControlConfig {
    fn default() -> Self {
        Self {
            base_path: DEFAULT_BASE_PATH.to_string(),
            roles: HashMap::new(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Output format (pretty, json)
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable output
    #[default]
    Pretty,
    /// JSON structured output
    Json,
}
