//! Configuration loader with layered sources
//!
//! Loads configuration from multiple sources with the following precedence
//! (highest to lowest):
//! 1. Environment variables (RESGUARD__*)
//! 2. Configuration file (TOML)
//! 3. Default values

use crate::access_control::PermissionTable;
use crate::config::types::AppConfig;
use crate::error::ConfigError;
use config::{Config, Environment, File, FileFormat};
use std::path::Path;

/// Default configuration file paths to check (in order)
const DEFAULT_CONFIG_PATHS: &[&str] = &[
    "resguard.toml",
    ".resguard.toml",
    "~/.config/resguard/config.toml",
    "/etc/resguard/config.toml",
];

/// Load configuration from a TOML string (useful for testing)
pub fn load_config_from_str(toml_str: &str) -> Result<AppConfig, ConfigError> {
    let config = Config::builder()
        .add_source(File::from_str(toml_str, FileFormat::Toml))
        .build()
        .map_err(|e| ConfigError::Load(e.to_string()))?;

    let app_config: AppConfig = config
        .try_deserialize()
        .map_err(|e| ConfigError::Load(e.to_string()))?;

    validate_config(&app_config)?;

    Ok(app_config)
}

/// Load configuration from files and environment
pub fn load_config(config_path: Option<&str>) -> Result<AppConfig, ConfigError> {
    let mut builder = Config::builder();

    // 1. Start with defaults (handled by serde defaults on AppConfig)

    // 2. Add configuration file
    if let Some(path) = config_path {
        // Explicit path provided - must exist
        if !Path::new(path).exists() {
            return Err(ConfigError::Load(format!(
                "Configuration file not found: {}",
                path
            )));
        }
        builder = builder.add_source(File::new(path, FileFormat::Toml));
    } else {
        // Try default paths (first existing one wins)
        for path in DEFAULT_CONFIG_PATHS {
            let expanded = shellexpand::tilde(path);
            if Path::new(expanded.as_ref()).exists() {
                builder = builder.add_source(File::new(&expanded, FileFormat::Toml));
                break;
            }
        }
    }

    // 3. Add environment variables with RESGUARD prefix
    // e.g., RESGUARD__SERVER__PORT, RESGUARD__LOGGING__FORMAT
    // Double underscore (__) maps to nested keys (server.port)
    builder = builder.add_source(
        Environment::with_prefix("RESGUARD")
            .separator("__")
            .try_parsing(true),
    );

    // 4. Base path shortcut, mirrors the common deployment convention
    if let Ok(base_path) = std::env::var("RESGUARD_BASE_PATH") {
        builder = builder
            .set_override("access_control.base_path", base_path)
            .map_err(|e| ConfigError::Load(e.to_string()))?;
    }

    // Build and deserialize
    let config = builder
        .build()
        .map_err(|e| ConfigError::Load(e.to_string()))?;

    let app_config: AppConfig = config
        .try_deserialize()
        .map_err(|e| ConfigError::Load(e.to_string()))?;

    // Validate the configuration
    validate_config(&app_config)?;

    Ok(app_config)
}

/// Validate configuration values
fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    // Validate port
    if config.server.port == 0 {
        return Err(ConfigError::Invalid {
            message: "server.port must be greater than 0".to_string(),
        });
    }

    // Validate role header
    if config.server.role_header.is_empty() {
        return Err(ConfigError::Missing {
            field: "server.role_header".to_string(),
        });
    }

    if axum::http::HeaderName::from_bytes(config.server.role_header.as_bytes()).is_err() {
        return Err(ConfigError::Invalid {
            message: format!(
                "server.role_header is not a valid header name: {}",
                config.server.role_header
            ),
        });
    }

    // Validate base path
    let base_path = &config.access_control.base_path;
    if !base_path.is_empty() && !base_path.starts_with('/') {
        return Err(ConfigError::Invalid {
            message: format!(
                "access_control.base_path must be empty or start with '/', got: {}",
                base_path
            ),
        });
    }

    validate_grants(config)?;

    Ok(())
}

/// Validate that every grant is a well-formed template and intent code string
fn validate_grants(config: &AppConfig) -> Result<(), ConfigError> {
    for (role, grants) in &config.access_control.roles {
        for (template, codes) in grants {
            PermissionTable::parse_grant(role, template, codes)?;
        }
    }
    Ok(())
}
