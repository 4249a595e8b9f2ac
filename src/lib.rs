//! resguard
//!
//! Role-based access control for REST APIs, decided per resource class.
//!
//! ## Features
//!
//! - **Canonical templates** - concrete paths such as `/course/20/unit` collapse to
//!   `/course/{course_id}/unit` by a positional odd/even rule
//! - **Intent sets** - HTTP verbs map to create/read/update/delete, granted per
//!   role and template as a bitmask
//! - **Fail closed** - unknown roles and unmapped resources are denied, unsupported
//!   methods are errors
//! - **HTTP glue** - `axum` middleware, a decision endpoint and a forward-auth
//!   endpoint for reverse proxies
//!
//! ## Example
//!
//! ```
//! use resguard::access_control::{AccessResolver, IntentSet, PermissionTable};
//!
//! let table = PermissionTable::new()
//!     .with_grant("admin", "/course", IntentSet::parse("crud").unwrap())
//!     .with_grant("admin", "/course/{course_id}/unit", IntentSet::parse("cr").unwrap());
//! let resolver = AccessResolver::new(table, "/api/v1/");
//!
//! assert!(resolver.decide("admin", "POST", "/api/v1/course/20/unit").unwrap());
//! assert!(!resolver.decide("admin", "DELETE", "/api/v1/course/20/unit").unwrap());
//! assert!(!resolver.decide("guest", "GET", "/api/v1/course").unwrap());
//! assert!(resolver.decide("admin", "TRACE", "/api/v1/course").is_err());
//! ```

pub mod access_control;
pub mod config;
pub mod error;
pub mod metrics;
pub mod server;

// Re-export main types
pub use access_control::{AccessResolver, Decision, PermissionTable};
pub use config::{AppConfig, load_config};
pub use error::{AccessError, AppError, Result};
pub use metrics::DecisionMetrics;
