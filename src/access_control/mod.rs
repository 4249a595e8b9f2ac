//! Access control module
//!
//! Role-based access control over REST paths, evaluated per resource class.
//!
//! ## Resolution Model
//!
//! A request is reduced to two keys before the permission table is consulted:
//!
//! 1. **Intent** - the HTTP method classified as create, read, update or delete
//! 2. **Canonical template** - the path with instance identifiers replaced by
//!    named placeholders, e.g. `/course/20/unit` becomes `/course/{course_id}/unit`
//!
//! The table maps role → template → granted intents. A missing role or template
//! is a denial. An unsupported method is an error, never an implicit grant.
//!
//! ## Example Configuration
//!
//! ```toml
//! [access_control]
//! base_path = "/api/v1/"
//!
//! [access_control.roles.admin]
//! "/course" = "crud"                  # collection and single courses
//! "/course/{course_id}/unit" = "cr"   # units of a course
//! "/unit" = "rud"                     # single units
//! ```

pub mod canonical;
pub mod method;
pub mod resolver;
pub mod table;
pub mod types;

pub use canonical::{CanonicalTemplate, addresses_instance, canonicalize};
pub use method::classify;
pub use resolver::{AccessDecision, AccessResolver, Decision, DenialReason};
pub use table::PermissionTable;
pub use types::{AccessIntent, IntentSet};
