//! Access control resolver
//!
//! Answers "may this role perform this method on this path?" by combining
//! method classification, path canonicalization and a permission table lookup:
//!
//! 1. Classify the method (unsupported verbs are an error, not a denial)
//! 2. Canonicalize the path against the base path
//! 3. Deny if the table is empty, the role is unknown, or the template is unmapped
//! 4. Deny if the granted intent set lacks the classified intent
//! 5. Deny an update or delete whose path names a collection instead of one
//!    resource (`DELETE /course` is refused even where `/course` grants `d`)
//! 6. Otherwise allow

use crate::access_control::canonical::{CanonicalTemplate, addresses_instance, canonicalize};
use crate::access_control::method::classify;
use crate::access_control::table::PermissionTable;
use crate::access_control::types::AccessIntent;
use crate::config::AccessControlConfig;
use crate::error::{AccessDeniedError, AccessError, ConfigError};
use serde::Serialize;
use std::fmt;
use tracing::{debug, trace};

/// Access control resolver
///
/// Owns an immutable [`PermissionTable`]. Every check is a pure function of
/// its inputs, so a resolver can be shared behind an `Arc` and queried from
/// any number of threads without locking.
#[derive(Debug, Clone)]
pub struct AccessResolver {
    table: PermissionTable,
    base_path: String,
}

/// Why a check came out negative
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DenialReason {
    /// No role has any grant
    EmptyTable,
    /// The role has no entry in the table
    UnknownRole,
    /// The role has no grant for the canonical template
    UnmappedResource,
    /// The template is granted, but not for this intent
    IntentNotGranted,
    /// An update or delete was aimed at a collection rather than one resource
    CollectionTarget,
}

impl DenialReason {
    pub const fn as_str(&self) -> &'static str {
        match self {
            DenialReason::EmptyTable => "empty_table",
            DenialReason::UnknownRole => "unknown_role",
            DenialReason::UnmappedResource => "unmapped_resource",
            DenialReason::IntentNotGranted => "intent_not_granted",
            DenialReason::CollectionTarget => "collection_target",
        }
    }
}

impl fmt::Display for DenialReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Result of access check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessDecision {
    /// Access is allowed
    Allowed,
    /// Access is denied with a reason
    Denied(DenialReason),
}

impl AccessDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, AccessDecision::Allowed)
    }

    pub fn is_denied(&self) -> bool {
        matches!(self, AccessDecision::Denied(_))
    }
}

/// Outcome of a single check, with what was evaluated
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub outcome: AccessDecision,
    pub template: CanonicalTemplate,
    pub intent: AccessIntent,
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        self.outcome.is_allowed()
    }

    pub fn denial_reason(&self) -> Option<DenialReason> {
        match self.outcome {
            AccessDecision::Allowed => None,
            AccessDecision::Denied(reason) => Some(reason),
        }
    }

    /// Convert a denial into an error for `role`
    pub fn into_result(self, role: &str) -> Result<Self, AccessDeniedError> {
        let Some(reason) = self.denial_reason() else {
            return Ok(self);
        };

        let template = self.template.as_str();
        Err(match reason {
            DenialReason::EmptyTable => {
                AccessDeniedError::empty_table(role, template, self.intent)
            }
            DenialReason::UnknownRole => {
                AccessDeniedError::unknown_role(role, template, self.intent)
            }
            DenialReason::UnmappedResource => {
                AccessDeniedError::unmapped_resource(role, template, self.intent)
            }
            DenialReason::IntentNotGranted => {
                AccessDeniedError::intent_not_granted(role, template, self.intent)
            }
            DenialReason::CollectionTarget => {
                AccessDeniedError::collection_target(role, template, self.intent)
            }
        })
    }
}

impl AccessResolver {
    /// Create a resolver over an already built permission table
    pub fn new(table: PermissionTable, base_path: impl Into<String>) -> Self {
        Self {
            table,
            base_path: base_path.into(),
        }
    }

    /// Create a new resolver from configuration
    pub fn from_config(config: &AccessControlConfig) -> Result<Self, ConfigError> {
        let table = PermissionTable::from_grants(&config.roles)?;
        Ok(Self::new(table, config.base_path.clone()))
    }

    /// Create a resolver that denies everything
    pub fn deny_all() -> Self {
        Self::new(PermissionTable::new(), crate::config::DEFAULT_BASE_PATH)
    }

    pub fn table(&self) -> &PermissionTable {
        &self.table
    }

    pub fn base_path(&self) -> &str {
        &self.base_path
    }

    /// Canonicalize a path with this resolver's base path
    pub fn canonicalize(&self, path: &str) -> CanonicalTemplate {
        canonicalize(path, &self.base_path)
    }

    /// Evaluate a request, returning the full decision
    ///
    /// Only an unsupported method is an error. Every other negative outcome is
    /// an [`AccessDecision::Denied`]. Instance operations such as
    /// `DELETE /course/3` are authorized by the class grant (`/course`).
    /// An update or delete on the bare collection is always denied.
    pub fn evaluate(&self, role: &str, method: &str, path: &str) -> Result<Decision, AccessError> {
        let intent = classify(method)?;
        let template = self.canonicalize(path);
        let instance = addresses_instance(path, &self.base_path);

        debug!(
            role,
            method,
            path,
            template = %template,
            intent = %intent,
            instance,
            "Checking access"
        );

        let outcome = self.resolve(role, &template, intent, instance);
        Ok(Decision {
            outcome,
            template,
            intent,
        })
    }

    fn resolve(
        &self,
        role: &str,
        template: &CanonicalTemplate,
        intent: AccessIntent,
        instance: bool,
    ) -> AccessDecision {
        if self.table.is_empty() {
            trace!("Permission table is empty");
            return AccessDecision::Denied(DenialReason::EmptyTable);
        }

        if !self.table.has_role(role) {
            trace!(role, "Role not present in permission table");
            return AccessDecision::Denied(DenialReason::UnknownRole);
        }

        let Some(allowed) = self.table.grants(role, template.as_str()) else {
            trace!(role, template = %template, "No grant for template");
            return AccessDecision::Denied(DenialReason::UnmappedResource);
        };

        if !allowed.contains(intent) {
            trace!(granted = %allowed, "Intent not among granted operations");
            return AccessDecision::Denied(DenialReason::IntentNotGranted);
        }

        if intent.requires_instance() && !instance {
            trace!(intent = %intent, "Intent needs a resource id");
            return AccessDecision::Denied(DenialReason::CollectionTarget);
        }

        trace!(granted = %allowed, "Intent granted");
        AccessDecision::Allowed
    }

    /// Check if a role may perform `method` on `path`
    pub fn decide(&self, role: &str, method: &str, path: &str) -> Result<bool, AccessError> {
        self.evaluate(role, method, path).map(|d| d.is_allowed())
    }

    /// Check if a request is permitted, returning an error if denied
    pub fn require(&self, role: &str, method: &str, path: &str) -> Result<Decision, AccessError> {
        let decision = self.evaluate(role, method, path)?;
        decision.into_result(role).map_err(AccessError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access_control::types::IntentSet;

    const BASE: &str = "/api/v1/";

    fn admin_resolver() -> AccessResolver {
        let table = PermissionTable::new()
            .with_grant("admin", "/course", IntentSet::parse("crud").unwrap())
            .with_grant("admin", "/course/{course_id}/unit", IntentSet::parse("cr").unwrap())
            .with_grant("admin", "/unit", IntentSet::parse("rud").unwrap());
        AccessResolver::new(table, BASE)
    }

    #[test]
    fn test_deny_all() {
        let resolver = AccessResolver::deny_all();
        let decision = resolver.evaluate("admin", "GET", "/api/v1/course").unwrap();
        assert_eq!(
            decision.outcome,
            AccessDecision::Denied(DenialReason::EmptyTable)
        );
    }

    #[test]
    fn test_create_on_collection() {
        let resolver = admin_resolver();
        assert!(resolver.decide("admin", "POST", "/api/v1/course").unwrap());
    }

    #[test]
    fn test_delete_on_sub_collection_not_granted() {
        let resolver = admin_resolver();
        let decision = resolver
            .evaluate("admin", "DELETE", "/api/v1/course/4/unit")
            .unwrap();
        assert_eq!(decision.template, "/course/{course_id}/unit");
        assert_eq!(decision.intent, AccessIntent::Delete);
        assert_eq!(decision.denial_reason(), Some(DenialReason::IntentNotGranted));
    }

    #[test]
    fn test_instance_operations_use_class_grant() {
        let resolver = admin_resolver();
        assert!(resolver.decide("admin", "GET", "/api/v1/unit/7").unwrap());
        assert!(resolver.decide("admin", "PATCH", "/api/v1/unit/7").unwrap());
        assert!(resolver.decide("admin", "DELETE", "/api/v1/unit/7").unwrap());
        assert!(!resolver.decide("admin", "POST", "/api/v1/unit").unwrap());
    }

    #[test]
    fn test_unknown_role() {
        let resolver = admin_resolver();
        let decision = resolver.evaluate("guest", "GET", "/api/v1/unit/7").unwrap();
        assert_eq!(decision.denial_reason(), Some(DenialReason::UnknownRole));
    }

    #[test]
    fn test_unmapped_resource() {
        let resolver = admin_resolver();
        let decision = resolver.evaluate("admin", "GET", "/api/v1/lesson").unwrap();
        assert_eq!(decision.denial_reason(), Some(DenialReason::UnmappedResource));
    }

    #[test]
    fn test_unsupported_method_is_error() {
        let resolver = admin_resolver();
        let err = resolver.decide("admin", "TRACE", "/api/v1/course").unwrap_err();
        assert!(matches!(err, AccessError::UnsupportedMethod { .. }));
    }

    #[test]
    fn test_require() {
        let resolver = admin_resolver();

        let decision = resolver.require("admin", "GET", "/api/v1/course/1/unit").unwrap();
        assert!(decision.is_allowed());

        let err = resolver.require("admin", "DELETE", "/api/v1/course").unwrap_err();
        match err {
            AccessError::Denied(denied) => {
                assert_eq!(denied.role, "admin");
                assert_eq!(denied.template, "/course");
                assert_eq!(denied.intent, AccessIntent::Delete);
            }
            other => panic!("expected denial, got {other:?}"),
        }
    }

    #[test]
    fn test_update_and_delete_need_an_instance() {
        let resolver = admin_resolver();

        // `/course` grants `crud`, but the bare collection cannot be updated or deleted
        for method in ["PUT", "PATCH", "DELETE"] {
            let decision = resolver.evaluate("admin", method, "/api/v1/course").unwrap();
            assert_eq!(decision.template, "/course");
            assert_eq!(decision.denial_reason(), Some(DenialReason::CollectionTarget));
        }

        assert!(resolver.decide("admin", "DELETE", "/api/v1/course/3").unwrap());
        assert!(resolver.decide("admin", "PUT", "/api/v1/course/3").unwrap());
        assert!(resolver.decide("admin", "POST", "/api/v1/course").unwrap());
        assert!(resolver.decide("admin", "GET", "/api/v1/course").unwrap());
    }

    #[test]
    fn test_from_config() {
        let mut config = AccessControlConfig::default();
        config.roles.insert(
            "viewer".to_string(),
            [("/course".to_string(), "r".to_string())].into_iter().collect(),
        );
        let resolver = AccessResolver::from_config(&config).unwrap();

        assert_eq!(resolver.base_path(), "/api/v1/");
        assert!(resolver.decide("viewer", "GET", "/api/v1/course/3").unwrap());
        assert!(!resolver.decide("viewer", "PUT", "/api/v1/course/3").unwrap());
    }
}
