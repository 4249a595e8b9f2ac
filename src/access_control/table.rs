//! Permission table
//!
//! Immutable role → canonical template → intent set mapping, built once at
//! startup and read concurrently afterwards.

use crate::access_control::canonical::{CanonicalTemplate, canonicalize};
use crate::access_control::types::IntentSet;
use crate::error::ConfigError;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Grants for a single role
type RoleGrants = HashMap<CanonicalTemplate, IntentSet>;

/// Role → canonical template → granted intents
#[derive(Debug, Clone, Default)]
pub struct PermissionTable {
    roles: HashMap<String, RoleGrants>,
}

impl PermissionTable {
    /// Create an empty table (denies everything)
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a table from configured grant strings
    ///
    /// Grant strings use the codes `c`, `r`, `u`, `d` in any order. Any other
    /// character is rejected. Templates must start with `/`.
    pub fn from_grants(
        roles: &HashMap<String, HashMap<String, String>>,
    ) -> Result<Self, ConfigError> {
        let mut table = Self::new();

        for (role, grants) in roles {
            // A role listed without templates is known but granted nothing
            table.roles.entry(role.clone()).or_default();

            for (template, codes) in grants {
                let intents = Self::parse_grant(role, template, codes)?;
                table = table.with_grant(role.as_str(), template.as_str(), intents);
            }
        }

        for template in table.unreachable_templates() {
            warn!(
                template = %template,
                "Configured template can never match a canonicalized path"
            );
        }

        debug!(
            roles = table.roles.len(),
            grants = table.grant_count(),
            "Built permission table"
        );

        Ok(table)
    }

    /// Validate one configured grant and parse its intent codes
    pub fn parse_grant(role: &str, template: &str, codes: &str) -> Result<IntentSet, ConfigError> {
        if !template.starts_with('/') {
            return Err(ConfigError::Invalid {
                message: format!(
                    "access_control.roles.{}: template '{}' must start with '/'",
                    role, template
                ),
            });
        }

        IntentSet::parse(codes).map_err(|_| ConfigError::InvalidGrant {
            role: role.to_string(),
            template: template.to_string(),
            code: codes.to_string(),
        })
    }

    /// Add or replace the grant for `(role, template)`
    ///
    /// Builder-style, for assembling a table before it is handed to a resolver.
    pub fn with_grant(
        mut self,
        role: impl Into<String>,
        template: impl Into<String>,
        intents: IntentSet,
    ) -> Self {
        self.roles
            .entry(role.into())
            .or_default()
            .insert(CanonicalTemplate::from_configured(template), intents);
        self
    }

    /// Look up the intents granted to `role` on `template`
    pub fn grants(&self, role: &str, template: &str) -> Option<IntentSet> {
        self.roles.get(role)?.get(template).copied()
    }

    /// Check whether the role appears in the table at all
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains_key(role)
    }

    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }

    /// Role names, sorted
    pub fn roles(&self) -> Vec<&str> {
        let mut roles: Vec<&str> = self.roles.keys().map(String::as_str).collect();
        roles.sort_unstable();
        roles
    }

    /// Templates configured for a role, sorted
    pub fn templates(&self, role: &str) -> Vec<(&CanonicalTemplate, IntentSet)> {
        let mut templates: Vec<_> = self
            .roles
            .get(role)
            .map(|grants| grants.iter().map(|(t, i)| (t, *i)).collect())
            .unwrap_or_default();
        templates.sort_unstable_by(|a, b| a.0.cmp(b.0));
        templates
    }

    /// Total number of `(role, template)` grants
    pub fn grant_count(&self) -> usize {
        self.roles.values().map(HashMap::len).sum()
    }

    /// Templates that no concrete path canonicalizes to
    ///
    /// A template is reachable only if canonicalizing it (without a base path)
    /// yields itself. `/unit/{unit_id}` is the typical offender: the trailing
    /// placeholder is always dropped, so requests land on `/unit`.
    pub fn unreachable_templates(&self) -> Vec<&CanonicalTemplate> {
        let mut unreachable: Vec<&CanonicalTemplate> = self
            .roles
            .values()
            .flat_map(HashMap::keys)
            .filter(|template| canonicalize(template.as_str(), "") != *template.as_str())
            .collect();
        unreachable.sort_unstable();
        unreachable.dedup();
        unreachable
    }
}
