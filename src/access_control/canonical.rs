//! Path canonicalization
//!
//! Turns concrete REST paths into canonical resource templates using a purely
//! positional rule: odd segments name a resource class, even segments are
//! instance identifiers of the class before them.
//!
//! ```text
//! /api/v1/course/20/unit    ->  /course/{course_id}/unit
//! /api/v1/course/10/unit/5  ->  /course/{course_id}/unit
//! /api/v1/unit/7            ->  /unit
//! ```
//!
//! A template with an even number of segments would end in a placeholder for
//! one instance of the last class. Instance operations are authorized at the
//! class level, so that trailing placeholder is dropped. Whether the path named
//! an instance at all is reported separately by [`addresses_instance`].

use serde::Serialize;
use std::borrow::Borrow;
use std::fmt;

/// Canonical resource template, e.g. `/course/{course_id}/unit`
///
/// Only ever used as a lookup key into the permission table.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct CanonicalTemplate(String);

impl CanonicalTemplate {
    /// Wrap a template string as configured in a permission table
    pub fn from_configured(template: impl Into<String>) -> Self {
        Self(template.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    /// Number of `/`-separated segments
    pub fn segment_count(&self) -> usize {
        self.0.split('/').filter(|s| !s.is_empty()).count()
    }
}

impl Borrow<str> for CanonicalTemplate {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for CanonicalTemplate {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CanonicalTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl PartialEq<str> for CanonicalTemplate {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for CanonicalTemplate {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Canonicalize a concrete request path
///
/// The first occurrence of `base_path` (e.g. `/api/v1/`) is replaced by `/`.
/// A missing prefix is not an error, the path is then used as is. An empty
/// `base_path` disables stripping. Anything from the first `?` or `#` on is
/// ignored.
pub fn canonicalize(path: &str, base_path: &str) -> CanonicalTemplate {
    let stripped = strip(path, base_path);

    let mut output: Vec<String> = Vec::new();
    let mut pending: Option<String> = None;

    for (index, segment) in stripped.split('/').filter(|s| !s.is_empty()).enumerate() {
        let position = index + 1;

        if position % 2 == 1 {
            if pending.is_none() {
                pending = Some(segment.to_lowercase());
            }
            output.push(segment.to_string());
        } else {
            match pending.take() {
                Some(name) => output.push(format!("{{{}_id}}", name)),
                // Unreachable with a strict alternation; keep the raw segment
                None => output.push(segment.to_string()),
            }
        }
    }

    if output.len() % 2 == 0 {
        output.pop();
    }

    CanonicalTemplate(format!("/{}", output.join("/")))
}

/// Whether `path` ends on one identified resource rather than a collection
///
/// True when the path has an even, non-zero number of segments after the
/// base path is stripped, i.e. the last segment is an instance identifier.
/// `/api/v1/unit/7` addresses an instance, `/api/v1/course/20/unit` does not.
pub fn addresses_instance(path: &str, base_path: &str) -> bool {
    let count = strip(path, base_path)
        .split('/')
        .filter(|s| !s.is_empty())
        .count();
    count > 0 && count % 2 == 0
}

/// Cut query and fragment, then replace the first `base_path` with `/`
fn strip(path: &str, base_path: &str) -> String {
    let path = path.split(['?', '#']).next().unwrap_or_default();

    if base_path.is_empty() {
        path.to_string()
    } else {
        path.replacen(base_path, "/", 1)
    }
}
