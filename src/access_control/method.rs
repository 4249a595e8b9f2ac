//! HTTP method classification
//!
//! Maps the conventional upper-case HTTP verbs onto access intents.

use crate::access_control::types::AccessIntent;
use crate::error::AccessError;

/// Classify an HTTP method into the intent it implies
///
/// Matching is case-sensitive. Verbs outside `POST`, `GET`, `PUT`, `PATCH`
/// and `DELETE` fail with [`AccessError::UnsupportedMethod`].
pub fn classify(method: &str) -> Result<AccessIntent, AccessError> {
    match method {
        "POST" => Ok(AccessIntent::Create),
        "GET" => Ok(AccessIntent::Read),
        "PUT" | "PATCH" => Ok(AccessIntent::Update),
        "DELETE" => Ok(AccessIntent::Delete),
        other => Err(AccessError::unsupported_method(other)),
    }
}
