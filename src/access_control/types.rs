//! Access control types
//!
//! Core value types used by the access control system.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The operation a request intends to perform on a resource class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessIntent {
    Create,
    Read,
    Update,
    Delete,
}

impl AccessIntent {
    /// Get the intent name as a string
    pub const fn as_str(&self) -> &'static str {
        match self {
            AccessIntent::Create => "create",
            AccessIntent::Read => "read",
            AccessIntent::Update => "update",
            AccessIntent::Delete => "delete",
        }
    }

    /// One-letter grant code used in permission tables
    pub const fn code(&self) -> char {
        match self {
            AccessIntent::Create => 'c',
            AccessIntent::Read => 'r',
            AccessIntent::Update => 'u',
            AccessIntent::Delete => 'd',
        }
    }

    /// Parse a grant code
    pub const fn from_code(code: char) -> Option<Self> {
        match code {
            'c' => Some(AccessIntent::Create),
            'r' => Some(AccessIntent::Read),
            'u' => Some(AccessIntent::Update),
            'd' => Some(AccessIntent::Delete),
            _ => None,
        }
    }

    /// Get all intents in `crud` order
    pub fn all() -> &'static [AccessIntent] {
        &[
            AccessIntent::Create,
            AccessIntent::Read,
            AccessIntent::Update,
            AccessIntent::Delete,
        ]
    }

    /// Check if this intent leaves the resource untouched
    pub const fn is_read_only(&self) -> bool {
        matches!(self, AccessIntent::Read)
    }

    /// Check if this intent acts on one identified resource
    ///
    /// Updates and deletes name their target by id; a collection can only be
    /// read or created into.
    pub const fn requires_instance(&self) -> bool {
        matches!(self, AccessIntent::Update | AccessIntent::Delete)
    }

    const fn bit(&self) -> u8 {
        match self {
            AccessIntent::Create => 0b0001,
            AccessIntent::Read => 0b0010,
            AccessIntent::Update => 0b0100,
            AccessIntent::Delete => 0b1000,
        }
    }
}

impl fmt::Display for AccessIntent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Set of intents granted to a role on one resource class
///
/// Stored as a bitmask over the four fixed intents. Membership is a bit test,
/// never a substring or pattern match over the configured grant string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct IntentSet(u8);

impl IntentSet {
    /// The empty set
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Every intent (`crud`)
    pub const fn full() -> Self {
        Self(0b1111)
    }

    /// Parse a grant string such as `"crud"` or `"rc"`
    ///
    /// Codes may appear in any order and duplicates are ignored. Returns the
    /// first unrecognized character on failure.
    pub fn parse(codes: &str) -> Result<Self, char> {
        codes.chars().try_fold(Self::empty(), |set, c| {
            AccessIntent::from_code(c)
                .map(|intent| set.with(intent))
                .ok_or(c)
        })
    }

    /// Return a copy of this set that also contains `intent`
    pub const fn with(self, intent: AccessIntent) -> Self {
        Self(self.0 | intent.bit())
    }

    pub fn insert(&mut self, intent: AccessIntent) {
        self.0 |= intent.bit();
    }

    pub const fn contains(&self, intent: AccessIntent) -> bool {
        self.0 & intent.bit() != 0
    }

    pub const fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub const fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    /// Iterate over the contained intents in `crud` order
    pub fn iter(&self) -> impl Iterator<Item = AccessIntent> + '_ {
        AccessIntent::all()
            .iter()
            .copied()
            .filter(move |intent| self.contains(*intent))
    }
}

impl FromIterator<AccessIntent> for IntentSet {
    fn from_iter<I: IntoIterator<Item = AccessIntent>>(iter: I) -> Self {
        iter.into_iter().fold(Self::empty(), IntentSet::with)
    }
}

impl fmt::Display for IntentSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for intent in self.iter() {
            write!(f, "{}", intent.code())?;
        }
        Ok(())
    }
}
