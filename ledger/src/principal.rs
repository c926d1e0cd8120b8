//! # Principals
//!
//! A [`Principal`] is the opaque identity of a caller or balance holder —
//! an address string supplied by the embedding environment. The ledger
//! never derives, validates, or interprets it; it is a map key and an
//! authorization token, nothing more.

use serde::{Deserialize, Serialize};

/// An opaque account identifier usable as a caller or balance key.
///
/// Wraps the externally supplied address string. Equality and hashing are
/// byte-exact: `"st1abc"` and `"ST1ABC"` are different principals.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Principal(String);

impl Principal {
    /// Wraps an address string as a principal.
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    /// The underlying address string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Principal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Principal {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for Principal {
    fn from(s: String) -> Self {
        Self(s)
    }
}
