//! Content-addressed object identifiers

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{GitError, Result};

/// A git object id (SHA-1 or SHA-256 hex), normalized to lowercase.
///
/// Two ids compare equal exactly when git hashed identical content, which is
/// the only equality the verifier relies on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectId(String);

impl ObjectId {
    /// Parse a hex object id as printed by git plumbing commands
    pub fn parse(raw: &str) -> Result<Self> {
        let raw = raw.trim();
        let valid_len = raw.len() == 40 || raw.len() == 64;
        if !valid_len || !raw.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(GitError::parse_error(format!(
                "'{}' is not an object id",
                raw
            )));
        }
        Ok(Self(raw.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
