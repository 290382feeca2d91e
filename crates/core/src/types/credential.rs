//! Stored credential types.

use core::fmt;

use serde::{Deserialize, Serialize};

/// A one-way password hash as stored in the user table.
///
/// The hash is an opaque PHC string produced by the configured hasher. It is
/// deliberately not `Display`, and its `Debug` output is redacted so that it
/// never ends up in logs or command output.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PasswordHash(String);

impl PasswordHash {
    /// Wrap a hash string.
    ///
    /// Returns `None` for an empty string: a stored hash is never empty.
    #[must_use]
    pub fn new(hash: String) -> Option<Self> {
        (!hash.is_empty()).then_some(Self(hash))
    }

    /// Get the hash as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Convert into the inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Debug for PasswordHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PasswordHash([REDACTED])")
    }
}

impl AsRef<str> for PasswordHash {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_hash_is_rejected() {
        assert!(PasswordHash::new(String::new()).is_none());
    }

    #[test]
    fn test_debug_is_redacted() {
        let hash = PasswordHash::new("$argon2id$v=19$secret".to_owned()).unwrap();
        let debug = format!("{hash:?}");
        assert!(!debug.contains("argon2id"));
        assert!(debug.contains("REDACTED"));
    }
}
