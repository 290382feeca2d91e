//! Username type.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`Username`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum UsernameError {
    /// The input string is empty.
    #[error("username cannot be empty")]
    Empty,
    /// The input string is too long.
    #[error("username must be at most {max} characters")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
    },
    /// The input contains whitespace or a control character.
    #[error("username cannot contain whitespace or control characters")]
    InvalidCharacter,
}

/// A user account name.
///
/// Usernames are compared exactly as stored: `Alice` and `alice` are two
/// different accounts.
///
/// ## Constraints
///
/// - Length: 1-64 characters
/// - No whitespace and no control characters
///
/// ## Examples
///
/// ```
/// use espf_core::Username;
///
/// assert!(Username::parse("alice").is_ok());
/// assert!(Username::parse("alice.smith-2").is_ok());
///
/// assert!(Username::parse("").is_err());
/// assert!(Username::parse("alice smith").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct Username(String);

impl Username {
    /// Maximum length of a username, in characters.
    pub const MAX_LENGTH: usize = 64;

    /// Parse a `Username` from a string.
    ///
    /// # Errors
    ///
    /// Returns an error if the input:
    /// - Is empty
    /// - Is longer than 64 characters
    /// - Contains whitespace or control characters
    pub fn parse(s: &str) -> Result<Self, UsernameError> {
        if s.is_empty() {
            return Err(UsernameError::Empty);
        }

        if s.chars().count() > Self::MAX_LENGTH {
            return Err(UsernameError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }

        if s.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(UsernameError::InvalidCharacter);
        }

        Ok(Self(s.to_owned()))
    }

    /// Get the username as a string slice.
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

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Username {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for Username {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for Username {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl std::str::FromStr for Username {
    type Err = UsernameError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid_usernames() {
        assert!(Username::parse("alice").is_ok());
        assert!(Username::parse("Alice").is_ok());
        assert!(Username::parse("bob_42").is_ok());
        assert!(Username::parse("first.last-name").is_ok());
        assert!(Username::parse("a").is_ok());
    }

    #[test]
    fn test_parse_empty() {
        assert_eq!(Username::parse(""), Err(UsernameError::Empty));
    }

    #[test]
    fn test_parse_too_long() {
        let long = "a".repeat(Username::MAX_LENGTH + 1);
        assert!(matches!(
            Username::parse(&long),
            Err(UsernameError::TooLong { .. })
        ));
        assert!(Username::parse(&"a".repeat(Username::MAX_LENGTH)).is_ok());
    }

    #[test]
    fn test_parse_rejects_whitespace_and_control() {
        assert_eq!(
            Username::parse("alice smith"),
            Err(UsernameError::InvalidCharacter)
        );
        assert_eq!(
            Username::parse(" alice"),
            Err(UsernameError::InvalidCharacter)
        );
        assert_eq!(
            Username::parse("alice\u{7}"),
            Err(UsernameError::InvalidCharacter)
        );
    }

    #[test]
    fn test_case_is_preserved() {
        let name = Username::parse("Alice").unwrap();
        assert_eq!(name.as_str(), "Alice");
        assert_ne!(name, Username::parse("alice").unwrap());
    }

    #[test]
    fn test_compare_with_str() {
        let name = Username::parse("alice").unwrap();
        assert_eq!(name, "alice");
        assert_eq!(name.to_string(), "alice");
    }
}
