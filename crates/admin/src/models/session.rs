//! Admin session types.
//!
//! The admin session only ever lives in process memory. Its credentials are
//! the database role the tool connects with.

use core::fmt;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};

/// Admin username and password, held for the duration of a session.
///
/// Implements `Debug` manually to redact the password.
#[derive(Clone)]
pub struct AdminCredentials {
    /// Admin (database role) name.
    pub username: String,
    /// Admin password.
    pub password: SecretString,
}

impl AdminCredentials {
    /// Build credentials from a username and a plaintext password.
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: SecretString::from(password.into()),
        }
    }

    /// Whether both hold the same username and password.
    #[must_use]
    pub fn same_as(&self, other: &Self) -> bool {
        self.username == other.username
            && self.password.expose_secret() == other.password.expose_secret()
    }
}

impl fmt::Debug for AdminCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdminCredentials")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Notifications broadcast by the session manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// The session countdown elapsed and the credentials were cleared.
    Expired {
        /// Admin whose session ended.
        username: String,
    },
    /// The admin logged out explicitly.
    LoggedOut {
        /// Admin whose session ended.
        username: String,
    },
}

/// Snapshot of the current session, for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionStatus {
    /// Logged-in admin.
    pub username: String,
    /// Time left before the session expires.
    pub remaining: Duration,
}
