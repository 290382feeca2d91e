//! User account domain types.
//!
//! These types represent validated domain objects for managed accounts.

use core::fmt;

use chrono::{DateTime, Utc};

use espf_core::{ExpirationDate, PasswordHash, UserId, Username};

/// A managed user account (domain type).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    /// Store-assigned ID, immutable.
    pub id: UserId,
    /// Unique account name (case-sensitive).
    pub username: Username,
    /// One-way hash of the account password.
    pub password_hash: PasswordHash,
    /// Whether the account may be used.
    pub activated: bool,
    /// Last day the account may be used; `None` means it never expires.
    pub expiration_date: Option<ExpirationDate>,
    /// When the account was created.
    pub created_at: DateTime<Utc>,
}

/// A user account that has not been stored yet.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: Username,
    pub password_hash: PasswordHash,
    pub activated: bool,
    pub expiration_date: Option<ExpirationDate>,
}

/// A change to exactly one column of a stored user.
#[derive(Debug, Clone)]
pub enum FieldChange {
    Username(Username),
    PasswordHash(PasswordHash),
    Activated(bool),
    ExpirationDate(ExpirationDate),
}

impl FieldChange {
    /// The field this change targets.
    #[must_use]
    pub const fn field(&self) -> UserField {
        match self {
            Self::Username(_) => UserField::Username,
            Self::PasswordHash(_) => UserField::Password,
            Self::Activated(_) => UserField::Activated,
            Self::ExpirationDate(_) => UserField::ExpirationDate,
        }
    }
}

/// The independently updatable fields of a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UserField {
    Username,
    Password,
    Activated,
    ExpirationDate,
}

impl fmt::Display for UserField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Username => write!(f, "username"),
            Self::Password => write!(f, "password"),
            Self::Activated => write!(f, "activated state"),
            Self::ExpirationDate => write!(f, "expiration date"),
        }
    }
}
