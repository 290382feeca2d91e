//! Account lifecycle error types.

use chrono::NaiveDate;
use thiserror::Error;

use espf_core::{DateError, ExpirationDate, UsernameError};

use crate::db::RepositoryError;
use crate::models::UserField;
use crate::services::hasher::HashError;
use crate::services::session::SessionError;

/// Errors that can occur during account operations.
#[derive(Debug, Error)]
pub enum AccountError {
    /// No usable admin session.
    #[error("wrong credentials ({0})")]
    Unauthenticated(SessionError),

    /// No user with this name.
    #[error("user {0} doesn't exist")]
    NotFound(String),

    /// A user with this name already exists.
    #[error("user {0} already exists")]
    DuplicateUser(String),

    /// Username does not meet requirements.
    #[error("invalid username: {0}")]
    InvalidUsername(#[from] UsernameError),

    /// Malformed or impossible expiration date.
    #[error("wrong format for expiration date: {0}")]
    InvalidDate(#[from] DateError),

    /// Routine expiration update would not move the date forward.
    #[error(transparent)]
    Monotonicity(#[from] MonotonicityViolation),

    /// Empty password.
    #[error("password cannot be empty")]
    EmptyPassword,

    /// The store accepted the request but changed nothing.
    #[error("failed to update the {field} of user {username}")]
    UpdateFailed {
        /// User the update targeted.
        username: String,
        /// Field that was not updated.
        field: UserField,
    },

    /// Password hashing error.
    #[error(transparent)]
    PasswordHash(#[from] HashError),

    /// The store could not be used.
    #[error("store unavailable: {0}")]
    StoreUnavailable(#[source] RepositoryError),
}

impl AccountError {
    /// Whether the error means the tool cannot keep working.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::StoreUnavailable(_))
    }
}

impl From<SessionError> for AccountError {
    fn from(error: SessionError) -> Self {
        match error {
            SessionError::Unavailable(e) => Self::StoreUnavailable(e),
            refused => Self::Unauthenticated(refused),
        }
    }
}

impl From<RepositoryError> for AccountError {
    fn from(error: RepositoryError) -> Self {
        Self::StoreUnavailable(error)
    }
}

/// Ways a routine expiration update can move a date in the wrong direction.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MonotonicityViolation {
    /// The new date is today or earlier.
    #[error(
        "the new expiration date {date} is not after today ({today}). If you want to perform this operation use the command changedate"
    )]
    BeforeToday {
        /// Requested date.
        date: ExpirationDate,
        /// Today's date.
        today: NaiveDate,
    },

    /// The new date is not after the current expiration date.
    #[error(
        "the new expiration date {date} is not after the current one ({current}). If you want to perform this operation use the command changedate"
    )]
    NotAfterCurrent {
        /// Requested date.
        date: ExpirationDate,
        /// Expiration date currently stored.
        current: ExpirationDate,
    },
}
