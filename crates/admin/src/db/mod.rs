//! Database operations for the ESPF user table.
//!
//! # Database: `espf_users`
//!
//! ## Tables
//!
//! - `espf.users` - Managed user accounts (credentials, activation, expiration)
//!
//! The tool connects with the admin's own database role: a successful
//! connection *is* the admin credential check, and every store handle is opened
//! with the credentials of the current session.
//!
//! # Migrations
//!
//! Migrations are stored in `crates/admin/migrations/` and run from the shell:
//! ```text
//! espf> login postgres
//! espf> migrate
//! ```
//!
//! # Implementations
//!
//! - [`postgres`] - `PostgreSQL` via sqlx
//! - [`memory`] - In-process store for tests and local experiments

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{AdminCredentials, FieldChange, NewUser, User};

pub use memory::{MemoryGateway, MemoryUserStore};
pub use postgres::{PgGateway, PgUserStore};

/// Errors that can occur during repository operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Migration error from sqlx.
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// The store could not be reached.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// Constraint violation (e.g., unique username).
    #[error("constraint violation: {0}")]
    Conflict(String),
}

/// CRUD access to persisted user records.
///
/// Each call is atomic on its own; the store owns username uniqueness.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Look up a user by exact username.
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepositoryError>;

    /// All users in insertion order.
    async fn find_all(&self) -> Result<Vec<User>, RepositoryError>;

    /// Store a new user.
    ///
    /// Returns `RepositoryError::Conflict` if the username is taken.
    async fn insert(&self, user: NewUser) -> Result<User, RepositoryError>;

    /// Apply a single-field change. Returns `false` if no such user exists.
    ///
    /// Returns `RepositoryError::Conflict` if a rename collides with another user.
    async fn update_field(&self, username: &str, change: FieldChange)
    -> Result<bool, RepositoryError>;

    /// Delete a user, returning the removed record if it existed.
    async fn delete(&self, username: &str) -> Result<Option<User>, RepositoryError>;
}

/// Entry point to a user store, keyed by admin credentials.
#[async_trait]
pub trait AdminGateway: Send + Sync + 'static {
    /// Store handle opened for one admin session.
    type Store: UserStore;

    /// Check admin credentials against the store.
    ///
    /// `Ok(false)` means the credentials were rejected. `Err` is reserved for
    /// failures to reach the store at all.
    async fn test_admin_credentials(
        &self,
        credentials: &AdminCredentials,
    ) -> Result<bool, RepositoryError>;

    /// Open a store handle with the given admin credentials.
    async fn open_store(&self, credentials: &AdminCredentials)
    -> Result<Self::Store, RepositoryError>;

    /// Bring the store schema up to date.
    async fn migrate(&self, credentials: &AdminCredentials) -> Result<(), RepositoryError>;

    /// Drop connections held for the last admin session.
    async fn release(&self) {}
}
