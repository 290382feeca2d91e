//! Domain models for user administration.
//!
//! - [`user`] - Persisted user accounts and single-field changes
//! - [`session`] - In-memory admin session types

pub mod session;
pub mod user;

pub use session::{AdminCredentials, SessionEvent, SessionStatus};
pub use user::{FieldChange, NewUser, User, UserField};
