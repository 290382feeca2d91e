//! Core types for ESPF user administration.
//!
//! This module provides type-safe wrappers for user account concepts.

pub mod credential;
pub mod date;
pub mod id;
pub mod username;

pub use credential::PasswordHash;
pub use date::{DateError, ExpirationDate};
pub use id::*;
pub use username::{Username, UsernameError};
