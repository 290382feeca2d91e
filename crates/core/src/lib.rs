//! ESPF Core - Shared types library.
//!
//! This crate provides the types shared by the ESPF user administration tools:
//! - `admin` - Session gate, account lifecycle rules and user stores
//! - `cli` - Interactive administration shell
//!
//! # Architecture
//!
//! The core crate contains only types and validation - no I/O, no database
//! access. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for user IDs, usernames, password hashes and
//!   expiration dates

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
