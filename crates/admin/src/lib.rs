//! ESPF user administration library.
//!
//! Session-gated management of user accounts: an admin logs in once, and every
//! account operation re-checks that session before touching the user table.
//!
//! # Security
//!
//! Admin credentials are the database role the tool connects with. They live
//! in process memory only, behind `SecretString`, for at most the session TTL.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod models;
pub mod services;
