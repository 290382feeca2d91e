//! Business logic services for user administration.
//!
//! # Services
//!
//! - `session` - Single admin session with re-verification and countdown
//! - `accounts` - User account lifecycle (add, update, expiration rules, ...)
//! - `hasher` - One-way password hashing
//! - `confirm` - Interactive yes/no confirmation

pub mod accounts;
pub mod confirm;
pub mod hasher;
pub mod session;

pub use accounts::{
    AccountError, AccountService, AppliedUpdate, FieldFailure, MonotonicityViolation, Outcome,
    UpdateReport, UserUpdate,
};
pub use confirm::{Prompt, ScriptedPrompt, confirm};
pub use hasher::{Argon2Hasher, CredentialHasher, HashError};
pub use session::{ActiveSession, MAX_SESSION_TTL, SessionError, SessionManager};
