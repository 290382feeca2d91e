//! Integration tests for the ESPF user administration tools.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p espf-integration-tests
//! ```
//!
//! The tests run against the in-memory gateway, so no database is needed.
//!
//! # Test Categories
//!
//! - `session_gate` - Login, expiry and re-verification in front of every operation
//! - `account_lifecycle` - Add, get, list, delete, update, activation
//! - `expiration_rules` - Forward-only updates and the confirmed force path
//! - `scenario` - A complete admin session from login to expiry

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::sync::Arc;
use std::time::Duration;

use chrono::{Days, Local, NaiveDate};

use espf_admin::db::MemoryGateway;
use espf_admin::models::AdminCredentials;
use espf_admin::services::{AccountService, SessionManager};
use espf_core::ExpirationDate;

pub const ADMIN: &str = "root";
pub const ADMIN_PASSWORD: &str = "s3cret";
pub const SESSION_TTL: Duration = Duration::from_secs(300);

/// An account service wired to an in-memory store.
pub struct TestContext {
    pub gateway: Arc<MemoryGateway>,
    pub service: AccountService<MemoryGateway>,
}

impl TestContext {
    /// A context with one admin and nobody logged in.
    #[must_use]
    pub fn new() -> Self {
        let gateway = Arc::new(MemoryGateway::new().with_admin(ADMIN, ADMIN_PASSWORD));
        let sessions = Arc::new(SessionManager::new(Arc::clone(&gateway), SESSION_TTL));
        Self {
            gateway,
            service: AccountService::new(sessions),
        }
    }

    /// A context with the admin already logged in.
    ///
    /// # Panics
    ///
    /// Panics if the login is refused.
    pub async fn logged_in() -> Self {
        let ctx = Self::new();
        assert!(ctx.login().await, "admin login refused");
        ctx
    }

    /// Log in with the admin's current password.
    ///
    /// # Panics
    ///
    /// Panics if the in-memory store is marked unavailable.
    pub async fn login(&self) -> bool {
        self.service
            .sessions()
            .login(AdminCredentials::new(ADMIN, ADMIN_PASSWORD))
            .await
            .unwrap_or_else(|e| panic!("login failed: {e}"))
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse a date literal known to be valid.
///
/// # Panics
///
/// Panics on an invalid literal.
#[must_use]
pub fn date(s: &str) -> ExpirationDate {
    ExpirationDate::parse(s).unwrap_or_else(|e| panic!("bad test date {s}: {e}"))
}

/// `today + days`, formatted for the service.
///
/// # Panics
///
/// Panics if the date overflows.
#[must_use]
pub fn days_from_today(days: i64) -> String {
    let today = Local::now().date_naive();
    let shifted: Option<NaiveDate> = if days >= 0 {
        today.checked_add_days(Days::new(days.unsigned_abs()))
    } else {
        today.checked_sub_days(Days::new(days.unsigned_abs()))
    };
    shifted
        .unwrap_or_else(|| panic!("date out of range"))
        .format("%Y-%m-%d")
        .to_string()
}
