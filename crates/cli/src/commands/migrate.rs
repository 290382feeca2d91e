//! Database migration command.
//!
//! Migrations are embedded from `crates/admin/migrations/` and applied with
//! the logged-in admin's role, which must be allowed to create the `espf`
//! schema:
//!
//! ```text
//! espf> login postgres
//! espf> migrate
//! ```

use espf_admin::db::AdminGateway;
use espf_admin::services::{AccountError, AccountService};

use crate::terminal::Terminal;

/// Apply pending migrations.
///
/// # Errors
///
/// Returns `AccountError::Unauthenticated` without a session, or
/// `AccountError::StoreUnavailable` if a migration fails.
pub async fn run<G: AdminGateway>(
    service: &AccountService<G>,
    terminal: &Terminal,
) -> Result<(), AccountError> {
    service.migrate().await?;
    terminal.success("Migrations applied");
    Ok(())
}
