//! Admin session commands.

use espf_admin::db::AdminGateway;
use espf_admin::models::AdminCredentials;
use espf_admin::services::{AccountError, AccountService};

use crate::render;
use crate::terminal::Terminal;

/// Log in, asking for the password when it was not typed inline.
///
/// # Errors
///
/// Returns `AccountError::StoreUnavailable` if the credential check cannot
/// reach the database.
pub async fn login<G: AdminGateway>(
    service: &AccountService<G>,
    terminal: &mut Terminal,
    username: String,
    password: Option<String>,
) -> Result<(), AccountError> {
    let Some(password) = password.or_else(|| terminal.read_secret("Password")) else {
        terminal.failure("No password given");
        return Ok(());
    };

    let credentials = AdminCredentials::new(username, password);
    if service.sessions().login(credentials).await? {
        terminal.success("You are now connected");
    } else {
        terminal.failure("Wrong credentials");
    }
    Ok(())
}

pub async fn logout<G: AdminGateway>(service: &AccountService<G>, terminal: &Terminal) {
    service.sessions().logout().await;
    terminal.failure("You are now disconnected");
}

pub async fn status<G: AdminGateway>(service: &AccountService<G>, terminal: &Terminal) {
    match service.sessions().status().await {
        Some(status) => terminal.info(render::session_status(&status)),
        None => terminal.failure("You need to login"),
    }
}
