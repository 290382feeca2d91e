//! Shell command grammar and dispatch.
//!
//! # Commands
//!
//! - `login <username> [password]` - Start an admin session
//! - `logout` - End the admin session
//! - `status` - Show the admin session
//! - `user ...` - Manage user accounts (see [`user::UserAction`])
//! - `migrate` - Apply database migrations
//! - `help`, `exit` / `quit`
//!
//! Words are split like a POSIX shell, so `'my password'` is one argument.

pub mod migrate;
pub mod session;
pub mod user;

use clap::error::ErrorKind;
use clap::{Parser, Subcommand};

use espf_admin::db::AdminGateway;
use espf_admin::services::{AccountError, AccountService};

use crate::terminal::Terminal;
use user::UserAction;

/// One line typed at the shell prompt.
#[derive(Debug, Parser)]
#[command(name = "espf", no_binary_name = true, disable_version_flag = true)]
pub struct ShellLine {
    #[command(subcommand)]
    pub command: ShellCommand,
}

#[derive(Debug, Subcommand)]
pub enum ShellCommand {
    /// Log in as an admin (the password is asked for when omitted)
    Login {
        /// Admin username
        username: String,
        /// Admin password
        password: Option<String>,
    },
    /// End the admin session
    Logout,
    /// Show who is logged in and for how long
    Status,
    /// Manage user accounts
    User {
        #[command(subcommand)]
        action: UserAction,
    },
    /// Apply database migrations
    Migrate,
    /// Leave the shell
    #[command(alias = "quit")]
    Exit,
}

/// Whether the shell keeps reading after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

/// Parse a shell line. `Ok(None)` for a blank line.
///
/// # Errors
///
/// Returns the clap error (which includes help output) for anything that is
/// not a valid command, or for unbalanced quotes.
pub fn parse(line: &str) -> Result<Option<ShellCommand>, clap::Error> {
    let words = shlex::split(line)
        .ok_or_else(|| clap::Error::raw(ErrorKind::InvalidValue, "unbalanced quotes\n"))?;
    if words.is_empty() {
        return Ok(None);
    }
    ShellLine::try_parse_from(words).map(|parsed| Some(parsed.command))
}

/// Run one command.
///
/// # Errors
///
/// Returns the `AccountError` of the failed operation, for the shell to report.
pub async fn dispatch<G: AdminGateway>(
    command: ShellCommand,
    service: &AccountService<G>,
    terminal: &mut Terminal,
) -> Result<Flow, AccountError> {
    match command {
        ShellCommand::Login { username, password } => {
            session::login(service, terminal, username, password).await?;
        }
        ShellCommand::Logout => session::logout(service, terminal).await,
        ShellCommand::Status => session::status(service, terminal).await,
        ShellCommand::User { action } => user::run(action, service, terminal).await?,
        ShellCommand::Migrate => migrate::run(service, terminal).await?,
        ShellCommand::Exit => return Ok(Flow::Exit),
    }
    Ok(Flow::Continue)
}
