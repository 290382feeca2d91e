//! ESPF admin shell - manage user accounts behind an admin session.
//!
//! # Usage
//!
//! ```bash
//! # Start the shell
//! espf-cli
//!
//! # Start the shell and log in right away
//! espf-cli --login postgres
//!
//! # Run a script (stops with exit code 1 if the database is unreachable)
//! espf-cli < commands.txt
//! ```
//!
//! See [`commands`] for the shell grammar and `espf_admin::config` for the
//! environment variables.

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use rustyline::error::ReadlineError;
use thiserror::Error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use espf_admin::config::{AdminToolConfig, ConfigError};
use espf_admin::db::{AdminGateway, PgGateway};
use espf_admin::services::{AccountError, AccountService, SessionManager};

mod commands;
mod render;
mod shell;
mod terminal;

use commands::ShellCommand;
use terminal::Terminal;

#[derive(Parser)]
#[command(name = "espf-cli")]
#[command(author, version, about = "ESPF user administration shell")]
struct Cli {
    /// Log in as this admin before the first prompt
    #[arg(long, value_name = "USERNAME")]
    login: Option<String>,
}

/// Errors that end the shell.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("terminal error: {0}")]
    Terminal(#[from] ReadlineError),

    #[error(transparent)]
    Account(#[from] AccountError),
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("Shell stopped: {e}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() {
    // Quiet by default: the shell's own output is the interface.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "espf_cli=warn,espf_admin=warn".into());

    let json = std::env::var_os("ESPF_LOG_JSON").is_some();
    let json_layer = json.then(|| {
        tracing_subscriber::fmt::layer()
            .json()
            .flatten_event(true)
            .with_writer(std::io::stderr)
    });
    let text_layer = (!json).then(|| tracing_subscriber::fmt::layer().with_writer(std::io::stderr));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(text_layer)
        .init();
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let config = AdminToolConfig::from_env()?;
    tracing::debug!(
        host = %config.database.host,
        port = config.database.port,
        database = %config.database.name,
        "Configuration loaded"
    );

    let gateway = Arc::new(PgGateway::new(config.database));
    let sessions = Arc::new(SessionManager::new(gateway, config.session_ttl));
    let service = AccountService::new(sessions);

    let mut terminal = Terminal::new()?;
    let initial = cli.login.map(|username| ShellCommand::Login {
        username,
        password: None,
    });

    let result = shell::run(&service, &mut terminal, initial).await;
    service.sessions().gateway().release().await;
    result
}
