//! The interactive read-dispatch loop.

use clap::error::ErrorKind;
use dialoguer::console::{Term, style};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

use espf_admin::db::AdminGateway;
use espf_admin::models::SessionEvent;
use espf_admin::services::{AccountService, SessionManager};

use crate::commands::{self, Flow};
use crate::render;
use crate::terminal::Terminal;

const PROMPT: &str = "espf> ";

/// Read commands until `exit` or end of input.
///
/// # Errors
///
/// In non-interactive mode, returns the first error that leaves the tool
/// unable to work (the store is unreachable). Interactive sessions report it
/// and keep going.
pub async fn run<G: AdminGateway>(
    service: &AccountService<G>,
    terminal: &mut Terminal,
    initial: Option<commands::ShellCommand>,
) -> Result<(), crate::CliError> {
    let notices = spawn_notices(service.sessions());
    let result = read_loop(service, terminal, initial).await;
    notices.abort();
    result
}

async fn read_loop<G: AdminGateway>(
    service: &AccountService<G>,
    terminal: &mut Terminal,
    mut pending: Option<commands::ShellCommand>,
) -> Result<(), crate::CliError> {
    loop {
        let command = if let Some(command) = pending.take() {
            command
        } else {
            let Some(line) = terminal.read_command(PROMPT)? else {
                return Ok(());
            };
            match commands::parse(&line) {
                Ok(Some(command)) => command,
                Ok(None) => continue,
                Err(e) => {
                    report_parse_error(terminal, &e);
                    continue;
                }
            }
        };

        match commands::dispatch(command, service, terminal).await {
            Ok(Flow::Continue) => {}
            Ok(Flow::Exit) => return Ok(()),
            Err(e) => {
                terminal.failure(render::error_message(&e));
                if e.is_fatal() {
                    tracing::error!(error = %e, "Store unavailable");
                    if !terminal.is_interactive() {
                        return Err(e.into());
                    }
                }
            }
        }
    }
}

fn report_parse_error(terminal: &Terminal, error: &clap::Error) {
    match error.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => {
            terminal.plain(error.render().to_string().trim_end());
        }
        _ => terminal.failure(error.render().to_string().trim_end()),
    }
}

/// Print session expiry as soon as it happens, not at the next command.
fn spawn_notices<G: AdminGateway>(sessions: &SessionManager<G>) -> JoinHandle<()> {
    let mut events = sessions.subscribe();
    tokio::spawn(async move {
        let out = Term::stdout();
        loop {
            match events.recv().await {
                Ok(SessionEvent::Expired { .. }) => {
                    let notice = style(
                        "You are now disconnected, if you want to keep using the CLI you need to reconnect",
                    )
                    .red();
                    if let Err(e) = out.write_line(&notice.to_string()) {
                        tracing::debug!(error = %e, "Could not write expiry notice");
                    }
                }
                Ok(SessionEvent::LoggedOut { .. }) | Err(RecvError::Lagged(_)) => {}
                Err(RecvError::Closed) => break,
            }
        }
    })
}
