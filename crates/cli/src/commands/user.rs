//! User account commands.
//!
//! # Usage
//!
//! ```text
//! espf> user add alice true 2030-01-01
//! espf> user update alice -u alicia -e 2031-01-01
//! espf> user changedate alicia 2029-06-30
//! espf> user list
//! ```

use clap::{ArgAction, Subcommand, builder::BoolishValueParser};

use espf_admin::db::AdminGateway;
use espf_admin::services::{AccountError, AccountService, Outcome, UserUpdate};

use crate::render;
use crate::terminal::Terminal;

#[derive(Debug, Subcommand)]
pub enum UserAction {
    /// List all users
    List,
    /// Create a user
    Add {
        username: String,
        /// Whether the user can log in right away
        #[arg(action = ArgAction::Set, value_parser = BoolishValueParser::new())]
        activated: Option<bool>,
        /// Last valid day, YYYY-MM-DD
        expiration_date: Option<String>,
        /// User password (asked for when omitted)
        #[arg(short, long)]
        password: Option<String>,
    },
    /// Show one user
    Get { username: String },
    /// Delete a user (asks for confirmation)
    Delete { username: String },
    /// Change several fields at once
    Update {
        username: String,
        /// New username
        #[arg(short = 'u', long = "newusername")]
        new_username: Option<String>,
        /// New password (asked for when given without a value)
        #[arg(short = 'p', long = "newpassword", num_args = 0..=1)]
        new_password: Option<Option<String>>,
        /// Activate the user
        #[arg(short, long, conflicts_with = "deactivate")]
        activate: bool,
        /// Deactivate the user
        #[arg(short, long)]
        deactivate: bool,
        /// New expiration date, later than today and than the current one
        #[arg(short = 'e', long = "expirationdate")]
        expiration_date: Option<String>,
    },
    /// Activate a user
    Activate { username: String },
    /// Deactivate a user
    Deactivate { username: String },
    /// Set the expiration date, even to an earlier one (asks for confirmation)
    #[command(name = "changedate")]
    ChangeDate {
        username: String,
        /// New expiration date, YYYY-MM-DD
        date: String,
    },
}

/// Run a `user` subcommand.
///
/// # Errors
///
/// Returns the `AccountError` of the underlying operation.
pub async fn run<G: AdminGateway>(
    action: UserAction,
    service: &AccountService<G>,
    terminal: &mut Terminal,
) -> Result<(), AccountError> {
    match action {
        UserAction::List => {
            let users = service.list().await?;
            if users.is_empty() {
                terminal.failure("There are no users in the database yet");
            } else {
                terminal.info(render::user_table(&users));
            }
        }
        UserAction::Add {
            username,
            activated,
            expiration_date,
            password,
        } => {
            let Some(password) = password.or_else(|| terminal.read_secret("The client password"))
            else {
                terminal.failure("No password given, user not added");
                return Ok(());
            };
            let user = service
                .add(
                    &username,
                    &password,
                    activated.unwrap_or(false),
                    expiration_date.as_deref(),
                )
                .await?;
            terminal.success(render::user_added(&user));
        }
        UserAction::Get { username } => {
            let user = service.get(&username).await?;
            terminal.info(render::user_table(std::slice::from_ref(&user)));
        }
        UserAction::Delete { username } => match service.delete(&username, terminal).await? {
            Outcome::Completed(user) => {
                terminal.success(format!("User {} has been deleted", user.username));
            }
            Outcome::Cancelled => terminal.failure(format!("Deletion of {username} cancelled")),
        },
        UserAction::Update {
            username,
            new_username,
            new_password,
            activate,
            deactivate,
            expiration_date,
        } => {
            let new_password = match new_password {
                Some(Some(password)) => Some(password),
                Some(None) => {
                    let Some(password) = terminal.read_secret("New password") else {
                        terminal.failure(format!("No modification of the user {username}"));
                        return Ok(());
                    };
                    Some(password)
                }
                None => None,
            };
            let activated = match (activate, deactivate) {
                (true, _) => Some(true),
                (false, true) => Some(false),
                (false, false) => None,
            };

            let report = service
                .update(
                    &username,
                    UserUpdate {
                        new_username,
                        new_password,
                        activated,
                        expiration: expiration_date,
                    },
                )
                .await?;

            for line in render::applied_updates(&report) {
                terminal.success(line);
            }
            for line in render::failed_updates(&report) {
                terminal.failure(line);
            }
            if report.is_unmodified() {
                terminal.failure(format!("No modification of the user {}", report.username));
            }
        }
        UserAction::Activate { username } => {
            let user = service.activate(&username).await?;
            terminal.success(format!("User {} was activated", user.username));
        }
        UserAction::Deactivate { username } => {
            let user = service.deactivate(&username).await?;
            terminal.success(format!("User {} was deactivated", user.username));
        }
        UserAction::ChangeDate { username, date } => {
            match service
                .change_expiration_date(&username, &date, terminal)
                .await?
            {
                Outcome::Completed(user) => terminal.success(format!(
                    "User {} expiration date is now {}",
                    user.username,
                    render::expiration(user.expiration_date)
                )),
                Outcome::Cancelled => terminal.failure("Modification of expiration date cancelled"),
            }
        }
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use crate::commands::{ShellCommand, parse};

    use super::*;

    fn user_action(line: &str) -> UserAction {
        match parse(line).unwrap().unwrap() {
            ShellCommand::User { action } => action,
            other => panic!("expected a user command, got {other:?}"),
        }
    }

    #[test]
    fn test_add_positional_arguments() {
        let UserAction::Add {
            username,
            activated,
            expiration_date,
            password,
        } = user_action("user add alice true 2030-01-01 --password pw")
        else {
            panic!("expected add");
        };
        assert_eq!(username, "alice");
        assert_eq!(activated, Some(true));
        assert_eq!(expiration_date.as_deref(), Some("2030-01-01"));
        assert_eq!(password.as_deref(), Some("pw"));

        let UserAction::Add {
            activated,
            expiration_date,
            password,
            ..
        } = user_action("user add bob")
        else {
            panic!("expected add");
        };
        assert_eq!(activated, None);
        assert_eq!(expiration_date, None);
        assert_eq!(password, None);
    }

    #[test]
    fn test_update_flags() {
        let UserAction::Update {
            new_username,
            new_password,
            activate,
            deactivate,
            expiration_date,
            ..
        } = user_action("user update alice -u alicia -p -d -e 2031-01-01")
        else {
            panic!("expected update");
        };
        assert_eq!(new_username.as_deref(), Some("alicia"));
        assert_eq!(new_password, Some(None));
        assert!(!activate);
        assert!(deactivate);
        assert_eq!(expiration_date.as_deref(), Some("2031-01-01"));
    }

    #[test]
    fn test_update_password_with_value() {
        let UserAction::Update { new_password, .. } =
            user_action("user update alice --newpassword hunter2")
        else {
            panic!("expected update");
        };
        assert_eq!(new_password, Some(Some("hunter2".to_owned())));
    }

    #[test]
    fn test_update_activate_and_deactivate_conflict() {
        assert!(parse("user update alice -a -d").is_err());
    }

    #[test]
    fn test_changedate_and_simple_verbs() {
        assert!(matches!(
            user_action("user changedate alice 2000-01-01"),
            UserAction::ChangeDate { ref date, .. } if date == "2000-01-01"
        ));
        assert!(matches!(user_action("user list"), UserAction::List));
        assert!(matches!(user_action("user get alice"), UserAction::Get { .. }));
        assert!(matches!(
            user_action("user delete alice"),
            UserAction::Delete { .. }
        ));
        assert!(matches!(
            user_action("user activate alice"),
            UserAction::Activate { .. }
        ));
        assert!(matches!(
            user_action("user deactivate alice"),
            UserAction::Deactivate { .. }
        ));
    }
}
