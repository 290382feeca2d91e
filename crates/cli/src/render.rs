//! Text for shell output.
//!
//! Everything here builds strings; styling and writing happen in
//! [`crate::terminal`].

use std::time::Duration;

use espf_admin::models::{SessionStatus, User};
use espf_admin::services::{AccountError, AppliedUpdate, SessionError, UpdateReport};
use espf_core::ExpirationDate;

const HEADERS: [&str; 4] = ["ID", "Username", "Activated", "Expiration Date"];

/// Expiration date as shown to the admin.
#[must_use]
pub fn expiration(date: Option<ExpirationDate>) -> String {
    date.map_or_else(|| "never".to_owned(), |d| d.to_string())
}

/// Users as an aligned table, header first.
#[must_use]
pub fn user_table(users: &[User]) -> String {
    let rows: Vec<[String; 4]> = users
        .iter()
        .map(|user| {
            [
                user.id.to_string(),
                user.username.to_string(),
                user.activated.to_string(),
                expiration(user.expiration_date),
            ]
        })
        .collect();

    let mut widths = HEADERS.map(str::len);
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let separator = widths
        .iter()
        .map(|width| "-".repeat(*width))
        .collect::<Vec<_>>()
        .join("-+-");

    let mut lines = vec![table_row(&HEADERS, &widths), separator];
    lines.extend(rows.iter().map(|row| table_row(row, &widths)));
    lines.join("\n")
}

fn table_row<S: AsRef<str>>(cells: &[S], widths: &[usize]) -> String {
    cells
        .iter()
        .zip(widths)
        .map(|(cell, &width)| format!("{:<width$}", cell.as_ref()))
        .collect::<Vec<_>>()
        .join(" | ")
        .trim_end()
        .to_owned()
}

#[must_use]
pub fn user_added(user: &User) -> String {
    format!(
        "User {} was added to the database, activated: {}, expiration date: {}",
        user.username,
        user.activated,
        expiration(user.expiration_date)
    )
}

/// One line per applied change, in the order they were applied.
#[must_use]
pub fn applied_updates(report: &UpdateReport) -> Vec<String> {
    report
        .applied
        .iter()
        .map(|applied| match applied {
            AppliedUpdate::Renamed { from, to } => format!("User {from} is now {to}"),
            AppliedUpdate::PasswordChanged => {
                format!("User {} password has been changed", report.username)
            }
            AppliedUpdate::Activated(activated) => {
                format!("User {} activated state is now {activated}", report.username)
            }
            AppliedUpdate::ExpirationDate(date) => {
                format!("User {} expiration date is now {date}", report.username)
            }
        })
        .collect()
}

#[must_use]
pub fn failed_updates(report: &UpdateReport) -> Vec<String> {
    report
        .failures
        .iter()
        .map(|failure| {
            format!(
                "Failure in the update of user {} {}: {}",
                report.username,
                failure.field,
                error_message(&failure.error)
            )
        })
        .collect()
}

#[must_use]
pub fn session_status(status: &SessionStatus) -> String {
    format!(
        "Logged in as {}, session expires in {}",
        status.username,
        remaining(status.remaining)
    )
}

fn remaining(duration: Duration) -> String {
    let secs = duration.as_secs();
    format!("{}m {:02}s", secs / 60, secs % 60)
}

/// An error as a sentence for the admin.
#[must_use]
pub fn error_message(error: &AccountError) -> String {
    let message = match error {
        AccountError::Unauthenticated(SessionError::Rejected) => "wrong credentials".to_owned(),
        other => other.to_string(),
    };
    capitalize(&message)
}

fn capitalize(message: &str) -> String {
    let mut chars = message.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;

    use espf_admin::models::UserField;
    use espf_admin::services::FieldFailure;
    use espf_core::{PasswordHash, UserId, Username};

    use super::*;

    fn user(id: i32, name: &str, activated: bool, expiration: Option<&str>) -> User {
        User {
            id: UserId::new(id),
            username: Username::parse(name).unwrap(),
            password_hash: PasswordHash::new("hash".to_owned()).unwrap(),
            activated,
            expiration_date: expiration.map(|d| ExpirationDate::parse(d).unwrap()),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_user_table_aligns_columns() {
        let table = user_table(&[
            user(1, "alice", true, None),
            user(12, "bartholomew", false, Some("2999-01-01")),
        ]);
        let lines: Vec<_> = table.lines().collect();

        assert_eq!(lines.len(), 4);
        assert_eq!(
            lines[0],
            "ID | Username    | Activated | Expiration Date"
        );
        assert_eq!(
            lines[1],
            "---+-------------+-----------+----------------"
        );
        assert_eq!(lines[2], "1  | alice       | true      | never");
        assert_eq!(lines[3], "12 | bartholomew | false     | 2999-01-01");
    }

    #[test]
    fn test_user_table_empty_has_header_only() {
        assert_eq!(user_table(&[]).lines().count(), 2);
    }

    #[test]
    fn test_update_lines_use_final_name() {
        let report = UpdateReport {
            username: "alicia".to_owned(),
            applied: vec![
                AppliedUpdate::Renamed {
                    from: "alice".to_owned(),
                    to: "alicia".to_owned(),
                },
                AppliedUpdate::Activated(true),
            ],
            failures: vec![FieldFailure {
                field: UserField::Password,
                error: AccountError::EmptyPassword,
            }],
        };

        assert_eq!(
            applied_updates(&report),
            [
                "User alice is now alicia",
                "User alicia activated state is now true"
            ]
        );
        assert_eq!(
            failed_updates(&report),
            ["Failure in the update of user alicia password: Password cannot be empty"]
        );
    }

    #[test]
    fn test_session_status_formats_minutes() {
        let status = SessionStatus {
            username: "root".to_owned(),
            remaining: Duration::from_secs(245),
        };
        assert_eq!(
            session_status(&status),
            "Logged in as root, session expires in 4m 05s"
        );
    }

    #[test]
    fn test_unauthenticated_reports_wrong_credentials() {
        let error = AccountError::Unauthenticated(SessionError::NoSession);
        assert_eq!(
            error_message(&error),
            "Wrong credentials (you need to login)"
        );
        let error = AccountError::Unauthenticated(SessionError::Expired);
        assert_eq!(
            error_message(&error),
            "Wrong credentials (your session has expired, login again)"
        );
        let error = AccountError::Unauthenticated(SessionError::Rejected);
        assert_eq!(error_message(&error), "Wrong credentials");
        assert_eq!(
            error_message(&AccountError::NotFound("bob".to_owned())),
            "User bob doesn't exist"
        );
    }
}
