//! User account lifecycle.
//!
//! Every operation first asks the [`SessionManager`] for a live admin session
//! and keeps it for its whole duration; without one nothing touches the store.
//!
//! Expiration dates follow two rules:
//! - routine updates ([`AccountService::update`]) may only move a date forward,
//!   strictly after today and strictly after the current date;
//! - [`AccountService::change_expiration_date`] may move it anywhere, but asks
//!   for confirmation when the new date is earlier than the current one.

mod error;

pub use error::{AccountError, MonotonicityViolation};

use std::sync::Arc;

use chrono::{Local, NaiveDate};

use espf_core::{ExpirationDate, Username};

use crate::db::{AdminGateway, RepositoryError, UserStore};
use crate::models::{FieldChange, NewUser, User, UserField};
use crate::services::confirm::{Prompt, confirm};
use crate::services::hasher::{Argon2Hasher, CredentialHasher};
use crate::services::session::{ActiveSession, SessionManager};

/// Result of an operation the admin may decline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome<T> {
    /// The operation went through.
    Completed(T),
    /// The admin answered `no`; nothing changed.
    Cancelled,
}

impl<T> Outcome<T> {
    /// Whether the admin declined.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// The value, if the operation went through.
    pub fn completed(self) -> Option<T> {
        match self {
            Self::Completed(value) => Some(value),
            Self::Cancelled => None,
        }
    }
}

/// Fields to change in [`AccountService::update`]. `None` leaves a field alone.
#[derive(Debug, Clone, Default)]
pub struct UserUpdate {
    pub new_username: Option<String>,
    pub new_password: Option<String>,
    pub activated: Option<bool>,
    pub expiration: Option<String>,
}

impl UserUpdate {
    /// Whether no field was supplied.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.new_username.is_none()
            && self.new_password.is_none()
            && self.activated.is_none()
            && self.expiration.is_none()
    }
}

/// A sub-update that went through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppliedUpdate {
    Renamed { from: String, to: String },
    PasswordChanged,
    Activated(bool),
    ExpirationDate(ExpirationDate),
}

/// A sub-update that did not go through.
#[derive(Debug)]
pub struct FieldFailure {
    pub field: UserField,
    pub error: AccountError,
}

/// What a partial update did, field by field.
#[derive(Debug)]
pub struct UpdateReport {
    /// Name of the user once the update finished.
    pub username: String,
    pub applied: Vec<AppliedUpdate>,
    pub failures: Vec<FieldFailure>,
}

impl UpdateReport {
    fn new(username: &str) -> Self {
        Self {
            username: username.to_owned(),
            applied: Vec::new(),
            failures: Vec::new(),
        }
    }

    /// Whether the stored record is unchanged.
    #[must_use]
    pub fn is_unmodified(&self) -> bool {
        self.applied.is_empty()
    }

    fn fail(&mut self, field: UserField, error: AccountError) {
        tracing::debug!(username = %self.username, %field, error = %error, "Sub-update failed");
        self.failures.push(FieldFailure { field, error });
    }
}

/// Session-gated account operations.
pub struct AccountService<G, H = Argon2Hasher> {
    sessions: Arc<SessionManager<G>>,
    hasher: H,
}

impl<G: AdminGateway> AccountService<G> {
    /// Create a service hashing passwords with Argon2id.
    #[must_use]
    pub const fn new(sessions: Arc<SessionManager<G>>) -> Self {
        Self::with_hasher(sessions, Argon2Hasher)
    }
}

impl<G: AdminGateway, H: CredentialHasher> AccountService<G, H> {
    /// Create a service with a custom password hasher.
    #[must_use]
    pub const fn with_hasher(sessions: Arc<SessionManager<G>>, hasher: H) -> Self {
        Self { sessions, hasher }
    }

    /// The session manager gating this service.
    #[must_use]
    pub fn sessions(&self) -> &SessionManager<G> {
        &self.sessions
    }

    /// The hasher user passwords go through.
    #[must_use]
    pub const fn hasher(&self) -> &H {
        &self.hasher
    }

    async fn open(&self) -> Result<(ActiveSession<'_>, G::Store), AccountError> {
        let session = self.sessions.require_session().await?;
        let store = self
            .sessions
            .gateway()
            .open_store(session.credentials())
            .await?;
        Ok((session, store))
    }

    // =========================================================================
    // Queries
    // =========================================================================

    /// Look up one user.
    ///
    /// # Errors
    ///
    /// Returns `AccountError::NotFound` if there is no such user.
    pub async fn get(&self, username: &str) -> Result<User, AccountError> {
        let (_session, store) = self.open().await?;
        find_existing(&store, username).await
    }

    /// All users in insertion order. Empty when there are none yet.
    ///
    /// # Errors
    ///
    /// Returns `AccountError::Unauthenticated` without a live session.
    pub async fn list(&self) -> Result<Vec<User>, AccountError> {
        let (_session, store) = self.open().await?;
        Ok(store.find_all().await?)
    }

    // =========================================================================
    // Mutations
    // =========================================================================

    /// Create a user.
    ///
    /// The username and expiration date are validated before the password is
    /// hashed.
    ///
    /// # Errors
    ///
    /// - `AccountError::InvalidUsername` / `InvalidDate` / `EmptyPassword`
    /// - `AccountError::DuplicateUser` if the name is taken
    pub async fn add(
        &self,
        username: &str,
        password: &str,
        activated: bool,
        expiration: Option<&str>,
    ) -> Result<User, AccountError> {
        let (session, store) = self.open().await?;

        let username = Username::parse(username)?;
        let expiration_date = expiration.map(ExpirationDate::parse).transpose()?;
        if password.is_empty() {
            return Err(AccountError::EmptyPassword);
        }
        if store.find_by_username(username.as_str()).await?.is_some() {
            return Err(AccountError::DuplicateUser(username.into_inner()));
        }

        let password_hash = self.hasher.hash(password)?;
        let name = username.to_string();
        let user = store
            .insert(NewUser {
                username,
                password_hash,
                activated,
                expiration_date,
            })
            .await
            .map_err(|e| duplicate_or(e, &name))?;

        tracing::info!(
            admin = %session.username(),
            username = %user.username,
            activated,
            "User created"
        );
        Ok(user)
    }

    /// Delete a user after confirmation.
    ///
    /// # Errors
    ///
    /// Returns `AccountError::NotFound` if there is no such user.
    pub async fn delete(
        &self,
        username: &str,
        prompt: &mut dyn Prompt,
    ) -> Result<Outcome<User>, AccountError> {
        let (session, store) = self.open().await?;
        find_existing(&store, username).await?;

        if !confirm(prompt, &format!("You are going to delete {username}, do you confirm")) {
            return Ok(Outcome::Cancelled);
        }
        session.ensure_live()?;

        let removed = store
            .delete(username)
            .await?
            .ok_or_else(|| AccountError::NotFound(username.to_owned()))?;

        tracing::info!(admin = %session.username(), username, "User deleted");
        Ok(Outcome::Completed(removed))
    }

    /// Apply a partial update.
    ///
    /// Fields are applied in order: username, password, activated state,
    /// expiration date. Each one succeeds or fails on its own and failures are
    /// collected in the report; nothing is rolled back. Once renamed, the user
    /// is addressed by its new name.
    ///
    /// # Errors
    ///
    /// Returns `AccountError::NotFound` if the user does not exist and at
    /// least one field was supplied.
    pub async fn update(
        &self,
        username: &str,
        update: UserUpdate,
    ) -> Result<UpdateReport, AccountError> {
        let (session, store) = self.open().await?;

        let mut report = UpdateReport::new(username);
        if update.is_empty() {
            return Ok(report);
        }

        let current = find_existing(&store, username).await?;

        if let Some(new_username) = update.new_username {
            match self.rename(&store, &report.username, &new_username).await {
                Ok(()) => {
                    report.applied.push(AppliedUpdate::Renamed {
                        from: std::mem::replace(&mut report.username, new_username.clone()),
                        to: new_username,
                    });
                }
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => report.fail(UserField::Username, e),
            }
        }

        if let Some(new_password) = update.new_password {
            match self.change_password(&store, &report.username, &new_password).await {
                Ok(()) => report.applied.push(AppliedUpdate::PasswordChanged),
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => report.fail(UserField::Password, e),
            }
        }

        if let Some(activated) = update.activated {
            match apply(&store, &report.username, FieldChange::Activated(activated)).await {
                Ok(()) => report.applied.push(AppliedUpdate::Activated(activated)),
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => report.fail(UserField::Activated, e),
            }
        }

        if let Some(expiration) = update.expiration {
            let result = async {
                let date = ExpirationDate::parse(&expiration)?;
                check_moves_forward(date, current.expiration_date, today())?;
                apply(&store, &report.username, FieldChange::ExpirationDate(date)).await?;
                Ok::<_, AccountError>(date)
            }
            .await;

            match result {
                Ok(date) => report.applied.push(AppliedUpdate::ExpirationDate(date)),
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => report.fail(UserField::ExpirationDate, e),
            }
        }

        tracing::info!(
            admin = %session.username(),
            username = %report.username,
            applied = report.applied.len(),
            failed = report.failures.len(),
            "User updated"
        );
        Ok(report)
    }

    /// Allow the user to log in.
    ///
    /// # Errors
    ///
    /// Returns `AccountError::NotFound` or `AccountError::UpdateFailed`.
    pub async fn activate(&self, username: &str) -> Result<User, AccountError> {
        self.set_activated(username, true).await
    }

    /// Prevent the user from logging in.
    ///
    /// # Errors
    ///
    /// Returns `AccountError::NotFound` or `AccountError::UpdateFailed`.
    pub async fn deactivate(&self, username: &str) -> Result<User, AccountError> {
        self.set_activated(username, false).await
    }

    /// Set the expiration date, in either direction.
    ///
    /// Moving the date earlier than the current one asks for confirmation. A
    /// user without an expiration date never expires, so any date is earlier.
    ///
    /// # Errors
    ///
    /// - `AccountError::InvalidDate` if `date` is not a valid `YYYY-MM-DD`
    /// - `AccountError::NotFound` if there is no such user
    pub async fn change_expiration_date(
        &self,
        username: &str,
        date: &str,
        prompt: &mut dyn Prompt,
    ) -> Result<Outcome<User>, AccountError> {
        let (session, store) = self.open().await?;
        let date = ExpirationDate::parse(date)?;
        let mut user = find_existing(&store, username).await?;

        let moves_forward = user.expiration_date.is_some_and(|current| date >= current);
        if !moves_forward {
            let current = user
                .expiration_date
                .map_or_else(|| "never".to_owned(), |d| d.to_string());
            let question = format!(
                "You are going to update to an expiration date {date} which is before the actual one {current}, do you confirm"
            );
            if !confirm(prompt, &question) {
                return Ok(Outcome::Cancelled);
            }
            session.ensure_live()?;
        }

        apply(&store, username, FieldChange::ExpirationDate(date)).await?;
        user.expiration_date = Some(date);

        tracing::info!(
            admin = %session.username(),
            username,
            expiration_date = %date,
            "Expiration date changed"
        );
        Ok(Outcome::Completed(user))
    }

    /// Bring the store schema up to date.
    ///
    /// # Errors
    ///
    /// Returns `AccountError::StoreUnavailable` if migrations fail.
    pub async fn migrate(&self) -> Result<(), AccountError> {
        let session = self.sessions.require_session().await?;
        self.sessions
            .gateway()
            .migrate(session.credentials())
            .await?;
        tracing::info!(admin = %session.username(), "Migrations applied");
        Ok(())
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    async fn set_activated(&self, username: &str, activated: bool) -> Result<User, AccountError> {
        let (session, store) = self.open().await?;
        let mut user = find_existing(&store, username).await?;

        apply(&store, username, FieldChange::Activated(activated)).await?;
        user.activated = activated;

        tracing::info!(admin = %session.username(), username, activated, "Activation changed");
        Ok(user)
    }

    async fn rename(
        &self,
        store: &G::Store,
        username: &str,
        new_username: &str,
    ) -> Result<(), AccountError> {
        let parsed = Username::parse(new_username)?;
        apply(store, username, FieldChange::Username(parsed))
            .await
            .map_err(|e| match e {
                AccountError::StoreUnavailable(RepositoryError::Conflict(_)) => {
                    AccountError::DuplicateUser(new_username.to_owned())
                }
                other => other,
            })
    }

    async fn change_password(
        &self,
        store: &G::Store,
        username: &str,
        new_password: &str,
    ) -> Result<(), AccountError> {
        if new_password.is_empty() {
            return Err(AccountError::EmptyPassword);
        }
        let hash = self.hasher.hash(new_password)?;
        apply(store, username, FieldChange::PasswordHash(hash)).await
    }
}

async fn find_existing<S: UserStore>(store: &S, username: &str) -> Result<User, AccountError> {
    store
        .find_by_username(username)
        .await?
        .ok_or_else(|| AccountError::NotFound(username.to_owned()))
}

/// Apply one field change, treating "no row touched" as a failure.
async fn apply<S: UserStore>(
    store: &S,
    username: &str,
    change: FieldChange,
) -> Result<(), AccountError> {
    let field = change.field();
    if store.update_field(username, change).await? {
        Ok(())
    } else {
        Err(AccountError::UpdateFailed {
            username: username.to_owned(),
            field,
        })
    }
}

fn duplicate_or(error: RepositoryError, username: &str) -> AccountError {
    match error {
        RepositoryError::Conflict(_) => AccountError::DuplicateUser(username.to_owned()),
        other => AccountError::StoreUnavailable(other),
    }
}

/// Routine updates must move the date strictly forward.
fn check_moves_forward(
    date: ExpirationDate,
    current: Option<ExpirationDate>,
    today: NaiveDate,
) -> Result<(), MonotonicityViolation> {
    if date.as_naive() <= today {
        return Err(MonotonicityViolation::BeforeToday { date, today });
    }
    match current {
        Some(current) if date <= current => {
            Err(MonotonicityViolation::NotAfterCurrent { date, current })
        }
        _ => Ok(()),
    }
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}
