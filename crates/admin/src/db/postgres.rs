//! `PostgreSQL` user store.
//!
//! Queries are runtime-checked (`sqlx::query_as`) so the crate builds without
//! a live database; the row type is validated into domain types on the way out.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use secrecy::ExposeSecret;
use sqlx::postgres::{PgConnectOptions, PgConnection, PgPoolOptions};
use sqlx::{Connection, PgPool};
use tokio::sync::Mutex;

use espf_core::{ExpirationDate, PasswordHash, UserId, Username};

use super::{AdminGateway, RepositoryError, UserStore};
use crate::config::DatabaseConfig;
use crate::models::{AdminCredentials, FieldChange, NewUser, User};

/// SQLSTATE `invalid_password`.
const INVALID_PASSWORD: &str = "28P01";
/// SQLSTATE `invalid_authorization_specification` (e.g. unknown role).
const INVALID_AUTHORIZATION: &str = "28000";

const USER_COLUMNS: &str = "id, username, password_hash, activated, expiration_date, created_at";

// =============================================================================
// Internal Row Types
// =============================================================================

/// Internal row type for `PostgreSQL` user queries.
#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: i32,
    username: String,
    password_hash: String,
    activated: bool,
    expiration_date: Option<NaiveDate>,
    created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = RepositoryError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let username = Username::parse(&row.username).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid username in database: {e}"))
        })?;
        let password_hash = PasswordHash::new(row.password_hash).ok_or_else(|| {
            RepositoryError::DataCorruption(format!("empty password hash for user {username}"))
        })?;

        Ok(Self {
            id: UserId::new(row.id),
            username,
            password_hash,
            activated: row.activated,
            expiration_date: row.expiration_date.map(ExpirationDate::from_naive),
            created_at: row.created_at,
        })
    }
}

// =============================================================================
// Gateway
// =============================================================================

/// Pool opened with one admin's credentials.
struct SessionPool {
    credentials: AdminCredentials,
    pool: PgPool,
}

/// Connects to the user database with the admin's own role.
///
/// One pool is kept for the current admin and reused by every operation of
/// the session. Other credentials replace it.
#[derive(Debug)]
pub struct PgGateway {
    database: DatabaseConfig,
    pool: Mutex<Option<SessionPool>>,
}

impl std::fmt::Debug for SessionPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionPool")
            .field("credentials", &self.credentials)
            .field("size", &self.pool.size())
            .finish()
    }
}

impl PgGateway {
    /// Create a gateway for the given database location.
    #[must_use]
    pub fn new(database: DatabaseConfig) -> Self {
        Self {
            database,
            pool: Mutex::new(None),
        }
    }

    /// The pool for `credentials`, opened on first use.
    async fn session_pool(&self, credentials: &AdminCredentials) -> Result<PgPool, RepositoryError> {
        let mut cached = self.pool.lock().await;
        if let Some(current) = cached.as_ref()
            && current.credentials.same_as(credentials)
            && !current.pool.is_closed()
        {
            return Ok(current.pool.clone());
        }

        if let Some(stale) = cached.take() {
            stale.pool.close().await;
        }
        let pool = self.create_pool(credentials).await?;
        *cached = Some(SessionPool {
            credentials: credentials.clone(),
            pool: pool.clone(),
        });
        Ok(pool)
    }

    fn connect_options(&self, credentials: &AdminCredentials) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&self.database.host)
            .port(self.database.port)
            .database(&self.database.name)
            .username(&credentials.username)
            .password(credentials.password.expose_secret())
    }

    async fn create_pool(&self, credentials: &AdminCredentials) -> Result<PgPool, RepositoryError> {
        PgPoolOptions::new()
            .max_connections(2)
            .acquire_timeout(self.database.connect_timeout)
            .connect_with(self.connect_options(credentials))
            .await
            .map_err(|e| match e {
                sqlx::Error::PoolTimedOut => RepositoryError::Unavailable(format!(
                    "no connection to {}:{} within {}s",
                    self.database.host,
                    self.database.port,
                    self.database.connect_timeout.as_secs()
                )),
                other => RepositoryError::Database(other),
            })
    }
}

#[async_trait]
impl AdminGateway for PgGateway {
    type Store = PgUserStore;

    async fn test_admin_credentials(
        &self,
        credentials: &AdminCredentials,
    ) -> Result<bool, RepositoryError> {
        let options = self.connect_options(credentials);
        let attempt = tokio::time::timeout(
            self.database.connect_timeout,
            PgConnection::connect_with(&options),
        )
        .await;

        match attempt {
            Err(_) => Err(RepositoryError::Unavailable(format!(
                "no answer from {}:{} within {}s",
                self.database.host,
                self.database.port,
                self.database.connect_timeout.as_secs()
            ))),
            Ok(Ok(connection)) => {
                if let Err(e) = connection.close().await {
                    tracing::debug!(error = %e, "Closing credential check connection failed");
                }
                Ok(true)
            }
            Ok(Err(sqlx::Error::Database(ref db_err)))
                if db_err
                    .code()
                    .is_some_and(|code| code == INVALID_PASSWORD || code == INVALID_AUTHORIZATION) =>
            {
                tracing::debug!(username = %credentials.username, "Admin credentials rejected");
                Ok(false)
            }
            Ok(Err(e)) => Err(RepositoryError::Database(e)),
        }
    }

    async fn open_store(
        &self,
        credentials: &AdminCredentials,
    ) -> Result<Self::Store, RepositoryError> {
        let pool = self.session_pool(credentials).await?;
        Ok(PgUserStore::new(pool))
    }

    async fn migrate(&self, credentials: &AdminCredentials) -> Result<(), RepositoryError> {
        let pool = self.session_pool(credentials).await?;
        tracing::info!("Running user table migrations...");
        sqlx::migrate!("./migrations").run(&pool).await?;
        tracing::info!("User table migrations complete");
        Ok(())
    }

    async fn release(&self) {
        if let Some(session) = self.pool.lock().await.take() {
            session.pool.close().await;
            tracing::debug!(username = %session.credentials.username, "Session pool closed");
        }
    }
}

// =============================================================================
// Repository
// =============================================================================

/// User store backed by the `espf.users` table.
#[derive(Debug, Clone)]
pub struct PgUserStore {
    pool: PgPool,
}

impl PgUserStore {
    /// Wrap an existing connection pool.
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn find_by_username(&self, username: &str) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM espf.users WHERE username = $1"
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }

    async fn find_all(&self) -> Result<Vec<User>, RepositoryError> {
        let rows = sqlx::query_as::<_, UserRow>(&format!(
            "SELECT {USER_COLUMNS} FROM espf.users ORDER BY id ASC"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn insert(&self, user: NewUser) -> Result<User, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            r"
            INSERT INTO espf.users (username, password_hash, activated, expiration_date)
            VALUES ($1, $2, $3, $4)
            RETURNING {USER_COLUMNS}
            "
        ))
        .bind(user.username.as_str())
        .bind(user.password_hash.as_str())
        .bind(user.activated)
        .bind(user.expiration_date)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_or_database(e, "username already exists"))?;

        row.try_into()
    }

    async fn update_field(
        &self,
        username: &str,
        change: FieldChange,
    ) -> Result<bool, RepositoryError> {
        let query = match &change {
            FieldChange::Username(new_username) => sqlx::query(
                "UPDATE espf.users SET username = $2, updated_at = NOW() WHERE username = $1",
            )
            .bind(username)
            .bind(new_username.as_str()),
            FieldChange::PasswordHash(hash) => sqlx::query(
                "UPDATE espf.users SET password_hash = $2, updated_at = NOW() WHERE username = $1",
            )
            .bind(username)
            .bind(hash.as_str()),
            FieldChange::Activated(activated) => sqlx::query(
                "UPDATE espf.users SET activated = $2, updated_at = NOW() WHERE username = $1",
            )
            .bind(username)
            .bind(*activated),
            FieldChange::ExpirationDate(date) => sqlx::query(
                "UPDATE espf.users SET expiration_date = $2, updated_at = NOW() WHERE username = $1",
            )
            .bind(username)
            .bind(*date),
        };

        let result = query
            .execute(&self.pool)
            .await
            .map_err(|e| conflict_or_database(e, "username already exists"))?;

        tracing::debug!(
            username,
            field = %change.field(),
            rows = result.rows_affected(),
            "Updated user field"
        );

        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, username: &str) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(&format!(
            "DELETE FROM espf.users WHERE username = $1 RETURNING {USER_COLUMNS}"
        ))
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        row.map(TryInto::try_into).transpose()
    }
}

/// Map unique violations to `Conflict`, everything else to `Database`.
fn conflict_or_database(e: sqlx::Error, conflict: &str) -> RepositoryError {
    if let sqlx::Error::Database(ref db_err) = e
        && db_err.is_unique_violation()
    {
        return RepositoryError::Conflict(conflict.to_owned());
    }
    RepositoryError::Database(e)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use super::*;

    /// A gateway pointed at a port nothing listens on.
    fn unreachable_gateway() -> PgGateway {
        PgGateway::new(DatabaseConfig {
            port: 1,
            connect_timeout: Duration::from_secs(1),
            ..DatabaseConfig::default()
        })
    }

    async fn seed_pool(gateway: &PgGateway, credentials: &AdminCredentials) -> PgPool {
        let pool = PgPoolOptions::new().connect_lazy_with(gateway.connect_options(credentials));
        *gateway.pool.lock().await = Some(SessionPool {
            credentials: credentials.clone(),
            pool: pool.clone(),
        });
        pool
    }

    #[tokio::test]
    async fn test_session_pool_is_reused_for_same_credentials() {
        let gateway = unreachable_gateway();
        let root = AdminCredentials::new("root", "s3cret");
        let seeded = seed_pool(&gateway, &root).await;

        let pool = gateway.session_pool(&root).await.unwrap();

        assert!(!pool.is_closed());
        assert!(!seeded.is_closed());
    }

    #[tokio::test]
    async fn test_other_credentials_close_the_previous_pool() {
        let gateway = unreachable_gateway();
        let seeded = seed_pool(&gateway, &AdminCredentials::new("root", "s3cret")).await;

        let result = gateway
            .session_pool(&AdminCredentials::new("root", "rotated"))
            .await;

        assert!(result.is_err());
        assert!(seeded.is_closed());
        assert!(gateway.pool.lock().await.is_none());
    }

    #[tokio::test]
    async fn test_release_closes_the_session_pool() {
        let gateway = unreachable_gateway();
        let seeded = seed_pool(&gateway, &AdminCredentials::new("root", "s3cret")).await;

        gateway.release().await;
        gateway.release().await;

        assert!(seeded.is_closed());
        assert!(gateway.pool.lock().await.is_none());
    }
}
