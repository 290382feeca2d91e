//! Admin tool configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Optional
//! - `ESPF_DATABASE_HOST` - Database host (default: 127.0.0.1)
//! - `ESPF_DATABASE_PORT` - Database port (default: 5432)
//! - `ESPF_DATABASE_NAME` - Database holding the user table (default: `espf_users`)
//! - `ESPF_SESSION_TTL_SECS` - Admin session lifetime in seconds (default: 300, max: 86400)
//! - `ESPF_CONNECT_TIMEOUT_SECS` - Database connect timeout in seconds (default: 10, max: 3600)
//!
//! Admin credentials are never read from the environment: they are entered
//! with `login` and only kept in memory for the session.

use std::time::Duration;

use thiserror::Error;

use crate::services::MAX_SESSION_TTL;

const DEFAULT_DATABASE_NAME: &str = "espf_users";
const DEFAULT_SESSION_TTL_SECS: u64 = 300;
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
const MAX_SESSION_TTL_SECS: u64 = MAX_SESSION_TTL.as_secs();
const MAX_CONNECT_TIMEOUT_SECS: u64 = 3_600;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Admin tool configuration.
#[derive(Debug, Clone)]
pub struct AdminToolConfig {
    /// Where the user table lives
    pub database: DatabaseConfig,
    /// How long an admin session stays valid after login
    pub session_ttl: Duration,
}

/// Database location.
///
/// Holds no credentials: those come from the admin session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    /// Database host name or IP address
    pub host: String,
    /// Database port
    pub port: u16,
    /// Database name
    pub name: String,
    /// Upper bound on a single connection attempt
    pub connect_timeout: Duration,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_owned(),
            port: 5432,
            name: DEFAULT_DATABASE_NAME.to_owned(),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
        }
    }
}

impl AdminToolConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set but cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database = DatabaseConfig::from_env()?;
        let session_ttl = get_seconds(
            "ESPF_SESSION_TTL_SECS",
            DEFAULT_SESSION_TTL_SECS,
            MAX_SESSION_TTL_SECS,
        )?;

        Ok(Self {
            database,
            session_ttl,
        })
    }
}

impl DatabaseConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let port = get_env_or_default("ESPF_DATABASE_PORT", "5432")
            .parse::<u16>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("ESPF_DATABASE_PORT".to_string(), e.to_string())
            })?;

        let name = get_env_or_default("ESPF_DATABASE_NAME", DEFAULT_DATABASE_NAME);
        if name.is_empty() {
            return Err(ConfigError::InvalidEnvVar(
                "ESPF_DATABASE_NAME".to_string(),
                "must not be empty".to_string(),
            ));
        }

        Ok(Self {
            host: get_env_or_default("ESPF_DATABASE_HOST", "127.0.0.1"),
            port,
            name,
            connect_timeout: get_seconds(
                "ESPF_CONNECT_TIMEOUT_SECS",
                DEFAULT_CONNECT_TIMEOUT_SECS,
                MAX_CONNECT_TIMEOUT_SECS,
            )?,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Get a number of seconds in `1..=max`.
fn get_seconds(key: &str, default: u64, max: u64) -> Result<Duration, ConfigError> {
    let Some(raw) = get_optional_env(key) else {
        return Ok(Duration::from_secs(default));
    };

    match raw.parse::<u64>() {
        Ok(0) => Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            "must be greater than zero".to_string(),
        )),
        Ok(secs) if secs > max => Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("must be at most {max}"),
        )),
        Ok(secs) => Ok(Duration::from_secs(secs)),
        Err(e) => Err(ConfigError::InvalidEnvVar(key.to_string(), e.to_string())),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_database_defaults() {
        let config = DatabaseConfig::default();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 5432);
        assert_eq!(config.name, "espf_users");
        assert_eq!(config.connect_timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_get_seconds_default_when_unset() {
        let ttl = get_seconds("ESPF_TEST_UNSET_TTL_VARIABLE", 300, 86_400).unwrap();
        assert_eq!(ttl, Duration::from_secs(300));
    }

    #[test]
    #[allow(unsafe_code)]
    fn test_get_seconds_rejects_zero_and_garbage() {
        // SAFETY: test-only variables with names no other test reads
        unsafe {
            std::env::set_var("ESPF_TEST_ZERO_TTL", "0");
            std::env::set_var("ESPF_TEST_BAD_TTL", "five");
        }
        assert!(matches!(
            get_seconds("ESPF_TEST_ZERO_TTL", 300, 86_400),
            Err(ConfigError::InvalidEnvVar(..))
        ));
        assert!(matches!(
            get_seconds("ESPF_TEST_BAD_TTL", 300, 86_400),
            Err(ConfigError::InvalidEnvVar(..))
        ));
    }

    #[test]
    #[allow(unsafe_code)]
    fn test_get_seconds_parses_value() {
        // SAFETY: test-only variable with a name no other test reads
        unsafe {
            std::env::set_var("ESPF_TEST_GOOD_TTL", "42");
        }
        assert_eq!(
            get_seconds("ESPF_TEST_GOOD_TTL", 300, 86_400).unwrap(),
            Duration::from_secs(42)
        );
    }

    #[test]
    #[allow(unsafe_code)]
    fn test_get_seconds_rejects_values_above_max() {
        // SAFETY: test-only variables with names no other test reads
        unsafe {
            std::env::set_var("ESPF_TEST_HUGE_TTL", "18446744073709551615");
            std::env::set_var("ESPF_TEST_MAX_TTL", "86400");
        }
        assert!(matches!(
            get_seconds("ESPF_TEST_HUGE_TTL", 300, MAX_SESSION_TTL_SECS),
            Err(ConfigError::InvalidEnvVar(ref key, _)) if key == "ESPF_TEST_HUGE_TTL"
        ));
        assert_eq!(
            get_seconds("ESPF_TEST_MAX_TTL", 300, MAX_SESSION_TTL_SECS).unwrap(),
            Duration::from_secs(86_400)
        );
    }
}
