//! Admin configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Store
//! - `ADMIN_STORE` - `postgres` (default) or `memory`
//! - `ADMIN_DATABASE_URL` - `PostgreSQL` connection string (falls back to
//!   `DATABASE_URL`), required when the store is `postgres`
//!
//! ## Optional
//! - `ADMIN_HOST` - Bind address (default: 127.0.0.1)
//! - `ADMIN_PORT` - Listen port (default: 9000)
//! - `AUTH_ATTEMPTS_FOR_IP` - Failed logins allowed per IP (default: 50)
//! - `AUTH_ATTEMPTS_FOR_IP_AND_USER` - Failed logins allowed per IP and
//!   username (default: 7)
//! - `LOG_FORMAT` - `json` for structured logs, anything else for text
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Traces sample rate (default: 1.0)

use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use secrecy::SecretString;
use thiserror::Error;

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: &str = "9000";
const DEFAULT_AUTH_ATTEMPTS_FOR_IP: &str = "50";
const DEFAULT_AUTH_ATTEMPTS_FOR_IP_AND_USER: &str = "7";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Where admin and user records are kept.
#[derive(Clone)]
pub enum StoreConfig {
    /// `PostgreSQL`, reached through the given connection URL.
    Postgres {
        /// Connection URL (contains password).
        database_url: SecretString,
    },
    /// Process-local maps; contents are lost on exit.
    Memory,
}

impl std::fmt::Debug for StoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Postgres { .. } => f
                .debug_struct("Postgres")
                .field("database_url", &"[REDACTED]")
                .finish(),
            Self::Memory => f.write_str("Memory"),
        }
    }
}

/// Login throttling thresholds.
///
/// Consumed by the authentication layer in front of this service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthAttemptsConfig {
    /// Failed attempts allowed from one IP address.
    pub for_ip: u32,
    /// Failed attempts allowed for one username from one IP address.
    pub for_ip_and_user: u32,
}

impl Default for AuthAttemptsConfig {
    fn default() -> Self {
        Self {
            for_ip: 50,
            for_ip_and_user: 7,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}

/// Admin application configuration.
#[derive(Debug, Clone)]
pub struct AdminConfig {
    /// Record store backend
    pub store: StoreConfig,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Login throttling thresholds
    pub auth_attempts: AuthAttemptsConfig,
    /// Log output format
    pub log_format: LogFormat,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g., "development", "staging", "production")
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate (0.0 to 1.0)
    pub sentry_sample_rate: f32,
    /// Sentry traces sample rate for performance monitoring (0.0 to 1.0)
    pub sentry_traces_sample_rate: f32,
}

impl AdminConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let store = StoreConfig::from_env()?;
        let host = parse_env::<IpAddr>("ADMIN_HOST", DEFAULT_HOST)?;
        let port = parse_env::<u16>("ADMIN_PORT", DEFAULT_PORT)?;
        let auth_attempts = AuthAttemptsConfig {
            for_ip: parse_env("AUTH_ATTEMPTS_FOR_IP", DEFAULT_AUTH_ATTEMPTS_FOR_IP)?,
            for_ip_and_user: parse_env(
                "AUTH_ATTEMPTS_FOR_IP_AND_USER",
                DEFAULT_AUTH_ATTEMPTS_FOR_IP_AND_USER,
            )?,
        };
        let log_format = match get_optional_env("LOG_FORMAT").as_deref() {
            Some("json") => LogFormat::Json,
            _ => LogFormat::Text,
        };
        let sentry_dsn = get_optional_env("SENTRY_DSN");
        let sentry_environment = get_optional_env("SENTRY_ENVIRONMENT");
        let sentry_sample_rate = get_optional_env("SENTRY_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);
        let sentry_traces_sample_rate = get_optional_env("SENTRY_TRACES_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);

        Ok(Self {
            store,
            host,
            port,
            auth_attempts,
            log_format,
            sentry_dsn,
            sentry_environment,
            sentry_sample_rate,
            sentry_traces_sample_rate,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl StoreConfig {
    fn from_env() -> Result<Self, ConfigError> {
        match get_optional_env("ADMIN_STORE").as_deref() {
            None | Some("postgres") => Ok(Self::Postgres {
                database_url: get_database_url("ADMIN_DATABASE_URL")?,
            }),
            Some("memory") => Ok(Self::Memory),
            Some(other) => Err(ConfigError::InvalidEnvVar(
                "ADMIN_STORE".to_string(),
                format!("unknown store '{other}' (expected 'postgres' or 'memory')"),
            )),
        }
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Parse an environment variable, falling back to `default` when unset.
fn parse_env<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    parse_value(key, &std::env::var(key).unwrap_or_else(|_| default.to_string()))
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_value_valid() {
        let port: u16 = parse_value("ADMIN_PORT", " 9000 ").unwrap();
        assert_eq!(port, 9000);

        let host: IpAddr = parse_value("ADMIN_HOST", "0.0.0.0").unwrap();
        assert_eq!(host.to_string(), "0.0.0.0");
    }

    #[test]
    fn test_parse_value_invalid() {
        let err = parse_value::<u16>("ADMIN_PORT", "ninety").unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(ref key, _) if key == "ADMIN_PORT"));

        let err = parse_value::<u32>("AUTH_ATTEMPTS_FOR_IP", "-1").unwrap_err();
        assert!(err.to_string().contains("AUTH_ATTEMPTS_FOR_IP"));
    }

    #[test]
    fn test_auth_attempt_defaults_match_env_defaults() {
        let defaults = AuthAttemptsConfig::default();
        assert_eq!(
            defaults.for_ip,
            parse_value::<u32>("", DEFAULT_AUTH_ATTEMPTS_FOR_IP).unwrap()
        );
        assert_eq!(
            defaults.for_ip_and_user,
            parse_value::<u32>("", DEFAULT_AUTH_ATTEMPTS_FOR_IP_AND_USER).unwrap()
        );
    }

    #[test]
    fn test_socket_addr() {
        let config = AdminConfig {
            store: StoreConfig::Memory,
            host: "127.0.0.1".parse().unwrap(),
            port: 9000,
            auth_attempts: AuthAttemptsConfig::default(),
            log_format: LogFormat::Text,
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 1.0,
        };

        let addr = config.socket_addr();
        assert_eq!(addr.ip().to_string(), "127.0.0.1");
        assert_eq!(addr.port(), 9000);
    }

    #[test]
    fn test_store_config_debug_redacts_database_url() {
        let config = StoreConfig::Postgres {
            database_url: SecretString::from("postgres://backroom:hunter2@db/backroom"),
        };

        let debug_output = format!("{config:?}");

        assert!(debug_output.contains("Postgres"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("hunter2"));
    }
}
