//! services/dashboard/src/config.rs
//!
//! Defines the dashboard's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
use std::time::Duration;
use tracing::Level;
use uuid::Uuid;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    /// Connection string for the hosted platform's database. `None` runs the
    /// in-memory demo backend.
    pub database_url: Option<String>,
    pub log_level: Level,
    /// The account signed in when the process starts, if any.
    pub user_id: Option<Uuid>,
    pub remote_timeout: Duration,
    pub run_migrations: bool,
    pub allowed_origin: String,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to keep tests hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // --- Server Settings ---
        let bind_address_str = lookup("BIND_ADDRESS").unwrap_or_else(|| "0.0.0.0:3000".to_string());
        let bind_address = bind_address_str.parse::<SocketAddr>().map_err(|e| {
            ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string())
        })?;

        let log_level_str = lookup("RUST_LOG").unwrap_or_else(|| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let allowed_origin =
            lookup("ALLOWED_ORIGIN").unwrap_or_else(|| "http://localhost:3000".to_string());

        // --- Remote Platform Settings ---
        let database_url = lookup("DATABASE_URL").filter(|url| !url.trim().is_empty());

        let user_id = lookup("DASHBOARD_USER_ID")
            .map(|raw| {
                Uuid::parse_str(raw.trim()).map_err(|e| {
                    ConfigError::InvalidValue("DASHBOARD_USER_ID".to_string(), e.to_string())
                })
            })
            .transpose()?;

        let timeout_secs = match lookup("REMOTE_TIMEOUT_SECS") {
            Some(raw) => raw.trim().parse::<u64>().ok().filter(|s| *s > 0).ok_or_else(|| {
                ConfigError::InvalidValue(
                    "REMOTE_TIMEOUT_SECS".to_string(),
                    format!("'{}' is not a positive number of seconds", raw),
                )
            })?,
            None => 10,
        };

        let run_migrations = match lookup("RUN_MIGRATIONS").as_deref().map(str::trim) {
            None | Some("") | Some("0") | Some("false") => false,
            Some("1") | Some("true") => true,
            Some(other) => {
                return Err(ConfigError::InvalidValue(
                    "RUN_MIGRATIONS".to_string(),
                    format!("'{}' is not a boolean", other),
                ))
            }
        };
        if run_migrations && database_url.is_none() {
            return Err(ConfigError::MissingVar("DATABASE_URL".to_string()));
        }

        Ok(Self {
            bind_address,
            database_url,
            log_level,
            user_id,
            remote_timeout: Duration::from_secs(timeout_secs),
            run_migrations,
            allowed_origin,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> =
            vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = load(&[]).unwrap();
        assert_eq!(config.bind_address.port(), 3000);
        assert_eq!(config.log_level, Level::INFO);
        assert_eq!(config.remote_timeout, Duration::from_secs(10));
        assert!(config.database_url.is_none());
        assert!(config.user_id.is_none());
        assert!(!config.run_migrations);
    }

    #[test]
    fn rejects_zero_timeout() {
        let err = load(&[("REMOTE_TIMEOUT_SECS", "0")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(ref key, _) if key == "REMOTE_TIMEOUT_SECS"));
    }

    #[test]
    fn rejects_malformed_user_id() {
        let err = load(&[("DASHBOARD_USER_ID", "not-a-uuid")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue(ref key, _) if key == "DASHBOARD_USER_ID"));
    }

    #[test]
    fn migrations_need_a_database() {
        let err = load(&[("RUN_MIGRATIONS", "true")]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingVar(ref key) if key == "DATABASE_URL"));
    }

    #[test]
    fn reads_explicit_values() {
        let user = Uuid::new_v4().to_string();
        let config = load(&[
            ("DATABASE_URL", "postgres://localhost/app"),
            ("DASHBOARD_USER_ID", user.as_str()),
            ("REMOTE_TIMEOUT_SECS", "3"),
            ("RUN_MIGRATIONS", "1"),
            ("RUST_LOG", "debug"),
        ])
        .unwrap();
        assert_eq!(config.database_url.as_deref(), Some("postgres://localhost/app"));
        assert_eq!(config.user_id.map(|u| u.to_string()), Some(user));
        assert_eq!(config.remote_timeout, Duration::from_secs(3));
        assert!(config.run_migrations);
        assert_eq!(config.log_level, Level::DEBUG);
    }
}
