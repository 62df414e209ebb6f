//! services/dashboard/src/error.rs
//!
//! Startup and shutdown failures of the `dashboard` binary. Request-time
//! failures never reach this type; handlers map `StoreError` to a status.

use crate::config::ConfigError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// The platform database could not be reached or queried.
    #[error("Platform database unavailable: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Schema migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Binding the listener or serving connections failed.
    #[error("Server I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Startup failed: {0}")]
    Internal(String),
}
