//! Error types shared across the crate.
//!
//! Module-local failures (validation, media, admin gate, persistence
//! adapters) live next to the code that raises them; this module holds the
//! infrastructure errors that cross module boundaries.

use thiserror::Error;

/// Configuration resolution errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required configuration: {key}")]
    MissingRequired { key: String },

    #[error("invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("failed to read settings file {path}: {reason}")]
    SettingsRead { path: String, reason: String },

    #[error("failed to parse settings file {path}: {reason}")]
    SettingsParse { path: String, reason: String },
}

/// Storage backend errors.
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("connection pool error: {0}")]
    Pool(String),

    #[error("query failed: {0}")]
    Query(String),

    #[error("migration failed: {0}")]
    Migration(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[cfg(feature = "postgres")]
    #[error("postgres error: {0}")]
    Postgres(#[from] tokio_postgres::Error),

    #[cfg(feature = "libsql")]
    #[error("libsql error: {0}")]
    LibSql(#[from] libsql::Error),
}

#[cfg(feature = "postgres")]
impl From<deadpool_postgres::PoolError> for DatabaseError {
    fn from(err: deadpool_postgres::PoolError) -> Self {
        Self::Pool(err.to_string())
    }
}

impl From<serde_json::Error> for DatabaseError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// HTTP gateway lifecycle errors.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("gateway failed to start: {reason}")]
    StartupFailed { reason: String },

    #[error("invalid CORS origin '{origin}'")]
    InvalidOrigin { origin: String },
}
