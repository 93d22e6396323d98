use std::path::PathBuf;

use secrecy::SecretString;

use crate::config::helpers::{optional_env, parse_optional_env, parse_string_env};
use crate::error::ConfigError;
use crate::settings::{Settings, buildtrack_dir};

/// Which storage backend the API server persists to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseBackend {
    Postgres,
    LibSql,
}

impl DatabaseBackend {
    fn from_str(value: &str) -> Result<Self, ConfigError> {
        match value.trim().to_ascii_lowercase().as_str() {
            "postgres" | "postgresql" | "pg" => Ok(Self::Postgres),
            "libsql" | "sqlite" | "turso" => Ok(Self::LibSql),
            other => Err(ConfigError::InvalidValue {
                key: "DATABASE_BACKEND".to_string(),
                message: format!("unsupported backend '{other}'"),
            }),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Postgres => "postgres",
            Self::LibSql => "libsql",
        }
    }
}

/// Storage connection settings.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub backend: DatabaseBackend,
    pub url: Option<SecretString>,
    pub pool_size: usize,
    pub libsql_path: Option<PathBuf>,
}

pub fn default_libsql_path() -> PathBuf {
    buildtrack_dir().join("buildtrack.db")
}

impl DatabaseConfig {
    pub(crate) fn resolve(settings: &Settings) -> Result<Self, ConfigError> {
        let backend = DatabaseBackend::from_str(&parse_string_env(
            "DATABASE_BACKEND",
            settings.database.backend.clone(),
        )?)?;

        let url = optional_env("DATABASE_URL")?.map(SecretString::from);
        if backend == DatabaseBackend::Postgres && url.is_none() {
            return Err(ConfigError::MissingRequired {
                key: "DATABASE_URL".to_string(),
            });
        }

        let pool_size = parse_optional_env("DATABASE_POOL_SIZE", settings.database.pool_size)?;
        if pool_size == 0 {
            return Err(ConfigError::InvalidValue {
                key: "DATABASE_POOL_SIZE".to_string(),
                message: "pool size must be at least 1".to_string(),
            });
        }

        let libsql_path = optional_env("LIBSQL_PATH")?
            .or_else(|| settings.database.libsql_path.clone())
            .map(PathBuf::from);

        Ok(Self {
            backend,
            url,
            pool_size,
            libsql_path,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::DatabaseBackend;

    #[test]
    fn backend_names_are_case_insensitive() {
        assert_eq!(
            DatabaseBackend::from_str("LibSQL").expect("libsql"),
            DatabaseBackend::LibSql
        );
        assert_eq!(
            DatabaseBackend::from_str(" postgresql ").expect("postgres"),
            DatabaseBackend::Postgres
        );
        assert!(DatabaseBackend::from_str("mongo").is_err());
    }
}
