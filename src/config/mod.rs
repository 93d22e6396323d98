//! Resolved runtime configuration.
//!
//! Precedence, highest first: process environment (including a `.env` file
//! loaded by the binary), `~/.buildtrack/settings.toml`, built-in defaults.

mod database;
mod gateway;
pub(crate) mod helpers;
pub(crate) mod tracker;

pub use database::{DatabaseBackend, DatabaseConfig, default_libsql_path};
pub use gateway::GatewayConfig;
pub use tracker::{TrackerConfig, default_snapshot_path};

use crate::error::ConfigError;
use crate::settings::Settings;

/// Configuration for the API server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub database: DatabaseConfig,
    pub gateway: GatewayConfig,
}

impl ServerConfig {
    pub fn resolve(settings: &Settings) -> Result<Self, ConfigError> {
        Ok(Self {
            database: DatabaseConfig::resolve(settings)?,
            gateway: GatewayConfig::resolve(settings)?,
        })
    }
}

impl TrackerConfig {
    pub fn from_settings(settings: &Settings) -> Result<Self, ConfigError> {
        Self::resolve(settings)
    }
}
