//! Persisted user settings (`~/.buildtrack/settings.toml`).
//!
//! Every field has a default so a missing or partial file is valid. Values
//! here are the lowest-precedence layer: environment variables resolved in
//! [`crate::config`] override them.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub gateway: GatewaySettings,
    pub tracker: TrackerSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSettings {
    /// `postgres` or `libsql`.
    pub backend: String,
    pub pool_size: usize,
    pub libsql_path: Option<String>,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            backend: "postgres".to_string(),
            pool_size: 8,
            libsql_path: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewaySettings {
    pub host: String,
    pub port: u16,
    pub allowed_origins: Vec<String>,
    pub max_body_bytes: usize,
    pub max_photo_bytes: usize,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3000,
            allowed_origins: Vec::new(),
            max_body_bytes: 16 * 1024 * 1024,
            max_photo_bytes: 4 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerSettings {
    /// Status a completed task returns to when un-toggled: `pending` or `in_progress`.
    pub reopen_status: String,
    pub snapshot_path: Option<String>,
    pub remote_url: Option<String>,
}

impl Default for TrackerSettings {
    fn default() -> Self {
        Self {
            reopen_status: "pending".to_string(),
            snapshot_path: None,
            remote_url: None,
        }
    }
}

/// Base directory for buildtrack state (`~/.buildtrack`).
pub fn buildtrack_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".buildtrack")
}

impl Settings {
    pub fn default_path() -> PathBuf {
        buildtrack_dir().join("settings.toml")
    }

    /// Load settings from `path`, falling back to defaults when the file is absent.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No settings file at {:?}, using defaults", path);
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(ConfigError::SettingsRead {
                    path: path.display().to_string(),
                    reason: e.to_string(),
                });
            }
        };

        toml::from_str(&raw).map_err(|e| ConfigError::SettingsParse {
            path: path.display().to_string(),
            reason: e.to_string(),
        })
    }

    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::default_path())
    }
}
