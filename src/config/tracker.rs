use std::path::PathBuf;

use secrecy::SecretString;
use url::Url;

use crate::config::helpers::{optional_env, parse_string_env};
use crate::error::ConfigError;
use crate::settings::{Settings, buildtrack_dir};
use crate::tracker::model::TaskStatus;

/// Project tracking behavior and client-side persistence settings.
#[derive(Debug, Clone)]
pub struct TrackerConfig {
    /// Status a completed task falls back to when toggled off.
    pub reopen_status: TaskStatus,
    /// Credential that unlocks admin mode. `None` keeps every session read-only.
    pub admin_credential: Option<SecretString>,
    /// Local-only snapshot slot.
    pub snapshot_path: PathBuf,
    /// Base URL of a remote API server, when the remote variant is used.
    pub remote_url: Option<Url>,
}

pub fn default_snapshot_path() -> PathBuf {
    buildtrack_dir().join("project.json")
}

pub(crate) fn parse_reopen_status(raw: &str) -> Result<TaskStatus, ConfigError> {
    match raw.trim().to_ascii_lowercase().replace('-', "_").as_str() {
        "pending" => Ok(TaskStatus::Pending),
        "in_progress" | "inprogress" => Ok(TaskStatus::InProgress),
        other => Err(ConfigError::InvalidValue {
            key: "BUILDTRACK_REOPEN_STATUS".to_string(),
            message: format!("expected 'pending' or 'in_progress', got '{other}'"),
        }),
    }
}

pub(crate) fn validate_remote_url(raw: &str) -> Result<Url, ConfigError> {
    let invalid = |message: String| ConfigError::InvalidValue {
        key: "BUILDTRACK_REMOTE_URL".to_string(),
        message,
    };

    let mut url = Url::parse(raw.trim()).map_err(|e| invalid(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!(
            "remote url must use http or https, got '{}'",
            url.scheme()
        )));
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err(invalid("remote url must include a host".to_string()));
    }
    if url.query().is_some() || url.fragment().is_some() {
        return Err(invalid(
            "remote url must not carry a query or fragment".to_string(),
        ));
    }

    // Endpoint paths are joined onto the base, which needs a trailing slash.
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

fn validate_snapshot_path(raw: &str) -> Result<PathBuf, ConfigError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::InvalidValue {
            key: "BUILDTRACK_SNAPSHOT_PATH".to_string(),
            message: "snapshot path must not be empty".to_string(),
        });
    }
    if trimmed.ends_with('/') || trimmed.ends_with('\\') {
        return Err(ConfigError::InvalidValue {
            key: "BUILDTRACK_SNAPSHOT_PATH".to_string(),
            message: "snapshot path must name a file".to_string(),
        });
    }
    Ok(PathBuf::from(trimmed))
}

impl TrackerConfig {
    pub(crate) fn resolve(settings: &Settings) -> Result<Self, ConfigError> {
        let reopen_status = parse_reopen_status(&parse_string_env(
            "BUILDTRACK_REOPEN_STATUS",
            settings.tracker.reopen_status.clone(),
        )?)?;

        let snapshot_path = match optional_env("BUILDTRACK_SNAPSHOT_PATH")?
            .or_else(|| settings.tracker.snapshot_path.clone())
        {
            Some(raw) => validate_snapshot_path(&raw)?,
            None => default_snapshot_path(),
        };

        let remote_url = optional_env("BUILDTRACK_REMOTE_URL")?
            .or_else(|| settings.tracker.remote_url.clone())
            .map(|raw| validate_remote_url(&raw))
            .transpose()?;

        Ok(Self {
            reopen_status,
            admin_credential: optional_env("BUILDTRACK_ADMIN_PASSWORD")?.map(SecretString::from),
            snapshot_path,
            remote_url,
        })
    }
}
