//! Where a session's project document lives.
//!
//! Two adapters share one contract: [`RemoteProject`] talks to the API
//! server, [`LocalSnapshot`] keeps the document in a JSON file on disk.

mod local;
mod remote;

pub use local::LocalSnapshot;
pub use remote::{RemoteProject, photo_id_from_url};

use async_trait::async_trait;
use thiserror::Error;

use crate::tracker::model::Project;

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("{error}{}", detail_suffix(.details))]
    Api {
        status: u16,
        error: String,
        details: Option<String>,
    },

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("invalid endpoint url: {0}")]
    Url(#[from] url::ParseError),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("snapshot I/O failed for {path}: {reason}")]
    Io { path: String, reason: String },
}

fn detail_suffix(details: &Option<String>) -> String {
    details
        .as_deref()
        .map(|d| format!(": {d}"))
        .unwrap_or_default()
}

/// Storage contract for a whole project document and its photo blobs.
#[async_trait]
pub trait ProjectPersistence: Send + Sync {
    /// Fetch the stored project, seeding defaults when none exists yet.
    async fn load(&self) -> Result<Project, PersistenceError>;

    /// Replace the stored project wholesale. Last write wins.
    async fn save(&self, project: &Project) -> Result<(), PersistenceError>;

    /// Store an encoded photo and return the url the document should carry.
    async fn store_photo(&self, data_url: String) -> Result<String, PersistenceError>;

    /// Release the blob behind `url`, if it is stored out of band.
    async fn delete_photo(&self, url: &str) -> Result<(), PersistenceError>;
}
