use std::path::PathBuf;

use async_trait::async_trait;

use crate::persistence::{PersistenceError, ProjectPersistence};
use crate::tracker::format::now;
use crate::tracker::model::Project;
use crate::tracker::seed::{LOCAL_INIT_MESSAGE, seed_project};

/// Single-slot JSON snapshot on local disk. Photos stay embedded.
#[derive(Debug, Clone)]
pub struct LocalSnapshot {
    path: PathBuf,
}

impl LocalSnapshot {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn io_error(&self, e: std::io::Error) -> PersistenceError {
        PersistenceError::Io {
            path: self.path.display().to_string(),
            reason: e.to_string(),
        }
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl ProjectPersistence for LocalSnapshot {
    async fn load(&self) -> Result<Project, PersistenceError> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No snapshot at {:?}, seeding defaults", self.path);
                return Ok(seed_project(LOCAL_INIT_MESSAGE, &now()));
            }
            Err(e) => return Err(self.io_error(e)),
        };

        match serde_json::from_str(&raw) {
            Ok(project) => Ok(project),
            Err(e) => {
                tracing::warn!(
                    "Snapshot at {:?} is unreadable ({}), starting from defaults",
                    self.path,
                    e
                );
                Ok(seed_project(LOCAL_INIT_MESSAGE, &now()))
            }
        }
    }

    async fn save(&self, project: &Project) -> Result<(), PersistenceError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| self.io_error(e))?;
        }

        let body = serde_json::to_vec_pretty(project)?;
        let temp = self.temp_path();
        tokio::fs::write(&temp, body)
            .await
            .map_err(|e| self.io_error(e))?;
        tokio::fs::rename(&temp, &self.path)
            .await
            .map_err(|e| self.io_error(e))?;
        tracing::debug!("Snapshot written to {:?}", self.path);
        Ok(())
    }

    async fn store_photo(&self, data_url: String) -> Result<String, PersistenceError> {
        Ok(data_url)
    }

    async fn delete_photo(&self, _url: &str) -> Result<(), PersistenceError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracker::seed::seed_phases;

    #[tokio::test]
    async fn missing_snapshot_loads_seed() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = LocalSnapshot::new(dir.path().join("project.json"));

        let project = store.load().await.expect("seed");
        assert_eq!(project.phases, seed_phases());
        assert_eq!(project.logs.len(), 1);
        assert_eq!(project.logs[0].message, LOCAL_INIT_MESSAGE);
    }

    #[tokio::test]
    async fn corrupt_snapshot_falls_back_to_seed() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("project.json");
        std::fs::write(&path, "{ not json").expect("write corrupt");

        let project = LocalSnapshot::new(&path).load().await.expect("seed");
        assert_eq!(project.phases.len(), 6);
    }

    #[tokio::test]
    async fn save_then_load_returns_the_same_project() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = LocalSnapshot::new(dir.path().join("nested").join("project.json"));

        let mut project = store.load().await.expect("seed");
        project.project_name = "Lake House".to_string();
        store.save(&project).await.expect("save");

        assert!(!store.temp_path().exists());
        let loaded = store.load().await.expect("load");
        assert_eq!(loaded, project);
    }

    #[tokio::test]
    async fn photos_are_embedded() {
        let store = LocalSnapshot::new("unused.json");
        let url = store
            .store_photo("data:image/png;base64,AA==".to_string())
            .await
            .expect("store");
        assert_eq!(url, "data:image/png;base64,AA==");
        store.delete_photo(&url).await.expect("delete is a no-op");
    }
}
