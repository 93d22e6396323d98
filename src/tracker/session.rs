//! An editing session over one project document.
//!
//! The session owns the in-memory project, the admin gate and the
//! persistence adapter. Mutations are applied locally and mark the session
//! dirty; [`Session::save`] writes the whole document back.

use futures::future::join_all;
use thiserror::Error;

use crate::config::TrackerConfig;
use crate::persistence::{PersistenceError, ProjectPersistence};
use crate::tracker::admin::{AdminError, AdminGate, AdminMode};
use crate::tracker::format::now;
use crate::tracker::media::{MediaError, PhotoFile};
use crate::tracker::model::{Photo, Project, TaskStatus};
use crate::tracker::mutation::{MutationResult, ValidationError, parse_amount};
use crate::tracker::seed::{LOCAL_INIT_MESSAGE, seed_project};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("admin mode is required for this action")]
    AdminRequired,

    #[error(transparent)]
    Admin(#[from] AdminError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Media(#[from] MediaError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveState {
    Saved,
    Unsaved,
    Saving,
}

pub struct Session {
    project: Project,
    persistence: Box<dyn ProjectPersistence>,
    admin: AdminGate,
    reopen_status: TaskStatus,
    save_state: SaveState,
    banner: Option<String>,
    /// Blobs of deleted photos, released once the document no longer
    /// references them.
    pending_releases: Vec<String>,
}

impl Session {
    /// Load the project. A failed load shows a banner and starts from the seed.
    pub async fn open(persistence: Box<dyn ProjectPersistence>, config: &TrackerConfig) -> Self {
        let (project, banner) = match persistence.load().await {
            Ok(project) => (project, None),
            Err(e) => {
                tracing::error!("Failed to load project: {}", e);
                (
                    seed_project(LOCAL_INIT_MESSAGE, &now()),
                    Some(format!("Could not load the project: {e}")),
                )
            }
        };

        Self {
            project,
            persistence,
            admin: AdminGate::new(config.admin_credential.clone()),
            reopen_status: config.reopen_status,
            save_state: SaveState::Saved,
            banner,
            pending_releases: Vec::new(),
        }
    }

    pub fn project(&self) -> &Project {
        &self.project
    }

    pub fn banner(&self) -> Option<&str> {
        self.banner.as_deref()
    }

    pub fn dismiss_banner(&mut self) {
        self.banner = None;
    }

    pub fn save_state(&self) -> SaveState {
        self.save_state
    }

    pub fn is_dirty(&self) -> bool {
        self.save_state != SaveState::Saved
    }

    pub fn admin(&self) -> &AdminGate {
        &self.admin
    }

    pub fn unlock_admin(&mut self, attempt: &str) -> Result<(), SessionError> {
        Ok(self.admin.unlock(attempt)?)
    }

    pub fn lock_admin(&mut self) {
        self.admin.lock();
    }

    pub fn toggle_admin(&mut self, attempt: Option<&str>) -> Result<AdminMode, SessionError> {
        Ok(self.admin.toggle(attempt)?)
    }

    fn require_admin(&self) -> Result<(), SessionError> {
        if self.admin.is_admin() {
            Ok(())
        } else {
            Err(SessionError::AdminRequired)
        }
    }

    /// Adopt the outcome of a mutation. Returns whether anything changed.
    fn apply(&mut self, result: MutationResult) -> Result<bool, SessionError> {
        match result? {
            Some(next) => {
                self.project = next;
                self.save_state = SaveState::Unsaved;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn fail(&mut self, context: &str, error: SessionError) -> SessionError {
        tracing::error!("{}: {}", context, error);
        self.banner = Some(format!("{context}: {error}"));
        error
    }

    pub fn toggle_task(&mut self, task_id: u64) -> Result<bool, SessionError> {
        self.require_admin()?;
        let result = self
            .project
            .toggle_task_complete(task_id, self.reopen_status, &now());
        self.apply(result)
    }

    /// Encode and store a batch of photos, then attach them to the task.
    ///
    /// All or nothing: if any photo fails to encode or store, blobs already
    /// stored for this batch are released and the project is untouched.
    pub async fn upload_photos(
        &mut self,
        task_id: u64,
        files: Vec<PhotoFile>,
    ) -> Result<bool, SessionError> {
        self.require_admin()?;
        if files.is_empty() || self.project.find_task(task_id).is_none() {
            return Ok(false);
        }

        let encoded = match files.iter().map(PhotoFile::encode).collect::<Result<Vec<_>, _>>() {
            Ok(encoded) => encoded,
            Err(e) => return Err(self.fail("Photo upload failed", e.into())),
        };

        let persistence = &self.persistence;
        let results = join_all(encoded.into_iter().map(|data| persistence.store_photo(data))).await;
        let (stored, failures): (Vec<_>, Vec<_>) = results.into_iter().partition(Result::is_ok);
        let stored: Vec<String> = stored.into_iter().filter_map(Result::ok).collect();

        if let Some(Err(first)) = failures.into_iter().next() {
            for url in &stored {
                if let Err(e) = self.persistence.delete_photo(url).await {
                    tracing::warn!("Failed to release stored photo {}: {}", url, e);
                }
            }
            return Err(self.fail("Photo upload failed", first.into()));
        }

        let photos = stored.into_iter().map(Photo::new).collect();
        let result = self.project.upload_photos(task_id, photos, &now());
        self.apply(result)
    }

    /// Remove a photo from a task. Its stored blob is released by the next
    /// successful [`Session::save`].
    pub async fn delete_photo(&mut self, task_id: u64, photo_id: &str) -> Result<bool, SessionError> {
        self.require_admin()?;
        let url = self
            .project
            .find_task(task_id)
            .and_then(|task| task.photos.iter().find(|photo| photo.id == photo_id))
            .map(|photo| photo.url.clone());

        let result = self.project.delete_photo(task_id, photo_id, &now());
        let changed = self.apply(result)?;

        if changed && let Some(url) = url {
            self.pending_releases.push(url);
        }
        Ok(changed)
    }

    pub fn update_photo_comment(
        &mut self,
        task_id: u64,
        photo_id: &str,
        comment: &str,
    ) -> Result<bool, SessionError> {
        self.require_admin()?;
        let result = self
            .project
            .update_photo_comment(task_id, photo_id, comment, &now());
        self.apply(result)
    }

    pub fn update_phase_date(&mut self, phase_id: u64, new_date: &str) -> Result<bool, SessionError> {
        self.require_admin()?;
        let result = self.project.update_phase_date(phase_id, new_date, &now());
        self.apply(result)
    }

    /// Validate, store the optional receipt, then append the payment.
    pub async fn record_payment(
        &mut self,
        milestone_id: u64,
        amount: &str,
        receipt: Option<PhotoFile>,
        comments: Option<String>,
    ) -> Result<bool, SessionError> {
        self.require_admin()?;
        let amount = parse_amount(amount)?;
        if self.project.validate_payment(milestone_id, amount)?.is_none() {
            return Ok(false);
        }

        let receipt_url = match receipt {
            Some(file) => {
                let stored = match file.encode() {
                    Ok(data) => self.persistence.store_photo(data).await.map_err(SessionError::from),
                    Err(e) => Err(e.into()),
                };
                match stored {
                    Ok(url) => Some(url),
                    Err(e) => return Err(self.fail("Receipt upload failed", e)),
                }
            }
            None => None,
        };

        let result = self
            .project
            .record_payment(milestone_id, amount, receipt_url, comments, &now());
        self.apply(result)
    }

    pub fn rename_project(&mut self, name: &str) -> Result<bool, SessionError> {
        self.require_admin()?;
        let result = self.project.rename_project(name, &now());
        self.apply(result)
    }

    pub fn set_drive_folder_path(&mut self, path: &str) -> Result<bool, SessionError> {
        self.require_admin()?;
        let result = self.project.set_drive_folder_path(path, &now());
        self.apply(result)
    }

    pub fn delete_log_entry(&mut self, log_id: &str) -> Result<bool, SessionError> {
        self.require_admin()?;
        let result = self.project.delete_log_entry(log_id);
        self.apply(result)
    }

    /// Write the whole document. On failure the session stays dirty and a
    /// banner describes the error.
    pub async fn save(&mut self) -> Result<(), SessionError> {
        if self.save_state == SaveState::Saved {
            return Ok(());
        }

        self.save_state = SaveState::Saving;
        match self.persistence.save(&self.project).await {
            Ok(()) => {
                self.save_state = SaveState::Saved;
                self.banner = None;
                for url in std::mem::take(&mut self.pending_releases) {
                    if let Err(e) = self.persistence.delete_photo(&url).await {
                        tracing::warn!("Failed to release photo blob {}: {}", url, e);
                    }
                }
                Ok(())
            }
            Err(e) => {
                self.save_state = SaveState::Unsaved;
                Err(self.fail("Could not save the project", e.into()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use async_trait::async_trait;
    use secrecy::SecretString;

    use super::*;
    use crate::tracker::model::MilestoneStatus;

    /// In-memory adapter with switchable failures.
    #[derive(Default)]
    struct MemoryStore {
        saved: Mutex<Option<Project>>,
        stored: Mutex<Vec<String>>,
        released: Mutex<Vec<String>>,
        fail_load: bool,
        fail_save: AtomicBool,
        fail_store_after: Option<usize>,
        store_calls: AtomicUsize,
    }

    #[async_trait]
    impl ProjectPersistence for std::sync::Arc<MemoryStore> {
        async fn load(&self) -> Result<Project, PersistenceError> {
            if self.fail_load {
                return Err(PersistenceError::Api {
                    status: 500,
                    error: "Internal server error".to_string(),
                    details: None,
                });
            }
            Ok(seed_project(LOCAL_INIT_MESSAGE, &now()))
        }

        async fn save(&self, project: &Project) -> Result<(), PersistenceError> {
            if self.fail_save.load(Ordering::SeqCst) {
                return Err(PersistenceError::Io {
                    path: "memory".to_string(),
                    reason: "disk full".to_string(),
                });
            }
            *self.saved.lock().expect("lock") = Some(project.clone());
            Ok(())
        }

        async fn store_photo(&self, data_url: String) -> Result<String, PersistenceError> {
            let call = self.store_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_store_after.is_some_and(|limit| call >= limit) {
                return Err(PersistenceError::Api {
                    status: 413,
                    error: "Payload too large".to_string(),
                    details: None,
                });
            }
            let url = format!("/api/get-photo?id=blob-{call}");
            self.stored.lock().expect("lock").push(data_url);
            Ok(url)
        }

        async fn delete_photo(&self, url: &str) -> Result<(), PersistenceError> {
            self.released.lock().expect("lock").push(url.to_string());
            Ok(())
        }
    }

    fn config() -> TrackerConfig {
        TrackerConfig {
            reopen_status: TaskStatus::Pending,
            admin_credential: Some(SecretString::from("builder")),
            snapshot_path: PathBuf::from("unused.json"),
            remote_url: None,
        }
    }

    async fn admin_session(store: MemoryStore) -> (Session, std::sync::Arc<MemoryStore>) {
        let store = std::sync::Arc::new(store);
        let mut session = Session::open(Box::new(store.clone()), &config()).await;
        session.unlock_admin("builder").expect("unlock");
        (session, store)
    }

    fn png(name: &str) -> PhotoFile {
        PhotoFile::new(name, vec![137u8, 80, 78, 71])
    }

    #[tokio::test]
    async fn viewer_cannot_mutate() {
        let store = std::sync::Arc::new(MemoryStore::default());
        let mut session = Session::open(Box::new(store), &config()).await;

        assert!(matches!(session.toggle_task(101), Err(SessionError::AdminRequired)));
        assert!(matches!(
            session.rename_project("Other"),
            Err(SessionError::AdminRequired)
        ));
        assert!(!session.is_dirty());
    }

    #[tokio::test]
    async fn admin_mode_toggles_and_locks() {
        let store = std::sync::Arc::new(MemoryStore::default());
        let mut session = Session::open(Box::new(store), &config()).await;
        assert_eq!(session.admin().mode(), AdminMode::Viewer);

        assert!(matches!(
            session.toggle_admin(Some("wrong")),
            Err(SessionError::Admin(AdminError::WrongCredential))
        ));
        assert_eq!(session.admin().message(), Some("incorrect admin password"));

        assert_eq!(session.toggle_admin(Some("builder")).expect("unlock"), AdminMode::Admin);
        assert!(session.toggle_task(101).expect("admin edit"));

        assert_eq!(session.toggle_admin(None).expect("lock"), AdminMode::Viewer);
        assert!(matches!(session.toggle_task(101), Err(SessionError::AdminRequired)));

        session.unlock_admin("builder").expect("unlock");
        session.lock_admin();
        assert!(!session.admin().is_admin());
    }

    #[tokio::test]
    async fn failed_load_starts_from_seed_with_banner() {
        let store = MemoryStore {
            fail_load: true,
            ..Default::default()
        };
        let session = Session::open(Box::new(std::sync::Arc::new(store)), &config()).await;
        assert_eq!(session.project().phases.len(), 6);
        assert!(session.banner().is_some_and(|b| b.contains("Internal server error")));

        let mut session = session;
        session.dismiss_banner();
        assert!(session.banner().is_none());
    }

    #[tokio::test]
    async fn mutations_mark_dirty_and_save_clears_it() {
        let (mut session, store) = admin_session(MemoryStore::default()).await;

        assert!(session.toggle_task(101).expect("toggle"));
        assert!(session.is_dirty());
        assert!(!session.toggle_task(999).expect("unknown task"));

        session.save().await.expect("save");
        assert_eq!(session.save_state(), SaveState::Saved);
        let saved = store.saved.lock().expect("lock").clone().expect("saved project");
        assert_eq!(saved.find_task(101).map(|t| t.status), Some(TaskStatus::Completed));
    }

    #[tokio::test]
    async fn failed_save_keeps_session_dirty() {
        let (mut session, _store) = admin_session(MemoryStore {
            fail_save: AtomicBool::new(true),
            ..Default::default()
        })
        .await;

        session.rename_project("Lake House").expect("rename");
        assert!(session.save().await.is_err());
        assert_eq!(session.save_state(), SaveState::Unsaved);
        assert!(session.banner().is_some_and(|b| b.contains("disk full")));
        assert_eq!(session.project().project_name, "Lake House");
    }

    #[tokio::test]
    async fn upload_stores_every_photo_then_attaches_them() {
        let (mut session, store) = admin_session(MemoryStore::default()).await;

        let changed = session
            .upload_photos(201, vec![png("a.png"), png("b.png")])
            .await
            .expect("upload");
        assert!(changed);

        let task = session.project().find_task(201).expect("task");
        assert_eq!(task.photos.len(), 2);
        assert_eq!(task.status, TaskStatus::InProgress);
        assert!(task.photos.iter().all(|p| p.url.starts_with("/api/get-photo?id=")));
        assert_eq!(store.stored.lock().expect("lock").len(), 2);
    }

    #[tokio::test]
    async fn upload_is_all_or_nothing() {
        let (mut session, store) = admin_session(MemoryStore {
            fail_store_after: Some(1),
            ..Default::default()
        })
        .await;
        let before = session.project().clone();

        let result = session
            .upload_photos(201, vec![png("a.png"), png("b.png"), png("c.png")])
            .await;
        assert!(matches!(result, Err(SessionError::Persistence(_))));
        assert_eq!(session.project(), &before);
        assert!(!session.is_dirty());
        assert_eq!(store.released.lock().expect("lock").len(), 1);
        assert!(session.banner().is_some());
    }

    #[tokio::test]
    async fn upload_rejects_non_images_before_storing() {
        let (mut session, store) = admin_session(MemoryStore::default()).await;

        let result = session
            .upload_photos(201, vec![png("a.png"), PhotoFile::new("notes.txt", b"hi".to_vec())])
            .await;
        assert!(matches!(result, Err(SessionError::Media(_))));
        assert!(store.stored.lock().expect("lock").is_empty());
        assert!(session.project().find_task(201).expect("task").photos.is_empty());
    }

    #[tokio::test]
    async fn delete_photo_releases_the_blob() {
        let (mut session, store) = admin_session(MemoryStore::default()).await;
        session
            .upload_photos(301, vec![png("wall.png")])
            .await
            .expect("upload");
        let photo = session.project().find_task(301).expect("task").photos[0].clone();

        assert!(session.delete_photo(301, &photo.id).await.expect("delete"));
        assert!(session.project().find_task(301).expect("task").photos.is_empty());
        assert!(store.released.lock().expect("lock").is_empty());

        session.save().await.expect("save");
        assert_eq!(*store.released.lock().expect("lock"), vec![photo.url]);
    }

    #[tokio::test]
    async fn failed_save_keeps_deleted_photo_blob() {
        let store = std::sync::Arc::new(MemoryStore::default());
        let mut session = Session::open(Box::new(store.clone()), &config()).await;
        session.unlock_admin("builder").expect("unlock");
        session
            .upload_photos(101, vec![png("slab.png")])
            .await
            .expect("upload");
        let photo = session.project().find_task(101).expect("task").photos[0].clone();

        store.fail_save.store(true, Ordering::SeqCst);
        assert!(session.delete_photo(101, &photo.id).await.expect("delete"));
        assert!(session.save().await.is_err());
        assert!(store.released.lock().expect("lock").is_empty());

        store.fail_save.store(false, Ordering::SeqCst);
        session.save().await.expect("retry save");
        assert_eq!(*store.released.lock().expect("lock"), vec![photo.url]);
    }

    #[tokio::test]
    async fn payment_with_receipt_is_recorded() {
        let (mut session, store) = admin_session(MemoryStore::default()).await;

        let changed = session
            .record_payment(1, "5000,00", Some(png("receipt.png")), Some("deposit".to_string()))
            .await
            .expect("payment");
        assert!(changed);

        let milestone = session.project().find_milestone(1).expect("milestone");
        assert_eq!(milestone.status, MilestoneStatus::PartiallyPaid);
        assert!(milestone.payments[0].receipt_url.is_some());
        assert_eq!(store.stored.lock().expect("lock").len(), 1);
    }

    #[tokio::test]
    async fn rejected_payment_uploads_nothing() {
        let (mut session, store) = admin_session(MemoryStore::default()).await;

        let over = session
            .record_payment(1, "999999", Some(png("receipt.png")), None)
            .await;
        assert!(matches!(
            over,
            Err(SessionError::Validation(ValidationError::PaymentExceedsRemaining { .. }))
        ));
        let bad = session.record_payment(1, "abc", None, None).await;
        assert!(matches!(
            bad,
            Err(SessionError::Validation(ValidationError::InvalidAmount))
        ));
        assert!(store.stored.lock().expect("lock").is_empty());
        assert!(!session.is_dirty());
    }

    #[tokio::test]
    async fn invalid_phase_date_leaves_project_unchanged() {
        let (mut session, _store) = admin_session(MemoryStore::default()).await;
        let before = session.project().clone();

        assert!(matches!(
            session.update_phase_date(2, "2026-01-01"),
            Err(SessionError::Validation(ValidationError::InvalidDeliveryDate { .. }))
        ));
        assert_eq!(session.project(), &before);
    }

    #[tokio::test]
    async fn log_entries_can_be_deleted() {
        let (mut session, _store) = admin_session(MemoryStore::default()).await;
        let log_id = session.project().logs[0].id.clone();

        assert!(session.delete_log_entry(&log_id).expect("delete"));
        assert!(session.project().logs.is_empty());
    }
}
