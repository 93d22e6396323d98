//! Test helpers shared by unit tests.

use std::sync::Arc;

use crate::db::Database;
use crate::db::libsql::LibSqlBackend;

/// A migrated libSQL database in a temp dir. Keep the `TempDir` alive for
/// as long as the database is used.
pub async fn test_db() -> (Arc<dyn Database>, tempfile::TempDir) {
    let dir = tempfile::tempdir().expect("tempdir");
    let backend = LibSqlBackend::new_local(&dir.path().join("test.db"))
        .await
        .expect("local backend should initialize");
    backend
        .run_migrations()
        .await
        .expect("migrations should succeed");
    (Arc::new(backend), dir)
}
