//! Database abstraction layer.
//!
//! The API server stores two things: the project document (one JSON row
//! keyed by [`PROJECT_DOCUMENT_ID`]) and photo blobs (data URLs keyed by a
//! generated UUID). Two backends implement [`Database`] behind feature flags:
//!
//! - `postgres` (default): `deadpool-postgres` + `tokio-postgres`, schema via `refinery`
//! - `libsql`: embedded libSQL file for single-host deployments and tests

#[cfg(feature = "postgres")]
pub mod postgres;

#[cfg(feature = "libsql")]
pub mod libsql;

#[cfg(feature = "libsql")]
pub mod libsql_migrations;

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::DatabaseError;

/// Row id of the single stored project document.
pub const PROJECT_DOCUMENT_ID: i32 = 1;

/// Create a database backend from configuration, run migrations, and return it.
pub async fn connect_from_config(
    config: &crate::config::DatabaseConfig,
) -> Result<Arc<dyn Database>, DatabaseError> {
    match config.backend {
        #[cfg(feature = "libsql")]
        crate::config::DatabaseBackend::LibSql => {
            let default_path = crate::config::default_libsql_path();
            let db_path = config.libsql_path.as_deref().unwrap_or(&default_path);

            let backend = libsql::LibSqlBackend::new_local(db_path)
                .await
                .map_err(|e| DatabaseError::Pool(e.to_string()))?;
            backend.run_migrations().await?;
            Ok(Arc::new(backend))
        }
        #[cfg(feature = "postgres")]
        crate::config::DatabaseBackend::Postgres => {
            let pg = postgres::PgBackend::new(config)
                .await
                .map_err(|e| DatabaseError::Pool(e.to_string()))?;
            pg.run_migrations().await?;
            Ok(Arc::new(pg))
        }
        #[allow(unreachable_patterns)]
        other => Err(DatabaseError::Pool(format!(
            "database backend '{}' is not compiled in; enable the '{}' feature",
            other.as_str(),
            other.as_str()
        ))),
    }
}

/// The stored project document, as raw JSON.
#[async_trait]
pub trait ProjectDocumentStore: Send + Sync {
    async fn get_project_document(
        &self,
        id: i32,
    ) -> Result<Option<serde_json::Value>, DatabaseError>;

    /// Insert or replace the whole document.
    async fn upsert_project_document(
        &self,
        id: i32,
        data: &serde_json::Value,
    ) -> Result<(), DatabaseError>;

    /// Insert `data` only when no document exists, then return whichever
    /// document is stored. Concurrent first reads converge on one seed.
    async fn insert_project_document_if_absent(
        &self,
        id: i32,
        data: &serde_json::Value,
    ) -> Result<serde_json::Value, DatabaseError>;
}

/// Photo blobs stored out of band from the project document.
#[async_trait]
pub trait PhotoStore: Send + Sync {
    async fn insert_photo(&self, data_url: &str) -> Result<Uuid, DatabaseError>;

    async fn get_photo(&self, id: Uuid) -> Result<Option<String>, DatabaseError>;

    /// Returns whether a row was removed.
    async fn delete_photo(&self, id: Uuid) -> Result<bool, DatabaseError>;
}

/// Backend-agnostic database supertrait.
#[async_trait]
pub trait Database: ProjectDocumentStore + PhotoStore + Send + Sync {
    /// Run schema migrations for this backend.
    async fn run_migrations(&self) -> Result<(), DatabaseError>;
}
