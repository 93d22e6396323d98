//! libSQL backend for the Database trait.
//!
//! Opens a local database file. Each operation takes a fresh connection;
//! all connections share the same file so schema and state are visible
//! across them.

mod project;

use std::path::Path;

use async_trait::async_trait;
use libsql::{Builder, Connection};

use crate::db::Database;
use crate::db::libsql_migrations::SCHEMA;
use crate::error::DatabaseError;

pub struct LibSqlBackend {
    db: libsql::Database,
}

impl LibSqlBackend {
    /// Open (or create) a database file at `path`.
    pub async fn new_local(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| {
                DatabaseError::Pool(format!("cannot create {}: {}", parent.display(), e))
            })?;
        }
        let db = Builder::new_local(path).build().await?;
        Ok(Self { db })
    }

    pub async fn connect(&self) -> Result<Connection, DatabaseError> {
        let conn = self.db.connect()?;
        conn.query("PRAGMA busy_timeout = 5000", ()).await?;
        Ok(conn)
    }
}

#[async_trait]
impl Database for LibSqlBackend {
    async fn run_migrations(&self) -> Result<(), DatabaseError> {
        let conn = self.connect().await?;
        conn.execute_batch(SCHEMA)
            .await
            .map_err(|e| DatabaseError::Migration(e.to_string()))?;
        Ok(())
    }
}

pub(crate) fn get_text(row: &libsql::Row, idx: i32) -> Result<String, DatabaseError> {
    Ok(row.get::<String>(idx)?)
}
