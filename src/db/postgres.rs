//! PostgreSQL backend for the Database trait.

use async_trait::async_trait;
use deadpool_postgres::{Config, Pool, PoolConfig, Runtime};
use secrecy::ExposeSecret;
use tokio_postgres::NoTls;
use uuid::Uuid;

use crate::config::DatabaseConfig;
use crate::db::{Database, PhotoStore, ProjectDocumentStore};
use crate::error::DatabaseError;

mod embedded {
    refinery::embed_migrations!("migrations");
}

/// PostgreSQL database backend over a deadpool connection pool.
pub struct PgBackend {
    pool: Pool,
}

impl PgBackend {
    /// Create a new PostgreSQL backend from configuration.
    pub async fn new(config: &DatabaseConfig) -> Result<Self, DatabaseError> {
        let url = config
            .url
            .as_ref()
            .ok_or_else(|| DatabaseError::Pool("DATABASE_URL is not set".to_string()))?;

        let mut cfg = Config::new();
        cfg.url = Some(url.expose_secret().to_string());
        cfg.pool = Some(PoolConfig::new(config.pool_size));
        let pool = cfg
            .create_pool(Some(Runtime::Tokio1), NoTls)
            .map_err(|e| DatabaseError::Pool(e.to_string()))?;

        // Fail fast on an unreachable server instead of on the first request.
        let _ = pool.get().await?;
        Ok(Self { pool })
    }
}

#[async_trait]
impl Database for PgBackend {
    async fn run_migrations(&self) -> Result<(), DatabaseError> {
        let mut client = self.pool.get().await?;
        let report = embedded::migrations::runner()
            .run_async(&mut **client)
            .await
            .map_err(|e| DatabaseError::Migration(e.to_string()))?;
        for migration in report.applied_migrations() {
            tracing::info!("Applied migration {}", migration);
        }
        Ok(())
    }
}

// ==================== ProjectDocumentStore ====================

#[async_trait]
impl ProjectDocumentStore for PgBackend {
    async fn get_project_document(
        &self,
        id: i32,
    ) -> Result<Option<serde_json::Value>, DatabaseError> {
        let conn = self.pool.get().await?;
        let row = conn
            .query_opt("SELECT data FROM project_data WHERE id = $1", &[&id])
            .await?;
        Ok(row.map(|row| row.get::<_, serde_json::Value>(0)))
    }

    async fn upsert_project_document(
        &self,
        id: i32,
        data: &serde_json::Value,
    ) -> Result<(), DatabaseError> {
        let conn = self.pool.get().await?;
        conn.execute(
            "INSERT INTO project_data (id, data, updated_at) VALUES ($1, $2, NOW()) \
             ON CONFLICT (id) DO UPDATE SET data = EXCLUDED.data, updated_at = NOW()",
            &[&id, data],
        )
        .await?;
        Ok(())
    }

    async fn insert_project_document_if_absent(
        &self,
        id: i32,
        data: &serde_json::Value,
    ) -> Result<serde_json::Value, DatabaseError> {
        let conn = self.pool.get().await?;
        conn.execute(
            "INSERT INTO project_data (id, data) VALUES ($1, $2) ON CONFLICT (id) DO NOTHING",
            &[&id, data],
        )
        .await?;
        let row = conn
            .query_one("SELECT data FROM project_data WHERE id = $1", &[&id])
            .await?;
        Ok(row.get::<_, serde_json::Value>(0))
    }
}

// ==================== PhotoStore ====================

#[async_trait]
impl PhotoStore for PgBackend {
    async fn insert_photo(&self, data_url: &str) -> Result<Uuid, DatabaseError> {
        let conn = self.pool.get().await?;
        let id = Uuid::new_v4();
        conn.execute(
            "INSERT INTO project_photos (id, data) VALUES ($1, $2)",
            &[&id, &data_url],
        )
        .await?;
        Ok(id)
    }

    async fn get_photo(&self, id: Uuid) -> Result<Option<String>, DatabaseError> {
        let conn = self.pool.get().await?;
        let row = conn
            .query_opt("SELECT data FROM project_photos WHERE id = $1", &[&id])
            .await?;
        Ok(row.map(|row| row.get::<_, String>(0)))
    }

    async fn delete_photo(&self, id: Uuid) -> Result<bool, DatabaseError> {
        let conn = self.pool.get().await?;
        let removed = conn
            .execute("DELETE FROM project_photos WHERE id = $1", &[&id])
            .await?;
        Ok(removed > 0)
    }
}
