use async_trait::async_trait;
use libsql::params;
use uuid::Uuid;

use crate::db::{PhotoStore, ProjectDocumentStore};
use crate::error::DatabaseError;

use super::{LibSqlBackend, get_text};

fn parse_document(raw: &str) -> Result<serde_json::Value, DatabaseError> {
    serde_json::from_str(raw).map_err(|e| DatabaseError::Serialization(e.to_string()))
}

#[async_trait]
impl ProjectDocumentStore for LibSqlBackend {
    async fn get_project_document(
        &self,
        id: i32,
    ) -> Result<Option<serde_json::Value>, DatabaseError> {
        let conn = self.connect().await?;
        let mut rows = conn
            .query(
                "SELECT data FROM project_data WHERE id = ?1",
                params![i64::from(id)],
            )
            .await?;
        match rows.next().await? {
            Some(row) => Ok(Some(parse_document(&get_text(&row, 0)?)?)),
            None => Ok(None),
        }
    }

    async fn upsert_project_document(
        &self,
        id: i32,
        data: &serde_json::Value,
    ) -> Result<(), DatabaseError> {
        let conn = self.connect().await?;
        conn.execute(
            "INSERT INTO project_data (id, data) VALUES (?1, ?2) \
             ON CONFLICT (id) DO UPDATE SET data = excluded.data, \
             updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')",
            params![i64::from(id), serde_json::to_string(data)?],
        )
        .await?;
        Ok(())
    }

    async fn insert_project_document_if_absent(
        &self,
        id: i32,
        data: &serde_json::Value,
    ) -> Result<serde_json::Value, DatabaseError> {
        let conn = self.connect().await?;
        conn.execute(
            "INSERT OR IGNORE INTO project_data (id, data) VALUES (?1, ?2)",
            params![i64::from(id), serde_json::to_string(data)?],
        )
        .await?;
        let mut rows = conn
            .query(
                "SELECT data FROM project_data WHERE id = ?1",
                params![i64::from(id)],
            )
            .await?;
        let row = rows.next().await?.ok_or_else(|| {
            DatabaseError::Query(format!("project document {id} missing after insert"))
        })?;
        parse_document(&get_text(&row, 0)?)
    }
}

#[async_trait]
impl PhotoStore for LibSqlBackend {
    async fn insert_photo(&self, data_url: &str) -> Result<Uuid, DatabaseError> {
        let conn = self.connect().await?;
        let id = Uuid::new_v4();
        conn.execute(
            "INSERT INTO project_photos (id, data) VALUES (?1, ?2)",
            params![id.to_string(), data_url],
        )
        .await?;
        Ok(id)
    }

    async fn get_photo(&self, id: Uuid) -> Result<Option<String>, DatabaseError> {
        let conn = self.connect().await?;
        let mut rows = conn
            .query(
                "SELECT data FROM project_photos WHERE id = ?1",
                params![id.to_string()],
            )
            .await?;
        match rows.next().await? {
            Some(row) => Ok(Some(get_text(&row, 0)?)),
            None => Ok(None),
        }
    }

    async fn delete_photo(&self, id: Uuid) -> Result<bool, DatabaseError> {
        let conn = self.connect().await?;
        let removed = conn
            .execute(
                "DELETE FROM project_photos WHERE id = ?1",
                params![id.to_string()],
            )
            .await?;
        Ok(removed > 0)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::db::{Database, PROJECT_DOCUMENT_ID};

    struct TestBackend {
        backend: LibSqlBackend,
        _tmpdir: tempfile::TempDir,
    }

    async fn setup_backend() -> TestBackend {
        let tmpdir = tempfile::tempdir().expect("tempdir");
        let backend = LibSqlBackend::new_local(&tmpdir.path().join("project_test.db"))
            .await
            .expect("local backend should initialize");
        backend
            .run_migrations()
            .await
            .expect("migrations should succeed");
        TestBackend {
            backend,
            _tmpdir: tmpdir,
        }
    }

    #[tokio::test]
    async fn schema_contains_project_tables() {
        let fixture = setup_backend().await;
        let conn = fixture.backend.connect().await.expect("connect");

        for table in ["project_data", "project_photos"] {
            let row = conn
                .query(
                    "SELECT name FROM sqlite_master WHERE type='table' AND name=?1",
                    params![table],
                )
                .await
                .expect("query sqlite_master")
                .next()
                .await
                .expect("row read");
            assert!(row.is_some(), "missing table {table}");
        }
    }

    #[tokio::test]
    async fn migrations_are_idempotent() {
        let fixture = setup_backend().await;
        fixture
            .backend
            .run_migrations()
            .await
            .expect("second run succeeds");
    }

    #[tokio::test]
    async fn document_is_absent_until_written() {
        let fixture = setup_backend().await;
        let doc = fixture
            .backend
            .get_project_document(PROJECT_DOCUMENT_ID)
            .await
            .expect("get");
        assert!(doc.is_none());
    }

    #[tokio::test]
    async fn upsert_replaces_the_whole_document() {
        let fixture = setup_backend().await;
        let first = serde_json::json!({"projectName": "First", "phases": [{"id": 1}]});
        let second = serde_json::json!({"projectName": "Second", "phases": []});

        fixture
            .backend
            .upsert_project_document(PROJECT_DOCUMENT_ID, &first)
            .await
            .expect("insert");
        fixture
            .backend
            .upsert_project_document(PROJECT_DOCUMENT_ID, &second)
            .await
            .expect("replace");

        let stored = fixture
            .backend
            .get_project_document(PROJECT_DOCUMENT_ID)
            .await
            .expect("get");
        assert_eq!(stored, Some(second));
    }

    #[tokio::test]
    async fn insert_if_absent_keeps_the_first_document() {
        let fixture = setup_backend().await;
        let seed = serde_json::json!({"projectName": "Seed", "phases": []});
        let late = serde_json::json!({"projectName": "Late", "phases": []});

        let first = fixture
            .backend
            .insert_project_document_if_absent(PROJECT_DOCUMENT_ID, &seed)
            .await
            .expect("seed");
        let second = fixture
            .backend
            .insert_project_document_if_absent(PROJECT_DOCUMENT_ID, &late)
            .await
            .expect("seed again");

        assert_eq!(first, seed);
        assert_eq!(second, seed);
    }

    #[tokio::test]
    async fn photos_insert_get_and_delete() {
        let fixture = setup_backend().await;
        let id = fixture
            .backend
            .insert_photo("data:image/jpeg;base64,/9j/")
            .await
            .expect("insert");

        assert_eq!(
            fixture.backend.get_photo(id).await.expect("get").as_deref(),
            Some("data:image/jpeg;base64,/9j/")
        );
        assert!(fixture.backend.delete_photo(id).await.expect("delete"));
        assert!(fixture.backend.get_photo(id).await.expect("get").is_none());
        assert!(!fixture.backend.delete_photo(id).await.expect("delete again"));
        assert!(
            fixture
                .backend
                .get_photo(Uuid::new_v4())
                .await
                .expect("unknown id")
                .is_none()
        );
    }
}
