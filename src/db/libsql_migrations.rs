//! SQLite-dialect schema for the libSQL backend.
//!
//! Mirrors `migrations/V1__project_documents.sql`. Statements are idempotent
//! and run on every startup.

pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS project_data (
    id INTEGER PRIMARY KEY,
    data TEXT NOT NULL,
    updated_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
);

CREATE TABLE IF NOT EXISTS project_photos (
    id TEXT PRIMARY KEY,
    data TEXT NOT NULL,
    created_at TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
);
"#;
