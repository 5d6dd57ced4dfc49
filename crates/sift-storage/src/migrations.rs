//! Database schema migrations.
//!
//! Applies the embeddings table and its shared session index, tracked in
//! the schema_migrations table.

use rusqlite::Connection;
use tracing::info;

use sift_core::error::{Result, SiftError};

/// Run all pending database migrations.
pub fn run_migrations(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version     INTEGER PRIMARY KEY NOT NULL,
            name        TEXT NOT NULL,
            applied_at  INTEGER NOT NULL DEFAULT (strftime('%s', 'now'))
        );",
    )
    .map_err(|e| SiftError::StorageIo(format!("Failed to create migrations table: {}", e)))?;

    let current_version: i64 = conn
        .query_row(
            "SELECT COALESCE(MAX(version), 0) FROM schema_migrations",
            [],
            |row| row.get(0),
        )
        .map_err(|e| SiftError::StorageIo(format!("Failed to query migration version: {}", e)))?;

    if current_version < 1 {
        apply_v1(conn)?;
        info!("Applied migration v1: embeddings");
    }

    Ok(())
}

/// Version 1: embeddings table.
///
/// `vector` holds little-endian f32 values, `metadata` a JSON object or NULL.
fn apply_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS embeddings (
            id          TEXT PRIMARY KEY NOT NULL,
            session_id  TEXT NOT NULL,
            vector      BLOB NOT NULL,
            norm        REAL NOT NULL,
            metadata    TEXT
        );

        CREATE INDEX IF NOT EXISTS idx_embeddings_session
            ON embeddings (session_id);

        INSERT OR IGNORE INTO schema_migrations (version, name) VALUES (1, 'embeddings');
        ",
    )
    .map_err(|e| SiftError::StorageIo(format!("Failed to apply migration v1: {}", e)))?;

    Ok(())
}
