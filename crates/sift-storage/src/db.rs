//! Database connection management.
//!
//! Wraps a single rusqlite Connection in a Mutex for thread-safe access.
//! Configures WAL mode and recommended PRAGMAs on initialization. The
//! connection can be closed explicitly; every access after that fails.

use std::path::Path;
use std::sync::Mutex;

use rusqlite::Connection;
use tracing::info;

use sift_core::config::StoreLocation;
use sift_core::error::{Result, SiftError};

use crate::migrations;

/// Thread-safe SQLite database wrapper.
///
/// Concurrent access from other processes to the same file relies on SQLite's
/// own locking; nothing here coordinates beyond the in-process Mutex.
pub struct Database {
    conn: Mutex<Option<Connection>>,
}

impl Database {
    /// Open the database described by `location`.
    pub fn open(location: &StoreLocation) -> Result<Self> {
        match location {
            StoreLocation::InMemory => Self::in_memory(),
            StoreLocation::Path(path) => Self::new(path),
        }
    }

    /// Open (or create) a database at the given path.
    ///
    /// Configures WAL mode and synchronous=NORMAL, then runs all pending
    /// migrations.
    pub fn new(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    SiftError::StorageIo(format!(
                        "Failed to create {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }

        let conn = Connection::open(path)
            .map_err(|e| SiftError::StorageIo(format!("Failed to open database: {}", e)))?;

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;",
        )
        .map_err(|e| SiftError::StorageIo(format!("Failed to set pragmas: {}", e)))?;

        info!("Database opened at {}", path.display());

        Self::with_migrations(conn)
    }

    /// Open an ephemeral in-memory database.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| SiftError::StorageIo(format!("Failed to open in-memory db: {}", e)))?;

        Self::with_migrations(conn)
    }

    fn with_migrations(conn: Connection) -> Result<Self> {
        migrations::run_migrations(&conn)?;
        Ok(Self {
            conn: Mutex::new(Some(conn)),
        })
    }

    /// Execute a closure with a reference to the underlying connection.
    ///
    /// The mutex is held for the duration of the closure. Fails with
    /// `StorageIo` once the database has been closed.
    pub fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let guard = self
            .conn
            .lock()
            .map_err(|e| SiftError::StorageIo(format!("Database lock poisoned: {}", e)))?;
        match guard.as_ref() {
            Some(conn) => f(conn),
            None => Err(SiftError::StorageIo("Database is closed".to_string())),
        }
    }

    /// Close the connection. Closing twice is a no-op.
    pub fn close(&self) -> Result<()> {
        let mut guard = self
            .conn
            .lock()
            .map_err(|e| SiftError::StorageIo(format!("Database lock poisoned: {}", e)))?;
        if let Some(conn) = guard.take() {
            conn.close().map_err(|(_, e)| {
                SiftError::StorageIo(format!("Failed to close database: {}", e))
            })?;
            info!("Database closed");
        }
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.conn.lock().map(|c| c.is_none()).unwrap_or(true)
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("closed", &self.is_closed())
            .finish()
    }
}
