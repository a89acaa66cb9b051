//! Per-file read markers, persisted in `SQLite`.

use std::fs;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use rusqlite::{params, Connection, OptionalExtension};
use tracing::debug;

use crate::{Error, Result};

/// File name of the read-state database inside the data directory.
pub const DATABASE_FILE: &str = "read_state.sqlite3";

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS read_state (
    provider_id TEXT NOT NULL,
    review_id   TEXT NOT NULL,
    file_path   TEXT NOT NULL,
    revision    TEXT NOT NULL,
    is_read     INTEGER NOT NULL,
    updated_at  INTEGER NOT NULL,
    PRIMARY KEY (provider_id, review_id, file_path, revision)
);
";

const UPSERT: &str = "INSERT INTO read_state (provider_id, review_id, file_path, revision, is_read, updated_at) \
VALUES (?1, ?2, ?3, ?4, ?5, CAST(strftime('%s', 'now') AS INTEGER)) \
ON CONFLICT(provider_id, review_id, file_path, revision) DO UPDATE SET \
is_read = excluded.is_read, updated_at = excluded.updated_at";

const LOOKUP: &str = "SELECT is_read FROM read_state \
WHERE provider_id = ?1 AND review_id = ?2 AND file_path = ?3 AND revision = ?4";

/// Identity of one file at one revision of one review.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReadStateKey {
    /// Provider the review belongs to.
    pub provider_id: String,
    /// Review identifier as returned by the provider.
    pub review_id: String,
    /// Path of the file within the review.
    pub file_path: String,
    /// Revision the marker applies to.
    pub revision: String,
}

impl ReadStateKey {
    /// Build a key from its four parts.
    pub fn new(
        provider_id: impl Into<String>,
        review_id: impl Into<String>,
        file_path: impl Into<String>,
        revision: impl Into<String>,
    ) -> Self {
        Self {
            provider_id: provider_id.into(),
            review_id: review_id.into(),
            file_path: file_path.into(),
            revision: revision.into(),
        }
    }
}

/// Durable store of read markers; absent keys read as unread.
///
/// Keys are independent of which providers are configured, so markers
/// survive reconfiguration and restarts.
#[derive(Debug)]
pub struct ReadStateStore {
    conn: Mutex<Connection>,
}

impl ReadStateStore {
    /// Open (creating if needed) the database inside `data_dir`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] when the directory cannot be created and
    /// [`Error::Storage`] when the database cannot be opened or migrated.
    pub fn open(data_dir: impl AsRef<Path>) -> Result<Self> {
        let data_dir = data_dir.as_ref();
        fs::create_dir_all(data_dir).map_err(|source| Error::Io {
            path: data_dir.display().to_string(),
            source,
        })?;

        let path = data_dir.join(DATABASE_FILE);
        debug!(path = %path.display(), "opening read-state database");
        let conn = Connection::open(&path)?;
        let mode: String =
            conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
        debug!(%mode, "read-state journal mode");
        conn.busy_timeout(Duration::from_secs(5))?;
        Self::with_connection(conn)
    }

    /// Store backed by a private in-memory database.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] when `SQLite` fails to initialize.
    pub fn in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Read flag for `key`, `false` when never marked.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] when the query fails.
    pub fn get(&self, key: &ReadStateKey) -> Result<bool> {
        Ok(self.lookup(key)?.unwrap_or(false))
    }

    /// Read flag for `key`, `None` when never marked.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] when the query fails.
    pub fn lookup(&self, key: &ReadStateKey) -> Result<Option<bool>> {
        let conn = self.conn.lock()?;
        let flag = conn
            .query_row(
                LOOKUP,
                params![key.provider_id, key.review_id, key.file_path, key.revision],
                |row| row.get::<_, bool>(0),
            )
            .optional()?;
        Ok(flag)
    }

    /// Replace the flag for `key`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Storage`] when the write fails.
    pub fn set(&self, key: &ReadStateKey, read: bool) -> Result<()> {
        let conn = self.conn.lock()?;
        conn.execute(
            UPSERT,
            params![key.provider_id, key.review_id, key.file_path, key.revision, read],
        )?;
        Ok(())
    }
}
