//! SQLite connection for a registry store.
//!
//! A [`Database`] is only handed out with the download schema at
//! [`CURRENT_SCHEMA_VERSION`](super::migrations::CURRENT_SCHEMA_VERSION).

use std::path::Path;
use std::time::Duration;

use rusqlite::Connection;
use tracing::debug;

use super::migrations;

/// How long a write waits for another process holding the same store file.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

pub struct Database {
    conn: Connection,
}

impl Database {
    /// Opens or creates the store file at `path` and migrates it.
    ///
    /// The parent directory must already exist.
    ///
    /// # Errors
    /// Returns `rusqlite::Error` if the file cannot be opened or a migration fails.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, rusqlite::Error> {
        let path = path.as_ref();
        debug!(path = %path.display(), "opening download database");
        let conn = Connection::open(path)?;
        // Another registry process may hold the file while finalizing a download.
        conn.busy_timeout(BUSY_TIMEOUT)?;
        Self::migrated(conn)
    }

    /// Opens a private in-memory database; its rows die with the `Database`.
    ///
    /// # Errors
    /// Returns `rusqlite::Error` if SQLite cannot allocate it or a migration fails.
    pub fn open_in_memory() -> Result<Self, rusqlite::Error> {
        Self::migrated(Connection::open_in_memory()?)
    }

    fn migrated(conn: Connection) -> Result<Self, rusqlite::Error> {
        migrations::run_all(&conn)?;
        Ok(Self { conn })
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}
