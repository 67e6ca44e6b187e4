//! Persistence backends for the download registry.
//!
//! The registry talks to storage only through [`RegistryStore`]. The SQLite
//! implementation serves both the durable (file) and the transient (in-memory)
//! locator, so the two modes share one schema and one query set.

use std::fmt;
use std::fs;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension};
use tracing::{debug, info};
use url::Url;

use super::connection::Database;
use crate::types::download::DownloadRecord;
use crate::types::errors::StoreError;

/// Locator string that selects the transient store.
pub const TRANSIENT_LOCATOR: &str = ":memory:";

/// Address of a registry store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreLocator {
    /// Non-durable store; nothing survives the process.
    Transient,
    /// SQLite database file.
    File(PathBuf),
}

impl StoreLocator {
    /// Interprets a user-facing path. Empty strings and `:memory:` select the
    /// transient store.
    pub fn parse(path: &str) -> Self {
        if path.is_empty() || path == TRANSIENT_LOCATOR {
            StoreLocator::Transient
        } else {
            StoreLocator::File(PathBuf::from(path))
        }
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, StoreLocator::Transient)
    }
}

impl fmt::Display for StoreLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreLocator::Transient => f.write_str(TRANSIENT_LOCATOR),
            StoreLocator::File(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Position in the ordered record sequence; pages start strictly after it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageCursor {
    pub created: DateTime<Utc>,
    pub sequence: u64,
}

impl From<&DownloadRecord> for PageCursor {
    fn from(record: &DownloadRecord) -> Self {
        Self {
            created: record.created,
            sequence: record.sequence,
        }
    }
}

/// Boolean column filter for bulk removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldPredicate {
    Incognito(bool),
    Complete(bool),
    Paused(bool),
}

impl FieldPredicate {
    fn column_and_value(self) -> (&'static str, bool) {
        match self {
            FieldPredicate::Incognito(v) => ("incognito", v),
            FieldPredicate::Complete(v) => ("complete", v),
            FieldPredicate::Paused(v) => ("paused", v),
        }
    }
}

/// Storage operations the registry relies on.
pub trait RegistryStore {
    /// Address this store was opened with.
    fn locator(&self) -> &StoreLocator;
    /// Writes the full current state of `record`, inserting or replacing by id.
    fn upsert(&self, record: &DownloadRecord) -> Result<(), StoreError>;
    /// Whether a record with `id` is persisted, loaded into a view or not.
    fn exists(&self, id: &str) -> Result<bool, StoreError>;
    /// Deletes the record with `id`; deleting an absent id succeeds.
    fn remove(&self, id: &str) -> Result<(), StoreError>;
    /// Deletes every record matching `predicate` and returns how many went.
    fn remove_all(&self, predicate: FieldPredicate) -> Result<usize, StoreError>;
    /// Returns up to `limit` records after `after`, newest first.
    fn load_page(
        &self,
        after: Option<&PageCursor>,
        limit: usize,
    ) -> Result<Vec<DownloadRecord>, StoreError>;
    /// Highest insertion counter persisted so far.
    fn max_sequence(&self) -> Result<Option<u64>, StoreError>;
}

/// Opens the store a locator points at.
///
/// # Errors
/// Returns [`StoreError`] if the database directory cannot be created, the file
/// cannot be opened, or migrations fail.
pub fn open_store(locator: &StoreLocator) -> Result<Box<dyn RegistryStore>, StoreError> {
    Ok(Box::new(SqliteStore::open(locator)?))
}

/// [`RegistryStore`] backed by a SQLite database.
pub struct SqliteStore {
    db: Database,
    locator: StoreLocator,
}

const SELECT_COLUMNS: &str =
    "SELECT id, url, path, mimetype, complete, paused, error, created_at, sequence, incognito FROM downloads";

/// Column values as SQLite hands them back, before validation.
type RawRow = (String, String, String, String, bool, bool, String, i64, i64, bool);

impl SqliteStore {
    /// Opens a SQLite store, creating the database file and its parent directory
    /// when needed.
    pub fn open(locator: &StoreLocator) -> Result<Self, StoreError> {
        let db = match locator {
            StoreLocator::Transient => Database::open_in_memory()?,
            StoreLocator::File(path) => {
                if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                    fs::create_dir_all(parent)?;
                }
                Database::open(path)?
            }
        };
        info!(store = %locator, "registry store opened");
        Ok(Self {
            db,
            locator: locator.clone(),
        })
    }

    fn raw_row(row: &rusqlite::Row) -> rusqlite::Result<RawRow> {
        Ok((
            row.get(0)?,
            row.get(1)?,
            row.get(2)?,
            row.get(3)?,
            row.get(4)?,
            row.get(5)?,
            row.get(6)?,
            row.get(7)?,
            row.get(8)?,
            row.get(9)?,
        ))
    }

    fn into_record(raw: RawRow) -> Result<DownloadRecord, StoreError> {
        let (id, url, path, mimetype, complete, paused, error, created_ms, sequence, incognito) =
            raw;
        let url = Url::parse(&url).map_err(|e| StoreError::CorruptRow {
            id: id.clone(),
            reason: format!("invalid url {url:?}: {e}"),
        })?;
        let created =
            DateTime::from_timestamp_millis(created_ms).ok_or_else(|| StoreError::CorruptRow {
                id: id.clone(),
                reason: format!("timestamp out of range: {created_ms}"),
            })?;
        let sequence = u64::try_from(sequence).map_err(|_| StoreError::CorruptRow {
            id: id.clone(),
            reason: format!("negative sequence: {sequence}"),
        })?;
        Ok(DownloadRecord {
            id,
            url,
            path,
            mimetype,
            complete,
            paused,
            error,
            created,
            incognito,
            sequence,
        })
    }
}

impl RegistryStore for SqliteStore {
    fn locator(&self) -> &StoreLocator {
        &self.locator
    }

    fn upsert(&self, record: &DownloadRecord) -> Result<(), StoreError> {
        let sequence = i64::try_from(record.sequence).map_err(|_| StoreError::CorruptRow {
            id: record.id.clone(),
            reason: format!("sequence out of range: {}", record.sequence),
        })?;
        self.db.connection().execute(
            "INSERT INTO downloads (id, url, path, mimetype, complete, paused, error, created_at, sequence, incognito)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
             ON CONFLICT(id) DO UPDATE SET
                 url = excluded.url,
                 path = excluded.path,
                 mimetype = excluded.mimetype,
                 complete = excluded.complete,
                 paused = excluded.paused,
                 error = excluded.error,
                 created_at = excluded.created_at,
                 sequence = excluded.sequence,
                 incognito = excluded.incognito",
            params![
                record.id,
                record.url.as_str(),
                record.path,
                record.mimetype,
                record.complete,
                record.paused,
                record.error,
                record.created.timestamp_millis(),
                sequence,
                record.incognito,
            ],
        )?;
        Ok(())
    }

    fn exists(&self, id: &str) -> Result<bool, StoreError> {
        let found = self
            .db
            .connection()
            .query_row("SELECT 1 FROM downloads WHERE id = ?1", params![id], |_| Ok(()))
            .optional()?;
        Ok(found.is_some())
    }

    fn remove(&self, id: &str) -> Result<(), StoreError> {
        self.db
            .connection()
            .execute("DELETE FROM downloads WHERE id = ?1", params![id])?;
        Ok(())
    }

    fn remove_all(&self, predicate: FieldPredicate) -> Result<usize, StoreError> {
        let (column, value) = predicate.column_and_value();
        let removed = self.db.connection().execute(
            &format!("DELETE FROM downloads WHERE {column} = ?1"),
            params![value],
        )?;
        debug!(?predicate, removed, "bulk removal from registry store");
        Ok(removed)
    }

    fn load_page(
        &self,
        after: Option<&PageCursor>,
        limit: usize,
    ) -> Result<Vec<DownloadRecord>, StoreError> {
        let conn = self.db.connection();
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let raw: Vec<RawRow> = match after {
            None => {
                let mut stmt = conn.prepare(&format!(
                    "{SELECT_COLUMNS} ORDER BY created_at DESC, sequence DESC LIMIT ?1"
                ))?;
                let rows = stmt.query_map(params![limit], Self::raw_row)?;
                rows.collect::<rusqlite::Result<_>>()?
            }
            Some(cursor) => {
                let mut stmt = conn.prepare(&format!(
                    "{SELECT_COLUMNS}
                     WHERE created_at < ?1 OR (created_at = ?1 AND sequence < ?2)
                     ORDER BY created_at DESC, sequence DESC LIMIT ?3"
                ))?;
                let rows = stmt.query_map(
                    params![
                        cursor.created.timestamp_millis(),
                        i64::try_from(cursor.sequence).unwrap_or(i64::MAX),
                        limit
                    ],
                    Self::raw_row,
                )?;
                rows.collect::<rusqlite::Result<_>>()?
            }
        };
        raw.into_iter().map(Self::into_record).collect()
    }

    fn max_sequence(&self) -> Result<Option<u64>, StoreError> {
        let top: Option<(String, i64)> = self
            .db
            .connection()
            .query_row(
                "SELECT id, sequence FROM downloads ORDER BY sequence DESC LIMIT 1",
                [],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;
        top.map(|(id, sequence)| {
            u64::try_from(sequence).map_err(|_| StoreError::CorruptRow {
                id,
                reason: format!("negative sequence: {sequence}"),
            })
        })
        .transpose()
    }
}
