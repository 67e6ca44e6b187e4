use std::path::PathBuf;

use thiserror::Error;

// === StoreError ===

/// Errors raised by a registry store backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The underlying SQLite call failed.
    #[error("Registry store database error: {0}")]
    Database(#[from] rusqlite::Error),
    /// The store file or its directory could not be prepared.
    #[error("Registry store I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// A persisted row could not be turned back into a record.
    #[error("Corrupt download row {id}: {reason}")]
    CorruptRow { id: String, reason: String },
}

// === MoveError ===

/// Errors raised while relocating a finished download into the downloads directory.
#[derive(Debug, Error)]
pub enum MoveError {
    /// The source file does not exist.
    #[error("Download not found: {}", .0.display())]
    MissingSource(PathBuf),
    /// The source path has no final component to reuse as a file name.
    #[error("Download has no file name: {}", .0.display())]
    NoFileName(PathBuf),
    /// Every disambiguated name was already taken.
    #[error("No free file name for {name} in {}", .dir.display())]
    Exhausted { dir: PathBuf, name: String },
    /// A file system call failed.
    #[error("Download file system error: {0}")]
    Io(#[from] std::io::Error),
}

// === SettingsError ===

/// Errors related to registry settings management.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// An I/O error occurred while reading or writing settings.
    #[error("Settings I/O error: {0}")]
    IoError(String),
    /// Failed to serialize or deserialize settings.
    #[error("Settings serialization error: {0}")]
    SerializationError(String),
    /// The provided settings key is invalid.
    #[error("Invalid settings key: {0}")]
    InvalidKey(String),
    /// The provided settings value is invalid.
    #[error("Invalid settings value: {0}")]
    InvalidValue(String),
}

// === AppError ===

/// Errors raised while assembling the application host.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Settings(#[from] SettingsError),
    #[error(transparent)]
    Store(#[from] StoreError),
}
