use std::path::PathBuf;

use download_registry::types::errors::*;

// === StoreError Tests ===

#[test]
fn store_error_corrupt_row_display() {
    let err = StoreError::CorruptRow {
        id: "dl-1".to_string(),
        reason: "invalid url".to_string(),
    };
    assert_eq!(err.to_string(), "Corrupt download row dl-1: invalid url");
}

#[test]
fn store_error_wraps_io() {
    let err: StoreError = std::io::Error::other("read-only file system").into();
    assert_eq!(err.to_string(), "Registry store I/O error: read-only file system");
}

#[test]
fn store_error_wraps_sqlite() {
    let err: StoreError = rusqlite::Error::QueryReturnedNoRows.into();
    assert!(err.to_string().starts_with("Registry store database error: "));
    assert!(matches!(err, StoreError::Database(_)));
}

// === MoveError Tests ===

#[test]
fn move_error_display_variants() {
    assert_eq!(
        MoveError::MissingSource(PathBuf::from("/tmp/a.txt")).to_string(),
        "Download not found: /tmp/a.txt"
    );
    assert_eq!(
        MoveError::NoFileName(PathBuf::from("/")).to_string(),
        "Download has no file name: /"
    );
    assert_eq!(
        MoveError::Exhausted {
            dir: PathBuf::from("/home/u/Downloads"),
            name: "a.txt".to_string(),
        }
        .to_string(),
        "No free file name for a.txt in /home/u/Downloads"
    );
}

#[test]
fn move_error_implements_error_trait() {
    let err: Box<dyn std::error::Error> =
        Box::new(MoveError::MissingSource(PathBuf::from("x")));
    assert!(err.source().is_none());
}

// === SettingsError Tests ===

#[test]
fn settings_error_display_variants() {
    assert_eq!(
        SettingsError::IoError("permission denied".to_string()).to_string(),
        "Settings I/O error: permission denied"
    );
    assert_eq!(
        SettingsError::SerializationError("bad json".to_string()).to_string(),
        "Settings serialization error: bad json"
    );
    assert_eq!(
        SettingsError::InvalidKey("storage.nope".to_string()).to_string(),
        "Invalid settings key: storage.nope"
    );
    assert_eq!(
        SettingsError::InvalidValue("page_size must be positive".to_string()).to_string(),
        "Invalid settings value: page_size must be positive"
    );
}

// === AppError Tests ===

#[test]
fn app_error_is_transparent() {
    let err: AppError = SettingsError::InvalidKey("x".to_string()).into();
    assert_eq!(err.to_string(), "Invalid settings key: x");

    let err: AppError = StoreError::CorruptRow {
        id: "a".to_string(),
        reason: "b".to_string(),
    }
    .into();
    assert_eq!(err.to_string(), "Corrupt download row a: b");
}
