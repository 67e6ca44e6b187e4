//! Unit tests for the SQLite-backed registry store.

use chrono::{DateTime, Duration, Utc};
use download_registry::database::store::{
    open_store, FieldPredicate, PageCursor, RegistryStore, SqliteStore, StoreLocator,
};
use download_registry::types::download::DownloadRecord;
use download_registry::types::errors::StoreError;
use tempfile::TempDir;
use url::Url;

fn base_time() -> DateTime<Utc> {
    DateTime::from_timestamp_millis(1_700_000_000_000).unwrap()
}

fn record(id: &str, offset_ms: i64, sequence: u64) -> DownloadRecord {
    DownloadRecord {
        id: id.to_string(),
        url: Url::parse(&format!("https://example.org/{id}")).unwrap(),
        path: format!("/tmp/{id}.bin"),
        mimetype: "application/octet-stream".to_string(),
        complete: false,
        paused: false,
        error: String::new(),
        created: base_time() + Duration::milliseconds(offset_ms),
        incognito: false,
        sequence,
    }
}

fn transient() -> SqliteStore {
    SqliteStore::open(&StoreLocator::Transient).expect("transient store")
}

fn page_ids(store: &dyn RegistryStore, after: Option<&PageCursor>, limit: usize) -> Vec<String> {
    store
        .load_page(after, limit)
        .unwrap()
        .into_iter()
        .map(|r| r.id)
        .collect()
}

#[test]
fn test_upsert_then_load_round_trips_every_field() {
    let store = transient();
    let mut rec = record("a", 0, 1);
    rec.complete = true;
    rec.paused = true;
    rec.error = "disk full".to_string();

    store.upsert(&rec).unwrap();

    assert_eq!(store.load_page(None, 10).unwrap(), vec![rec]);
}

#[test]
fn test_upsert_replaces_existing_row() {
    let store = transient();
    let mut rec = record("a", 0, 1);
    store.upsert(&rec).unwrap();

    rec.path = "/home/u/Downloads/a.bin".to_string();
    rec.complete = true;
    store.upsert(&rec).unwrap();
    store.upsert(&rec).unwrap();

    let loaded = store.load_page(None, 10).unwrap();
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded[0].path, "/home/u/Downloads/a.bin");
    assert!(loaded[0].complete);
}

#[test]
fn test_remove_absent_id_succeeds() {
    let store = transient();
    store.upsert(&record("a", 0, 1)).unwrap();

    store.remove("ghost").unwrap();
    store.remove("a").unwrap();
    store.remove("a").unwrap();

    assert!(store.load_page(None, 10).unwrap().is_empty());
}

#[test]
fn test_remove_all_by_predicate() {
    let store = transient();
    let mut done = record("done", 0, 1);
    done.complete = true;
    let mut held = record("held", 1, 2);
    held.paused = true;
    let mut secret = record("secret", 2, 3);
    secret.incognito = true;
    for rec in [&done, &held, &secret] {
        store.upsert(rec).unwrap();
    }

    assert_eq!(store.remove_all(FieldPredicate::Incognito(true)).unwrap(), 1);
    assert_eq!(store.remove_all(FieldPredicate::Incognito(true)).unwrap(), 0);
    assert_eq!(store.remove_all(FieldPredicate::Complete(true)).unwrap(), 1);
    assert_eq!(page_ids(&store, None, 10), vec!["held"]);
    assert_eq!(store.remove_all(FieldPredicate::Paused(false)).unwrap(), 0);
    assert_eq!(store.remove_all(FieldPredicate::Paused(true)).unwrap(), 1);
}

#[test]
fn test_load_page_orders_newest_first_with_sequence_tiebreak() {
    let store = transient();
    store.upsert(&record("old", 0, 1)).unwrap();
    store.upsert(&record("tie-low", 5, 2)).unwrap();
    store.upsert(&record("tie-high", 5, 3)).unwrap();
    store.upsert(&record("new", 10, 4)).unwrap();

    assert_eq!(
        page_ids(&store, None, 10),
        vec!["new", "tie-high", "tie-low", "old"]
    );
}

#[test]
fn test_load_page_cursor_walks_all_rows_once() {
    let store = transient();
    for i in 0..7u64 {
        // Pairs of records share a timestamp.
        store
            .upsert(&record(&format!("r{i}"), (i / 2) as i64, i + 1))
            .unwrap();
    }

    let mut seen = Vec::new();
    let mut cursor: Option<PageCursor> = None;
    loop {
        let page = store.load_page(cursor.as_ref(), 3).unwrap();
        if page.is_empty() {
            break;
        }
        cursor = page.last().map(PageCursor::from);
        seen.extend(page.into_iter().map(|r| r.id));
    }

    assert_eq!(seen, vec!["r6", "r5", "r4", "r3", "r2", "r1", "r0"]);
}

#[test]
fn test_max_sequence() {
    let store = transient();
    assert_eq!(store.max_sequence().unwrap(), None);
    store.upsert(&record("a", 0, 4)).unwrap();
    store.upsert(&record("b", 0, 9)).unwrap();
    assert_eq!(store.max_sequence().unwrap(), Some(9));
}

#[test]
fn test_exists() {
    let store = transient();
    assert!(!store.exists("a").unwrap());
    store.upsert(&record("a", 0, 1)).unwrap();
    assert!(store.exists("a").unwrap());
    store.remove("a").unwrap();
    assert!(!store.exists("a").unwrap());
}

#[test]
fn test_negative_sequence_is_corrupt() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("downloads.db");
    let store = SqliteStore::open(&StoreLocator::File(path.clone())).unwrap();
    store.upsert(&record("a", 0, 1)).unwrap();
    drop(store);

    let raw = rusqlite::Connection::open(&path).unwrap();
    raw.execute("UPDATE downloads SET sequence = -3 WHERE id = 'a'", [])
        .unwrap();
    drop(raw);

    let store = SqliteStore::open(&StoreLocator::File(path)).unwrap();
    let err = store.load_page(None, 10).unwrap_err();
    assert!(matches!(err, StoreError::CorruptRow { ref id, .. } if id == "a"));
    assert!(matches!(
        store.max_sequence().unwrap_err(),
        StoreError::CorruptRow { .. }
    ));
}

#[test]
fn test_sequence_beyond_i64_is_rejected() {
    let store = transient();
    let err = store.upsert(&record("a", 0, u64::MAX)).unwrap_err();
    assert!(matches!(err, StoreError::CorruptRow { .. }));
    assert!(!store.exists("a").unwrap());
}

#[test]
fn test_corrupt_row_is_reported() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("downloads.db");
    let store = SqliteStore::open(&StoreLocator::File(path.clone())).unwrap();
    store.upsert(&record("a", 0, 1)).unwrap();
    drop(store);

    let raw = rusqlite::Connection::open(&path).unwrap();
    raw.execute("UPDATE downloads SET url = 'not a url' WHERE id = 'a'", [])
        .unwrap();
    drop(raw);

    let store = SqliteStore::open(&StoreLocator::File(path)).unwrap();
    let err = store.load_page(None, 10).unwrap_err();
    assert!(err.to_string().starts_with("Corrupt download row a:"));
}

#[test]
fn test_file_store_survives_reopen_and_creates_parent() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("downloads.db");
    let locator = StoreLocator::File(path.clone());

    {
        let store = open_store(&locator).unwrap();
        store.upsert(&record("a", 0, 1)).unwrap();
        store.upsert(&record("b", 1, 2)).unwrap();
    }
    assert!(path.exists());

    let store = open_store(&locator).unwrap();
    assert_eq!(store.locator(), &locator);
    assert_eq!(page_ids(store.as_ref(), None, 10), vec!["b", "a"]);
    assert_eq!(store.max_sequence().unwrap(), Some(2));
}

#[test]
fn test_transient_stores_are_independent() {
    let first = open_store(&StoreLocator::Transient).unwrap();
    let second = open_store(&StoreLocator::Transient).unwrap();
    first.upsert(&record("a", 0, 1)).unwrap();

    assert!(second.load_page(None, 10).unwrap().is_empty());
    assert_eq!(second.locator().to_string(), ":memory:");
}
