//! Property-based tests for the registry store.
//!
//! Arbitrary records written through `upsert` come back unchanged from
//! `load_page`, newest first, and paging with any page size visits every row
//! exactly once.

use chrono::DateTime;
use download_registry::database::store::{PageCursor, RegistryStore, SqliteStore, StoreLocator};
use download_registry::types::download::DownloadRecord;
use proptest::prelude::*;
use url::Url;

fn arb_url() -> impl Strategy<Value = Url> {
    (
        prop_oneof![Just("https"), Just("http"), Just("ftp")],
        "[a-z][a-z0-9]{2,12}",
        prop_oneof![Just(".com"), Just(".org"), Just(".net")],
        proptest::option::of("/[a-z0-9._-]{1,16}"),
    )
        .prop_map(|(scheme, host, tld, path)| {
            Url::parse(&format!("{scheme}://{host}{tld}{}", path.unwrap_or_default())).unwrap()
        })
}

fn arb_record() -> impl Strategy<Value = DownloadRecord> {
    (
        arb_url(),
        "/[a-zA-Z0-9 _./-]{0,40}",
        prop_oneof![Just(""), Just("text/plain"), Just("application/pdf")],
        (any::<bool>(), any::<bool>(), any::<bool>()),
        "[ -~]{0,30}",
        // A narrow range so timestamps collide and the sequence tiebreak matters.
        1_600_000_000_000i64..1_600_000_000_020,
    )
        .prop_map(|(url, path, mimetype, (complete, paused, incognito), error, ms)| {
            DownloadRecord {
                id: String::new(),
                url,
                path,
                mimetype: mimetype.to_string(),
                complete,
                paused,
                error,
                created: DateTime::from_timestamp_millis(ms).unwrap(),
                incognito,
                sequence: 0,
            }
        })
}

/// Records with unique ids and sequences.
fn arb_records() -> impl Strategy<Value = Vec<DownloadRecord>> {
    prop::collection::vec(arb_record(), 0..25).prop_map(|records| {
        records
            .into_iter()
            .enumerate()
            .map(|(i, mut r)| {
                r.id = format!("dl-{i}");
                r.sequence = i as u64 + 1;
                r
            })
            .collect()
    })
}

fn sorted_newest_first(mut records: Vec<DownloadRecord>) -> Vec<DownloadRecord> {
    records.sort_by(|a, b| b.order_key().cmp(&a.order_key()));
    records
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(30))]

    #[test]
    fn upsert_then_load_returns_sorted_records(records in arb_records()) {
        let store = SqliteStore::open(&StoreLocator::Transient).unwrap();
        for record in &records {
            store.upsert(record).unwrap();
        }

        let loaded = store.load_page(None, records.len() + 1).unwrap();
        prop_assert_eq!(loaded, sorted_newest_first(records));
    }

    #[test]
    fn paging_visits_every_row_once(records in arb_records(), page_size in 1usize..7) {
        let store = SqliteStore::open(&StoreLocator::Transient).unwrap();
        for record in &records {
            store.upsert(record).unwrap();
        }

        let mut seen = Vec::new();
        let mut cursor: Option<PageCursor> = None;
        loop {
            let page = store.load_page(cursor.as_ref(), page_size).unwrap();
            prop_assert!(page.len() <= page_size);
            let done = page.len() < page_size;
            cursor = page.last().map(PageCursor::from).or(cursor);
            seen.extend(page);
            if done {
                break;
            }
        }

        prop_assert_eq!(seen, sorted_newest_first(records));
    }

    #[test]
    fn upsert_is_idempotent(records in arb_records()) {
        let store = SqliteStore::open(&StoreLocator::Transient).unwrap();
        for record in records.iter().chain(records.iter()) {
            store.upsert(record).unwrap();
        }

        let loaded = store.load_page(None, usize::MAX).unwrap();
        prop_assert_eq!(loaded.len(), records.len());
        prop_assert_eq!(
            store.max_sequence().unwrap(),
            records.iter().map(|r| r.sequence).max()
        );
    }
}
