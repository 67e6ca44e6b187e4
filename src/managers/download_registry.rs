//! Download Registry.
//!
//! Keeps the ordered, in-memory view of every tracked download, writes each
//! change through to a [`RegistryStore`], and reports what changed to
//! subscribers as [`DownloadEvent`]s.
//!
//! The view is ordered newest first by `created`, ties broken by insertion
//! order. Store failures never undo an in-memory change: they are logged and
//! the operation carries on.

use std::collections::HashSet;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Receiver;

use chrono::{SubsecRound, Utc};
use tracing::{debug, error, info, warn};
use url::Url;

use crate::database::store::{
    open_store, FieldPredicate, PageCursor, RegistryStore, StoreLocator,
};
use crate::services::broadcaster::EventBroadcaster;
use crate::services::{file_mover, mime};
use crate::types::download::{DownloadRecord, Field, FieldValue};
use crate::types::errors::StoreError;
use crate::types::event::DownloadEvent;
use crate::types::settings::DEFAULT_PAGE_SIZE;

/// Operations the transfer/UI layer drives the registry with.
pub trait DownloadRegistryTrait {
    fn add(&mut self, id: &str, url: Url, path: &str, mimetype: &str, incognito: bool);
    fn contains(&self, id: &str) -> bool;
    fn set_complete(&mut self, id: &str, complete: bool);
    fn set_error(&mut self, id: &str, message: &str);
    fn pause(&mut self, id: &str);
    fn resume(&mut self, id: &str);
    fn cancel(&mut self, id: &str);
    fn move_to_downloads(&mut self, id: &str, source: &Path) -> bool;
    fn delete(&mut self, path: &str);
    fn prune_incognito(&mut self);
    fn set_store_path(&mut self, path: &str);
    fn store_path(&self) -> String;
    fn fetch_more(&mut self);
    fn can_fetch_more(&self) -> bool;
    fn data(&self, row: usize, field: Field) -> FieldValue;
    fn count(&self) -> usize;
}

/// Registry over a swappable store, with mpsc-based change notification.
pub struct DownloadRegistry {
    store: Box<dyn RegistryStore>,
    /// Path exactly as last passed to `set_store_path`.
    requested_path: String,
    records: Vec<DownloadRecord>,
    ids: HashSet<String>,
    downloads_dir: PathBuf,
    page_size: usize,
    cursor: Option<PageCursor>,
    exhausted: bool,
    next_sequence: u64,
    events: EventBroadcaster,
}

impl DownloadRegistry {
    /// Creates a registry bound to a fresh transient store.
    ///
    /// # Errors
    /// Returns [`StoreError`] if the in-memory database cannot be initialized.
    pub fn new(downloads_dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let store = open_store(&StoreLocator::Transient)?;
        Ok(Self::with_store(store, downloads_dir))
    }

    /// Creates a registry over an already opened store. No rows are loaded
    /// until [`fetch_more`](DownloadRegistryTrait::fetch_more) is called.
    pub fn with_store(store: Box<dyn RegistryStore>, downloads_dir: impl Into<PathBuf>) -> Self {
        let next_sequence = Self::first_free_sequence(store.as_ref());
        Self {
            requested_path: store.locator().to_string(),
            store,
            records: Vec::new(),
            ids: HashSet::new(),
            downloads_dir: downloads_dir.into(),
            page_size: DEFAULT_PAGE_SIZE,
            cursor: None,
            exhausted: false,
            next_sequence,
            events: EventBroadcaster::new(),
        }
    }

    /// Subscribes to change events emitted from now on.
    pub fn subscribe(&mut self) -> Receiver<DownloadEvent> {
        self.events.subscribe()
    }

    pub fn get(&self, row: usize) -> Option<&DownloadRecord> {
        self.records.get(row)
    }

    pub fn find(&self, id: &str) -> Option<&DownloadRecord> {
        self.row_of(id).map(|row| &self.records[row])
    }

    /// Records in view order, newest first.
    pub fn records(&self) -> impl Iterator<Item = &DownloadRecord> {
        self.records.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Positional query by numeric role. Negative rows, rows past the end and
    /// unknown roles all yield [`FieldValue::Invalid`].
    pub fn data_by_role(&self, row: i64, role: i32) -> FieldValue {
        match (usize::try_from(row), Field::from_role(role)) {
            (Ok(row), Some(field)) => self.data(row, field),
            _ => FieldValue::Invalid,
        }
    }

    /// Numeric role and name of every queryable field.
    pub fn role_names(&self) -> Vec<(i32, &'static str)> {
        Field::ALL.iter().map(|f| (f.role(), f.name())).collect()
    }

    pub fn downloads_dir(&self) -> &Path {
        &self.downloads_dir
    }

    pub fn set_downloads_dir(&mut self, dir: impl Into<PathBuf>) {
        self.downloads_dir = dir.into();
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn set_page_size(&mut self, page_size: usize) {
        self.page_size = page_size.max(1);
    }

    fn first_free_sequence(store: &dyn RegistryStore) -> u64 {
        match store.max_sequence() {
            Ok(max) => max.map_or(1, |m| m + 1),
            Err(err) => {
                warn!(store = %store.locator(), error = %err, "could not read insertion counter");
                1
            }
        }
    }

    fn row_of(&self, id: &str) -> Option<usize> {
        if !self.ids.contains(id) {
            return None;
        }
        self.records.iter().position(|r| r.id == id)
    }

    /// Writes `record` through to the store. Incognito records stay in memory.
    fn persist(&self, record: &DownloadRecord) {
        if record.incognito {
            return;
        }
        if let Err(err) = self.store.upsert(record) {
            warn!(id = %record.id, error = %err, "failed to persist download");
        }
    }

    fn remove_row(&mut self, row: usize) {
        let record = self.records.remove(row);
        self.ids.remove(&record.id);
        if let Err(err) = self.store.remove(&record.id) {
            warn!(id = %record.id, error = %err, "failed to remove download from store");
        }
        self.events.broadcast(DownloadEvent::Removed {
            first: row,
            last: row,
        });
    }

    /// Applies `apply` to the record `id`; when it reports a change, persists
    /// and announces `field` for that row.
    fn update_field<F>(&mut self, id: &str, field: Field, apply: F)
    where
        F: FnOnce(&mut DownloadRecord) -> bool,
    {
        let Some(row) = self.row_of(id) else {
            debug!(id, field = field.name(), "update for unknown download ignored");
            return;
        };
        if !apply(&mut self.records[row]) {
            return;
        }
        self.persist(&self.records[row]);
        self.events.broadcast(DownloadEvent::DataChanged {
            row,
            fields: vec![field],
        });
    }

    fn bind(&mut self, store: Box<dyn RegistryStore>) {
        self.records.clear();
        self.ids.clear();
        self.cursor = None;
        self.exhausted = false;
        self.next_sequence = Self::first_free_sequence(store.as_ref());
        self.store = store;
        self.events.broadcast(DownloadEvent::Reset);
    }
}

/// Stores `value` in `slot` and reports whether that changed anything.
fn assign<T: PartialEq>(slot: &mut T, value: T) -> bool {
    if *slot == value {
        return false;
    }
    *slot = value;
    true
}

impl DownloadRegistryTrait for DownloadRegistry {
    /// Inserts a new record at the head of the view. Ids already in the view or
    /// in the bound store are ignored.
    fn add(&mut self, id: &str, url: Url, path: &str, mimetype: &str, incognito: bool) {
        if self.ids.contains(id) {
            debug!(id, "download already registered");
            return;
        }
        // Rows not paged in yet are only known to the store.
        if !self.exhausted {
            match self.store.exists(id) {
                Ok(true) => {
                    debug!(id, "download already stored");
                    return;
                }
                Ok(false) => {}
                Err(err) => warn!(id, error = %err, "could not check store for download"),
            }
        }

        // Millisecond precision matches the store, and never going below the
        // current head keeps the new record first.
        let now = Utc::now().trunc_subsecs(3);
        let created = self.records.first().map_or(now, |head| now.max(head.created));
        let sequence = self.next_sequence;
        self.next_sequence += 1;

        let record = DownloadRecord {
            id: id.to_string(),
            url,
            path: path.to_string(),
            mimetype: mimetype.to_string(),
            complete: false,
            paused: false,
            error: String::new(),
            created,
            incognito,
            sequence,
        };
        self.persist(&record);
        info!(id, incognito, "download registered");

        self.ids.insert(record.id.clone());
        self.records.insert(0, record);
        self.events
            .broadcast(DownloadEvent::Inserted { first: 0, last: 0 });
    }

    fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    fn set_complete(&mut self, id: &str, complete: bool) {
        self.update_field(id, Field::Complete, |r| assign(&mut r.complete, complete));
    }

    fn set_error(&mut self, id: &str, message: &str) {
        self.update_field(id, Field::Error, |r| {
            if r.error == message {
                return false;
            }
            r.error = message.to_string();
            true
        });
    }

    fn pause(&mut self, id: &str) {
        self.update_field(id, Field::Paused, |r| assign(&mut r.paused, true));
    }

    fn resume(&mut self, id: &str) {
        self.update_field(id, Field::Paused, |r| assign(&mut r.paused, false));
    }

    /// Drops the record without touching any file on disk.
    fn cancel(&mut self, id: &str) {
        let Some(row) = self.row_of(id) else {
            debug!(id, "cancel for unknown download ignored");
            return;
        };
        info!(id, "download cancelled");
        self.remove_row(row);
    }

    /// Moves `source` into the downloads directory under a free name and points
    /// the record at it. Returns whether the file was moved.
    fn move_to_downloads(&mut self, id: &str, source: &Path) -> bool {
        let Some(row) = self.row_of(id) else {
            warn!(id, source = %source.display(), "cannot move file for unknown download");
            return false;
        };

        let destination = match file_mover::move_into_dir(source, &self.downloads_dir) {
            Ok(destination) => destination,
            Err(err) => {
                warn!(id, "{err}");
                return false;
            }
        };
        info!(id, destination = %destination.display(), "download moved into downloads directory");

        let record = &mut self.records[row];
        record.path = destination.to_string_lossy().into_owned();
        record.mimetype = mime::mime_type_for_path(&destination).to_string();
        self.persist(&self.records[row]);
        self.events.broadcast(DownloadEvent::DataChanged {
            row,
            fields: vec![Field::Path, Field::Mimetype],
        });
        true
    }

    /// Removes the record stored at `path` and unlinks the file (best-effort).
    fn delete(&mut self, path: &str) {
        let Some(row) = self.records.iter().position(|r| r.path == path) else {
            debug!(path, "delete for unknown path ignored");
            return;
        };

        match fs::remove_file(path) {
            Ok(()) => {}
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!(path, "downloaded file already gone");
            }
            Err(err) => warn!(path, error = %err, "could not delete downloaded file"),
        }
        info!(id = %self.records[row].id, path, "download deleted");
        self.remove_row(row);
    }

    /// Removes every incognito record.
    ///
    /// One removal event is sent per contiguous run, tail first, so each event's
    /// indices are valid for the view left by the events before it.
    fn prune_incognito(&mut self) {
        let mut removed = 0;
        let mut end = self.records.len();
        while end > 0 {
            if !self.records[end - 1].incognito {
                end -= 1;
                continue;
            }
            let last = end - 1;
            let mut first = last;
            while first > 0 && self.records[first - 1].incognito {
                first -= 1;
            }
            for record in self.records.drain(first..=last) {
                self.ids.remove(&record.id);
                removed += 1;
            }
            self.events
                .broadcast(DownloadEvent::Removed { first, last });
            end = first;
        }

        if let Err(err) = self.store.remove_all(FieldPredicate::Incognito(true)) {
            warn!(error = %err, "failed to prune incognito downloads from store");
        }
        if removed > 0 {
            info!(removed, "incognito downloads pruned");
        }
    }

    /// Rebinds the registry to another store. Repeating the last requested path
    /// is a no-op; any other path, even `""` after `":memory:"`, binds a fresh
    /// store, clears the view and emits [`DownloadEvent::Reset`].
    fn set_store_path(&mut self, path: &str) {
        if path == self.requested_path {
            return;
        }
        let locator = StoreLocator::parse(path);

        let store = match open_store(&locator) {
            Ok(store) => store,
            Err(err) => {
                error!(store = %locator, error = %err, "could not open registry store, using a transient one");
                match open_store(&StoreLocator::Transient) {
                    Ok(store) => store,
                    Err(err) => {
                        error!(error = %err, "could not open transient store, keeping current store");
                        return;
                    }
                }
            }
        };
        self.requested_path = path.to_string();
        self.bind(store);
    }

    fn store_path(&self) -> String {
        self.store.locator().to_string()
    }

    /// Materializes the next page of persisted records.
    fn fetch_more(&mut self) {
        if self.exhausted {
            return;
        }
        let page = match self.store.load_page(self.cursor.as_ref(), self.page_size) {
            Ok(page) => page,
            Err(err) => {
                warn!(store = %self.store.locator(), error = %err, "failed to load downloads page");
                return;
            }
        };
        if page.len() < self.page_size {
            self.exhausted = true;
        }
        if let Some(last) = page.last() {
            self.cursor = Some(PageCursor::from(last));
        }
        debug!(rows = page.len(), exhausted = self.exhausted, "downloads page loaded");

        let mut run: Option<(usize, usize)> = None;
        for record in page {
            if self.ids.contains(&record.id) {
                continue;
            }
            self.next_sequence = self.next_sequence.max(record.sequence + 1);
            let key = record.order_key();
            let pos = self.records.partition_point(|r| r.order_key() > key);
            self.ids.insert(record.id.clone());
            self.records.insert(pos, record);

            run = match run {
                Some((first, last)) if pos == last + 1 => Some((first, pos)),
                Some((first, last)) => {
                    self.events
                        .broadcast(DownloadEvent::Inserted { first, last });
                    Some((pos, pos))
                }
                None => Some((pos, pos)),
            };
        }
        if let Some((first, last)) = run {
            self.events
                .broadcast(DownloadEvent::Inserted { first, last });
        }
    }

    fn can_fetch_more(&self) -> bool {
        !self.exhausted
    }

    fn data(&self, row: usize, field: Field) -> FieldValue {
        self.records
            .get(row)
            .map_or(FieldValue::Invalid, |record| record.value(field))
    }

    fn count(&self) -> usize {
        self.records.len()
    }
}
