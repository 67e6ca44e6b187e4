//! Download registry database layer.
//!
//! Provides SQLite connection management, schema migrations and the
//! [`RegistryStore`](store::RegistryStore) abstraction the registry persists through.
//!
//! # Usage
//!
//! ```no_run
//! use download_registry::database::store::{open_store, StoreLocator};
//!
//! // Durable store backed by a file
//! let store = open_store(&StoreLocator::parse("downloads.db")).expect("failed to open store");
//!
//! // Transient store that never touches disk
//! let scratch = open_store(&StoreLocator::Transient).expect("failed to open store");
//! ```

pub mod connection;
pub mod migrations;
pub mod store;

pub use connection::Database;
pub use store::{open_store, FieldPredicate, PageCursor, RegistryStore, SqliteStore, StoreLocator};
