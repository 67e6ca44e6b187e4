use serde::{Deserialize, Serialize};

use crate::platform;

/// Top-level registry settings container.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct RegistrySettings {
    pub storage: StorageSettings,
    pub downloads: DownloadsSettings,
    pub logging: LoggingSettings,
}

/// Where and how download records are persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StorageSettings {
    /// SQLite file path. Empty or `:memory:` selects the transient store.
    pub path: String,
    /// Number of rows materialized per `fetch_more` call.
    pub page_size: usize,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            path: platform::get_data_dir()
                .join("downloads.db")
                .to_string_lossy()
                .to_string(),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

pub const DEFAULT_PAGE_SIZE: usize = 50;

/// Destination of finished downloads.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct DownloadsSettings {
    /// Overrides the platform downloads directory when set.
    pub directory: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingSettings {
    /// `tracing_subscriber::EnvFilter` directive; `RUST_LOG` wins when set.
    pub filter: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}
