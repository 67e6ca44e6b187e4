//! App core for the download registry host.
//!
//! Wires the settings engine to the registry and keeps one event subscription
//! the host drains after every request.

use std::sync::mpsc::Receiver;

use tracing::info;

use crate::managers::download_registry::{DownloadRegistry, DownloadRegistryTrait};
use crate::services::settings_engine::{SettingsEngine, SettingsEngineTrait};
use crate::types::errors::AppError;
use crate::types::event::DownloadEvent;

/// Central application struct holding the registry and its settings.
pub struct App {
    pub registry: DownloadRegistry,
    pub settings_engine: SettingsEngine,
    events: Receiver<DownloadEvent>,
}

impl App {
    /// Loads settings from `settings_path` (or the platform default) and opens
    /// the configured store.
    ///
    /// # Errors
    /// Returns [`AppError`] if the settings file is unreadable or malformed, or
    /// no store can be opened at all.
    pub fn new(settings_path: Option<String>) -> Result<Self, AppError> {
        let mut settings_engine = SettingsEngine::new(settings_path);
        settings_engine.load()?;
        Self::with_settings(settings_engine)
    }

    /// Builds the app from an already loaded settings engine and materializes
    /// the first page of stored downloads.
    ///
    /// # Errors
    /// Returns [`AppError::Store`] if even a transient store cannot be opened.
    pub fn with_settings(settings_engine: SettingsEngine) -> Result<Self, AppError> {
        let mut registry = DownloadRegistry::new(settings_engine.downloads_dir())?;
        let settings = settings_engine.get_settings();
        registry.set_page_size(settings.storage.page_size);
        registry.set_store_path(&settings.storage.path);
        registry.fetch_more();
        info!(
            store = %registry.store_path(),
            downloads_dir = %registry.downloads_dir().display(),
            loaded = registry.count(),
            "download registry ready"
        );

        let events = registry.subscribe();
        Ok(Self {
            registry,
            settings_engine,
            events,
        })
    }

    /// Pushes the current settings into the registry. Changing the store path
    /// resets the view.
    pub fn apply_settings(&mut self) {
        let settings = self.settings_engine.get_settings();
        self.registry.set_page_size(settings.storage.page_size);
        self.registry
            .set_downloads_dir(self.settings_engine.downloads_dir());
        self.registry.set_store_path(&settings.storage.path);
    }

    /// Events emitted since the previous call, in emission order.
    pub fn drain_events(&self) -> Vec<DownloadEvent> {
        self.events.try_iter().collect()
    }

    /// Shutdown sequence: incognito downloads never outlive the session.
    pub fn shutdown(&mut self) {
        self.registry.prune_incognito();
    }
}
