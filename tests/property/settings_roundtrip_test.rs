//! Property-based tests for RegistrySettings serialization round-trip.
//!
//! These tests verify that RegistrySettings can be serialized to JSON
//! and deserialized back without data loss for arbitrary valid inputs, both
//! directly and through the settings engine's file on disk.

use download_registry::services::settings_engine::{SettingsEngine, SettingsEngineTrait};
use download_registry::types::settings::{
    DownloadsSettings, LoggingSettings, RegistrySettings, StorageSettings,
};
use proptest::prelude::*;
use tempfile::TempDir;

fn arb_storage_settings() -> impl Strategy<Value = StorageSettings> {
    (
        prop_oneof![
            Just(String::new()),
            Just(":memory:".to_string()),
            "/[a-zA-Z0-9_./ -]{1,50}\\.db",
        ],
        1usize..10_000,
    )
        .prop_map(|(path, page_size)| StorageSettings { path, page_size })
}

fn arb_downloads_settings() -> impl Strategy<Value = DownloadsSettings> {
    proptest::option::of("/[a-zA-Z0-9_./ -]{1,50}")
        .prop_map(|directory| DownloadsSettings { directory })
}

fn arb_logging_settings() -> impl Strategy<Value = LoggingSettings> {
    prop_oneof![
        Just("info"),
        Just("debug"),
        Just("warn,download_registry=trace"),
        Just("error"),
    ]
    .prop_map(|filter| LoggingSettings {
        filter: filter.to_string(),
    })
}

fn arb_registry_settings() -> impl Strategy<Value = RegistrySettings> {
    (
        arb_storage_settings(),
        arb_downloads_settings(),
        arb_logging_settings(),
    )
        .prop_map(|(storage, downloads, logging)| RegistrySettings {
            storage,
            downloads,
            logging,
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(20))]

    #[test]
    fn settings_json_roundtrip(settings in arb_registry_settings()) {
        let json = serde_json::to_string(&settings).expect("serialize settings");
        let decoded: RegistrySettings = serde_json::from_str(&json).expect("deserialize settings");
        prop_assert_eq!(decoded, settings);
    }

    #[test]
    fn settings_survive_engine_save_and_load(settings in arb_registry_settings()) {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.json").to_string_lossy().to_string();

        let mut writer = SettingsEngine::new(Some(path.clone()));
        writer.load().unwrap();
        writer
            .set_value("storage", serde_json::to_value(&settings.storage).unwrap())
            .unwrap();
        writer
            .set_value("downloads", serde_json::to_value(&settings.downloads).unwrap())
            .unwrap();
        writer
            .set_value("logging", serde_json::to_value(&settings.logging).unwrap())
            .unwrap();

        let mut reader = SettingsEngine::new(Some(path));
        prop_assert_eq!(reader.load().unwrap(), settings);
    }
}
