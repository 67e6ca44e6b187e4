// Download registry platform paths
// Resolves per-user configuration, data and downloads directories through `dirs`.

use std::path::PathBuf;

const APP_DIR: &str = "download-registry";

/// Returns the configuration directory for the registry.
///
/// - **Linux**: `$XDG_CONFIG_HOME/download-registry` or `~/.config/download-registry`
/// - **macOS**: `~/Library/Application Support/download-registry`
/// - **Windows**: `%APPDATA%\download-registry`
pub fn get_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(fallback_home)
        .join(APP_DIR)
}

/// Returns the data directory holding the durable registry store.
///
/// - **Linux**: `$XDG_DATA_HOME/download-registry` or `~/.local/share/download-registry`
/// - **macOS**: `~/Library/Application Support/download-registry`
/// - **Windows**: `%APPDATA%\download-registry`
pub fn get_data_dir() -> PathBuf {
    dirs::data_dir().unwrap_or_else(fallback_home).join(APP_DIR)
}

/// Returns the per-user downloads directory finished files are moved into.
///
/// Uses the platform's well-known downloads folder, falling back to
/// `$HOME/Downloads` when the platform does not define one.
pub fn get_downloads_dir() -> PathBuf {
    dirs::download_dir().unwrap_or_else(|| fallback_home().join("Downloads"))
}

fn fallback_home() -> PathBuf {
    dirs::home_dir().unwrap_or_else(std::env::temp_dir)
}
