// src/infra/paths.rs — Config and data path resolution
//
// SCADCRITIC_HOME overrides everything for isolation. When unset, config
// lives under ~/.scadcritic/ and generated designs under ./designs
// (overridable via [data] in config.toml).

use std::path::PathBuf;

fn scadcritic_home() -> Option<PathBuf> {
    std::env::var_os("SCADCRITIC_HOME").map(PathBuf::from)
}

/// Configuration directory: $SCADCRITIC_HOME/ or ~/.scadcritic/
pub fn config_dir() -> PathBuf {
    if let Some(home) = scadcritic_home() {
        return home;
    }
    dirs::home_dir()
        .map(|h| h.join(".scadcritic"))
        .unwrap_or_else(|| PathBuf::from(".scadcritic"))
}

/// Config file path
pub fn config_file_path() -> PathBuf {
    config_dir().join("config.toml")
}

/// Default directory for generated designs
pub fn default_data_dir() -> PathBuf {
    if let Some(home) = scadcritic_home() {
        return home.join("designs");
    }
    PathBuf::from("designs")
}
