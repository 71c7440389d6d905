//! Configuration module for Duck Search
//!
//! Handles loading and validating settings from YAML files and environment variables.

mod settings;

pub use settings::*;

use anyhow::Result;
use std::path::PathBuf;
use tracing::info;

/// Load settings from the first settings file found, or use defaults
///
/// `DUCK_SEARCH_SETTINGS_PATH` is checked before the default locations.
pub fn load() -> Result<Settings> {
    if let Ok(path) = std::env::var("DUCK_SEARCH_SETTINGS_PATH") {
        let path = PathBuf::from(path);
        if path.exists() {
            return load_file(path);
        }
    }

    let paths = [
        PathBuf::from("settings.yml"),
        PathBuf::from("config/settings.yml"),
        PathBuf::from("/etc/duck-search/settings.yml"),
        dirs::config_dir()
            .map(|p| p.join("duck-search/settings.yml"))
            .unwrap_or_default(),
    ];

    for path in paths {
        if path.is_file() {
            return load_file(path);
        }
    }

    info!("No settings file found, using defaults");
    let mut settings = Settings::default();
    settings.merge_env();
    settings.validate()?;
    Ok(settings)
}

/// Load settings from an explicit file, then apply environment overrides
pub fn load_file(path: PathBuf) -> Result<Settings> {
    info!("Loading settings from: {}", path.display());
    let mut settings = Settings::from_file(&path)?;
    settings.merge_env();
    settings.validate()?;
    Ok(settings)
}
