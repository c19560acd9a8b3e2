use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::backup::{DEFAULT_TIMESTAMP_FORMAT, EntityRegistry, validate_format};
use crate::error::{BackupError, Result};

pub mod settings;

pub use settings::{PromptState, Settings};

pub const DEFAULT_CONFIG_FILE: &str = "backup-tables.json";

/// Settings for one invocation after CLI flags, environment and file are merged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    pub database_url: String,
    pub timestamp_format: String,
    pub entities: EntityRegistry,
}

/// Load settings from `path`, or from `backup-tables.json` in `dir` when no
/// path is given. A missing default file yields empty settings; a missing
/// explicit file is an error.
pub fn load_settings(path: Option<&Path>, dir: &Path) -> Result<Settings> {
    let (path, required): (PathBuf, bool) = match path {
        Some(p) => (p.to_path_buf(), true),
        None => (dir.join(DEFAULT_CONFIG_FILE), false),
    };

    if !path.exists() {
        if required {
            return Err(BackupError::Config(format!("config file not found: {}", path.display())));
        }
        return Ok(Settings::default());
    }

    let content = fs::read_to_string(&path)?;
    if content.trim().is_empty() {
        return Ok(Settings::default());
    }
    let settings: Settings = serde_json::from_str(&content)?;
    debug!("Loaded settings from {}", path.display());
    Ok(settings)
}

pub fn save_settings(path: &Path, settings: &Settings) -> Result<()> {
    let content = serde_json::to_string_pretty(settings)?;
    fs::write(path, content)?;
    Ok(())
}

impl RunConfig {
    /// Flags win over the file; the file wins over built-in defaults.
    /// `database_url` from the environment arrives through the flag.
    pub fn resolve(settings: Settings, database_url: Option<String>, timestamp_format: Option<String>) -> Result<Self> {
        let database_url = database_url
            .or(settings.database_url)
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| {
                BackupError::Config(format!(
                    "no database given; pass --database, set DATABASE_URL or add database_url to {}",
                    DEFAULT_CONFIG_FILE
                ))
            })?;

        let timestamp_format = timestamp_format
            .or(settings.timestamp_format)
            .unwrap_or_else(|| DEFAULT_TIMESTAMP_FORMAT.to_string());
        validate_format(&timestamp_format)?;

        Ok(Self {
            database_url,
            timestamp_format,
            entities: EntityRegistry::from(settings.entities),
        })
    }
}
