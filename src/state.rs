use std::fs;
use std::path::{Path, PathBuf};

use crate::config::PromptState;
use crate::error::{BackupError, Result};

fn config_dir() -> Result<PathBuf> {
    if cfg!(windows) {
        if let Ok(appdata) = std::env::var("APPDATA") {
            return Ok(PathBuf::from(appdata).join("backup-tables"));
        }
        if let Ok(home) = std::env::var("USERPROFILE") {
            return Ok(PathBuf::from(home).join("AppData\\Roaming").join("backup-tables"));
        }
        Err(BackupError::Config("APPDATA not set; cannot determine config directory".into()))
    } else {
        if let Ok(home) = std::env::var("HOME") {
            return Ok(PathBuf::from(home).join(".backup-tables"));
        }
        Err(BackupError::Config("HOME not set; cannot determine config directory".into()))
    }
}

/// File-backed [`PromptState`], read lazily on first use.
#[derive(Debug)]
pub struct StateStore {
    path: PathBuf,
    cached: Option<PromptState>,
}

impl StateStore {
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cached: None,
        }
    }

    /// `state.json` in the per-user config directory.
    pub fn default_location() -> Result<Self> {
        Ok(Self::at(config_dir()?.join("state.json")))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&mut self) -> &PromptState {
        let path = &self.path;
        self.cached.get_or_insert_with(|| load_state(path))
    }

    pub fn update(&mut self, f: impl FnOnce(&mut PromptState)) -> Result<()> {
        let mut state = self.get().clone();
        f(&mut state);
        save_state(&self.path, &state)?;
        self.cached = Some(state);
        Ok(())
    }
}

/// Missing, empty or corrupt files read as the default state.
pub fn load_state(path: &Path) -> PromptState {
    let Ok(content) = fs::read_to_string(path) else {
        return PromptState::default();
    };
    if content.trim().is_empty() {
        return PromptState::default();
    }
    serde_json::from_str(&content).unwrap_or_default()
}

pub fn save_state(path: &Path, state: &PromptState) -> Result<()> {
    let dir = path
        .parent()
        .ok_or_else(|| BackupError::Config(format!("invalid state path {}", path.display())))?;
    if !dir.as_os_str().is_empty() && !dir.exists() {
        fs::create_dir_all(dir)?;
    }
    let json = serde_json::to_string_pretty(state)?;
    // tmp then rename
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json)?;
    if path.exists() {
        let _ = fs::remove_file(path);
    }
    fs::rename(&tmp, path)?;
    Ok(())
}
