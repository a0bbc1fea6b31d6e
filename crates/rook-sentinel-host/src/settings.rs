//! File-backed user settings.
//!
//! The file is a flat JSON object such as `{"enableSound": false}` and is
//! re-read on every lookup, so edits apply to the next overlay.

use std::path::PathBuf;

use serde::Deserialize;

use rook_sentinel::SettingsStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub enable_sound: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self { enable_sound: true }
    }
}

/// Settings store backed by a JSON file.
#[derive(Debug, Clone)]
pub struct FileSettings {
    path: PathBuf,
}

impl FileSettings {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Current settings. Missing or unreadable files give the defaults.
    pub fn read(&self) -> Settings {
        let Ok(raw) = std::fs::read_to_string(&self.path) else {
            return Settings::default();
        };
        serde_json::from_str(&raw).unwrap_or_else(|e| {
            tracing::warn!("Ignoring malformed settings {}: {e}", self.path.display());
            Settings::default()
        })
    }
}

impl SettingsStore for FileSettings {
    fn sound_enabled(&self) -> bool {
        self.read().enable_sound
    }
}
