//! Configuration loading and resolution.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use rook_sentinel::SentinelConfig;

use crate::error::{HostError, HostResult};

const DEFAULT_PAGE_POLL_MS: u64 = 250;

/// External overlay player: an argv list, the asset path is appended.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    pub command: Vec<String>,
    pub asset: Option<PathBuf>,
}

/// Everything the host reads from its config file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    #[serde(flatten)]
    pub detection: SentinelConfig,
    /// How often the page file is re-read for move-list changes.
    pub page_poll_ms: u64,
    pub player: PlayerConfig,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            detection: SentinelConfig::default(),
            page_poll_ms: DEFAULT_PAGE_POLL_MS,
            player: PlayerConfig::default(),
        }
    }
}

impl HostConfig {
    /// Load from a JSON file and apply environment overrides. A missing file
    /// yields the defaults.
    pub fn load(path: &Path) -> HostResult<Self> {
        let mut config = if path.exists() {
            tracing::info!("Loading config: {}", path.display());
            let raw = std::fs::read_to_string(path)?;
            serde_json::from_str::<HostConfig>(&raw)?
        } else {
            tracing::debug!("No config at {}, using defaults", path.display());
            HostConfig::default()
        };

        config.detection = config.detection.with_env_overrides();
        config.detection.validate()?;
        if config.page_poll_ms == 0 {
            return Err(HostError::Sentinel(rook_sentinel::SentinelError::Config(
                "page_poll_ms must be > 0".into(),
            )));
        }
        Ok(config)
    }
}

/// Resolve the config file path.
pub fn resolve_config_path(explicit: Option<&str>) -> String {
    if let Some(path) = explicit {
        return path.to_string();
    }

    if let Ok(env_path) = std::env::var("ROOK_SENTINEL_CONFIG") {
        return env_path;
    }

    let cwd_config = PathBuf::from(".rook-sentinel/config.json");
    if cwd_config.exists() {
        return cwd_config.display().to_string();
    }

    format!("{}/.rook-sentinel/config.json", home_dir())
}

/// Resolve the settings store path.
pub fn resolve_settings_path(explicit: Option<&str>) -> String {
    if let Some(path) = explicit {
        return path.to_string();
    }

    if let Ok(env_path) = std::env::var("ROOK_SENTINEL_SETTINGS") {
        return env_path;
    }

    format!("{}/.rook-sentinel/settings.json", home_dir())
}

fn home_dir() -> String {
    std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .unwrap_or_else(|_| ".".to_string())
}
