//! Detection timing and markup selector configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::types::{SentinelError, SentinelResult, DEFAULT_MOVE_LABEL};

const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;
const DEFAULT_REATTACH_BACKOFF_MS: u64 = 2000;
const DEFAULT_REARM_DELAY_MS: u64 = 500;
const DEFAULT_OVERLAY_CEILING_SECS: u64 = 10;

/// CSS selectors used to find things on the page. Alternatives are tried in
/// order and the first match wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkupSelectors {
    pub board: Vec<String>,
    pub move_list: Vec<String>,
}

impl Default for MarkupSelectors {
    fn default() -> Self {
        Self {
            board: vec![".board".to_string(), "chess-board".to_string()],
            move_list: vec![
                ".move-list-component".to_string(),
                "vertical-move-list".to_string(),
                "wc-simple-move-list".to_string(),
            ],
        }
    }
}

/// Runtime knobs for the detection coordinator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SentinelConfig {
    /// Board sampling period.
    pub poll_interval_ms: u64,
    /// Delay between attempts to locate the move list.
    pub reattach_backoff_ms: u64,
    /// Delay before re-arming the move-list watcher after navigation.
    pub rearm_delay_ms: u64,
    /// Hard ceiling on a single overlay playback.
    pub overlay_ceiling_secs: u64,
    /// Description used when a detector has no move text.
    pub default_move_label: String,
    pub selectors: MarkupSelectors,
}

impl Default for SentinelConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            reattach_backoff_ms: DEFAULT_REATTACH_BACKOFF_MS,
            rearm_delay_ms: DEFAULT_REARM_DELAY_MS,
            overlay_ceiling_secs: DEFAULT_OVERLAY_CEILING_SECS,
            default_move_label: DEFAULT_MOVE_LABEL.to_string(),
            selectors: MarkupSelectors::default(),
        }
    }
}

impl SentinelConfig {
    /// Apply `ROOK_SENTINEL_*` environment overrides on top of this config.
    pub fn with_env_overrides(mut self) -> Self {
        self.poll_interval_ms = read_env_u64("ROOK_SENTINEL_POLL_MS", self.poll_interval_ms).max(1);
        self.reattach_backoff_ms =
            read_env_u64("ROOK_SENTINEL_REATTACH_MS", self.reattach_backoff_ms).max(1);
        self.rearm_delay_ms = read_env_u64("ROOK_SENTINEL_REARM_MS", self.rearm_delay_ms);
        self.overlay_ceiling_secs =
            read_env_u64("ROOK_SENTINEL_OVERLAY_CEILING_SECS", self.overlay_ceiling_secs).max(1);
        self
    }

    /// Reject settings the coordinator cannot run with.
    pub fn validate(&self) -> SentinelResult<()> {
        if self.poll_interval_ms == 0 {
            return Err(SentinelError::Config("poll_interval_ms must be > 0".into()));
        }
        if self.reattach_backoff_ms == 0 {
            return Err(SentinelError::Config("reattach_backoff_ms must be > 0".into()));
        }
        if self.selectors.board.is_empty() || self.selectors.move_list.is_empty() {
            return Err(SentinelError::Config(
                "board and move_list selectors must not be empty".into(),
            ));
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn reattach_backoff(&self) -> Duration {
        Duration::from_millis(self.reattach_backoff_ms)
    }

    pub fn rearm_delay(&self) -> Duration {
        Duration::from_millis(self.rearm_delay_ms)
    }

    pub fn overlay_ceiling(&self) -> Duration {
        Duration::from_secs(self.overlay_ceiling_secs)
    }
}

fn read_env_u64(name: &str, default_value: u64) -> u64 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(default_value)
}
