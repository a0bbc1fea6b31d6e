//! Celebration overlay gating.
//!
//! At most one overlay plays at a time. The [`PlaybackGuard`] is taken when
//! playback starts and always released when it ends, whether the player
//! finished, failed, or ran into the playback ceiling. A page change
//! dismisses the overlay early.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::task::{AbortHandle, JoinHandle};

use crate::types::{SentinelResult, DEFAULT_MOVE_LABEL};

const IDLE: u64 = 0;

/// Process-wide "an overlay is on screen" flag.
///
/// Each acquisition gets its own ticket, so a playback that outlives a
/// forced release cannot free the guard taken by the next one.
#[derive(Debug, Clone)]
pub struct PlaybackGuard {
    holder: Arc<AtomicU64>,
    next_ticket: Arc<AtomicU64>,
}

impl Default for PlaybackGuard {
    fn default() -> Self {
        Self {
            holder: Arc::new(AtomicU64::new(IDLE)),
            next_ticket: Arc::new(AtomicU64::new(IDLE + 1)),
        }
    }
}

impl PlaybackGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the guard. Returns `None` if it is already held.
    pub fn try_acquire(&self) -> Option<u64> {
        let ticket = self.next_ticket.fetch_add(1, Ordering::Relaxed);
        self.holder
            .compare_exchange(IDLE, ticket, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| ticket)
    }

    /// Release the guard if `ticket` still holds it.
    pub fn release_ticket(&self, ticket: u64) -> bool {
        self.holder
            .compare_exchange(ticket, IDLE, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Release the guard whoever holds it.
    pub fn release(&self) {
        self.holder.store(IDLE, Ordering::Release);
    }

    pub fn is_active(&self) -> bool {
        self.holder.load(Ordering::Acquire) != IDLE
    }
}

/// What the player is asked to show.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlayRequest {
    pub move_description: String,
    pub muted: bool,
}

/// Shows the overlay. The future resolves when playback ends or is dismissed.
#[async_trait]
pub trait OverlayPlayer: Send + Sync {
    async fn play(&self, request: OverlayRequest) -> SentinelResult<()>;
}

/// Read access to user settings held by an external store.
pub trait SettingsStore: Send + Sync {
    /// Whether the overlay plays with sound. Defaults to `true`.
    fn sound_enabled(&self) -> bool;
}

/// Settings fixed at construction time.
#[derive(Debug, Clone, Copy)]
pub struct StaticSettings {
    pub sound_enabled: bool,
}

impl Default for StaticSettings {
    fn default() -> Self {
        Self {
            sound_enabled: true,
        }
    }
}

impl SettingsStore for StaticSettings {
    fn sound_enabled(&self) -> bool {
        self.sound_enabled
    }
}

/// Player that only logs. Used when no real player is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogOnlyPlayer;

#[async_trait]
impl OverlayPlayer for LogOnlyPlayer {
    async fn play(&self, request: OverlayRequest) -> SentinelResult<()> {
        tracing::info!(
            "Overlay: {} (muted: {})",
            request.move_description,
            request.muted
        );
        Ok(())
    }
}

/// Entry point for "play sacrifice overlay".
#[derive(Clone)]
pub struct OverlayController {
    player: Arc<dyn OverlayPlayer>,
    settings: Arc<dyn SettingsStore>,
    guard: PlaybackGuard,
    in_flight: Arc<Mutex<Option<AbortHandle>>>,
    ceiling: Duration,
}

impl OverlayController {
    pub fn new(
        player: Arc<dyn OverlayPlayer>,
        settings: Arc<dyn SettingsStore>,
        ceiling: Duration,
    ) -> Self {
        Self {
            player,
            settings,
            guard: PlaybackGuard::new(),
            in_flight: Arc::new(Mutex::new(None)),
            ceiling,
        }
    }

    pub fn guard(&self) -> &PlaybackGuard {
        &self.guard
    }

    /// Start an overlay unless one is already playing.
    ///
    /// Returns the playback task, or `None` when the guard was held and the
    /// request was dropped. Must be called inside a tokio runtime.
    pub fn trigger(&self, move_description: Option<&str>) -> Option<JoinHandle<()>> {
        let Some(ticket) = self.guard.try_acquire() else {
            tracing::debug!("Overlay already playing, request dropped");
            return None;
        };

        let request = OverlayRequest {
            move_description: move_description
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .unwrap_or(DEFAULT_MOVE_LABEL)
                .to_string(),
            muted: !self.settings.sound_enabled(),
        };

        let player = Arc::clone(&self.player);
        let guard = self.guard.clone();
        let ceiling = self.ceiling;

        let handle = tokio::spawn(async move {
            match tokio::time::timeout(ceiling, player.play(request)).await {
                Ok(Ok(())) => tracing::debug!("Overlay finished"),
                Ok(Err(e)) => tracing::warn!("Overlay playback failed: {e}"),
                Err(_) => tracing::debug!("Overlay hit the {}s ceiling", ceiling.as_secs()),
            }
            guard.release_ticket(ticket);
        });

        if let Ok(mut slot) = self.in_flight.lock() {
            *slot = Some(handle.abort_handle());
        }
        Some(handle)
    }

    /// Tear down any overlay on screen and free the guard, for a page change.
    pub fn reset(&self) {
        let in_flight = self.in_flight.lock().ok().and_then(|mut slot| slot.take());
        if let Some(playback) = in_flight {
            if !playback.is_finished() {
                tracing::debug!("Overlay dismissed by page change");
            }
            playback.abort();
        }
        self.guard.release();
    }
}
