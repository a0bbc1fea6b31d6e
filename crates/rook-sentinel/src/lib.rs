//! Rook Sentinel: detects rook sacrifices on a live chess page.
//!
//! Two racing detectors (board-snapshot diffing and move-list watching) are
//! reconciled by a [`Coordinator`] that emits one [`SacrificeSignal`] per
//! detection and gates the celebration overlay.

pub mod attack;
pub mod capture;
pub mod config;
pub mod coordinator;
pub mod diff;
pub mod notation;
pub mod overlay;
pub mod page;
pub mod types;

pub use attack::can_attack;
pub use capture::BoardReader;
pub use config::{MarkupSelectors, SentinelConfig};
pub use coordinator::{Coordinator, DetectionSource, Observation};
pub use diff::{analyze, detect, SacrificeFinding};
pub use notation::{has_rook_glyph, DedupLedger, MoveListDetector, MoveNode};
pub use overlay::{
    LogOnlyPlayer, OverlayController, OverlayPlayer, OverlayRequest, PlaybackGuard,
    SettingsStore, StaticSettings,
};
pub use page::{respond, Notifier, NullNotifier, Page, PageLoad};
pub use types::*;
