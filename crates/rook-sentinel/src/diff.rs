//! Rook-sacrifice detection between two consecutive board snapshots.
//!
//! The check is a two-stage heuristic. A rook must have disappeared from the
//! board; then either an enemy piece now stands on its square (direct
//! capture), or a rook of the same side reappeared on a square an enemy
//! piece can reach (moved into jeopardy). Positions skipped between samples
//! produce false negatives.

use serde::{Deserialize, Serialize};

use crate::attack::first_attacker;
use crate::types::{BoardSnapshot, Coordinate, Piece};

/// Which heuristic confirmed the sacrifice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SacrificeFinding {
    /// An enemy piece occupies the square the rook was on.
    DirectCapture { square: Coordinate, captured_by: Piece },
    /// The rook's side has a rook on a new square that `attacker` can reach.
    MovedIntoJeopardy {
        vacated: Coordinate,
        square: Coordinate,
        attacker: Coordinate,
    },
}

impl SacrificeFinding {
    /// Short human-readable summary for logs.
    pub fn describe(&self) -> String {
        match self {
            SacrificeFinding::DirectCapture { square, captured_by } => {
                format!("rook captured on {square} by {:?}", captured_by.kind)
            }
            SacrificeFinding::MovedIntoJeopardy {
                square, attacker, ..
            } => format!("rook moved to {square}, attacked from {attacker}"),
        }
    }
}

/// True when a rook sacrifice happened between `previous` and `current`.
pub fn detect(previous: Option<&BoardSnapshot>, current: Option<&BoardSnapshot>) -> bool {
    analyze(previous, current).is_some()
}

/// Same as [`detect`], reporting which heuristic fired.
pub fn analyze(
    previous: Option<&BoardSnapshot>,
    current: Option<&BoardSnapshot>,
) -> Option<SacrificeFinding> {
    let (previous, current) = (previous?, current?);

    if current.rook_count() >= previous.rook_count() {
        return None;
    }

    // Rooks whose square no longer holds a rook of the same side.
    let missing: Vec<(Coordinate, Piece)> = previous
        .rooks()
        .filter(|(at, rook)| !current.has_rook(at, rook.color))
        .map(|(at, rook)| (*at, *rook))
        .collect();

    for (square, rook) in &missing {
        if let Some(occupant) = current.get(square) {
            if occupant.color != rook.color {
                tracing::debug!("Board diff: direct capture on {square}");
                return Some(SacrificeFinding::DirectCapture {
                    square: *square,
                    captured_by: *occupant,
                });
            }
        }
    }

    let (vacated, rook) = missing.first().copied()?;

    let (landed, _) = current
        .rooks()
        .find(|(at, p)| p.color == rook.color && !previous.has_rook(at, rook.color))?;

    let attacker = first_attacker(current, *landed, rook.color.opponent())?;
    tracing::debug!("Board diff: rook {vacated} -> {landed} attacked from {attacker}");

    Some(SacrificeFinding::MovedIntoJeopardy {
        vacated,
        square: *landed,
        attacker,
    })
}
