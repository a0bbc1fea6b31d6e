//! Core data types for board observations, move entries, and emitted signals.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Label used when a sacrifice is confirmed without a move text to show.
pub const DEFAULT_MOVE_LABEL: &str = "Rook sacrifice";

/// A square on the board, file `a`-`h` and rank `1`-`8`.
///
/// Stored zero-based; ordering is file-major so `a1 < a2 < ... < a8 < b1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Coordinate {
    file: u8,
    rank: u8,
}

impl Coordinate {
    /// Build a coordinate from a file letter and a 1-based rank.
    pub fn new(file: char, rank: u8) -> Option<Self> {
        let file = file.to_ascii_lowercase();
        if !('a'..='h').contains(&file) || !(1..=8).contains(&rank) {
            return None;
        }
        Some(Self {
            file: file as u8 - b'a',
            rank: rank - 1,
        })
    }

    /// Decode the page form: 1-based file index and 1-based rank index
    /// (`square-11` is a1, `square-85` is h5).
    pub fn from_encoded(file_index: u8, rank_index: u8) -> Option<Self> {
        if !(1..=8).contains(&file_index) || !(1..=8).contains(&rank_index) {
            return None;
        }
        Some(Self {
            file: file_index - 1,
            rank: rank_index - 1,
        })
    }

    /// Encode back to the page form `(file_index, rank_index)`.
    pub fn encoded(&self) -> (u8, u8) {
        (self.file + 1, self.rank + 1)
    }

    pub fn file(&self) -> char {
        (b'a' + self.file) as char
    }

    pub fn rank(&self) -> u8 {
        self.rank + 1
    }

    /// Absolute file distance to another square.
    pub fn file_delta(&self, other: &Coordinate) -> u8 {
        self.file.abs_diff(other.file)
    }

    /// Absolute rank distance to another square.
    pub fn rank_delta(&self, other: &Coordinate) -> u8 {
        self.rank.abs_diff(other.rank)
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.file(), self.rank())
    }
}

impl FromStr for Coordinate {
    type Err = SentinelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut chars = s.trim().chars();
        let parsed = match (chars.next(), chars.next(), chars.next()) {
            (Some(file), Some(rank), None) => rank
                .to_digit(10)
                .and_then(|r| Coordinate::new(file, r as u8)),
            _ => None,
        };
        parsed.ok_or_else(|| SentinelError::InvalidCoordinate(s.to_string()))
    }
}

impl From<Coordinate> for String {
    fn from(c: Coordinate) -> Self {
        c.to_string()
    }
}

impl TryFrom<String> for Coordinate {
    type Error = SentinelError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// Side a piece belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    White,
    Black,
}

impl Color {
    pub fn opponent(self) -> Color {
        match self {
            Color::White => Color::Black,
            Color::Black => Color::White,
        }
    }

    fn from_code(c: char) -> Option<Color> {
        match c {
            'w' => Some(Color::White),
            'b' => Some(Color::Black),
            _ => None,
        }
    }
}

/// Kind of chess piece.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PieceKind {
    Pawn,
    Knight,
    Bishop,
    Rook,
    Queen,
    King,
}

impl PieceKind {
    fn from_code(c: char) -> Option<PieceKind> {
        match c {
            'p' => Some(PieceKind::Pawn),
            'n' => Some(PieceKind::Knight),
            'b' => Some(PieceKind::Bishop),
            'r' => Some(PieceKind::Rook),
            'q' => Some(PieceKind::Queen),
            'k' => Some(PieceKind::King),
            _ => None,
        }
    }
}

/// A piece on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Piece {
    pub kind: PieceKind,
    pub color: Color,
}

impl Piece {
    pub fn new(kind: PieceKind, color: Color) -> Self {
        Self { kind, color }
    }

    /// Parse a two-letter piece code such as `wr` (white rook) or `bn`
    /// (black knight).
    pub fn from_code(code: &str) -> Option<Piece> {
        let mut chars = code.chars();
        match (chars.next(), chars.next(), chars.next()) {
            (Some(c), Some(k), None) => Some(Piece {
                color: Color::from_code(c)?,
                kind: PieceKind::from_code(k)?,
            }),
            _ => None,
        }
    }

    pub fn is_rook(&self) -> bool {
        self.kind == PieceKind::Rook
    }
}

/// Point-in-time piece placement. An absent coordinate is an empty square.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BoardSnapshot {
    squares: BTreeMap<Coordinate, Piece>,
}

impl BoardSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Place a piece, replacing whatever was recorded on that square.
    pub fn insert(&mut self, at: Coordinate, piece: Piece) -> Option<Piece> {
        self.squares.insert(at, piece)
    }

    pub fn get(&self, at: &Coordinate) -> Option<&Piece> {
        self.squares.get(at)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Coordinate, &Piece)> {
        self.squares.iter()
    }

    /// All rooks of either color, in square order.
    pub fn rooks(&self) -> impl Iterator<Item = (&Coordinate, &Piece)> {
        self.squares.iter().filter(|(_, p)| p.is_rook())
    }

    pub fn rook_count(&self) -> usize {
        self.rooks().count()
    }

    /// True when `at` holds a rook of `color`.
    pub fn has_rook(&self, at: &Coordinate, color: Color) -> bool {
        matches!(self.get(at), Some(p) if p.is_rook() && p.color == color)
    }

    pub fn len(&self) -> usize {
        self.squares.len()
    }

    pub fn is_empty(&self) -> bool {
        self.squares.is_empty()
    }
}

impl FromIterator<(Coordinate, Piece)> for BoardSnapshot {
    fn from_iter<I: IntoIterator<Item = (Coordinate, Piece)>>(iter: I) -> Self {
        Self {
            squares: iter.into_iter().collect(),
        }
    }
}

/// Features derived once from a newly appended move-list entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveEvent {
    pub raw_text: String,
    pub has_rook_glyph: bool,
    pub is_capture: bool,
}

/// A confirmed sacrifice. Built once, never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SacrificeSignal {
    pub move_description: String,
    pub source_url: String,
    pub timestamp: DateTime<Utc>,
}

impl SacrificeSignal {
    /// Create a signal stamped with the current time. An empty description
    /// falls back to [`DEFAULT_MOVE_LABEL`].
    pub fn new(move_description: impl Into<String>, source_url: impl Into<String>) -> Self {
        let mut move_description = move_description.into();
        if move_description.trim().is_empty() {
            move_description = DEFAULT_MOVE_LABEL.to_string();
        }
        Self {
            move_description,
            source_url: source_url.into(),
            timestamp: Utc::now(),
        }
    }

    /// The wire message sent to the external notification channel.
    pub fn to_message(&self) -> OutboundMessage {
        OutboundMessage::RookSacrificeDetected {
            move_text: self.move_description.clone(),
            url: self.source_url.clone(),
        }
    }
}

/// Messages pushed to the external notification channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action")]
pub enum OutboundMessage {
    #[serde(rename = "rookSacrificeDetected")]
    RookSacrificeDetected {
        #[serde(rename = "move")]
        move_text: String,
        url: String,
    },
}

/// Requests accepted from external collaborators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action")]
pub enum InboundRequest {
    #[serde(rename = "extractPageURL")]
    ExtractPageUrl,
}

/// Answer to [`InboundRequest::ExtractPageUrl`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageUrlResponse {
    pub url: String,
}

/// Errors that can occur in the detection engine.
#[derive(thiserror::Error, Debug)]
pub enum SentinelError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid coordinate: {0}")]
    InvalidCoordinate(String),

    #[error("Invalid selector '{selector}': {reason}")]
    InvalidSelector { selector: String, reason: String },

    #[error("Notification channel error: {0}")]
    Notify(String),

    #[error("Playback error: {0}")]
    Playback(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Convenience result type.
pub type SentinelResult<T> = Result<T, SentinelError>;
