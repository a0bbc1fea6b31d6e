//! Board snapshot reader.
//!
//! Scrapes piece placement out of page markup. Squares are identified by a
//! `square-<file><rank>` class (1-based digits) and pieces by a two-letter
//! class token such as `wr` or `bq`. The piece token may sit on the square
//! element itself or on a nested `piece` element.
//!
//! `scraper` documents are `!Send`, so everything here is synchronous and
//! works on a markup string supplied by the caller.

use scraper::{ElementRef, Html, Selector};

use crate::config::MarkupSelectors;
use crate::types::{BoardSnapshot, Coordinate, Piece, SentinelError, SentinelResult};

const SQUARE_SELECTOR: &str = r#"[class*="square-"]"#;
const PIECE_SELECTOR: &str = r#"[class*="piece"]"#;

/// Reads [`BoardSnapshot`]s from page markup.
#[derive(Debug, Clone)]
pub struct BoardReader {
    board_selectors: Vec<String>,
}

impl BoardReader {
    /// Build a reader, rejecting selectors that do not parse.
    pub fn new(selectors: &MarkupSelectors) -> SentinelResult<Self> {
        for s in &selectors.board {
            parse_selector(s)?;
        }
        Ok(Self {
            board_selectors: selectors.board.clone(),
        })
    }

    /// Capture the board from a full HTML document.
    ///
    /// Returns `None` when no board container is present.
    pub fn capture(&self, html: &str) -> Option<BoardSnapshot> {
        let document = Html::parse_document(html);
        self.capture_document(&document)
    }

    /// Capture the board from an already parsed document.
    pub fn capture_document(&self, document: &Html) -> Option<BoardSnapshot> {
        let board = self.find_board(document)?;
        Some(read_board(board))
    }

    fn find_board<'a>(&self, document: &'a Html) -> Option<ElementRef<'a>> {
        self.board_selectors
            .iter()
            .filter_map(|s| Selector::parse(s).ok())
            .find_map(|sel| document.select(&sel).next())
    }
}

impl Default for BoardReader {
    fn default() -> Self {
        Self {
            board_selectors: MarkupSelectors::default().board,
        }
    }
}

fn read_board(board: ElementRef<'_>) -> BoardSnapshot {
    let mut snapshot = BoardSnapshot::new();
    let (Ok(square_sel), Ok(piece_sel)) =
        (Selector::parse(SQUARE_SELECTOR), Selector::parse(PIECE_SELECTOR))
    else {
        return snapshot;
    };

    for square in board.select(&square_sel) {
        let Some(at) = square_coordinate(square) else {
            continue;
        };

        let piece = piece_from_classes(square)
            .or_else(|| square.select(&piece_sel).find_map(piece_from_classes));

        match piece {
            Some(piece) => {
                // A piece element that also carries the square class is seen twice.
                if snapshot.get(&at).is_none() {
                    snapshot.insert(at, piece);
                }
            }
            None if has_piece_marker(square, &piece_sel) => {
                tracing::trace!("Unclassified piece markup on {at}");
            }
            None => {}
        }
    }

    snapshot
}

/// Decode the first `square-XY` class token on an element.
fn square_coordinate(el: ElementRef<'_>) -> Option<Coordinate> {
    el.value().classes().find_map(|class| {
        let digits = class.strip_prefix("square-")?.as_bytes();
        match digits {
            [f, r] if f.is_ascii_digit() && r.is_ascii_digit() => {
                Coordinate::from_encoded(f - b'0', r - b'0')
            }
            _ => None,
        }
    })
}

fn piece_from_classes(el: ElementRef<'_>) -> Option<Piece> {
    el.value().classes().find_map(Piece::from_code)
}

fn has_piece_marker(square: ElementRef<'_>, piece_sel: &Selector) -> bool {
    square.value().classes().any(|c| c.contains("piece")) || square.select(piece_sel).next().is_some()
}

fn parse_selector(s: &str) -> SentinelResult<Selector> {
    Selector::parse(s).map_err(|e| SentinelError::InvalidSelector {
        selector: s.to_string(),
        reason: e.to_string(),
    })
}
