//! Move-list entry classification and the per-session dedup ledger.
//!
//! Each entry appended to the move list is reduced to a [`MoveEvent`] and
//! classified as a rook capture either from its algebraic text (`Rxe5`,
//! `Raxd1`, `R1xa3`) or from rook iconography combined with a capture marker
//! (`♜xe5`, or a figurine icon element next to `xe5`).

use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::types::MoveEvent;

const CAPTURE_MARKER: char = 'x';
const ROOK_FIGURINES: [char; 2] = ['\u{2656}', '\u{265C}'];
const ROOK_ICON_TOKENS: [&str; 2] = ["wr", "br"];

fn rook_capture_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"R[a-h1-8]?x").expect("rook capture regex is valid"))
}

fn any_element() -> &'static Selector {
    static SEL: OnceLock<Selector> = OnceLock::new();
    SEL.get_or_init(|| Selector::parse("*").expect("universal selector is valid"))
}

/// A node appended to the move list, as handed over by the page observer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveNode {
    /// Text content of the node.
    pub text: String,
    /// Outer HTML of the node.
    pub markup: String,
}

impl MoveNode {
    pub fn new(text: impl Into<String>, markup: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            markup: markup.into(),
        }
    }

    /// A node with text only and no markup.
    pub fn plain(text: impl Into<String>) -> Self {
        let text = text.into();
        Self {
            markup: text.clone(),
            text,
        }
    }

    /// Build a node from a parsed element.
    pub fn from_element(el: ElementRef<'_>) -> Self {
        Self {
            text: el.text().collect(),
            markup: el.html(),
        }
    }
}

impl MoveEvent {
    /// Derive the classification features of a move-list node.
    pub fn from_node(node: &MoveNode) -> Self {
        Self {
            raw_text: node.text.clone(),
            has_rook_glyph: has_rook_glyph(&node.markup),
            is_capture: node.text.contains(CAPTURE_MARKER),
        }
    }

    /// Algebraic rook-capture notation, or rook iconography plus a capture.
    pub fn is_rook_capture(&self) -> bool {
        rook_capture_re().is_match(&self.raw_text) || (self.has_rook_glyph && self.is_capture)
    }
}

/// True when markup carries a rook marker: a figurine character, a
/// `data-figurine` attribute naming a rook, a `wr`/`br` icon class, or any
/// class containing "rook".
pub fn has_rook_glyph(markup: &str) -> bool {
    if markup.contains(ROOK_FIGURINES) {
        return true;
    }
    let fragment = Html::parse_fragment(markup);
    let found = fragment.select(any_element()).any(is_rook_marker);
    found
}

fn is_rook_marker(el: ElementRef<'_>) -> bool {
    let value = el.value();

    if let Some(fig) = value.attr("data-figurine") {
        let fig = fig.trim();
        if fig.eq_ignore_ascii_case("r") || fig.eq_ignore_ascii_case("rook") {
            return true;
        }
    }

    value.classes().any(|class| {
        ROOK_ICON_TOKENS.iter().any(|t| *t == class)
            || class.to_ascii_lowercase().contains("rook")
    })
}

/// Move texts already turned into signals during the current page session.
#[derive(Debug, Default, Clone)]
pub struct DedupLedger {
    seen: HashSet<String>,
}

impl DedupLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a move text. Returns `false` if it was already present.
    pub fn insert(&mut self, move_text: &str) -> bool {
        self.seen.insert(move_text.to_string())
    }

    pub fn clear(&mut self) {
        self.seen.clear();
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

/// Classifies appended move-list entries, one at a time and in order.
#[derive(Debug, Default)]
pub struct MoveListDetector {
    ledger: DedupLedger,
    last_text: Option<String>,
}

impl MoveListDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Process one appended node. Returns the move description when the
    /// entry is a rook capture not seen before in this session.
    pub fn observe(&mut self, node: &MoveNode) -> Option<String> {
        let text = node.text.trim();
        if text.is_empty() {
            return None;
        }
        if self.last_text.as_deref() == Some(text) {
            tracing::trace!("Repeated move entry '{text}' skipped");
            return None;
        }
        self.last_text = Some(text.to_string());

        let event = MoveEvent::from_node(node);
        if !event.is_rook_capture() {
            return None;
        }

        if !self.ledger.insert(text) {
            tracing::debug!("Rook capture '{text}' already recorded this session");
            return None;
        }

        tracing::debug!(
            "Move list: rook capture '{text}' (glyph: {}, capture: {})",
            event.has_rook_glyph,
            event.is_capture
        );
        Some(text.to_string())
    }

    /// Forget everything seen so far, for a new page session.
    pub fn reset(&mut self) {
        self.ledger.clear();
        self.last_text = None;
    }

    pub fn ledger(&self) -> &DedupLedger {
        &self.ledger
    }
}
