//! Geometric attack checks.
//!
//! Only the shape of each piece's movement is considered. Blocking pieces,
//! pawn direction and move legality are ignored.

use crate::types::{BoardSnapshot, Color, Coordinate, PieceKind};

/// Whether a piece of `kind` standing on `from` could attack `to`.
pub fn can_attack(from: Coordinate, to: Coordinate, kind: PieceKind) -> bool {
    if from == to {
        return false;
    }

    let df = from.file_delta(&to);
    let dr = from.rank_delta(&to);

    match kind {
        PieceKind::Pawn => df == 1 && dr == 1,
        PieceKind::Knight => (df == 2 && dr == 1) || (df == 1 && dr == 2),
        PieceKind::Bishop => diagonal(df, dr),
        PieceKind::Rook => straight(df, dr),
        PieceKind::Queen => diagonal(df, dr) || straight(df, dr),
        PieceKind::King => df <= 1 && dr <= 1,
    }
}

fn diagonal(df: u8, dr: u8) -> bool {
    df == dr && df != 0
}

fn straight(df: u8, dr: u8) -> bool {
    (df == 0) ^ (dr == 0)
}

/// First square holding a piece of `by` that can reach `target`.
pub fn first_attacker(board: &BoardSnapshot, target: Coordinate, by: Color) -> Option<Coordinate> {
    board
        .iter()
        .filter(|(_, piece)| piece.color == by)
        .find(|(at, piece)| can_attack(**at, target, piece.kind))
        .map(|(at, _)| *at)
}
