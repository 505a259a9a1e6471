//! Arbor - Position Evaluation Module
//!
//! Static evaluation of chess positions from white's point of view:
//! - Material balance
//! - Piece positioning (piece-square tables)
//!
//! Nothing here searches or generates moves; the score is a pure function
//! of piece placement.

use crate::board::Board;
use crate::types::*;

// ============================================================================
// PIECE VALUES
// ============================================================================

pub const PIECE_VALUES: [i32; 7] = [
    0,    // EMPTY
    100,  // PAWN
    350,  // KNIGHT
    350,  // BISHOP
    525,  // ROOK
    1000, // QUEEN
    0,    // KING
];

// ============================================================================
// PIECE-SQUARE TABLES
// ============================================================================
//
// Tables are laid out in board index order for white, a8 first. Black reads
// the vertically mirrored square.

// Pawn PST - rewards central pawns and keeps the king's shelter in place
#[rustfmt::skip]
const PAWN_PST: [i32; 64] = [
     0,   0,   0,   0,   0,   0,   0,   0,  // Rank 8
     0,   0,   0,   0,   0,   0,   0,   0,  // Rank 7
     0,   0,   0,  15,  15,   0,   0,   0,  // Rank 6
     0,   0,  15,  30,  30,  15,   0,   0,  // Rank 5
    10,  15,  20,  25,  25,  20,  15,  10,  // Rank 4
    20,  20,  20,   0,   0,  20,  20,  20,  // Rank 3
     0,   0,   0,   0,   0,   0,   0,   0,  // Rank 2
     0,   0,   0,   0,   0,   0,   0,   0,  // Rank 1
];

// Knight PST
#[rustfmt::skip]
const KNIGHT_PST: [i32; 64] = [
   -90, -90, -90, -90, -90, -90, -90, -90,
   -90,   0,   0,   0,   0,   0,   0, -90,
   -50,  60,  90,  75,  75,  90,  60, -50,
   -70,   0,  60,  30,  30,  60,   0, -70,
   -70,   0,  60,  30,  30,  60,   0, -70,
   -70,   0,  60,  60,  60,  60,   0, -70,
   -70, -30, -30, -30, -30, -30, -30, -70,
   -90, -70, -70, -70, -70, -70, -70, -90,
];

// Bishop PST
#[rustfmt::skip]
const BISHOP_PST: [i32; 64] = [
   -90, -90, -90, -90,   0, -90, -90, -90,
   -90, -60, -60, -60, -60, -60, -60, -90,
   -60, -60,   0,   0,   0,   0, -60, -60,
     0,   0,  40,  40,  40,  40,   0,   0,
     0,  40,  40,  40,  40,  40,  40,   0,
     0,  40,  40,  40,  40,  40,  40,   0,
   -30,   0,   0,   0,   0,   0,   0, -30,
   -30, -30, -30, -30, -30, -30, -30, -30,
];

// Rooks and queens are scored on material alone
const ROOK_PST: [i32; 64] = [0; 64];
const QUEEN_PST: [i32; 64] = [0; 64];

// King PST - stay home behind the pawns
#[rustfmt::skip]
const KING_PST: [i32; 64] = [
   -90, -90, -90, -90, -90, -90, -90, -90,
   -90, -90, -90, -90, -90, -90, -90, -90,
   -90, -90, -90, -90, -90, -90, -90, -90,
   -90, -90, -90, -90, -90, -90, -90, -90,
   -40, -40, -90, -90, -90, -90, -40, -40,
     0,   0, -40, -40, -40, -40,   0,   0,
    50,  50,   0, -40, -40,   0,  50,  50,
   100, 100,  50, -40, -40,  50, 100, 100,
];

/// Get piece-square table value for a piece
#[inline]
fn get_pst_value(piece_type: u8, sq: usize, color: Color) -> i32 {
    // Flip square for black pieces
    let pst_sq = match color {
        Color::White => sq,
        Color::Black => sq ^ 56,
    };

    match piece_type {
        PAWN => PAWN_PST[pst_sq],
        KNIGHT => KNIGHT_PST[pst_sq],
        BISHOP => BISHOP_PST[pst_sq],
        ROOK => ROOK_PST[pst_sq],
        QUEEN => QUEEN_PST[pst_sq],
        KING => KING_PST[pst_sq],
        _ => 0,
    }
}

/// Material balance alone, white minus black
pub fn material(board: &Board) -> i32 {
    board
        .squares
        .iter()
        .filter_map(|&piece| {
            let value = PIECE_VALUES[get_piece_type(piece) as usize];
            match Color::of_piece(piece)? {
                Color::White => Some(value),
                Color::Black => Some(-value),
            }
        })
        .sum()
}

/// Main evaluation function
/// Returns score from white's perspective (positive = good for white)
pub fn evaluate(board: &Board) -> i32 {
    let mut score = 0;

    for (sq, &piece) in board.squares.iter().enumerate() {
        let Some(color) = Color::of_piece(piece) else {
            continue;
        };
        let piece_type = get_piece_type(piece);
        let value = PIECE_VALUES[piece_type as usize] + get_pst_value(piece_type, sq, color);
        match color {
            Color::White => score += value,
            Color::Black => score -= value,
        }
    }

    score
}
