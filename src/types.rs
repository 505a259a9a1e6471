//! Arbor - Type definitions and constants
//!
//! This module provides the core type definitions and constants for
//! representing chess pieces, colors, squares and the 0x88 embedding
//! used by the move generator.
//!
//! Board indices run 0..63 rank-major starting at a8, so index 0 is the
//! corner on black's side of the board and white pawns advance towards
//! lower indices.

/// Piece type constants (lower 3 bits)
pub const EMPTY: u8 = 0;
pub const PAWN: u8 = 1;
pub const KNIGHT: u8 = 2;
pub const BISHOP: u8 = 3;
pub const ROOK: u8 = 4;
pub const QUEEN: u8 = 5;
pub const KING: u8 = 6;

/// Color constants (bits 3-4)
pub const WHITE: u8 = 8;
pub const BLACK: u8 = 16;

/// Piece masks
pub const PIECE_MASK: u8 = 0b111;
pub const COLOR_MASK: u8 = 0b11000;

/// Complete piece values for convenience
pub const WHITE_PAWN: u8 = WHITE | PAWN;
pub const WHITE_KNIGHT: u8 = WHITE | KNIGHT;
pub const WHITE_BISHOP: u8 = WHITE | BISHOP;
pub const WHITE_ROOK: u8 = WHITE | ROOK;
pub const WHITE_QUEEN: u8 = WHITE | QUEEN;
pub const WHITE_KING: u8 = WHITE | KING;

pub const BLACK_PAWN: u8 = BLACK | PAWN;
pub const BLACK_KNIGHT: u8 = BLACK | KNIGHT;
pub const BLACK_BISHOP: u8 = BLACK | BISHOP;
pub const BLACK_ROOK: u8 = BLACK | ROOK;
pub const BLACK_QUEEN: u8 = BLACK | QUEEN;
pub const BLACK_KING: u8 = BLACK | KING;

/// Piece types a pawn may promote to, in generation order
pub const PROMOTION_PIECES: [u8; 4] = [KNIGHT, BISHOP, ROOK, QUEEN];

/// File and rank names for coordinate notation (rank names are top-down)
pub const FILE_NAMES: &[u8; 8] = b"abcdefgh";
pub const RANK_NAMES: &[u8; 8] = b"87654321";

/// Side of the board
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Color {
    White,
    Black,
}

impl Color {
    /// The other side
    #[inline]
    pub fn opposite(self) -> Color {
        match self {
            Color::White => Color::Black,
            Color::Black => Color::White,
        }
    }

    /// Index into per-color arrays (black first, white second)
    #[inline]
    pub fn index(self) -> usize {
        match self {
            Color::White => 1,
            Color::Black => 0,
        }
    }

    /// Color bits as stored in a piece value
    #[inline]
    pub fn bits(self) -> u8 {
        match self {
            Color::White => WHITE,
            Color::Black => BLACK,
        }
    }

    #[inline]
    pub fn from_white(is_white: bool) -> Color {
        if is_white {
            Color::White
        } else {
            Color::Black
        }
    }

    /// Color of a non-empty piece value
    #[inline]
    pub fn of_piece(piece: u8) -> Option<Color> {
        match piece & COLOR_MASK {
            WHITE => Some(Color::White),
            BLACK => Some(Color::Black),
            _ => None,
        }
    }

    #[inline]
    pub fn is_white(self) -> bool {
        self == Color::White
    }
}

impl std::fmt::Display for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Color::White => write!(f, "white"),
            Color::Black => write!(f, "black"),
        }
    }
}

/// Extract piece type from piece value
#[inline]
pub fn get_piece_type(piece: u8) -> u8 {
    piece & PIECE_MASK
}

/// Extract color from piece value
#[inline]
pub fn get_piece_color(piece: u8) -> u8 {
    piece & COLOR_MASK
}

/// Check if piece is white
#[inline]
pub fn is_white(piece: u8) -> bool {
    (piece & COLOR_MASK) == WHITE
}

/// Check if piece is black
#[inline]
pub fn is_black(piece: u8) -> bool {
    (piece & COLOR_MASK) == BLACK
}

/// Board row of a square (0 = black's back rank)
#[inline]
pub fn row_of(sq: usize) -> usize {
    sq / 8
}

/// Board column of a square (0 = a-file)
#[inline]
pub fn file_of(sq: usize) -> usize {
    sq % 8
}

/// Row a pawn of this color starts on
#[inline]
pub fn pawn_start_row(color: Color) -> usize {
    match color {
        Color::White => 6,
        Color::Black => 1,
    }
}

/// Row a pawn of this color promotes on
#[inline]
pub fn promotion_row(color: Color) -> usize {
    match color {
        Color::White => 0,
        Color::Black => 7,
    }
}

/// Square the king of this color starts on
#[inline]
pub fn king_home(color: Color) -> usize {
    match color {
        Color::White => 60,
        Color::Black => 4,
    }
}

// ============================================================================
// 0x88 EMBEDDING
// ============================================================================

/// Map a 0..63 board index into the 16-wide 0x88 layout
#[inline]
pub fn to_0x88(sq: usize) -> i32 {
    (sq + (sq & !7)) as i32
}

/// Map a 0x88 index back to 0..63. The caller must have checked
/// that the index is on the board.
#[inline]
pub fn from_0x88(sq88: i32) -> usize {
    ((sq88 + (sq88 & 7)) >> 1) as usize
}

/// True if a 0x88 index falls off the 8x8 board
#[inline]
pub fn off_board(sq88: i32) -> bool {
    !(0..128).contains(&sq88) || sq88 & 0x88 != 0
}

/// Convert square index (0-63) to algebraic notation (e.g., "e4")
pub fn square_name(sq: usize) -> String {
    format!(
        "{}{}",
        FILE_NAMES[file_of(sq)] as char,
        RANK_NAMES[row_of(sq)] as char
    )
}

/// Convert algebraic notation to square index
pub fn parse_square(name: &str) -> Option<usize> {
    let bytes = name.as_bytes();
    if bytes.len() != 2 {
        return None;
    }

    let file = match bytes[0] {
        b'a'..=b'h' => (bytes[0] - b'a') as usize,
        _ => return None,
    };

    let row = match bytes[1] {
        b'1'..=b'8' => 7 - (bytes[1] - b'1') as usize,
        _ => return None,
    };

    Some(row * 8 + file)
}

/// Piece character to piece value. `'0'` is an empty square.
pub fn char_to_piece(c: char) -> Option<u8> {
    match c {
        '0' => Some(EMPTY),
        'P' => Some(WHITE_PAWN),
        'N' => Some(WHITE_KNIGHT),
        'B' => Some(WHITE_BISHOP),
        'R' => Some(WHITE_ROOK),
        'Q' => Some(WHITE_QUEEN),
        'K' => Some(WHITE_KING),
        'p' => Some(BLACK_PAWN),
        'n' => Some(BLACK_KNIGHT),
        'b' => Some(BLACK_BISHOP),
        'r' => Some(BLACK_ROOK),
        'q' => Some(BLACK_QUEEN),
        'k' => Some(BLACK_KING),
        _ => None,
    }
}

/// Piece value to character (uppercase white, lowercase black, `'0'` empty)
pub fn piece_to_char(piece: u8) -> char {
    let c = match get_piece_type(piece) {
        PAWN => 'p',
        KNIGHT => 'n',
        BISHOP => 'b',
        ROOK => 'r',
        QUEEN => 'q',
        KING => 'k',
        _ => return '0',
    };
    if is_white(piece) {
        c.to_ascii_uppercase()
    } else {
        c
    }
}
