//! Arbor - Board Representation Module
//!
//! This module provides the core data structures for representing a chess board
//! and moves. It includes FEN parsing and generation, the text-grid form used
//! for diagnostics, and the make-move state transition.

use crate::error::{EngineError, ParseError};
use crate::types::*;
use std::str::FromStr;
use tracing::warn;

/// Starting position FEN
pub const STARTING_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

#[rustfmt::skip]
const STARTING_SQUARES: [u8; 64] = [
    BLACK_ROOK, BLACK_KNIGHT, BLACK_BISHOP, BLACK_QUEEN, BLACK_KING, BLACK_BISHOP, BLACK_KNIGHT, BLACK_ROOK,
    BLACK_PAWN, BLACK_PAWN,   BLACK_PAWN,   BLACK_PAWN,  BLACK_PAWN, BLACK_PAWN,   BLACK_PAWN,   BLACK_PAWN,
    EMPTY, EMPTY, EMPTY, EMPTY, EMPTY, EMPTY, EMPTY, EMPTY,
    EMPTY, EMPTY, EMPTY, EMPTY, EMPTY, EMPTY, EMPTY, EMPTY,
    EMPTY, EMPTY, EMPTY, EMPTY, EMPTY, EMPTY, EMPTY, EMPTY,
    EMPTY, EMPTY, EMPTY, EMPTY, EMPTY, EMPTY, EMPTY, EMPTY,
    WHITE_PAWN, WHITE_PAWN,   WHITE_PAWN,   WHITE_PAWN,  WHITE_PAWN, WHITE_PAWN,   WHITE_PAWN,   WHITE_PAWN,
    WHITE_ROOK, WHITE_KNIGHT, WHITE_BISHOP, WHITE_QUEEN, WHITE_KING, WHITE_BISHOP, WHITE_KNIGHT, WHITE_ROOK,
];

/// Represents a chess move
///
/// Two moves are equal iff origin, destination and promotion piece match.
/// Castling and en passant are recognised from the board when the move is made.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Move {
    pub from_sq: usize,
    pub to_sq: usize,
    /// Promotion piece type, `EMPTY` for non-promoting moves
    pub promotion: u8,
}

impl Move {
    /// Create a new move
    pub fn new(from_sq: usize, to_sq: usize) -> Self {
        Move {
            from_sq,
            to_sq,
            promotion: EMPTY,
        }
    }

    /// Create a promotion move
    pub fn with_promotion(from_sq: usize, to_sq: usize, promotion: u8) -> Self {
        Move {
            from_sq,
            to_sq,
            promotion,
        }
    }

    /// Null move constant, returned when there is no move to make
    pub fn null() -> Self {
        Move::new(0, 0)
    }

    /// Check if this is a null move
    pub fn is_null(&self) -> bool {
        self.from_sq == self.to_sq
    }

    /// Convert move to coordinate notation (e.g., "e2e4", "e7e8q")
    pub fn to_algebraic(&self) -> String {
        let mut text = format!("{}{}", square_name(self.from_sq), square_name(self.to_sq));
        let promo_char = match self.promotion {
            QUEEN => Some('q'),
            ROOK => Some('r'),
            BISHOP => Some('b'),
            KNIGHT => Some('n'),
            _ => None,
        };
        if let Some(c) = promo_char {
            text.push(c);
        }
        text
    }

    /// Parse coordinate notation (e.g., "g1f3", "a7a8q")
    pub fn from_algebraic(text: &str) -> Result<Self, ParseError> {
        let bad = || ParseError::Move(text.to_string());
        if !text.is_ascii() || !(4..=5).contains(&text.len()) {
            return Err(bad());
        }
        let from_sq = parse_square(&text[0..2]).ok_or_else(bad)?;
        let to_sq = parse_square(&text[2..4]).ok_or_else(bad)?;
        if from_sq == to_sq {
            return Err(bad());
        }
        let promotion = match text.as_bytes().get(4) {
            None => EMPTY,
            Some(b'n') => KNIGHT,
            Some(b'b') => BISHOP,
            Some(b'r') => ROOK,
            Some(b'q') => QUEEN,
            Some(_) => return Err(bad()),
        };
        Ok(Move::with_promotion(from_sq, to_sq, promotion))
    }
}

impl Default for Move {
    fn default() -> Self {
        Move::null()
    }
}

impl std::fmt::Display for Move {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_null() {
            write!(f, "0000")
        } else {
            write!(f, "{}", self.to_algebraic())
        }
    }
}

/// Chess board representation
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Board {
    /// 64-element array representing the board (0=a8, 1=b8, ..., 63=h1)
    pub squares: [u8; 64],
    /// True if it's white's turn
    pub white_to_move: bool,
    /// Square passed over by the last two-square pawn advance
    pub en_passant_square: Option<usize>,
    /// Castling rights indexed by `Color::index()`
    pub can_castle_kingside: [bool; 2],
    pub can_castle_queenside: [bool; 2],
    /// Moves since last pawn move or capture
    pub halfmove_clock: u16,
    /// Full move counter
    pub fullmove_number: u16,
}

impl Board {
    /// Create a new board with the starting position
    pub fn new() -> Self {
        Board {
            squares: STARTING_SQUARES,
            can_castle_kingside: [true; 2],
            can_castle_queenside: [true; 2],
            ..Board::empty()
        }
    }

    /// Board with no pieces, white to move and no rights
    pub fn empty() -> Self {
        Board {
            squares: [EMPTY; 64],
            white_to_move: true,
            en_passant_square: None,
            can_castle_kingside: [false; 2],
            can_castle_queenside: [false; 2],
            halfmove_clock: 0,
            fullmove_number: 1,
        }
    }

    /// Create a board from a FEN string
    pub fn from_fen(fen: &str) -> Result<Self, ParseError> {
        let parts: Vec<&str> = fen.split_whitespace().collect();
        if !(4..=6).contains(&parts.len()) {
            return Err(ParseError::FieldCount { found: parts.len() });
        }

        let mut board = Board::empty();

        // Parse piece placement
        let ranks: Vec<&str> = parts[0].split('/').collect();
        if ranks.len() != 8 {
            return Err(ParseError::RankCount(ranks.len()));
        }
        for (row, rank) in ranks.iter().enumerate() {
            let mut file = 0usize;
            for c in rank.chars() {
                if let Some(skip) = c.to_digit(10).filter(|d| (1..=8).contains(d)) {
                    file += skip as usize;
                    continue;
                }
                let piece = match char_to_piece(c) {
                    Some(p) if p != EMPTY => p,
                    _ => return Err(ParseError::InvalidPiece(c)),
                };
                if file < 8 {
                    board.squares[row * 8 + file] = piece;
                }
                file += 1;
            }
            if file != 8 {
                return Err(ParseError::RankLength { rank: 8 - row, files: file });
            }
        }

        // Parse active color
        board.white_to_move = match parts[1] {
            "w" => true,
            "b" => false,
            other => return Err(ParseError::SideToMove(other.to_string())),
        };

        // Parse castling rights
        if parts[2] != "-" {
            for c in parts[2].chars() {
                let (rights, color) = match c {
                    'K' => (&mut board.can_castle_kingside, Color::White),
                    'Q' => (&mut board.can_castle_queenside, Color::White),
                    'k' => (&mut board.can_castle_kingside, Color::Black),
                    'q' => (&mut board.can_castle_queenside, Color::Black),
                    _ => return Err(ParseError::Castling(parts[2].to_string())),
                };
                if rights[color.index()] {
                    return Err(ParseError::Castling(parts[2].to_string()));
                }
                rights[color.index()] = true;
            }
        }

        // Parse en passant square, either "e3" or a raw board index. The
        // target must sit behind a pawn the side not to move just pushed.
        if parts[3] != "-" {
            let target_row = if board.white_to_move { 2 } else { 5 };
            let sq = parse_square(parts[3])
                .or_else(|| parts[3].parse::<usize>().ok().filter(|&sq| sq < 64))
                .filter(|&sq| row_of(sq) == target_row)
                .ok_or_else(|| ParseError::EnPassant(parts[3].to_string()))?;
            board.en_passant_square = Some(sq);
        }

        // Parse halfmove clock and fullmove number
        let counter = |field: Option<&&str>, default: u16| -> Result<u16, ParseError> {
            match field {
                Some(text) => text
                    .parse()
                    .map_err(|_| ParseError::Counter(text.to_string())),
                None => Ok(default),
            }
        };
        board.halfmove_clock = counter(parts.get(4), 0)?;
        board.fullmove_number = counter(parts.get(5), 1)?;

        for color in [Color::White, Color::Black] {
            let king = color.bits() | KING;
            let count = board.squares.iter().filter(|&&p| p == king).count();
            if count != 1 {
                return Err(ParseError::KingCount { color, count });
            }
        }

        board.revoke_castle_rights();
        Ok(board)
    }

    /// Create a board from the text grid produced by `to_text`
    ///
    /// Whitespace is ignored; exactly 64 piece codes must remain. White is to
    /// move and castle rights are derived from the placement.
    pub fn from_text(text: &str) -> Result<Self, ParseError> {
        let mut board = Board::empty();
        let mut count = 0usize;

        for c in text.chars().filter(|c| !c.is_whitespace()) {
            let piece = char_to_piece(c).ok_or(ParseError::InvalidPiece(c))?;
            if count < 64 {
                board.squares[count] = piece;
            }
            count += 1;
        }
        if count != 64 {
            return Err(ParseError::SquareCount(count));
        }

        board.can_castle_kingside = [true; 2];
        board.can_castle_queenside = [true; 2];
        board.revoke_castle_rights();
        Ok(board)
    }

    /// Generate FEN string from current board state
    pub fn to_fen(&self) -> String {
        let mut fen = String::new();

        // Piece placement
        for row in 0..8 {
            let mut empty_count = 0;
            for file in 0..8 {
                let piece = self.squares[row * 8 + file];
                if piece == EMPTY {
                    empty_count += 1;
                } else {
                    if empty_count > 0 {
                        fen.push_str(&empty_count.to_string());
                        empty_count = 0;
                    }
                    fen.push(piece_to_char(piece));
                }
            }
            if empty_count > 0 {
                fen.push_str(&empty_count.to_string());
            }
            if row < 7 {
                fen.push('/');
            }
        }

        // Active color
        fen.push(' ');
        fen.push(if self.white_to_move { 'w' } else { 'b' });

        // Castling rights
        fen.push(' ');
        let white = Color::White.index();
        let black = Color::Black.index();
        let mut castling = String::new();
        if self.can_castle_kingside[white] { castling.push('K'); }
        if self.can_castle_queenside[white] { castling.push('Q'); }
        if self.can_castle_kingside[black] { castling.push('k'); }
        if self.can_castle_queenside[black] { castling.push('q'); }
        if castling.is_empty() {
            castling.push('-');
        }
        fen.push_str(&castling);

        // En passant
        fen.push(' ');
        match self.en_passant_square {
            Some(sq) => fen.push_str(&square_name(sq)),
            None => fen.push('-'),
        }

        // Halfmove clock and fullmove number
        fen.push_str(&format!(" {} {}", self.halfmove_clock, self.fullmove_number));

        fen
    }

    /// 8x8 grid of piece codes, one row per line, no trailing newline
    pub fn to_text(&self) -> String {
        self.squares
            .chunks(8)
            .map(|row| {
                row.iter()
                    .map(|&p| piece_to_char(p).to_string())
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Side whose turn it is
    #[inline]
    pub fn side_to_move(&self) -> Color {
        Color::from_white(self.white_to_move)
    }

    /// Execute a move on the board
    ///
    /// The mover is whoever occupies the origin square; the side to move is
    /// handed to the other color afterwards. Moves are not validated.
    pub fn make_move(&mut self, mv: &Move) {
        let from_sq = mv.from_sq;
        let to_sq = mv.to_sq;
        let piece = self.squares[from_sq];
        let Some(color) = Color::of_piece(piece) else {
            warn!(mv = %mv, "make_move from an empty square ignored");
            return;
        };
        let piece_type = get_piece_type(piece);
        let captured = self.squares[to_sq];

        // Handle en passant capture
        if piece_type == PAWN
            && Some(to_sq) == self.en_passant_square
            && captured == EMPTY
            && file_of(from_sq) != file_of(to_sq)
        {
            let victim_sq = match color {
                Color::White => Some(to_sq + 8).filter(|&sq| sq < 64),
                Color::Black => to_sq.checked_sub(8),
            };
            if let Some(victim_sq) = victim_sq {
                if self.squares[victim_sq] == color.opposite().bits() | PAWN {
                    self.squares[victim_sq] = EMPTY;
                }
            }
        }

        // Handle castling: the king leaves its home square by two files
        if piece_type == KING
            && from_sq == king_home(color)
            && row_of(to_sq) == row_of(from_sq)
            && from_sq.abs_diff(to_sq) == 2
        {
            let (rook_from, rook_to, allowed) = if to_sq > from_sq {
                (from_sq + 3, from_sq + 1, self.can_castle_kingside[color.index()])
            } else {
                (from_sq - 4, from_sq - 1, self.can_castle_queenside[color.index()])
            };
            if allowed && self.squares[rook_from] == color.bits() | ROOK {
                self.squares[rook_to] = self.squares[rook_from];
                self.squares[rook_from] = EMPTY;
            }
        }

        // Move the piece
        self.squares[to_sq] = piece;
        self.squares[from_sq] = EMPTY;

        // Handle promotion
        if piece_type == PAWN
            && row_of(to_sq) == promotion_row(color)
            && PROMOTION_PIECES.contains(&mv.promotion)
        {
            self.squares[to_sq] = color.bits() | mv.promotion;
        }

        // Update castling rights
        if piece_type == KING {
            self.can_castle_kingside[color.index()] = false;
            self.can_castle_queenside[color.index()] = false;
        }
        self.revoke_castle_rights();

        // Update en passant square
        self.en_passant_square = None;
        if piece_type == PAWN && from_sq.abs_diff(to_sq) == 16 {
            self.en_passant_square = Some((from_sq + to_sq) / 2);
        }

        // Update halfmove clock
        if piece_type == PAWN || captured != EMPTY {
            self.halfmove_clock = 0;
        } else {
            self.halfmove_clock = self.halfmove_clock.saturating_add(1);
        }

        // Update fullmove number
        if color == Color::Black {
            self.fullmove_number = self.fullmove_number.saturating_add(1);
        }

        self.white_to_move = color == Color::Black;
    }

    /// Copy of the board with the move made
    pub fn apply_move(&self, mv: &Move) -> Board {
        let mut next = *self;
        next.make_move(mv);
        next
    }

    /// Replace a pawn standing on its far rank with the chosen piece type
    ///
    /// Used when a client reports a deferred promotion choice after a pawn
    /// move that carried no promotion piece.
    pub fn apply_promotion(&mut self, sq: usize, piece_type: u8) -> Result<(), EngineError> {
        let invalid = |reason| EngineError::InvalidPromotion {
            square: if sq < 64 { square_name(sq) } else { sq.to_string() },
            reason,
        };
        if sq >= 64 {
            return Err(invalid("square is off the board"));
        }
        let piece = self.squares[sq];
        let color = match Color::of_piece(piece) {
            Some(color) if get_piece_type(piece) == PAWN => color,
            _ => return Err(invalid("no pawn on the square")),
        };
        if row_of(sq) != promotion_row(color) {
            return Err(invalid("pawn has not reached the far rank"));
        }
        let piece_type = get_piece_type(piece_type);
        if !PROMOTION_PIECES.contains(&piece_type) {
            return Err(invalid("pawns promote to a knight, bishop, rook or queen"));
        }
        self.squares[sq] = color.bits() | piece_type;
        Ok(())
    }

    /// Find the king's square for the specified color
    pub fn find_king(&self, color: Color) -> Option<usize> {
        let king = color.bits() | KING;
        self.squares.iter().position(|&p| p == king)
    }

    /// Clear any castle right whose king or corner rook is no longer at home
    fn revoke_castle_rights(&mut self) {
        for color in [Color::White, Color::Black] {
            let home = king_home(color);
            let rook = color.bits() | ROOK;
            if self.squares[home] != color.bits() | KING {
                self.can_castle_kingside[color.index()] = false;
                self.can_castle_queenside[color.index()] = false;
            }
            if self.squares[home + 3] != rook {
                self.can_castle_kingside[color.index()] = false;
            }
            if self.squares[home - 4] != rook {
                self.can_castle_queenside[color.index()] = false;
            }
        }
    }

    /// Display the board as a string
    pub fn display(&self) -> String {
        let mut lines = Vec::new();
        lines.push("  +---+---+---+---+---+---+---+---+".to_string());

        for row in 0..8 {
            let mut line = format!("{} |", RANK_NAMES[row] as char);
            for file in 0..8 {
                let piece = self.squares[row * 8 + file];
                if piece == EMPTY {
                    line.push_str("   |");
                } else {
                    line.push_str(&format!(" {} |", piece_to_char(piece)));
                }
            }
            lines.push(line);
            lines.push("  +---+---+---+---+---+---+---+---+".to_string());
        }
        lines.push("    a   b   c   d   e   f   g   h".to_string());

        lines.join("\n")
    }
}

impl Default for Board {
    fn default() -> Self {
        Board::new()
    }
}

impl FromStr for Board {
    type Err = ParseError;

    fn from_str(fen: &str) -> Result<Self, Self::Err> {
        Board::from_fen(fen)
    }
}

impl std::fmt::Display for Board {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display())
    }
}
