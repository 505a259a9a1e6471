//! Arbor - Error types
//!
//! Parsing failures for FEN, board text, squares and moves, plus the
//! errors a game session can report to its caller.

use crate::types::Color;

/// Errors produced while parsing external text into engine types
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// FEN did not have between 4 and 6 whitespace separated fields
    #[error("expected 4 to 6 FEN fields, found {found}")]
    FieldCount { found: usize },

    /// Unknown piece character
    #[error("invalid piece character '{0}'")]
    InvalidPiece(char),

    /// A placement rank did not describe exactly eight files
    #[error("rank {rank} describes {files} files, expected 8")]
    RankLength { rank: usize, files: usize },

    /// Placement did not contain exactly eight ranks
    #[error("piece placement has {0} ranks, expected 8")]
    RankCount(usize),

    #[error("invalid side to move '{0}'")]
    SideToMove(String),

    #[error("invalid castling field '{0}'")]
    Castling(String),

    #[error("invalid en passant field '{0}'")]
    EnPassant(String),

    #[error("invalid move counter '{0}'")]
    Counter(String),

    /// Board text did not contain 64 piece codes
    #[error("board text has {0} squares, expected 64")]
    SquareCount(usize),

    #[error("invalid square '{0}'")]
    Square(String),

    #[error("invalid move '{0}'")]
    Move(String),

    /// Position does not have exactly one king of the given color
    #[error("position has {count} {color} kings, expected 1")]
    KingCount { color: Color, count: usize },
}

/// Errors reported by a game session
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// Move is not legal for the side to move
    #[error("illegal move {0}")]
    IllegalMove(String),

    /// No promotable pawn on the square, or an invalid promotion piece
    #[error("cannot promote on {square}: {reason}")]
    InvalidPromotion { square: String, reason: &'static str },

    /// The side to move has no legal moves
    #[error("game is over: {0}")]
    GameOver(&'static str),
}

/// Result type alias for engine operations
pub type EngineResult<T> = Result<T, EngineError>;
