//! Arbor - Chess Engine
//!
//! A square-array chess engine with:
//! - Full legal move generation over a 0x88 embedding (pins, castling,
//!   en passant, promotion)
//! - Material and piece-square evaluation
//! - Minimax search with alpha-beta pruning over a persistent search tree
//! - Iterative deepening with tree reuse and forced-mate playback
//! - Multi-threaded precomputation of the opponent's replies

pub mod types;
pub mod error;
pub mod board;
pub mod move_generator;
pub mod evaluation;
pub mod tree;
pub mod search;
pub mod parallel_search;
pub mod config;
pub mod logging;
pub mod session;

pub use board::{Board, Move, STARTING_FEN};
pub use config::EngineConfig;
pub use error::{EngineError, EngineResult, ParseError};
pub use move_generator::MoveGenerator;
pub use parallel_search::{precompute, Precomputation};
pub use search::{calculate_line, CancelToken, SearchSession};
pub use session::GameSession;
pub use tree::{NodeId, Tree, TreeStatus};
pub use types::Color;

/// Position to start a game from
pub fn new_game(fen: &str) -> Result<Board, ParseError> {
    Board::from_fen(fen)
}
