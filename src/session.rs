//! Arbor - Game Session Module
//!
//! One live game: the current position, the persistent search tree, the
//! forced-mate state and any precomputation running while the opponent
//! thinks. This is the surface a transport layer maps its requests onto.

use tracing::{debug, info};

use crate::board::{Board, Move};
use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult, ParseError};
use crate::move_generator::MoveGenerator;
use crate::parallel_search::{precompute, Precomputation};
use crate::search::{CancelToken, SearchSession};
use crate::tree::{Tree, TreeStatus};
use crate::types::*;

pub struct GameSession {
    config: EngineConfig,
    board: Board,
    tree: Tree,
    search: SearchSession,
    precomputation: Option<Precomputation>,
    move_generator: MoveGenerator,
}

impl GameSession {
    /// Start a game from `fen`
    pub fn new(fen: &str, config: EngineConfig) -> Result<Self, ParseError> {
        let board = Board::from_fen(fen)?;
        Ok(GameSession {
            config,
            board,
            tree: Tree::new(board, config.depth),
            search: SearchSession::new(),
            precomputation: None,
            move_generator: MoveGenerator::new(),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    /// Legal moves of the piece on `sq`; empty unless it belongs to the
    /// side to move
    pub fn legal_moves(&self, sq: usize) -> Vec<Move> {
        if sq >= 64 || Color::of_piece(self.board.squares[sq]) != Some(self.board.side_to_move()) {
            return Vec::new();
        }
        self.move_generator.legal_moves(&self.board, sq, true)
    }

    /// Legal moves of the side to move
    pub fn legal_moves_all(&self) -> Vec<Move> {
        self.move_generator.generate_legal_moves(&self.board)
    }

    /// Best line found by the last search of the current position
    pub fn principal_line(&self) -> Vec<Move> {
        self.tree.best_line(self.tree.root())
    }

    /// Play a move for the side to move
    ///
    /// A pawn move onto the far rank may omit the promotion piece; the pawn
    /// then waits for `promote`.
    pub fn make_move(&mut self, mv: Move) -> EngineResult<()> {
        let legal = self.legal_moves_all();
        if legal.is_empty() {
            return Err(self.game_over());
        }
        let allowed = legal.iter().any(|l| {
            l.from_sq == mv.from_sq
                && l.to_sq == mv.to_sq
                && (l.promotion == mv.promotion || mv.promotion == EMPTY)
        });
        if !allowed {
            return Err(EngineError::IllegalMove(mv.to_string()));
        }

        self.advance(mv);
        Ok(())
    }

    /// Search the current position without playing the result
    pub fn best_move(&mut self) -> Move {
        self.search.search(&mut self.tree, &CancelToken::new())
    }

    /// Search, play the best move and start analysing the replies
    pub fn play_engine_move(&mut self) -> EngineResult<Move> {
        if self.legal_moves_all().is_empty() {
            return Err(self.game_over());
        }
        let mv = self.best_move();
        if mv.is_null() {
            return Err(self.game_over());
        }
        self.advance(mv);

        let side = self.board.side_to_move();
        if self.config.precompute && !self.legal_moves_all().is_empty() {
            self.precomputation = Some(precompute(
                &self.board,
                self.config.depth,
                side,
                self.config.worker_count(),
            ));
        }
        Ok(mv)
    }

    /// Complete a deferred promotion on `sq`
    pub fn promote(&mut self, sq: usize, piece_type: u8) -> EngineResult<()> {
        self.board.apply_promotion(sq, piece_type)?;
        let last = self.tree[self.tree.root()].mv;
        self.tree = Tree::after_move(self.board, self.config.depth, last);
        self.precomputation = None;
        Ok(())
    }

    pub fn is_in_check(&self, color: Color) -> bool {
        self.move_generator.is_in_check(&self.board, color)
    }

    pub fn is_in_checkmate(&self, color: Color) -> bool {
        self.move_generator.is_in_checkmate(&self.board, color)
    }

    pub fn is_in_stalemate(&self, color: Color) -> bool {
        self.move_generator.is_in_stalemate(&self.board, color)
    }

    pub fn checking_square(&self, color: Color) -> Option<usize> {
        self.move_generator.checking_square(&self.board, color)
    }

    pub fn board_text(&self) -> String {
        self.board.to_text()
    }

    pub fn fen(&self) -> String {
        self.board.to_fen()
    }

    /// Replace the position, dropping all analysis
    pub fn set_position(&mut self, fen: &str) -> EngineResult<()> {
        let board = Board::from_fen(fen)?;
        self.board = board;
        self.tree = Tree::new(board, self.config.depth);
        self.search = SearchSession::new();
        self.precomputation = None;
        info!(fen, "position set");
        Ok(())
    }

    /// True while replies are being analysed in the background
    pub fn is_precomputing(&self) -> bool {
        self.precomputation.is_some()
    }

    /// Apply a validated move and carry the analysis of the new position
    /// forward
    fn advance(&mut self, mv: Move) {
        let root = self.tree.root();
        let reused = self.tree.child_with_move(root, mv).map(|child| self.tree.deep_copy(child));
        let precomputed = self
            .precomputation
            .take()
            .and_then(|pre| pre.take_reply(mv));

        self.board.make_move(&mv);

        self.tree = match (precomputed, reused) {
            (Some(tree), _) if tree.status == TreeStatus::Complete => {
                debug!(mv = %mv, nodes = tree.len(), "adopting precomputed tree");
                tree
            }
            (_, Some(tree)) => {
                debug!(mv = %mv, nodes = tree.len(), "reusing subtree");
                tree
            }
            _ => Tree::after_move(self.board, self.config.depth, mv),
        };
        self.tree.board = self.board;
        self.tree.depth = self.config.depth;

        info!(mv = %mv, fen = %self.board.to_fen(), "move applied");
    }

    fn game_over(&self) -> EngineError {
        if self.is_in_check(self.board.side_to_move()) {
            EngineError::GameOver("checkmate")
        } else {
            EngineError::GameOver("stalemate")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::STARTING_FEN;

    fn quiet_config(depth: u32) -> EngineConfig {
        EngineConfig::new(depth).with_threads(2).with_precompute(false)
    }

    #[test]
    fn test_rejects_illegal_and_wrong_side_moves() {
        let mut game = GameSession::new(STARTING_FEN, quiet_config(1)).unwrap();
        let e7e5 = Move::from_algebraic("e7e5").unwrap();
        assert!(matches!(game.make_move(e7e5), Err(EngineError::IllegalMove(_))));
        assert!(game.legal_moves(parse_square("e7").unwrap()).is_empty());
        assert_eq!(game.legal_moves(parse_square("e2").unwrap()).len(), 2);

        game.make_move(Move::from_algebraic("e2e4").unwrap()).unwrap();
        game.make_move(e7e5).unwrap();
        assert_eq!(
            game.fen(),
            "rnbqkbnr/pppp1ppp/8/4p3/4P3/8/PPPP1PPP/RNBQKBNR w KQkq e6 0 2"
        );
    }

    #[test]
    fn test_game_over_is_reported() {
        let mut game =
            GameSession::new("6k1/5ppp/8/8/8/8/5PPP/r5K1 w - - 0 1", quiet_config(1)).unwrap();
        assert!(game.is_in_checkmate(Color::White));
        assert!(matches!(
            game.play_engine_move(),
            Err(EngineError::GameOver("checkmate"))
        ));
        assert!(game.best_move().is_null());
    }

    #[test]
    fn test_deferred_promotion() {
        let mut game =
            GameSession::new("7k/P7/8/8/8/8/8/4K3 w - - 0 1", quiet_config(1)).unwrap();
        game.make_move(Move::from_algebraic("a7a8").unwrap()).unwrap();
        assert_eq!(game.board().squares[0], WHITE_PAWN);

        game.promote(0, QUEEN).unwrap();
        assert_eq!(game.board().squares[0], WHITE_QUEEN);
        assert_eq!(game.checking_square(Color::Black), Some(0));
        assert!(game.promote(0, QUEEN).is_err());
    }

    #[test]
    fn test_set_position_discards_analysis() {
        let mut game = GameSession::new(STARTING_FEN, quiet_config(2)).unwrap();
        game.best_move();
        assert!(game.set_position("not a fen").is_err());
        game.set_position("4k3/8/8/8/8/8/8/4K2R w K - 0 1").unwrap();
        assert_eq!(game.fen(), "4k3/8/8/8/8/8/8/4K2R w K - 0 1");
        assert!(!game.is_precomputing());
        assert_eq!(game.board_text().lines().count(), 8);
    }
}
