//! Arbor - Move Generator Module
//!
//! This module handles the generation of legal chess moves, including
//! all special moves (castling, en passant, pawn promotion).
//!
//! Generation walks the 16-wide 0x88 embedding of the board so that ray and
//! leaper offsets which would wrap around a rank land on an off-board index
//! and are discarded. Check detection is done by reverse attack: a piece of
//! each type is placed on the king's square and the generator is asked
//! whether it reaches an enemy piece of the same type.

use crate::board::{Board, Move};
use crate::types::*;
use rand::seq::SliceRandom;
use rand::Rng;

/// Direction offsets in 0x88 space
const ROOK_DIRECTIONS: [i32; 4] = [-16, 16, -1, 1];
const BISHOP_DIRECTIONS: [i32; 4] = [-17, -15, 15, 17];
const QUEEN_DIRECTIONS: [i32; 8] = [-16, 16, -1, 1, -17, -15, 15, 17];
const KNIGHT_OFFSETS: [i32; 8] = [-33, -31, -18, -14, 14, 18, 31, 33];

/// Enemy piece types tried on the king's square, in reporting priority
const CHECKER_ORDER: [u8; 6] = [QUEEN, ROOK, BISHOP, KNIGHT, PAWN, KING];

/// Castling generation mode for a single square
#[derive(Clone, Copy, PartialEq, Eq)]
enum Castling {
    /// Used by the reverse-attack locator; castling never captures
    Skip,
    Generate,
}

/// Move generator for chess positions
pub struct MoveGenerator;

impl MoveGenerator {
    /// Create a new move generator
    pub fn new() -> Self {
        MoveGenerator
    }

    /// Moves for the piece on `sq`, whichever color it is
    ///
    /// An empty square yields no moves. With `consider_checks` every move
    /// that would leave the mover's own king attacked is discarded.
    pub fn legal_moves(&self, board: &Board, sq: usize, consider_checks: bool) -> Vec<Move> {
        let mut moves = Vec::new();
        if sq >= 64 {
            return moves;
        }
        let Some(color) = Color::of_piece(board.squares[sq]) else {
            return moves;
        };

        self.generate_square(board, sq, Castling::Generate, consider_checks, &mut moves);

        if consider_checks {
            moves.retain(|mv| self.leaves_king_safe(board, mv, color));
        }
        moves
    }

    /// Moves for every piece of `side`, or of both sides when `side` is `None`
    pub fn legal_moves_all(
        &self,
        board: &Board,
        side: Option<Color>,
        consider_checks: bool,
    ) -> Vec<Move> {
        let mut moves = Vec::with_capacity(64);
        for sq in 0..64 {
            let Some(color) = Color::of_piece(board.squares[sq]) else {
                continue;
            };
            if side.is_some_and(|side| side != color) {
                continue;
            }
            moves.extend(self.legal_moves(board, sq, consider_checks));
        }
        moves
    }

    /// Legal moves for the side to move
    pub fn generate_legal_moves(&self, board: &Board) -> Vec<Move> {
        self.legal_moves_all(board, Some(board.side_to_move()), true)
    }

    /// Square of a piece giving check to `color`'s king, if any
    ///
    /// Returns `None` when the king is missing from the board.
    pub fn checking_square(&self, board: &Board, color: Color) -> Option<usize> {
        let king_sq = board.find_king(color)?;
        let enemy = color.opposite();
        CHECKER_ORDER
            .iter()
            .find_map(|&piece_type| self.square_attacker(board, king_sq, piece_type, enemy))
    }

    /// Square of a `piece_type` piece of `attacker` that attacks `target`
    ///
    /// A piece of the defending color and the given type is put on `target`
    /// and its moves are generated without the check filter; any destination
    /// holding the matching enemy piece is an attacker.
    pub fn square_attacker(
        &self,
        board: &Board,
        target: usize,
        piece_type: u8,
        attacker: Color,
    ) -> Option<usize> {
        let mut scratch = *board;
        scratch.squares[target] = attacker.opposite().bits() | piece_type;

        let mut moves = Vec::with_capacity(28);
        self.generate_square(&scratch, target, Castling::Skip, false, &mut moves);

        let wanted = attacker.bits() | piece_type;
        moves
            .iter()
            .map(|mv| mv.to_sq)
            .find(|&to_sq| board.squares[to_sq] == wanted)
    }

    /// Check if `color`'s king is attacked
    pub fn is_in_check(&self, board: &Board, color: Color) -> bool {
        self.checking_square(board, color).is_some()
    }

    /// In check with no legal moves
    pub fn is_in_checkmate(&self, board: &Board, color: Color) -> bool {
        self.is_in_check(board, color) && !self.has_legal_move(board, color)
    }

    /// Not in check but no legal moves
    pub fn is_in_stalemate(&self, board: &Board, color: Color) -> bool {
        !self.is_in_check(board, color) && !self.has_legal_move(board, color)
    }

    fn has_legal_move(&self, board: &Board, color: Color) -> bool {
        (0..64).any(|sq| {
            Color::of_piece(board.squares[sq]) == Some(color)
                && !self.legal_moves(board, sq, true).is_empty()
        })
    }

    /// Uniformly chosen legal move for the side to move
    pub fn random_move<R: Rng + ?Sized>(&self, board: &Board, rng: &mut R) -> Option<Move> {
        self.generate_legal_moves(board).choose(rng).copied()
    }

    /// Count leaf positions reachable in exactly `depth` plies
    pub fn perft(&self, board: &Board, depth: u32) -> u64 {
        if depth == 0 {
            return 1;
        }
        let moves = self.generate_legal_moves(board);
        if depth == 1 {
            return moves.len() as u64;
        }
        moves
            .iter()
            .map(|mv| self.perft(&board.apply_move(mv), depth - 1))
            .sum()
    }

    /// True if making `mv` does not expose `color`'s king
    fn leaves_king_safe(&self, board: &Board, mv: &Move, color: Color) -> bool {
        let after = board.apply_move(mv);
        self.checking_square(&after, color).is_none()
    }

    /// Pseudo-legal moves for the piece on `sq`
    fn generate_square(
        &self,
        board: &Board,
        sq: usize,
        castling: Castling,
        consider_checks: bool,
        moves: &mut Vec<Move>,
    ) {
        let piece = board.squares[sq];
        let Some(color) = Color::of_piece(piece) else {
            return;
        };

        match get_piece_type(piece) {
            PAWN => self.generate_pawn_moves(board, sq, color, moves),
            KNIGHT => self.generate_leaper_moves(board, sq, color, &KNIGHT_OFFSETS, moves),
            BISHOP => self.generate_sliding_moves(board, sq, color, &BISHOP_DIRECTIONS, moves),
            ROOK => self.generate_sliding_moves(board, sq, color, &ROOK_DIRECTIONS, moves),
            QUEEN => self.generate_sliding_moves(board, sq, color, &QUEEN_DIRECTIONS, moves),
            KING => {
                self.generate_leaper_moves(board, sq, color, &QUEEN_DIRECTIONS, moves);
                if castling == Castling::Generate {
                    self.generate_castling_moves(board, sq, color, consider_checks, moves);
                }
            }
            _ => {}
        }
    }

    /// Generate pawn moves from the given square
    fn generate_pawn_moves(&self, board: &Board, sq: usize, color: Color, moves: &mut Vec<Move>) {
        let forward = match color {
            Color::White => -16,
            Color::Black => 16,
        };
        let sq88 = to_0x88(sq);
        let one = sq88 + forward;

        // Single push, then double push from the starting row
        if !off_board(one) && board.squares[from_0x88(one)] == EMPTY {
            Self::push_pawn_move(sq, from_0x88(one), color, moves);

            let two = one + forward;
            if row_of(sq) == pawn_start_row(color)
                && !off_board(two)
                && board.squares[from_0x88(two)] == EMPTY
            {
                moves.push(Move::new(sq, from_0x88(two)));
            }
        }

        // Captures, including onto the en passant target
        for side in [-1, 1] {
            let target88 = one + side;
            if off_board(target88) {
                continue;
            }
            let to_sq = from_0x88(target88);
            let target = board.squares[to_sq];
            let is_capture = Color::of_piece(target) == Some(color.opposite());
            let is_en_passant = target == EMPTY
                && board.en_passant_square == Some(to_sq)
                && row_of(to_sq) == en_passant_row(color);
            if is_capture || is_en_passant {
                Self::push_pawn_move(sq, to_sq, color, moves);
            }
        }
    }

    /// Push a pawn move, expanded into one move per piece on the far row
    fn push_pawn_move(from_sq: usize, to_sq: usize, color: Color, moves: &mut Vec<Move>) {
        if row_of(to_sq) == promotion_row(color) {
            for promo in PROMOTION_PIECES {
                moves.push(Move::with_promotion(from_sq, to_sq, promo));
            }
        } else {
            moves.push(Move::new(from_sq, to_sq));
        }
    }

    /// Knight jumps and single king steps
    fn generate_leaper_moves(
        &self,
        board: &Board,
        sq: usize,
        color: Color,
        offsets: &[i32],
        moves: &mut Vec<Move>,
    ) {
        let sq88 = to_0x88(sq);
        for &offset in offsets {
            let target88 = sq88 + offset;
            if off_board(target88) {
                continue;
            }
            let to_sq = from_0x88(target88);
            if Color::of_piece(board.squares[to_sq]) != Some(color) {
                moves.push(Move::new(sq, to_sq));
            }
        }
    }

    /// Generate moves for sliding pieces (bishop, rook, queen)
    fn generate_sliding_moves(
        &self,
        board: &Board,
        sq: usize,
        color: Color,
        directions: &[i32],
        moves: &mut Vec<Move>,
    ) {
        let sq88 = to_0x88(sq);
        for &direction in directions {
            let mut target88 = sq88 + direction;
            while !off_board(target88) {
                let to_sq = from_0x88(target88);
                match Color::of_piece(board.squares[to_sq]) {
                    None => moves.push(Move::new(sq, to_sq)),
                    Some(occupant) => {
                        if occupant != color {
                            moves.push(Move::new(sq, to_sq));
                        }
                        break;
                    }
                }
                target88 += direction;
            }
        }
    }

    /// Two-square king moves for each castle right still held
    fn generate_castling_moves(
        &self,
        board: &Board,
        sq: usize,
        color: Color,
        consider_checks: bool,
        moves: &mut Vec<Move>,
    ) {
        if sq != king_home(color) {
            return;
        }
        let kingside = board.can_castle_kingside[color.index()];
        let queenside = board.can_castle_queenside[color.index()];
        if !(kingside || queenside) || self.is_in_check(board, color) {
            return;
        }

        let rook = color.bits() | ROOK;
        let empty = |squares: &[usize]| squares.iter().all(|&s| board.squares[s] == EMPTY);
        let safe = |squares: &[usize]| {
            !consider_checks || squares.iter().all(|&s| !self.king_attacked_on(board, sq, s, color))
        };

        if kingside
            && board.squares[sq + 3] == rook
            && empty(&[sq + 1, sq + 2])
            && safe(&[sq + 1, sq + 2])
        {
            moves.push(Move::new(sq, sq + 2));
        }
        if queenside
            && board.squares[sq - 4] == rook
            && empty(&[sq - 1, sq - 2, sq - 3])
            && safe(&[sq - 1, sq - 2])
        {
            moves.push(Move::new(sq, sq - 2));
        }
    }

    /// Would the king on `from_sq` be attacked standing on `to_sq`
    fn king_attacked_on(&self, board: &Board, from_sq: usize, to_sq: usize, color: Color) -> bool {
        let mut scratch = *board;
        scratch.squares[to_sq] = scratch.squares[from_sq];
        scratch.squares[from_sq] = EMPTY;
        self.is_in_check(&scratch, color)
    }
}

impl Default for MoveGenerator {
    fn default() -> Self {
        MoveGenerator::new()
    }
}

/// Row of the en passant target a pawn of this color may capture onto
#[inline]
fn en_passant_row(color: Color) -> usize {
    match color {
        Color::White => 2,
        Color::Black => 5,
    }
}
