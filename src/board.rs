use chess::{Board, BoardStatus, ChessMove, Color, MoveGen, Piece, Rank, Square};
use std::str::FromStr;

use crate::constants::{
    PIECE_CODE_BISHOP, PIECE_CODE_KING, PIECE_CODE_KNIGHT, PIECE_CODE_PAWN, PIECE_CODE_QUEEN,
    PIECE_CODE_ROOK,
};

/// Outcome of an accepted move.
#[derive(Debug, Clone)]
pub struct AppliedMove {
    pub fen: String,
    pub game_over: bool,
    /// Opposing piece that stood on the destination square before the move.
    /// En passant lands on an empty square and goes unreported.
    pub captured_piece_code: Option<u8>,
    /// Winning side when the move ended the game. The side that is not to
    /// move in the final position is reported as the winner, including for
    /// stalemate.
    pub winner: Option<&'static str>,
}

/// Owns the position of a single chess game.
pub struct BoardSession {
    board: Board,
}

impl BoardSession {
    pub fn new() -> Self {
        Self {
            board: Board::default(),
        }
    }

    #[cfg(test)]
    pub fn from_fen(fen: &str) -> Result<Self, chess::Error> {
        Ok(Self {
            board: Board::from_str(fen)?,
        })
    }

    pub fn fen(&self) -> String {
        self.board.to_string()
    }

    pub fn game_over(&self) -> bool {
        self.board.status() != BoardStatus::Ongoing
    }

    /// Piece code of an opposing piece currently standing on `to`, if any.
    /// Looked up before a move is applied, so en passant captures are not
    /// seen here.
    pub fn capture_candidate(&self, to: &str) -> Option<u8> {
        let square = Square::from_str(to).ok()?;
        let occupant = self.board.piece_on(square)?;
        if self.board.color_on(square)? == self.board.side_to_move() {
            return None;
        }
        Some(piece_type_code(occupant))
    }

    /// Validates `from`/`to` against the legal moves of the current position
    /// and applies the move if it is one of them. Pawns reaching the last
    /// rank always promote to a queen.
    pub fn apply_move(&mut self, from: &str, to: &str) -> Option<AppliedMove> {
        let from_square = Square::from_str(from).ok()?;
        let to_square = Square::from_str(to).ok()?;

        let promotion = if self.board.piece_on(from_square) == Some(Piece::Pawn)
            && matches!(to_square.get_rank(), Rank::First | Rank::Eighth)
        {
            Some(Piece::Queen)
        } else {
            None
        };

        let candidate = ChessMove::new(from_square, to_square, promotion);
        if !MoveGen::new_legal(&self.board).any(|legal| legal == candidate) {
            return None;
        }

        let captured_piece_code = self.capture_candidate(to);

        self.board = self.board.make_move_new(candidate);
        let game_over = self.game_over();
        let winner = if game_over {
            Some(match self.board.side_to_move() {
                Color::White => "black",
                Color::Black => "white",
            })
        } else {
            None
        };

        Some(AppliedMove {
            fen: self.fen(),
            game_over,
            captured_piece_code,
            winner,
        })
    }
}

pub fn piece_type_code(piece: Piece) -> u8 {
    match piece {
        Piece::Pawn => PIECE_CODE_PAWN,
        Piece::Knight => PIECE_CODE_KNIGHT,
        Piece::Bishop => PIECE_CODE_BISHOP,
        Piece::Rook => PIECE_CODE_ROOK,
        Piece::Queen => PIECE_CODE_QUEEN,
        Piece::King => PIECE_CODE_KING,
    }
}
