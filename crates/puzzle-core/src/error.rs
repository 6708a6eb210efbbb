//! Puzzle input errors

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PuzzleError {
    #[error("Invalid FEN '{fen}': {reason}")]
    InvalidFen { fen: String, reason: String },

    #[error("Invalid UCI move '{uci}' at ply {ply}")]
    InvalidUci { ply: usize, uci: String },

    #[error("Illegal move '{uci}' at ply {ply} in position {fen}")]
    IllegalMove { ply: usize, uci: String, fen: String },

    #[error("Puzzle {0} has no moves")]
    EmptyMoves(String),

    #[error("Malformed puzzle record: {0}")]
    Malformed(String),
}
