//! Board state tracking for puzzle playback.
//! Wraps a shakmaty position and replays UCI moves one at a time.

use std::fmt;

use serde::{Deserialize, Serialize};
use shakmaty::{
    fen::Fen, uci::UciMove, Board, CastlingMode, Chess, Color, EnPassantMode, Move, Position,
    Square,
};

use crate::error::PuzzleError;

/// Side to move, as shown in overlays and captions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    White,
    Black,
}

impl Side {
    pub fn label(self) -> &'static str {
        match self {
            Side::White => "White",
            Side::Black => "Black",
        }
    }
}

impl From<Color> for Side {
    fn from(color: Color) -> Self {
        match color {
            Color::White => Side::White,
            Color::Black => Side::Black,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Origin and destination squares of the last played move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MoveHighlight {
    pub from: Square,
    pub to: Square,
}

/// Immutable view of the board at one point of the timeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardSnapshot {
    pub board: Board,
    pub turn: Side,
    pub last_move: Option<MoveHighlight>,
    pub fen: String,
}

/// Position plus the move that led to it.
#[derive(Debug, Clone)]
pub struct BoardTracker {
    position: Chess,
    last_move: Option<MoveHighlight>,
    ply: usize,
}

impl BoardTracker {
    /// Decode a FEN into a legal standard-chess position.
    pub fn from_fen(fen: &str) -> Result<Self, PuzzleError> {
        let invalid = |reason: String| PuzzleError::InvalidFen {
            fen: fen.to_string(),
            reason,
        };

        let parsed: Fen = fen.trim().parse().map_err(|e| invalid(format!("{e}")))?;
        let position: Chess = parsed
            .into_position(CastlingMode::Standard)
            .map_err(|e| invalid(format!("{e}")))?;

        Ok(Self {
            position,
            last_move: None,
            ply: 0,
        })
    }

    /// Play one UCI move. On error the tracker is left untouched.
    pub fn apply(&mut self, uci: &str) -> Result<Move, PuzzleError> {
        let uci_move: UciMove = uci.trim().parse().map_err(|_| PuzzleError::InvalidUci {
            ply: self.ply,
            uci: uci.to_string(),
        })?;

        let legal_move = uci_move
            .to_move(&self.position)
            .map_err(|_| PuzzleError::IllegalMove {
                ply: self.ply,
                uci: uci.to_string(),
                fen: self.fen(),
            })?;

        // Highlight the squares as written in UCI (e1g1 for castling, not the rook square)
        self.last_move = match uci_move {
            UciMove::Normal { from, to, .. } => Some(MoveHighlight { from, to }),
            _ => None,
        };
        self.position.play_unchecked(legal_move.clone());
        self.ply += 1;

        Ok(legal_move)
    }

    pub fn snapshot(&self) -> BoardSnapshot {
        BoardSnapshot {
            board: self.position.board().clone(),
            turn: self.turn(),
            last_move: self.last_move,
            fen: self.fen(),
        }
    }

    /// Snapshot with the last-move highlight cleared (final pause frames).
    pub fn snapshot_without_highlight(&self) -> BoardSnapshot {
        BoardSnapshot {
            last_move: None,
            ..self.snapshot()
        }
    }

    pub fn turn(&self) -> Side {
        self.position.turn().into()
    }

    pub fn fen(&self) -> String {
        Fen::from_position(&self.position, EnPassantMode::Legal).to_string()
    }

    /// Number of moves applied so far.
    pub fn ply(&self) -> usize {
        self.ply
    }

    pub fn last_move(&self) -> Option<MoveHighlight> {
        self.last_move
    }
}

/// Replay a full line and return the snapshot after every move.
pub fn replay(fen: &str, moves: &[String]) -> Result<Vec<BoardSnapshot>, PuzzleError> {
    let mut tracker = BoardTracker::from_fen(fen)?;
    let mut snapshots = Vec::with_capacity(moves.len());
    for uci in moves {
        tracker.apply(uci)?;
        snapshots.push(tracker.snapshot());
    }
    Ok(snapshots)
}

/// The side the viewer solves for: whoever is to move after the setup move.
pub fn solver_side(fen: &str, setup_move: &str) -> Result<Side, PuzzleError> {
    let mut tracker = BoardTracker::from_fen(fen)?;
    tracker.apply(setup_move)?;
    Ok(tracker.turn())
}
