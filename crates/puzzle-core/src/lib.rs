//! Chess puzzle timeline core.
//!
//! Expands puzzles (FEN + UCI move line + metadata) into scenes and a flat,
//! globally indexed frame plan. Everything here is pure: no filesystem, no
//! network, no clock. Randomized choices take an injected RNG.

pub mod board;
pub mod caption;
pub mod error;
pub mod puzzle;
pub mod scene;
pub mod sequencer;
pub mod timeline;

pub use board::{BoardSnapshot, BoardTracker, MoveHighlight, Side};
pub use error::PuzzleError;
pub use puzzle::Puzzle;
pub use scene::{OverlayMetadata, Scene, SceneFrame, SceneKind};
pub use timeline::{FramePlan, FramePlanEntry, TimelineConfig};
