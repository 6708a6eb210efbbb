//! Scenes: timeline segments with one fixed board state and overlay content.

use std::sync::Arc;

use serde::Serialize;

use crate::board::{BoardSnapshot, Side};

/// Added before flooring so that e.g. 2.3s * 30fps yields 69 frames, not 68.
const FRAME_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SceneKind {
    Initial,
    SetupMove,
    Countdown,
    SolutionMove,
    FinalPause,
    Break,
}

/// Text overlays for one frame. Every field is optional and independent.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OverlayMetadata {
    pub rating: Option<i32>,
    pub side_to_move: Option<Side>,
    pub countdown: Option<u32>,
    pub title: Option<String>,
    pub message: Option<String>,
    /// (1-based puzzle number, total puzzles)
    pub puzzle_index: Option<(usize, usize)>,
}

impl OverlayMetadata {
    pub fn is_empty(&self) -> bool {
        *self == OverlayMetadata::default()
    }
}

/// Everything needed to rasterize a frame. Shared by every frame of a scene.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SceneFrame {
    /// `None` for break frames, which show no board
    pub board: Option<BoardSnapshot>,
    pub overlay: OverlayMetadata,
}

#[derive(Debug, Clone)]
pub struct Scene {
    pub kind: SceneKind,
    pub frame: Arc<SceneFrame>,
    pub duration_secs: f64,
}

impl Scene {
    pub fn new(
        kind: SceneKind,
        board: Option<BoardSnapshot>,
        overlay: OverlayMetadata,
        duration_secs: f64,
    ) -> Self {
        Self {
            kind,
            frame: Arc::new(SceneFrame { board, overlay }),
            duration_secs,
        }
    }

    pub fn frame_count(&self, fps: u32) -> u64 {
        frames_for(self.duration_secs, fps)
    }
}

/// `floor(secs * fps)`. Non-finite or non-positive durations yield no frames.
pub fn frames_for(secs: f64, fps: u32) -> u64 {
    if !secs.is_finite() || secs <= 0.0 {
        return 0;
    }
    (secs * f64::from(fps) + FRAME_EPSILON).floor() as u64
}
