//! Timeline generation: puzzle -> scenes -> flat frame plan.
//!
//! Scene order for one puzzle:
//!
//! 1. `Initial`      starting position, no highlight
//! 2. `SetupMove`    opponent's move applied and highlighted
//! 3. `Countdown`    one scene per second, `countdown_secs..=1`
//! 4. `SolutionMove` one scene per remaining move
//! 5. `FinalPause`   final position, no highlight
//!
//! A puzzle with only the setup move skips 3 and 4.

use std::sync::Arc;

use serde::Serialize;

use crate::board::BoardTracker;
use crate::error::PuzzleError;
use crate::puzzle::Puzzle;
use crate::scene::{OverlayMetadata, Scene, SceneFrame, SceneKind};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimelineConfig {
    pub fps: u32,
    pub initial_pause_secs: f64,
    pub move_secs: f64,
    pub countdown_secs: u32,
    pub final_pause_secs: f64,
    pub break_secs: f64,
    /// Title shown during the countdown
    pub countdown_title: Option<String>,
    /// Replaces the puzzle message during the final pause
    pub final_message: Option<String>,
    /// Title of the break frame between puzzles
    pub break_title: Option<String>,
}

impl Default for TimelineConfig {
    fn default() -> Self {
        Self {
            fps: 30,
            initial_pause_secs: 0.0,
            move_secs: 1.0,
            countdown_secs: 4,
            final_pause_secs: 2.0,
            break_secs: 3.0,
            countdown_title: Some("FIND THE BEST MOVE".to_string()),
            final_message: Some("Solution shown!".to_string()),
            break_title: Some("Next Puzzle".to_string()),
        }
    }
}

/// Per-puzzle overlay context supplied by the caller.
#[derive(Debug, Clone, Default)]
pub struct PuzzleContext {
    /// (1-based number, total) within a batch
    pub position: Option<(usize, usize)>,
    pub message: Option<String>,
}

/// Expand one puzzle into its ordered scenes.
pub fn plan_puzzle(
    puzzle: &Puzzle,
    config: &TimelineConfig,
    ctx: &PuzzleContext,
) -> Result<Vec<Scene>, PuzzleError> {
    puzzle.check_shape()?;
    let (setup, solution) = puzzle
        .moves
        .split_first()
        .ok_or_else(|| PuzzleError::EmptyMoves(puzzle.id.clone()))?;

    let mut tracker = BoardTracker::from_fen(&puzzle.fen)?;
    let initial = tracker.snapshot();

    tracker.apply(setup)?;
    let after_setup = tracker.snapshot();

    // Whoever moves after the opponent's setup move is the solver
    let overlay = OverlayMetadata {
        rating: puzzle.rating,
        side_to_move: Some(tracker.turn()),
        puzzle_index: ctx.position,
        message: ctx.message.clone(),
        ..Default::default()
    };

    let countdown_len = if solution.is_empty() {
        0
    } else {
        config.countdown_secs as usize
    };
    let mut scenes = Vec::with_capacity(3 + countdown_len + solution.len());

    scenes.push(Scene::new(
        SceneKind::Initial,
        Some(initial),
        overlay.clone(),
        config.initial_pause_secs,
    ));
    scenes.push(Scene::new(
        SceneKind::SetupMove,
        Some(after_setup.clone()),
        overlay.clone(),
        config.move_secs,
    ));

    if !solution.is_empty() {
        // Setup move stays highlighted for the whole countdown
        for value in (1..=config.countdown_secs).rev() {
            let countdown_overlay = OverlayMetadata {
                countdown: Some(value),
                title: config.countdown_title.clone(),
                ..overlay.clone()
            };
            scenes.push(Scene::new(
                SceneKind::Countdown,
                Some(after_setup.clone()),
                countdown_overlay,
                1.0,
            ));
        }

        for uci in solution {
            tracker.apply(uci)?;
            scenes.push(Scene::new(
                SceneKind::SolutionMove,
                Some(tracker.snapshot()),
                overlay.clone(),
                config.move_secs,
            ));
        }
    }

    let final_overlay = OverlayMetadata {
        message: config.final_message.clone().or(overlay.message.clone()),
        ..overlay
    };
    scenes.push(Scene::new(
        SceneKind::FinalPause,
        Some(tracker.snapshot_without_highlight()),
        final_overlay,
        config.final_pause_secs,
    ));

    Ok(scenes)
}

/// The neutral frame shown between two puzzles, announcing `next` of `total`.
pub fn break_scene(config: &TimelineConfig, next: usize, total: usize) -> Scene {
    let overlay = OverlayMetadata {
        title: config.break_title.clone(),
        puzzle_index: Some((next, total)),
        ..Default::default()
    };
    Scene::new(SceneKind::Break, None, overlay, config.break_secs)
}

/// Total frames for a scene list at `fps`.
pub fn plan_frame_count(scenes: &[Scene], fps: u32) -> u64 {
    scenes.iter().map(|s| s.frame_count(fps)).sum()
}

/// One planned frame. All frames of a scene share the same `SceneFrame`.
#[derive(Debug, Clone)]
pub struct FramePlanEntry {
    pub index: u64,
    pub kind: SceneKind,
    pub frame: Arc<SceneFrame>,
}

/// Append the frames of `scenes` to `out`, numbering from `counter`.
/// Returns the counter value after the last emitted frame.
pub fn flatten_into(
    scenes: &[Scene],
    fps: u32,
    counter: u64,
    out: &mut Vec<FramePlanEntry>,
) -> u64 {
    let mut next = counter;
    for scene in scenes {
        for _ in 0..scene.frame_count(fps) {
            out.push(FramePlanEntry {
                index: next,
                kind: scene.kind,
                frame: Arc::clone(&scene.frame),
            });
            next += 1;
        }
    }
    next
}

/// Flattened, globally indexed frames of a whole video.
#[derive(Debug, Clone, Default)]
pub struct FramePlan {
    pub fps: u32,
    pub entries: Vec<FramePlanEntry>,
}

/// A run of consecutive plan entries that share one scene frame.
#[derive(Debug, Clone)]
pub struct FrameRun {
    pub start: u64,
    pub len: u64,
    pub kind: SceneKind,
    pub frame: Arc<SceneFrame>,
}

impl FramePlan {
    /// Flatten a single puzzle's scenes starting at frame 0.
    pub fn from_scenes(scenes: &[Scene], fps: u32) -> Self {
        let mut entries = Vec::with_capacity(plan_frame_count(scenes, fps) as usize);
        flatten_into(scenes, fps, 0, &mut entries);
        Self { fps, entries }
    }

    pub fn len(&self) -> u64 {
        self.entries.len() as u64
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn duration_secs(&self) -> f64 {
        if self.fps == 0 {
            return 0.0;
        }
        self.len() as f64 / f64::from(self.fps)
    }

    /// Group consecutive entries by shared scene frame, so each scene can be
    /// rasterized once.
    pub fn runs(&self) -> Vec<FrameRun> {
        let mut runs: Vec<FrameRun> = Vec::new();
        for entry in &self.entries {
            match runs.last_mut() {
                Some(run)
                    if Arc::ptr_eq(&run.frame, &entry.frame)
                        && run.start + run.len == entry.index =>
                {
                    run.len += 1;
                }
                _ => runs.push(FrameRun {
                    start: entry.index,
                    len: 1,
                    kind: entry.kind,
                    frame: Arc::clone(&entry.frame),
                }),
            }
        }
        runs
    }
}
