//! Multi-puzzle sequencing with break scenes between puzzles.

use rand::Rng;
use serde::Serialize;
use tracing::{info, warn};

use crate::board;
use crate::caption::pick_message;
use crate::error::PuzzleError;
use crate::puzzle::Puzzle;
use crate::timeline::{
    break_scene, flatten_into, plan_puzzle, FramePlan, FramePlanEntry, PuzzleContext,
    TimelineConfig,
};

/// Where one puzzle landed in the batch timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PuzzleSegment {
    pub puzzle_id: String,
    /// 1-based position among the puzzles that made it into the batch
    pub number: usize,
    pub start: u64,
    pub frames: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BreakSegment {
    pub start: u64,
    pub frames: u64,
}

#[derive(Debug, Clone)]
pub struct SkippedPuzzle {
    pub puzzle_id: String,
    pub error: PuzzleError,
}

#[derive(Debug, Clone, Default)]
pub struct BatchPlan {
    pub entries: Vec<FramePlanEntry>,
    pub segments: Vec<PuzzleSegment>,
    pub breaks: Vec<BreakSegment>,
    pub skipped: Vec<SkippedPuzzle>,
    /// Frame counter after the last frame of the batch
    pub next: u64,
}

impl BatchPlan {
    pub fn into_frame_plan(self, fps: u32) -> FramePlan {
        FramePlan {
            fps,
            entries: self.entries,
        }
    }
}

/// Plan a batch of puzzles as one continuous timeline starting at `start`.
///
/// Malformed puzzles are logged and skipped; the rest keep contiguous frame
/// indices and contiguous on-screen numbering. A break is inserted before
/// every puzzle except the first, so the batch never ends on a break.
pub fn sequence<R: Rng + ?Sized>(
    puzzles: &[Puzzle],
    config: &TimelineConfig,
    messages: &[String],
    start: u64,
    rng: &mut R,
) -> BatchPlan {
    let mut plan = BatchPlan {
        next: start,
        ..Default::default()
    };

    let mut valid: Vec<&Puzzle> = Vec::with_capacity(puzzles.len());
    for puzzle in puzzles {
        let checked = puzzle
            .check_shape()
            .and_then(|_| board::replay(&puzzle.fen, &puzzle.moves).map(|_| ()));
        match checked {
            Ok(()) => valid.push(puzzle),
            Err(error) => {
                warn!(puzzle_id = %puzzle.id, error = %error, "Skipping malformed puzzle");
                plan.skipped.push(SkippedPuzzle {
                    puzzle_id: puzzle.id.clone(),
                    error,
                });
            }
        }
    }

    let total = valid.len();
    for (i, puzzle) in valid.into_iter().enumerate() {
        let number = i + 1;
        let ctx = PuzzleContext {
            position: Some((number, total)),
            message: pick_message(messages, rng),
        };

        let scenes = match plan_puzzle(puzzle, config, &ctx) {
            Ok(scenes) => scenes,
            Err(error) => {
                warn!(puzzle_id = %puzzle.id, error = %error, "Skipping puzzle");
                plan.skipped.push(SkippedPuzzle {
                    puzzle_id: puzzle.id.clone(),
                    error,
                });
                continue;
            }
        };

        if !plan.segments.is_empty() {
            let scene = break_scene(config, number, total);
            let break_start = plan.next;
            plan.next = flatten_into(&[scene], config.fps, plan.next, &mut plan.entries);
            plan.breaks.push(BreakSegment {
                start: break_start,
                frames: plan.next - break_start,
            });
        }

        let puzzle_start = plan.next;
        plan.next = flatten_into(&scenes, config.fps, plan.next, &mut plan.entries);
        plan.segments.push(PuzzleSegment {
            puzzle_id: puzzle.id.clone(),
            number,
            start: puzzle_start,
            frames: plan.next - puzzle_start,
        });

        info!(
            puzzle_id = %puzzle.id,
            number,
            total,
            frames_so_far = plan.next,
            "Puzzle planned"
        );
    }

    plan
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scene::SceneKind;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const START: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

    fn puzzle(id: &str, moves: &[&str]) -> Puzzle {
        Puzzle {
            id: id.to_string(),
            fen: START.to_string(),
            moves: moves.iter().map(|m| m.to_string()).collect(),
            rating: Some(1500),
            themes: Vec::new(),
            game_url: None,
            popularity: None,
        }
    }

    fn config() -> TimelineConfig {
        TimelineConfig {
            break_secs: 4.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_three_puzzles_two_breaks() {
        let puzzles = vec![
            puzzle("p1", &["e2e4", "e7e5"]),
            puzzle("p2", &["d2d4", "d7d5", "c2c4"]),
            puzzle("p3", &["g1f3"]),
        ];
        let mut rng = StdRng::seed_from_u64(7);
        let plan = sequence(&puzzles, &config(), &[], 0, &mut rng);

        assert_eq!(plan.segments.len(), 3);
        assert_eq!(plan.breaks.len(), 2);
        assert!(plan.breaks.iter().all(|b| b.frames == 120));

        let p1 = &plan.segments[0];
        assert_eq!(p1.start, 0);
        assert_eq!(plan.segments[1].start, p1.frames + 120);

        let break_frames = plan
            .entries
            .iter()
            .filter(|e| e.kind == SceneKind::Break)
            .count();
        assert_eq!(break_frames, 240);

        // Last frame belongs to the last puzzle, not a break
        assert_eq!(plan.entries.last().unwrap().kind, SceneKind::FinalPause);
        assert_eq!(plan.next, plan.entries.len() as u64);
    }

    #[test]
    fn test_indices_contiguous_from_start() {
        let puzzles = vec![puzzle("a", &["e2e4", "e7e5"]), puzzle("b", &["e2e4"])];
        let mut rng = StdRng::seed_from_u64(1);
        let plan = sequence(&puzzles, &config(), &[], 1000, &mut rng);

        for (i, entry) in plan.entries.iter().enumerate() {
            assert_eq!(entry.index, 1000 + i as u64);
        }
        assert_eq!(plan.next, 1000 + plan.entries.len() as u64);
    }

    #[test]
    fn test_malformed_puzzle_skipped() {
        let puzzles = vec![
            puzzle("good1", &["e2e4", "e7e5"]),
            puzzle("bad", &["e2e4", "e2e4"]),
            puzzle("empty", &[]),
            puzzle("good2", &["d2d4"]),
        ];
        let mut rng = StdRng::seed_from_u64(3);
        let plan = sequence(&puzzles, &config(), &[], 0, &mut rng);

        let ids: Vec<&str> = plan.segments.iter().map(|s| s.puzzle_id.as_str()).collect();
        assert_eq!(ids, vec!["good1", "good2"]);
        assert_eq!(plan.skipped.len(), 2);
        assert!(matches!(
            plan.skipped[0].error,
            PuzzleError::IllegalMove { .. }
        ));
        assert!(matches!(plan.skipped[1].error, PuzzleError::EmptyMoves(_)));

        // Numbering is contiguous over the puzzles that survived
        let first = &plan.entries[0].frame.overlay;
        assert_eq!(first.puzzle_index, Some((1, 2)));
        assert_eq!(plan.breaks.len(), 1);
    }

    #[test]
    fn test_break_announces_next_puzzle() {
        let puzzles = vec![puzzle("a", &["e2e4"]), puzzle("b", &["e2e4"])];
        let mut rng = StdRng::seed_from_u64(3);
        let plan = sequence(&puzzles, &config(), &[], 0, &mut rng);

        let brk = plan
            .entries
            .iter()
            .find(|e| e.kind == SceneKind::Break)
            .unwrap();
        assert!(brk.frame.board.is_none());
        assert_eq!(brk.frame.overlay.puzzle_index, Some((2, 2)));
        assert_eq!(brk.frame.overlay.title.as_deref(), Some("Next Puzzle"));
    }

    #[test]
    fn test_messages_are_seeded() {
        let puzzles = vec![puzzle("a", &["e2e4"]), puzzle("b", &["e2e4"])];
        let messages = vec!["one".to_string(), "two".to_string(), "three".to_string()];

        let run = |seed| {
            let mut rng = StdRng::seed_from_u64(seed);
            let plan = sequence(&puzzles, &config(), &messages, 0, &mut rng);
            plan.entries
                .iter()
                .filter(|e| e.kind == SceneKind::SetupMove)
                .map(|e| e.frame.overlay.message.clone())
                .collect::<Vec<_>>()
        };

        assert_eq!(run(11), run(11));
        assert!(run(11).iter().all(|m| m.is_some()));
    }

    #[test]
    fn test_all_invalid_yields_empty_plan() {
        let puzzles = vec![puzzle("bad", &["a1a8"])];
        let mut rng = StdRng::seed_from_u64(0);
        let plan = sequence(&puzzles, &config(), &[], 42, &mut rng);
        assert!(plan.entries.is_empty());
        assert_eq!(plan.next, 42);
        assert_eq!(plan.skipped.len(), 1);
    }
}
