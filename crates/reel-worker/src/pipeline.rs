//! Run orchestration: fetch -> plan -> render -> encode -> publish.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use frame_render::{FrameComposer, FrameSink, RenderConfig, RenderError, RenderStats};
use puzzle_core::board::solver_side;
use puzzle_core::caption::{CaptionComposer, DEFAULT_OVERLAY_MESSAGES};
use puzzle_core::sequencer::{sequence, BreakSegment, PuzzleSegment};
use puzzle_core::timeline::{plan_puzzle, FrameRun, PuzzleContext};
use puzzle_core::{FramePlan, Puzzle, TimelineConfig};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

use crate::clients::puzzles::{load_csv, select_puzzles};
use crate::clients::{PuzzleApiClient, SocialClient};
use crate::config::{RunMode, WorkerConfig};
use crate::encoder::{encode, locate_ffmpeg, AudioMix, EncodeJob};
use crate::error::WorkerError;

/// Per-run switches that don't belong in the environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    pub publish: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SkippedEntry {
    pub puzzle_id: String,
    pub error: String,
}

/// A planned video plus the bookkeeping needed to report on it.
#[derive(Debug, Clone)]
pub struct PlannedVideo {
    pub plan: FramePlan,
    pub puzzles: Vec<Puzzle>,
    pub segments: Vec<PuzzleSegment>,
    pub breaks: Vec<BreakSegment>,
    pub skipped: Vec<SkippedEntry>,
    pub timeline: TimelineConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlanSummary {
    pub mode: &'static str,
    pub fps: u32,
    pub total_frames: u64,
    pub duration_secs: f64,
    pub segments: Vec<PuzzleSegment>,
    pub breaks: Vec<BreakSegment>,
    pub skipped: Vec<SkippedEntry>,
    /// Durations and titles the plan was built with
    pub timeline: TimelineConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub output: PathBuf,
    pub puzzles: usize,
    pub frames: u64,
    pub duration_secs: f64,
    pub bytes: u64,
    pub published: usize,
}

fn mode_name(mode: RunMode) -> &'static str {
    match mode {
        RunMode::Short => "short",
        RunMode::Marathon => "marathon",
    }
}

pub fn make_rng(config: &WorkerConfig) -> StdRng {
    match config.rng_seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

/// Fetch the puzzles for a run from the CSV when configured, else the API.
pub async fn fetch_puzzles(
    config: &WorkerConfig,
    mode: RunMode,
    rng: &mut StdRng,
) -> Result<Vec<Puzzle>, WorkerError> {
    let wanted = match mode {
        RunMode::Short => 1,
        RunMode::Marathon => config.num_puzzles,
    };

    let puzzles = if let Some(path) = &config.puzzle_csv {
        let pool = load_csv(path, config.min_rating, config.max_rating)?;
        select_puzzles(pool, wanted, rng)
    } else {
        let client = PuzzleApiClient::new(&config.puzzle_api_url)?;
        match mode {
            RunMode::Short => vec![
                client
                    .random_by_rating(config.min_rating, config.max_rating)
                    .await?,
            ],
            RunMode::Marathon => {
                let pool = client
                    .fetch_pool(&config.queries, config.per_query_limit)
                    .await;
                select_puzzles(pool, wanted, rng)
            }
        }
    };

    if puzzles.is_empty() {
        return Err(WorkerError::NoPuzzles("no puzzles fetched".into()));
    }
    Ok(puzzles)
}

/// Plan the frames of a run. A short run aborts on a bad puzzle; a marathon
/// skips it.
pub fn plan_video(
    config: &WorkerConfig,
    mode: RunMode,
    puzzles: Vec<Puzzle>,
    rng: &mut StdRng,
) -> Result<PlannedVideo, WorkerError> {
    let timeline = config.timeline(mode);

    match mode {
        RunMode::Short => {
            let puzzle = puzzles
                .into_iter()
                .next()
                .ok_or_else(|| WorkerError::NoPuzzles("short run needs one puzzle".into()))?;
            let scenes = plan_puzzle(&puzzle, &timeline, &PuzzleContext::default())?;
            let plan = FramePlan::from_scenes(&scenes, timeline.fps);
            let segment = PuzzleSegment {
                puzzle_id: puzzle.id.clone(),
                number: 1,
                start: 0,
                frames: plan.len(),
            };
            Ok(PlannedVideo {
                plan,
                puzzles: vec![puzzle],
                segments: vec![segment],
                breaks: Vec::new(),
                skipped: Vec::new(),
                timeline,
            })
        }
        RunMode::Marathon => {
            let messages: Vec<String> = DEFAULT_OVERLAY_MESSAGES
                .iter()
                .map(|s| s.to_string())
                .collect();
            let batch = sequence(&puzzles, &timeline, &messages, 0, rng);
            if batch.segments.is_empty() {
                return Err(WorkerError::NoPuzzles(format!(
                    "all {} puzzles were invalid",
                    puzzles.len()
                )));
            }

            let kept: Vec<Puzzle> = batch
                .segments
                .iter()
                .filter_map(|s| puzzles.iter().find(|p| p.id == s.puzzle_id).cloned())
                .collect();
            let skipped = batch
                .skipped
                .iter()
                .map(|s| SkippedEntry {
                    puzzle_id: s.puzzle_id.clone(),
                    error: s.error.to_string(),
                })
                .collect();
            let segments = batch.segments.clone();
            let breaks = batch.breaks.clone();

            Ok(PlannedVideo {
                plan: batch.into_frame_plan(timeline.fps),
                puzzles: kept,
                segments,
                breaks,
                skipped,
                timeline,
            })
        }
    }
}

pub fn summarize(mode: RunMode, video: &PlannedVideo) -> PlanSummary {
    PlanSummary {
        mode: mode_name(mode),
        fps: video.plan.fps,
        total_frames: video.plan.len(),
        duration_secs: video.plan.duration_secs(),
        segments: video.segments.clone(),
        breaks: video.breaks.clone(),
        skipped: video.skipped.clone(),
        timeline: video.timeline.clone(),
    }
}

/// Rasterize every scene run on blocking workers, at most `workers` at a time.
pub async fn render_parallel(
    plan: &FramePlan,
    composer: Arc<FrameComposer>,
    sink: &FrameSink,
    workers: usize,
) -> Result<RenderStats, WorkerError> {
    let semaphore = Arc::new(Semaphore::new(workers.max(1)));
    let runs = plan.runs();
    info!(runs = runs.len(), frames = plan.len(), workers, "Rendering frames");

    // Set by the first failing run; no new runs start after that
    let failed = Arc::new(AtomicBool::new(false));
    let mut handles = Vec::with_capacity(runs.len());
    for run in runs {
        let permit = semaphore.clone().acquire_owned().await?;
        if failed.load(Ordering::SeqCst) {
            break;
        }
        let composer = Arc::clone(&composer);
        let sink = sink.clone();
        let failed = Arc::clone(&failed);

        handles.push(tokio::task::spawn_blocking(move || {
            let result = render_run(&composer, &sink, &run);
            if result.is_err() {
                failed.store(true, Ordering::SeqCst);
            }
            drop(permit);
            result
        }));
    }

    let mut stats = RenderStats::default();
    let mut first_error: Option<WorkerError> = None;
    for handle in handles {
        match handle.await {
            Ok(Ok(run_stats)) => stats.merge(run_stats),
            Ok(Err(e)) => {
                first_error.get_or_insert(e.into());
            }
            Err(e) => {
                first_error.get_or_insert(e.into());
            }
        }
    }
    if let Some(e) = first_error {
        return Err(e);
    }

    sink.verify_contiguous(plan.len())?;
    info!(
        frames = stats.frames,
        rasterized = stats.rasterized,
        "Frames rendered"
    );
    Ok(stats)
}

fn render_run(
    composer: &FrameComposer,
    sink: &FrameSink,
    run: &FrameRun,
) -> Result<RenderStats, RenderError> {
    let png = composer.render(&run.frame)?.to_png()?;
    sink.write_run(run.start, run.len, &png)?;
    Ok(RenderStats {
        frames: run.len,
        rasterized: 1,
        bytes_encoded: png.len() as u64,
    })
}

/// Audio tracks that exist on disk. Missing files are dropped with a warning.
fn audio_mix(config: &WorkerConfig) -> AudioMix {
    let existing = |path: &Option<PathBuf>, name: &str| {
        path.as_ref().and_then(|p| {
            if p.is_file() {
                Some(p.clone())
            } else {
                warn!(track = name, path = %p.display(), "Audio file not found, skipping track");
                None
            }
        })
    };
    AudioMix {
        music: existing(&config.background_music, "music"),
        music_volume: config.music_volume,
        sfx: existing(&config.click_sound, "sfx"),
        sfx_volume: config.sfx_volume,
    }
}

/// Fetch, plan, render, encode and (for short runs) publish one video.
pub async fn run(
    config: &WorkerConfig,
    mode: RunMode,
    options: RunOptions,
) -> Result<RunSummary, WorkerError> {
    let mut rng = make_rng(config);

    info!(mode = mode_name(mode), "Fetching puzzles");
    let puzzles = fetch_puzzles(config, mode, &mut rng).await?;

    let video = plan_video(config, mode, puzzles, &mut rng)?;
    let summary = summarize(mode, &video);
    info!(
        puzzles = summary.segments.len(),
        skipped = summary.skipped.len(),
        frames = summary.total_frames,
        "Timeline planned"
    );

    // Fail on the encoder before spending time on frames
    let ffmpeg = locate_ffmpeg(config.ffmpeg_path.as_deref()).await?;

    let render_config = RenderConfig::with_size(config.board_size);
    let composer = Arc::new(FrameComposer::with_font_file(render_config, &config.font_path)?);
    let sink = FrameSink::create(&config.frames_dir)?;

    let output = config.output_for(mode);
    let rendered = render_parallel(&video.plan, composer, &sink, config.render_workers).await;

    let encoded = match rendered {
        Ok(_) => {
            let job = EncodeJob {
                input_pattern: sink.input_pattern(),
                fps: video.plan.fps,
                audio: audio_mix(config),
                output: output.clone(),
            };
            encode(&ffmpeg, &job).await
        }
        Err(e) => Err(e),
    };

    if let Err(e) = &encoded {
        error!(error = %e, frames_dir = %sink.dir().display(), "Video generation failed");
    }
    if config.keep_frames {
        info!(dir = %sink.dir().display(), "Keeping frames");
    } else if let Err(e) = cleanup(&sink) {
        warn!(error = %e, "Failed to remove frames");
    }
    let bytes = encoded?;

    let mut published = 0;
    if mode == RunMode::Short && options.publish && !config.social_targets.is_empty() {
        published = publish_short(config, &video, &output, &mut rng).await;
    }

    let run_summary = RunSummary {
        output,
        puzzles: video.segments.len(),
        frames: summary.total_frames,
        duration_secs: summary.duration_secs,
        bytes,
        published,
    };
    info!(
        output = %run_summary.output.display(),
        puzzles = run_summary.puzzles,
        frames = run_summary.frames,
        duration = %format!(
            "{:.1} minutes ({:.0} seconds)",
            run_summary.duration_secs / 60.0,
            run_summary.duration_secs
        ),
        "Generation complete"
    );
    Ok(run_summary)
}

fn cleanup(sink: &FrameSink) -> Result<(), WorkerError> {
    sink.clear()?;
    // Only remove the directory when nothing else lives in it
    if std::fs::read_dir(sink.dir())?.next().is_none() {
        std::fs::remove_dir(sink.dir())?;
    }
    Ok(())
}

/// Post the first puzzle to every target. Failures are logged; returns how many posts were accepted.
async fn publish_short(
    config: &WorkerConfig,
    video: &PlannedVideo,
    output: &std::path::Path,
    rng: &mut StdRng,
) -> usize {
    let Some(puzzle) = video.puzzles.first() else {
        return 0;
    };

    let side = puzzle
        .setup_move()
        .and_then(|setup| solver_side(&puzzle.fen, setup).ok());
    let caption = CaptionComposer::default().compose(puzzle.rating, side, rng);

    let client = match SocialClient::new(&config.social_api_url) {
        Ok(client) => client,
        Err(e) => {
            warn!(error = %e, "Social client unavailable, skipping publish");
            return 0;
        }
    };
    let accepted = client
        .publish_all(
            &config.social_targets,
            &config.puzzle_link(&puzzle.id),
            &caption,
            Some(&config.media_url(output)),
        )
        .await;
    info!(
        accepted,
        targets = config.social_targets.len(),
        "Publishing finished"
    );
    accepted
}
