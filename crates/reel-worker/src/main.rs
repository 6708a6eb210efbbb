//! Chess puzzle video worker
//!
//! Fetches puzzles, renders them to a numbered frame sequence, encodes the
//! sequence with ffmpeg and optionally publishes the result.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;

use reel_worker::pipeline::{self, RunOptions};
use reel_worker::{RunMode, WorkerConfig};

#[derive(Parser)]
#[command(author, version, about = "Render chess puzzle videos")]
struct Cli {
    /// Seed for puzzle selection, messages and captions
    #[arg(long, global = true)]
    seed: Option<u64>,

    /// Output video path
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    /// Read puzzles from a Lichess puzzle CSV instead of the API
    #[arg(long, global = true)]
    csv: Option<PathBuf>,

    /// Leave the frame files on disk after encoding
    #[arg(long, global = true)]
    keep_frames: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// One puzzle, published to the configured social targets
    Short {
        #[arg(long)]
        no_publish: bool,
    },
    /// Several puzzles back to back with breaks in between
    Marathon {
        /// Number of puzzles (overrides NUM_PUZZLES)
        #[arg(short = 'n', long)]
        count: Option<usize>,
    },
    /// Fetch and plan without rendering; prints a JSON summary
    Plan {
        #[arg(value_enum, default_value_t = ModeArg::Marathon)]
        mode: ModeArg,

        #[arg(short = 'n', long)]
        count: Option<usize>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ModeArg {
    Short,
    Marathon,
}

impl From<ModeArg> for RunMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Short => RunMode::Short,
            ModeArg::Marathon => RunMode::Marathon,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    // Load .env file for local dev
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    let mut config = WorkerConfig::load()?;

    if let Some(seed) = cli.seed {
        config.rng_seed = Some(seed);
    }
    if let Some(output) = cli.output {
        config.output_video = Some(output);
    }
    if let Some(csv) = cli.csv {
        config.puzzle_csv = Some(csv);
    }
    if cli.keep_frames {
        config.keep_frames = true;
    }

    match cli.command {
        Command::Short { no_publish } => {
            let options = RunOptions {
                publish: !no_publish,
            };
            pipeline::run(&config, RunMode::Short, options).await?;
        }
        Command::Marathon { count } => {
            if let Some(count) = count {
                config.num_puzzles = count.max(1);
            }
            pipeline::run(&config, RunMode::Marathon, RunOptions::default()).await?;
        }
        Command::Plan { mode, count } => {
            if let Some(count) = count {
                config.num_puzzles = count.max(1);
            }
            let mode = RunMode::from(mode);
            let mut rng = pipeline::make_rng(&config);
            let puzzles = pipeline::fetch_puzzles(&config, mode, &mut rng).await?;
            let video = pipeline::plan_video(&config, mode, puzzles, &mut rng)?;
            let summary = pipeline::summarize(mode, &video);
            info!(frames = summary.total_frames, "Plan ready");
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
    }

    Ok(())
}
