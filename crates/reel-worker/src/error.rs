//! Worker error types

use std::path::PathBuf;

use frame_render::RenderError;
use puzzle_core::PuzzleError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WorkerError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Puzzle fetch error: {0}")]
    Fetch(String),

    #[error("No usable puzzles: {0}")]
    NoPuzzles(String),

    #[error("Puzzle error: {0}")]
    Puzzle(#[from] PuzzleError),

    #[error("Render error: {0}")]
    Render(#[from] RenderError),

    #[error("Encoder error: {0}")]
    Encoder(String),

    #[error("Encoder produced no output at {}", .0.display())]
    EncoderOutputMissing(PathBuf),

    #[error("Render pool closed: {0}")]
    Pool(#[from] tokio::sync::AcquireError),

    #[error("Render task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkerError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}
