//! Rendering errors. All of them are fatal to a run.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RenderError {
    #[error("No font loaded; cannot draw overlay text")]
    FontUnavailable,

    #[error("Invalid font file {}: {reason}", .path.display())]
    InvalidFont { path: PathBuf, reason: String },

    #[error("Invalid render size: {0}px")]
    InvalidSize(u32),

    #[error("Missing frame file: {}", .0.display())]
    MissingFrame(PathBuf),

    #[error("Image encoding error: {0}")]
    Image(#[from] image::ImageError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
