//! Frame rasterization and the on-disk frame sequence consumed by the encoder.

pub mod composer;
pub mod error;
pub mod pieces;
pub mod sink;
pub mod theme;

pub use composer::{FrameComposer, RenderedFrame};
pub use error::RenderError;
pub use sink::{render_plan, FrameSink, RenderStats};
pub use theme::RenderConfig;
