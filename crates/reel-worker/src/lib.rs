pub mod clients;
pub mod config;
pub mod encoder;
pub mod error;
pub mod pipeline;

pub use config::{RunMode, WorkerConfig};
pub use error::WorkerError;
