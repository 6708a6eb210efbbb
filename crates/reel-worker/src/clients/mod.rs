//! HTTP clients for the puzzle API and the social publishing API.

pub mod puzzles;
pub mod social;

pub use puzzles::PuzzleApiClient;
pub use social::SocialClient;
