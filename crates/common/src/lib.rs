//! StoryReel Common Utilities
//!
//! Shared infrastructure for all StoryReel crates:
//! - Error types and result aliases
//! - Monotonic time sources and frame pacing for the preview clock
//! - Tracing/logging initialization
//! - Configuration loading

pub mod clock;
pub mod config;
pub mod error;
pub mod logging;

pub use clock::*;
pub use config::*;
pub use error::*;
