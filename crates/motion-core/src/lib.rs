//! StoryReel Motion Core
//!
//! Turns timeline segments into per-frame pan/zoom transforms:
//! - **Easing:** Progress remap curve
//! - **Transform:** Ken Burns preset math with ROI targeting
//! - **Motion:** Fixed-rate transform sampling for headless previews
//! - **Preflight:** Render dry-run checks (timing, assets, frame estimate)
//!
//! This crate is pure computation. The only I/O is the asset existence
//! callback handed to the pre-flight check.

pub mod easing;
pub mod motion;
pub mod preflight;
pub mod transform;

pub use easing::ease_in_out;
pub use motion::{sample_motion, MotionFrame};
pub use preflight::{preflight, PreflightReport, PreflightStatus};
pub use transform::{compute, compute_motion, local_progress, transform_at, Transform};
