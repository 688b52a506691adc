//! StoryReel Project Model
//!
//! Defines the core data contracts for StoryReel projects:
//! - **Timeline:** Ordered visual segments, silence padding, and audio tracks
//! - **ROI:** Normalized region-of-interest boxes used to aim pan/zoom motion
//! - **Timing:** The contiguous timing-table recompute
//! - **API / Project:** The timeline persistence contract and its filesystem store
//!
//! ROI boxes are stored on a `0..1000` scale on the wire and normalized to
//! `[0.0, 1.0]` on ingestion.

pub mod api;
pub mod project;
pub mod roi;
pub mod timeline;
pub mod timing;

pub use api::*;
pub use project::*;
pub use roi::*;
pub use timeline::*;
pub use timing::*;
