//! StoryReel Preview Engine
//!
//! Audio-synchronized, scrub-able preview of a timeline, plus the editor
//! that reorders and restyles its segments.
//!
//! # Frame Pipeline
//!
//! ```text
//! AssetCache::pump ──┐
//!                    ├── PlaybackClock::tick (audio or free-running)
//!                    │          │
//!                    │          ├── segment lookup (visual time)
//!                    │          │          │
//!                    │          │          ├── Transform compute
//!                    │          │          │          │
//!                    └──────────┴──────────┴──────────▼
//!                                               Surface::draw
//! ```
//!
//! The [`editor::SegmentEditor`] works on drafts and only replaces the
//! committed timeline after a successful commit; the session renders the
//! committed timeline.

pub mod assets;
pub mod clock;
pub mod editor;
pub mod renderer;
pub mod scheduler;
pub mod session;
pub mod surface;

pub use assets::{AssetCache, AssetHandle, AssetLoader, DecodedAsset, FsAssetLoader, LoadError};
pub use clock::{
    AudioClock, AudioOutput, ExternalClock, FreeRunningClock, PlaybackClock, PlaybackStatus,
    SimulatedAudio,
};
pub use editor::{EditorError, EditorResult, EditorState, SegmentEditor};
pub use renderer::{compose_frame, FrameComposition, FrameContent, Overlay};
pub use scheduler::{FrameLoop, StopHandle};
pub use session::{PlaybackState, PreviewSession};
pub use surface::{RasterSurface, Surface};
