//! Preview session.
//!
//! Owns the committed timeline, the playback clock and the asset cache, and
//! runs the per-frame pipeline in a fixed order: apply finished asset loads,
//! advance the clock, look up the active segment, compute its transform,
//! draw.

use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;

use storyreel_common::{FrameRate, MonotonicSource, StoryreelResult};
use storyreel_project_model::Timeline;

use crate::assets::AssetCache;
use crate::clock::{PlaybackClock, PlaybackStatus};
use crate::renderer::{compose_frame, FrameComposition};
use crate::scheduler::{FrameLoop, StopHandle};
use crate::surface::Surface;

const ASSET_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Snapshot of where playback is.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackState {
    pub current_time: f64,
    pub is_playing: bool,
    pub active_segment_index: Option<usize>,
}

/// An interactive preview of one timeline.
pub struct PreviewSession {
    timeline: Timeline,
    clock: PlaybackClock,
    source: Arc<dyn MonotonicSource>,
    assets: AssetCache,
    rate: FrameRate,
    show_overlay: bool,
    stop: StopHandle,
    state: PlaybackState,
    frames: u64,
}

impl PreviewSession {
    /// Start a session paused at zero and begin loading every asset.
    pub fn new(
        timeline: Timeline,
        assets: AssetCache,
        source: Arc<dyn MonotonicSource>,
        rate: FrameRate,
    ) -> Self {
        let clock = PlaybackClock::for_timeline(&timeline, source.clone(), rate);
        let mut session = Self {
            timeline,
            clock,
            source,
            assets,
            rate,
            show_overlay: false,
            stop: StopHandle::new(),
            state: PlaybackState {
                current_time: 0.0,
                is_playing: false,
                active_segment_index: None,
            },
            frames: 0,
        };
        session.prefetch();
        tracing::info!(
            segments = session.timeline.segments.len(),
            span = session.clock.span(),
            fps = rate.fps(),
            "Preview session ready"
        );
        session
    }

    pub fn with_overlay(mut self, show: bool) -> Self {
        self.show_overlay = show;
        self
    }

    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn status(&self) -> PlaybackStatus {
        self.clock.status()
    }

    pub fn frames_drawn(&self) -> u64 {
        self.frames
    }

    pub fn assets(&self) -> &AssetCache {
        &self.assets
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub fn play(&mut self) {
        if !self.stop.is_stopped() {
            self.clock.play();
            self.sync_state();
        }
    }

    pub fn pause(&mut self) {
        self.clock.pause();
        self.sync_state();
    }

    /// Jump to `secs` (clamped to the span). Playing or paused is kept.
    pub fn seek(&mut self, secs: f64) {
        self.clock.seek(secs);
        self.sync_state();
    }

    /// Produce and draw the next frame. `None` once the session is stopped.
    pub fn tick(&mut self, surface: &mut dyn Surface) -> StoryreelResult<Option<FrameComposition>> {
        if self.stop.is_stopped() {
            return Ok(None);
        }

        self.assets.pump();
        let time = self.clock.tick();
        let frame = compose_frame(&self.timeline, time, &mut self.assets, self.show_overlay);
        self.state = PlaybackState {
            current_time: time,
            is_playing: self.clock.is_playing(),
            active_segment_index: frame.segment_index,
        };

        surface.draw(&frame)?;
        self.frames += 1;
        Ok(Some(frame))
    }

    /// Swap in a new committed timeline. Playback pauses, in-flight loads
    /// are abandoned, assets the new timeline no longer uses are evicted and
    /// the new ones start loading. The clock is rebuilt for the new timeline
    /// (narration-driven or free-running) and keeps the current time,
    /// clamped to the new span.
    pub fn replace_timeline(&mut self, timeline: Timeline) {
        self.clock.pause();
        let cancelled = self.assets.cancel_pending();
        self.timeline = timeline;
        self.clock = PlaybackClock::for_timeline(&self.timeline, self.source.clone(), self.rate)
            .continue_from(&self.clock);

        let timeline = &self.timeline;
        let evicted = self.assets.retain_settled(|reference| {
            timeline
                .segments
                .iter()
                .any(|segment| segment.asset_reference == reference)
        });
        self.prefetch();
        self.sync_state();
        tracing::info!(
            segments = self.timeline.segments.len(),
            span = self.clock.span(),
            cancelled,
            evicted,
            "Preview timeline replaced"
        );
    }

    /// Apply asset loads as they finish, for at most `limit`. Returns how
    /// many references are still loading. Headless renders call this before
    /// the first frame so their output does not depend on load timing.
    pub async fn wait_for_assets(&mut self, limit: Duration) -> usize {
        let deadline = tokio::time::Instant::now() + limit;
        loop {
            self.assets.pump();
            let pending = self.assets.pending();
            if pending == 0 || tokio::time::Instant::now() >= deadline {
                return pending;
            }
            tokio::time::sleep(ASSET_POLL_INTERVAL).await;
        }
    }

    /// Stop for good. Idempotent; no frame is drawn afterwards.
    pub fn stop(&mut self) {
        if self.stop.is_stopped() {
            return;
        }
        self.stop.stop();
        self.clock.pause();
        self.assets.cancel_pending();
        self.sync_state();
        tracing::info!(frames = self.frames, "Preview session stopped");
    }

    /// Tick at the nominal frame rate until playback pauses (end of the
    /// timeline or an explicit pause), the session stops, or drawing fails.
    pub async fn run(&mut self, surface: &mut dyn Surface) -> StoryreelResult<u64> {
        let frame_loop = FrameLoop::with_stop(self.rate, self.stop.clone());
        let mut failure = None;
        let ticks = frame_loop
            .run(|_| match self.tick(surface) {
                Ok(Some(_)) if self.clock.is_playing() => ControlFlow::Continue(()),
                Ok(_) => ControlFlow::Break(()),
                Err(e) => {
                    failure = Some(e);
                    ControlFlow::Break(())
                }
            })
            .await;

        match failure {
            Some(e) => Err(e),
            None => Ok(ticks),
        }
    }

    fn prefetch(&mut self) {
        for segment in &self.timeline.segments {
            self.assets.resolve(&segment.asset_reference);
        }
    }

    fn sync_state(&mut self) {
        let visual = self.timeline.visual_time(self.clock.current_time());
        self.state = PlaybackState {
            current_time: self.clock.current_time(),
            is_playing: self.clock.is_playing(),
            active_segment_index: self.timeline.segment_index_at(visual),
        };
    }
}

impl Drop for PreviewSession {
    fn drop(&mut self) {
        self.stop();
    }
}
