//! Playback clock and its time-source adapters.
//!
//! [`PlaybackClock`] owns the one authoritative playback time. It reads that
//! time from an [`ExternalClock`]: either [`AudioClock`], which mirrors the
//! narration output, or [`FreeRunningClock`], which advances by monotonic
//! wall time. The state machine is identical for both.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use storyreel_common::{DriftMeasurement, FrameRate, MonotonicSource};
use storyreel_project_model::Timeline;

/// Mirrored audio time may lag wall time by this much before it is logged.
pub const DRIFT_WARN_MS: f64 = 250.0;

/// Source of playback time.
pub trait ExternalClock: Send {
    /// Current position in seconds. Free-running sources advance here.
    fn get_time(&mut self) -> f64;

    /// Jump to `secs`.
    fn seek(&mut self, secs: f64);

    fn is_playing(&self) -> bool;

    fn play(&mut self);

    fn pause(&mut self);

    /// Whether the source ran out on its own (narration finished).
    fn has_ended(&self) -> bool {
        false
    }
}

/// The audio subsystem as seen by [`AudioClock`].
pub trait AudioOutput: Send {
    /// Poll the playhead (seconds).
    fn position(&mut self) -> f64;

    fn set_position(&mut self, secs: f64);

    fn play(&mut self);

    fn pause(&mut self);

    fn is_playing(&self) -> bool;

    fn has_ended(&self) -> bool;
}

/// Narration playhead driven by a monotonic source.
///
/// Stands in for a real audio device in headless previews. Its stall flag
/// freezes the playhead the way a buffering audio element would.
pub struct SimulatedAudio {
    source: Arc<dyn MonotonicSource>,
    duration: f64,
    position: f64,
    last_sample: Duration,
    playing: bool,
    ended: bool,
    stalled: Arc<AtomicBool>,
}

impl SimulatedAudio {
    pub fn new(source: Arc<dyn MonotonicSource>, duration_secs: f64) -> Self {
        let last_sample = source.now();
        Self {
            source,
            duration: duration_secs.max(0.0),
            position: 0.0,
            last_sample,
            playing: false,
            ended: false,
            stalled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Shared flag; while set the playhead does not move.
    pub fn stall_flag(&self) -> Arc<AtomicBool> {
        self.stalled.clone()
    }

    pub fn duration(&self) -> f64 {
        self.duration
    }
}

impl AudioOutput for SimulatedAudio {
    fn position(&mut self) -> f64 {
        let now = self.source.now();
        if self.playing && !self.stalled.load(Ordering::SeqCst) {
            let step = now.saturating_sub(self.last_sample).as_secs_f64();
            self.position = (self.position + step).min(self.duration);
            if self.position >= self.duration {
                self.playing = false;
                self.ended = true;
            }
        }
        self.last_sample = now;
        self.position
    }

    fn set_position(&mut self, secs: f64) {
        self.position = secs.clamp(0.0, self.duration);
        self.last_sample = self.source.now();
        self.ended = false;
    }

    fn play(&mut self) {
        if self.ended {
            self.position = 0.0;
            self.ended = false;
        }
        self.last_sample = self.source.now();
        self.playing = true;
    }

    fn pause(&mut self) {
        self.position();
        self.playing = false;
    }

    fn is_playing(&self) -> bool {
        self.playing
    }

    fn has_ended(&self) -> bool {
        self.ended
    }
}

/// Clock that mirrors an [`AudioOutput`].
///
/// The audio is the source of truth. Time is read from it on every tick and
/// pushed to it only on explicit seeks, never on natural progression.
pub struct AudioClock<A: AudioOutput> {
    audio: A,
    wall: Arc<dyn MonotonicSource>,
    last_wall: Duration,
    last_time: f64,
    stalls: u64,
}

impl<A: AudioOutput> AudioClock<A> {
    pub fn new(audio: A, wall: Arc<dyn MonotonicSource>) -> Self {
        let last_wall = wall.now();
        Self {
            audio,
            wall,
            last_wall,
            last_time: 0.0,
            stalls: 0,
        }
    }

    /// Ticks on which the audio playhead lagged wall time past the threshold.
    pub fn stall_count(&self) -> u64 {
        self.stalls
    }

    pub fn audio(&self) -> &A {
        &self.audio
    }
}

impl<A: AudioOutput> ExternalClock for AudioClock<A> {
    fn get_time(&mut self) -> f64 {
        let now = self.wall.now();
        let time = self.audio.position();

        if self.audio.is_playing() {
            let drift = DriftMeasurement {
                reference_secs: self.last_time + now.saturating_sub(self.last_wall).as_secs_f64(),
                measured_secs: time,
            };
            if drift.exceeds_threshold_ms(DRIFT_WARN_MS) {
                self.stalls += 1;
                tracing::debug!(
                    drift_ms = drift.drift_ms(),
                    position = time,
                    "Narration clock drifted from wall time"
                );
            }
        }

        self.last_wall = now;
        self.last_time = time;
        time
    }

    fn seek(&mut self, secs: f64) {
        self.audio.set_position(secs);
        self.last_wall = self.wall.now();
        self.last_time = secs;
    }

    fn is_playing(&self) -> bool {
        self.audio.is_playing()
    }

    fn play(&mut self) {
        self.last_wall = self.wall.now();
        self.audio.play();
    }

    fn pause(&mut self) {
        self.audio.pause();
    }

    fn has_ended(&self) -> bool {
        self.audio.has_ended()
    }
}

/// Clock advanced by monotonic wall time.
///
/// Each read adds the time elapsed since the previous read, clamped to one
/// nominal frame so a suspended process resumes instead of jumping.
pub struct FreeRunningClock {
    source: Arc<dyn MonotonicSource>,
    rate: FrameRate,
    position: f64,
    last_sample: Duration,
    playing: bool,
}

impl FreeRunningClock {
    pub fn new(source: Arc<dyn MonotonicSource>, rate: FrameRate) -> Self {
        let last_sample = source.now();
        Self {
            source,
            rate,
            position: 0.0,
            last_sample,
            playing: false,
        }
    }
}

impl ExternalClock for FreeRunningClock {
    fn get_time(&mut self) -> f64 {
        let now = self.source.now();
        if self.playing {
            let step = self.rate.clamp_step(now.saturating_sub(self.last_sample));
            self.position += step.as_secs_f64();
        }
        self.last_sample = now;
        self.position
    }

    fn seek(&mut self, secs: f64) {
        self.position = secs;
        self.last_sample = self.source.now();
    }

    fn is_playing(&self) -> bool {
        self.playing
    }

    fn play(&mut self) {
        self.last_sample = self.source.now();
        self.playing = true;
    }

    fn pause(&mut self) {
        self.get_time();
        self.playing = false;
    }
}

/// State of the playback clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackStatus {
    /// Created, never started.
    Idle,
    Playing,
    Paused,
}

/// The single authoritative playback time.
pub struct PlaybackClock {
    source: Box<dyn ExternalClock>,
    status: PlaybackStatus,
    current_time: f64,
    span: f64,
}

impl PlaybackClock {
    pub fn new(source: Box<dyn ExternalClock>, span_secs: f64) -> Self {
        Self {
            source,
            status: PlaybackStatus::Idle,
            current_time: 0.0,
            span: sanitize_span(span_secs),
        }
    }

    /// Audio-driven when the timeline has narration, free-running otherwise.
    pub fn for_timeline(
        timeline: &Timeline,
        source: Arc<dyn MonotonicSource>,
        rate: FrameRate,
    ) -> Self {
        let span = timeline.span();
        let external: Box<dyn ExternalClock> = match timeline.audio_reference() {
            Some(reference) => {
                tracing::debug!(audio = reference, span, "Playback clock follows narration");
                let audio = SimulatedAudio::new(source.clone(), span);
                Box::new(AudioClock::new(audio, source))
            }
            None => Box::new(FreeRunningClock::new(source, rate)),
        };
        Self::new(external, span)
    }

    /// Take over the position of `previous`, which has been paused. A clock
    /// that had started comes back `Paused`, not `Idle`.
    pub(crate) fn continue_from(mut self, previous: &PlaybackClock) -> Self {
        self.seek(previous.current_time);
        if previous.status != PlaybackStatus::Idle {
            self.status = PlaybackStatus::Paused;
        }
        self
    }

    pub fn status(&self) -> PlaybackStatus {
        self.status
    }

    pub fn is_playing(&self) -> bool {
        self.status == PlaybackStatus::Playing
    }

    pub fn current_time(&self) -> f64 {
        self.current_time
    }

    pub fn span(&self) -> f64 {
        self.span
    }

    pub fn play(&mut self) {
        if self.status == PlaybackStatus::Playing {
            return;
        }
        self.source.play();
        self.status = PlaybackStatus::Playing;
        tracing::debug!(at = self.current_time, "Playback started");
    }

    /// Pause playback. A no-op unless playing.
    pub fn pause(&mut self) {
        if self.status != PlaybackStatus::Playing {
            return;
        }
        self.source.pause();
        self.current_time = self.source.get_time().clamp(0.0, self.span);
        self.status = PlaybackStatus::Paused;
        tracing::debug!(at = self.current_time, "Playback paused");
    }

    /// Jump to `secs`, clamped to `[0, span]`. The status is unchanged.
    pub fn seek(&mut self, secs: f64) {
        let target = if secs.is_nan() {
            0.0
        } else {
            secs.clamp(0.0, self.span)
        };
        self.current_time = target;
        self.source.seek(target);
    }

    /// Advance to the source's time. Called once per frame, before any
    /// segment lookup.
    pub fn tick(&mut self) -> f64 {
        if self.status != PlaybackStatus::Playing {
            return self.current_time;
        }

        let time = self.source.get_time();
        if time >= self.span || self.source.has_ended() {
            self.source.pause();
            self.source.seek(0.0);
            self.current_time = 0.0;
            self.status = PlaybackStatus::Paused;
            tracing::info!(span = self.span, "Reached end of timeline, rewinding");
        } else {
            self.current_time = time.max(0.0);
        }
        self.current_time
    }
}

fn sanitize_span(span_secs: f64) -> f64 {
    if span_secs.is_finite() && span_secs > 0.0 {
        span_secs
    } else {
        0.0
    }
}
