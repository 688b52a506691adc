//! Clock and timing utilities for preview playback.
//!
//! The preview clock never reads `Instant::now()` directly. It asks a
//! [`MonotonicSource`] for the time elapsed since that source's epoch, which
//! lets headless renders and tests drive time by hand. This module provides:
//! - The system-backed source (anchored at creation)
//! - A manually advanced source
//! - Frame pacing helpers
//! - Drift measurement between two clocks

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A monotonic time source measured from an arbitrary fixed epoch.
pub trait MonotonicSource: Send + Sync {
    /// Time elapsed since the source's epoch.
    fn now(&self) -> Duration;
}

/// Monotonic source backed by the system clock, anchored to the moment it
/// was created.
#[derive(Debug, Clone)]
pub struct SystemClock {
    /// The instant the clock was started.
    epoch: Instant,

    /// Wall-clock time at epoch (RFC 3339 string).
    epoch_wall: String,
}

impl SystemClock {
    /// Create a new clock anchored to now.
    pub fn start() -> Self {
        Self {
            epoch: Instant::now(),
            epoch_wall: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Seconds elapsed since the clock started.
    pub fn elapsed_secs(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64()
    }

    /// Wall-clock time at clock start.
    pub fn epoch_wall(&self) -> &str {
        &self.epoch_wall
    }
}

impl MonotonicSource for SystemClock {
    fn now(&self) -> Duration {
        self.epoch.elapsed()
    }
}

/// Manually advanced monotonic source.
///
/// Clones share the same underlying counter, so a test (or a headless
/// renderer) can keep one handle and hand another to the playback clock.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    nanos: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Move time forward. Time never goes backwards.
    pub fn advance(&self, step: Duration) {
        self.nanos.fetch_add(step.as_nanos() as u64, Ordering::SeqCst);
    }

    /// Move time forward by fractional seconds.
    pub fn advance_secs(&self, secs: f64) {
        self.advance(Duration::from_secs_f64(secs.max(0.0)));
    }
}

impl MonotonicSource for ManualClock {
    fn now(&self) -> Duration {
        Duration::from_nanos(self.nanos.load(Ordering::SeqCst))
    }
}

/// Nominal display frame rate used for tick pacing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameRate {
    fps: u32,
}

impl FrameRate {
    /// Create a frame rate. Zero is treated as 1 fps.
    pub fn new(fps: u32) -> Self {
        Self { fps: fps.max(1) }
    }

    pub fn fps(&self) -> u32 {
        self.fps
    }

    /// Length of one nominal frame.
    pub fn interval(&self) -> Duration {
        Duration::from_nanos(1_000_000_000 / self.fps as u64)
    }

    /// Clamp an elapsed step so a single tick never exceeds one frame.
    ///
    /// After the process was suspended or backgrounded the raw elapsed
    /// time can be seconds long; playback should resume, not jump.
    pub fn clamp_step(&self, elapsed: Duration) -> Duration {
        elapsed.min(self.interval())
    }

    /// Whole frames that fit in `secs` (used for frame-count estimates).
    pub fn frames_in(&self, secs: f64) -> u64 {
        if secs <= 0.0 || !secs.is_finite() {
            return 0;
        }
        (secs * self.fps as f64).floor() as u64
    }
}

impl Default for FrameRate {
    fn default() -> Self {
        Self::new(60)
    }
}

/// Drift measurement between a reference clock and a measured clock.
#[derive(Debug, Clone, Copy)]
pub struct DriftMeasurement {
    /// Time according to the reference clock (seconds).
    pub reference_secs: f64,
    /// Time according to the measured clock (seconds).
    pub measured_secs: f64,
}

impl DriftMeasurement {
    /// Drift in seconds (positive = measured is ahead).
    pub fn drift_secs(&self) -> f64 {
        self.measured_secs - self.reference_secs
    }

    /// Drift in milliseconds.
    pub fn drift_ms(&self) -> f64 {
        self.drift_secs() * 1000.0
    }

    /// Whether drift exceeds an acceptable threshold.
    pub fn exceeds_threshold_ms(&self, threshold_ms: f64) -> bool {
        self.drift_ms().abs() > threshold_ms
    }
}
