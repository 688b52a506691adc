//! Frame scheduling.
//!
//! [`FrameLoop`] calls a tick closure once per nominal frame interval on a
//! tokio interval. Missed ticks are skipped rather than bunched up, so a
//! slow frame delays the next one instead of triggering a burst.

use std::ops::ControlFlow;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use storyreel_common::FrameRate;
use tokio::time::MissedTickBehavior;

/// Cloneable stop signal shared with a running loop.
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a stop. Safe to call any number of times; once it returns no
    /// further tick starts.
    pub fn stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stopped(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Drives a per-frame callback at a fixed rate.
pub struct FrameLoop {
    rate: FrameRate,
    stop: StopHandle,
}

impl FrameLoop {
    pub fn new(rate: FrameRate) -> Self {
        Self {
            rate,
            stop: StopHandle::new(),
        }
    }

    /// Loop sharing an existing stop signal.
    pub fn with_stop(rate: FrameRate, stop: StopHandle) -> Self {
        Self { rate, stop }
    }

    pub fn rate(&self) -> FrameRate {
        self.rate
    }

    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    /// Run until the stop handle fires or `tick` breaks. The closure gets the
    /// zero-based frame number. Returns the number of ticks run.
    pub async fn run<F>(&self, mut tick: F) -> u64
    where
        F: FnMut(u64) -> ControlFlow<()>,
    {
        let mut interval = tokio::time::interval(self.rate.interval());
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let mut frames = 0u64;
        tracing::debug!(fps = self.rate.fps(), "Frame loop started");
        loop {
            interval.tick().await;
            if self.stop.is_stopped() {
                break;
            }
            let flow = tick(frames);
            frames += 1;
            if flow.is_break() {
                break;
            }
        }
        tracing::debug!(frames, "Frame loop finished");
        frames
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_runs_until_break() {
        let frame_loop = FrameLoop::new(FrameRate::new(30));
        let ran = frame_loop
            .run(|frame| {
                if frame == 9 {
                    ControlFlow::Break(())
                } else {
                    ControlFlow::Continue(())
                }
            })
            .await;
        assert_eq!(ran, 10);
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_tick_after_stop() {
        let frame_loop = FrameLoop::new(FrameRate::new(60));
        let stop = frame_loop.stop_handle();
        let mut seen = Vec::new();
        let ran = frame_loop
            .run(|frame| {
                seen.push(frame);
                if frame == 4 {
                    stop.stop();
                    stop.stop();
                }
                ControlFlow::Continue(())
            })
            .await;
        assert_eq!(ran, 5);
        assert_eq!(seen, vec![0, 1, 2, 3, 4]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stopped_before_start_runs_nothing() {
        let stop = StopHandle::new();
        stop.stop();
        let frame_loop = FrameLoop::with_stop(FrameRate::new(24), stop);
        assert_eq!(frame_loop.run(|_| ControlFlow::Continue(())).await, 0);
    }
}
