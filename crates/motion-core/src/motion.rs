//! Fixed-rate motion sampling.
//!
//! Samples the transform a preview would show at each frame of the
//! playback span, so clients and tests can inspect motion without a
//! surface.

use storyreel_common::FrameRate;
use storyreel_project_model::Timeline;

use crate::transform::{transform_at, Transform};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionFrame {
    /// Playback time of the sample.
    pub time_secs: f64,
    pub segment_index: usize,
    pub transform: Transform,
}

impl MotionFrame {
    pub fn css_transform(&self) -> String {
        self.transform.css()
    }
}

/// Sample every frame of the playback span (silence padding included).
pub fn sample_motion(timeline: &Timeline, rate: FrameRate) -> Vec<MotionFrame> {
    let frames = rate.frames_in(timeline.span());
    let fps = rate.fps() as f64;

    (0..=frames)
        .filter_map(|frame| {
            let time_secs = frame as f64 / fps;
            transform_at(timeline, time_secs).map(|(segment_index, transform)| MotionFrame {
                time_secs,
                segment_index,
                transform,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use storyreel_project_model::{recompute, KenBurns, MotionPreset, SegmentDraft};

    fn zoom_timeline() -> Timeline {
        let drafts: Vec<SegmentDraft> = ["a.jpg", "b.jpg"]
            .iter()
            .map(|name| SegmentDraft {
                ken_burns: Some(KenBurns {
                    enabled: true,
                    preset: MotionPreset::ZoomIn,
                }),
                ..SegmentDraft::new(*name)
            })
            .collect();
        Timeline {
            segments: recompute(&drafts, 2.0).unwrap(),
            total_duration: 2.0,
            ..Default::default()
        }
    }

    #[test]
    fn test_sampling_covers_span() {
        let frames = sample_motion(&zoom_timeline(), FrameRate::new(10));
        assert_eq!(frames.len(), 21);
        assert_eq!(frames[0].segment_index, 0);
        assert_eq!(frames[0].transform.scale, 1.0);
        assert_eq!(frames[10].segment_index, 1);
        assert_eq!(frames[20].segment_index, 1);
        assert!((frames[20].transform.scale - 1.15).abs() < 1e-9);
    }

    #[test]
    fn test_scale_rises_within_a_segment() {
        let frames = sample_motion(&zoom_timeline(), FrameRate::new(20));
        let first: Vec<f64> = frames
            .iter()
            .filter(|f| f.segment_index == 0)
            .map(|f| f.transform.scale)
            .collect();
        assert!(first.windows(2).all(|w| w[1] >= w[0]));
    }

    #[test]
    fn test_empty_timeline_has_no_frames() {
        assert!(sample_motion(&Timeline::default(), FrameRate::default()).is_empty());
    }

    #[test]
    fn test_css_matches_transform() {
        let frames = sample_motion(&zoom_timeline(), FrameRate::new(4));
        assert_eq!(frames[0].css_transform(), "scale(1.0000) translate(0.000%, 0.000%)");
    }
}
