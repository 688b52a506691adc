//! Ken Burns transform compute.
//!
//! A [`Transform`] is a scale about the frame center followed by a
//! translation expressed in percent of the frame, matching the CSS
//! `scale(s) translate(x%, y%)` convention the preview surface applies.
//!
//! Every function here is pure: identical inputs always give an identical
//! transform, regardless of call history.

use storyreel_project_model::{MotionPreset, RoiBox, Segment, Timeline};

use crate::easing::ease_in_out;

/// Scale gained over a `subtle` segment.
pub const SUBTLE_ZOOM: f64 = 0.07;

/// Scale range travelled by `zoom_in` / `zoom_out`.
pub const ZOOM_RANGE: f64 = 0.15;

/// Fixed scale for the pan presets; leaves room to travel without exposing
/// the frame edge.
pub const PAN_SCALE: f64 = 1.3;

/// Half of the pan travel, in percent of the frame.
pub const PAN_HALF_TRAVEL: f64 = 11.5;

/// Scale plus translate (percent of frame) about the frame center.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transform {
    pub scale: f64,
    pub translate_x: f64,
    pub translate_y: f64,
}

impl Transform {
    pub const IDENTITY: Transform = Transform {
        scale: 1.0,
        translate_x: 0.0,
        translate_y: 0.0,
    };

    /// Largest translation (percent) the current scale can absorb without
    /// sampling outside the source image.
    pub fn max_offset(&self) -> f64 {
        (self.scale - 1.0) / 2.0 * 100.0
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }

    /// CSS transform string for web clients.
    pub fn css(&self) -> String {
        format!(
            "scale({:.4}) translate({:.3}%, {:.3}%)",
            self.scale, self.translate_x, self.translate_y
        )
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Progress through `segment` at `visual_secs`, clamped to `[0, 1]`.
pub fn local_progress(segment: &Segment, visual_secs: f64) -> f64 {
    if segment.duration.is_nan() || segment.duration <= 0.0 {
        return 0.0;
    }
    let progress = (visual_secs - segment.start) / segment.duration;
    if progress.is_nan() {
        0.0
    } else {
        progress.clamp(0.0, 1.0)
    }
}

/// Transform for `segment` at `progress`.
pub fn compute(segment: &Segment, progress: f64) -> Transform {
    compute_motion(segment.motion(), segment.roi(), progress)
}

/// Transform for a preset and optional ROI at `progress`.
///
/// `None` (no motion, or motion disabled) and unknown presets yield the
/// identity. Zoom-style presets ease their translation from the frame
/// center toward the ROI center, bounded by what the current scale allows.
pub fn compute_motion(
    preset: Option<&MotionPreset>,
    roi: Option<RoiBox>,
    progress: f64,
) -> Transform {
    let Some(preset) = preset else {
        return Transform::IDENTITY;
    };
    let eased = ease_in_out(progress);

    let mut transform = match preset {
        MotionPreset::Subtle => zoom(1.0 + SUBTLE_ZOOM * eased),
        MotionPreset::ZoomIn => zoom(1.0 + ZOOM_RANGE * eased),
        MotionPreset::ZoomOut => zoom(1.0 + ZOOM_RANGE - ZOOM_RANGE * eased),
        MotionPreset::PanLeftRight => Transform {
            scale: PAN_SCALE,
            translate_x: -PAN_HALF_TRAVEL + 2.0 * PAN_HALF_TRAVEL * eased,
            translate_y: 0.0,
        },
        MotionPreset::PanBottomTop => Transform {
            scale: PAN_SCALE,
            translate_x: 0.0,
            translate_y: PAN_HALF_TRAVEL - 2.0 * PAN_HALF_TRAVEL * eased,
        },
        MotionPreset::Other(_) => return Transform::IDENTITY,
    };

    if let Some(roi) = roi.filter(|_| preset.is_roi_aware()) {
        let (cx, cy) = roi.center();
        let max_offset = transform.max_offset();
        transform.translate_x = (0.5 - cx) * max_offset * 2.0 * eased;
        transform.translate_y = (0.5 - cy) * max_offset * 2.0 * eased;
    }

    transform
}

/// Active segment index and its transform at playback time `playback_secs`.
pub fn transform_at(timeline: &Timeline, playback_secs: f64) -> Option<(usize, Transform)> {
    let visual = timeline.visual_time(playback_secs);
    let index = timeline.segment_index_at(visual)?;
    let segment = &timeline.segments[index];
    Some((index, compute(segment, local_progress(segment, visual))))
}

fn zoom(scale: f64) -> Transform {
    Transform {
        scale,
        translate_x: 0.0,
        translate_y: 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use storyreel_project_model::{recompute, KenBurns, SegmentDraft};

    fn preset_timeline(preset: MotionPreset, count: usize, total: f64) -> Timeline {
        let drafts: Vec<SegmentDraft> = (0..count)
            .map(|i| SegmentDraft {
                ken_burns: Some(KenBurns {
                    enabled: true,
                    preset: preset.clone(),
                }),
                ..SegmentDraft::new(format!("{i}.jpg"))
            })
            .collect();
        Timeline {
            segments: recompute(&drafts, total).unwrap(),
            total_duration: total,
            ..Default::default()
        }
    }

    fn roi(xmin: f64, ymin: f64, xmax: f64, ymax: f64) -> Option<RoiBox> {
        Some(RoiBox::new(xmin, ymin, xmax, ymax).unwrap())
    }

    #[test]
    fn test_zoom_endpoints() {
        let zoom_in = Some(&MotionPreset::ZoomIn);
        assert_eq!(compute_motion(zoom_in, None, 0.0).scale, 1.0);
        assert!((compute_motion(zoom_in, None, 1.0).scale - 1.15).abs() < 1e-12);

        let zoom_out = Some(&MotionPreset::ZoomOut);
        assert!((compute_motion(zoom_out, None, 0.0).scale - 1.15).abs() < 1e-12);
        assert!((compute_motion(zoom_out, None, 1.0).scale - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_pan_presets_travel_full_range() {
        let lr = Some(&MotionPreset::PanLeftRight);
        let start = compute_motion(lr, None, 0.0);
        let end = compute_motion(lr, None, 1.0);
        assert_eq!(start.scale, PAN_SCALE);
        assert!((start.translate_x + 11.5).abs() < 1e-12);
        assert!((end.translate_x - 11.5).abs() < 1e-12);

        let bt = Some(&MotionPreset::PanBottomTop);
        assert!((compute_motion(bt, None, 0.0).translate_y - 11.5).abs() < 1e-12);
        assert!((compute_motion(bt, None, 1.0).translate_y + 11.5).abs() < 1e-12);
    }

    #[test]
    fn test_no_motion_is_identity() {
        assert!(compute_motion(None, roi(0.0, 0.0, 0.2, 0.2), 0.7).is_identity());
        let unknown = MotionPreset::Other("wobble".to_string());
        assert!(compute_motion(Some(&unknown), None, 0.7).is_identity());
    }

    #[test]
    fn test_subtle_three_segment_scenario() {
        let timeline = preset_timeline(MotionPreset::Subtle, 3, 6.0);

        let (index, at_one) = transform_at(&timeline, 1.0).unwrap();
        assert_eq!(index, 0);
        assert!((at_one.scale - 1.035).abs() < 1e-12);

        let (index, at_two) = transform_at(&timeline, 2.0).unwrap();
        assert_eq!(index, 1);
        assert_eq!(at_two.scale, 1.0);

        let (index, at_three) = transform_at(&timeline, 3.0).unwrap();
        assert_eq!(index, 1);
        assert!((at_three.scale - 1.035).abs() < 1e-12);
    }

    #[test]
    fn test_leading_silence_holds_first_frame() {
        let mut timeline = preset_timeline(MotionPreset::ZoomIn, 2, 4.0);
        timeline.silence_start_duration = Some(1.5);
        let (index, transform) = transform_at(&timeline, 0.5).unwrap();
        assert_eq!(index, 0);
        assert!(transform.is_identity());
    }

    #[test]
    fn test_roi_bias_targets_center() {
        let target = roi(0.1, 0.7, 0.3, 0.9);
        let transform = compute_motion(Some(&MotionPreset::ZoomIn), target, 1.0);
        assert!((transform.max_offset() - 7.5).abs() < 1e-9);
        assert!((transform.translate_x - 4.5).abs() < 1e-9);
        assert!((transform.translate_y + 4.5).abs() < 1e-9);

        let start = compute_motion(Some(&MotionPreset::ZoomIn), target, 0.0);
        assert_eq!(start.translate_x, 0.0);
    }

    #[test]
    fn test_roi_ignored_for_pans() {
        let pan_preset = Some(&MotionPreset::PanLeftRight);
        let pan = compute_motion(pan_preset, roi(0.0, 0.0, 0.1, 0.1), 0.5);
        assert!(pan.translate_x.abs() < 1e-12);
        assert_eq!(pan.translate_y, 0.0);
    }

    #[test]
    fn test_local_progress_clamps() {
        let timeline = preset_timeline(MotionPreset::Subtle, 2, 4.0);
        let seg = &timeline.segments[1];
        assert_eq!(local_progress(seg, 1.0), 0.0);
        assert_eq!(local_progress(seg, 3.0), 0.5);
        assert_eq!(local_progress(seg, 9.0), 1.0);
        assert_eq!(local_progress(seg, f64::NAN), 0.0);
    }

    #[test]
    fn test_compute_is_deterministic() {
        let timeline = preset_timeline(MotionPreset::ZoomOut, 1, 3.0);
        let seg = &timeline.segments[0];
        let first = compute(seg, 0.0);
        for p in [0.3, 0.9, 0.1] {
            let _ = compute(seg, p);
        }
        assert_eq!(compute(seg, 0.0), first);
    }

    #[test]
    fn test_css_string() {
        let css = Transform {
            scale: 1.035,
            translate_x: -2.5,
            translate_y: 0.0,
        }
        .css();
        assert_eq!(css, "scale(1.0350) translate(-2.500%, 0.000%)");
    }

    fn roi_aware_preset() -> impl Strategy<Value = MotionPreset> {
        prop_oneof![
            Just(MotionPreset::Subtle),
            Just(MotionPreset::ZoomIn),
            Just(MotionPreset::ZoomOut),
        ]
    }

    proptest! {
        #[test]
        fn prop_roi_bias_stays_within_max_offset(
            preset in roi_aware_preset(),
            x in (0.0f64..1.0, 0.0f64..1.0),
            y in (0.0f64..1.0, 0.0f64..1.0),
            progress in -0.5f64..1.5,
        ) {
            let (x0, x1) = if x.0 < x.1 { x } else { (x.1, x.0) };
            let (y0, y1) = if y.0 < y.1 { y } else { (y.1, y.0) };
            prop_assume!(x0 < x1 && y0 < y1);
            let target = RoiBox::new(x0, y0, x1, y1).ok();
            let t = compute_motion(Some(&preset), target, progress);
            prop_assert!(t.scale > 0.0);
            prop_assert!(t.translate_x.abs() <= t.max_offset() + 1e-9);
            prop_assert!(t.translate_y.abs() <= t.max_offset() + 1e-9);
        }
    }
}
