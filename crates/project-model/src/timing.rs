//! Segment timing recomputation.
//!
//! The only sanctioned way to derive `start`/`end`/`duration`. Boundaries
//! are computed from the cumulative weight of the drafts and rounded to the
//! millisecond, so every `end[i]` is bit-identical to `start[i + 1]` and the
//! last `end` is the rounded total.

use serde_json::{Map, Value};
use storyreel_common::DurationPolicy;

use crate::timeline::{CropData, Effect, KenBurns, Segment};

/// Slack allowed when checking a persisted table for contiguity.
pub const TIMING_TOLERANCE_SECS: f64 = 1e-3;

/// Rejected timing input.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TimingError {
    #[error("timeline has no segments")]
    EmptySegments,

    #[error("total duration must be positive, got {total}")]
    NonPositiveTotal { total: f64 },

    #[error("segment {index}: duration hint {hint} is not a positive number")]
    InvalidHint { index: usize, hint: f64 },

    #[error("segment {index}: duration collapsed to zero")]
    CollapsedSegment { index: usize },

    #[error("segment {index}: malformed ROI")]
    MalformedRoi { index: usize },

    #[error("segment {index}: starts at {found}, expected {expected}")]
    Discontinuous {
        index: usize,
        expected: f64,
        found: f64,
    },
}

/// A segment without a position in time: identity fields plus an optional
/// relative duration.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentDraft {
    pub asset_reference: String,
    pub duration_hint: Option<f64>,
    pub effect: Effect,
    pub ken_burns: Option<KenBurns>,
    pub crop_data: Option<CropData>,
    pub extra: Map<String, Value>,
}

impl SegmentDraft {
    /// A draft with no hint and no motion.
    pub fn new(asset_reference: impl Into<String>) -> Self {
        Self {
            asset_reference: asset_reference.into(),
            duration_hint: None,
            effect: Effect::None,
            ken_burns: None,
            crop_data: None,
            extra: Map::new(),
        }
    }

    pub fn with_hint(mut self, secs: f64) -> Self {
        self.duration_hint = Some(secs);
        self
    }

    fn place(&self, start: f64, end: f64, duration: f64) -> Segment {
        Segment {
            asset_reference: self.asset_reference.clone(),
            start,
            end,
            duration,
            effect: self.effect.clone(),
            ken_burns: self.ken_burns.clone(),
            crop_data: self.crop_data.clone(),
            extra: self.extra.clone(),
        }
    }
}

impl From<&Segment> for SegmentDraft {
    fn from(segment: &Segment) -> Self {
        Self {
            asset_reference: segment.asset_reference.clone(),
            duration_hint: Some(segment.duration),
            effect: segment.effect.clone(),
            ken_burns: segment.ken_burns.clone(),
            crop_data: segment.crop_data.clone(),
            extra: segment.extra.clone(),
        }
    }
}

/// Round to three decimal places.
pub fn round_millis(secs: f64) -> f64 {
    (secs * 1000.0).round() / 1000.0
}

/// Lay `drafts` out contiguously from zero across `total_duration`.
///
/// With no hints the total is split evenly. With hints, durations are
/// proportional to them; a draft missing its hint weighs the mean of the
/// hints that are present. Nothing is returned on error.
pub fn recompute(
    drafts: &[SegmentDraft],
    total_duration: f64,
) -> Result<Vec<Segment>, TimingError> {
    if drafts.is_empty() {
        return Err(TimingError::EmptySegments);
    }
    if !(total_duration.is_finite() && total_duration > 0.0) {
        return Err(TimingError::NonPositiveTotal {
            total: total_duration,
        });
    }

    for (index, draft) in drafts.iter().enumerate() {
        if let Some(hint) = draft.duration_hint {
            if !(hint.is_finite() && hint > 0.0) {
                return Err(TimingError::InvalidHint { index, hint });
            }
        }
        if let Some(Err(_)) = draft.crop_data.as_ref().and_then(CropData::normalized_roi) {
            return Err(TimingError::MalformedRoi { index });
        }
    }

    let weights = weights_for(drafts);
    let weight_sum: f64 = weights.iter().sum();
    let total = round_millis(total_duration);
    let last = drafts.len() - 1;

    let mut segments = Vec::with_capacity(drafts.len());
    let mut cumulative = 0.0;
    let mut start = 0.0;
    for (index, (draft, weight)) in drafts.iter().zip(&weights).enumerate() {
        cumulative += weight;
        let end = if index == last {
            total
        } else {
            round_millis(total_duration * cumulative / weight_sum)
        };
        let duration = round_millis(end - start);
        if duration <= 0.0 {
            return Err(TimingError::CollapsedSegment { index });
        }
        segments.push(draft.place(start, end, duration));
        start = end;
    }

    tracing::debug!(
        segments = segments.len(),
        total,
        hinted = drafts.iter().filter(|d| d.duration_hint.is_some()).count(),
        "Recomputed segment timing"
    );
    Ok(segments)
}

/// [`recompute`] under a configured duration policy.
pub fn recompute_with_policy(
    drafts: &[SegmentDraft],
    total_duration: f64,
    policy: DurationPolicy,
) -> Result<Vec<Segment>, TimingError> {
    match policy {
        DurationPolicy::PreserveAuthored => recompute(drafts, total_duration),
        DurationPolicy::EvenSplit => {
            let unhinted: Vec<SegmentDraft> = drafts
                .iter()
                .cloned()
                .map(|mut d| {
                    d.duration_hint = None;
                    d
                })
                .collect();
            recompute(&unhinted, total_duration)
        }
    }
}

fn weights_for(drafts: &[SegmentDraft]) -> Vec<f64> {
    let hints: Vec<f64> = drafts.iter().filter_map(|d| d.duration_hint).collect();
    if hints.is_empty() {
        return vec![1.0; drafts.len()];
    }
    let mean = hints.iter().sum::<f64>() / hints.len() as f64;
    drafts
        .iter()
        .map(|d| d.duration_hint.unwrap_or(mean))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roi::WireRoi;
    use crate::timeline::MotionPreset;
    use proptest::prelude::*;

    fn drafts(names: &[&str]) -> Vec<SegmentDraft> {
        names.iter().map(|n| SegmentDraft::new(*n)).collect()
    }

    #[test]
    fn test_even_split_without_hints() {
        let segments = recompute(&drafts(&["a", "b", "c"]), 6.0).unwrap();
        let bounds: Vec<(f64, f64)> = segments.iter().map(|s| (s.start, s.end)).collect();
        assert_eq!(bounds, vec![(0.0, 2.0), (2.0, 4.0), (4.0, 6.0)]);
        assert!(segments.iter().all(|s| s.duration == 2.0));
    }

    #[test]
    fn test_uneven_split_is_rounded_and_contiguous() {
        let segments = recompute(&drafts(&["a", "b", "c"]), 10.0).unwrap();
        assert_eq!(segments[0].end, 3.333);
        assert_eq!(segments[1].start, 3.333);
        assert_eq!(segments[1].end, 6.667);
        assert_eq!(segments[2].end, 10.0);
        assert_eq!(segments[2].duration, 3.333);
    }

    #[test]
    fn test_hints_are_proportional() {
        let input = vec![
            SegmentDraft::new("a").with_hint(1.0),
            SegmentDraft::new("b").with_hint(3.0),
        ];
        let segments = recompute(&input, 8.0).unwrap();
        assert_eq!(segments[0].duration, 2.0);
        assert_eq!(segments[1].duration, 6.0);
    }

    #[test]
    fn test_missing_hint_uses_mean() {
        let input = vec![
            SegmentDraft::new("a").with_hint(1.0),
            SegmentDraft::new("b"),
            SegmentDraft::new("c").with_hint(3.0),
        ];
        let segments = recompute(&input, 6.0).unwrap();
        let durations: Vec<f64> = segments.iter().map(|s| s.duration).collect();
        assert_eq!(durations, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_even_split_policy_discards_hints() {
        let input = vec![
            SegmentDraft::new("a").with_hint(1.0),
            SegmentDraft::new("b").with_hint(5.0),
        ];
        let segments = recompute_with_policy(&input, 6.0, DurationPolicy::EvenSplit).unwrap();
        assert_eq!(segments[0].duration, 3.0);
        let segments =
            recompute_with_policy(&input, 6.0, DurationPolicy::PreserveAuthored).unwrap();
        assert_eq!(segments[0].duration, 1.0);
    }

    #[test]
    fn test_rejects_bad_input() {
        assert_eq!(recompute(&[], 5.0), Err(TimingError::EmptySegments));
        assert!(matches!(
            recompute(&drafts(&["a"]), 0.0),
            Err(TimingError::NonPositiveTotal { .. })
        ));
        assert!(matches!(
            recompute(&drafts(&["a"]), f64::INFINITY),
            Err(TimingError::NonPositiveTotal { .. })
        ));
        let input = vec![SegmentDraft::new("a").with_hint(-1.0)];
        assert!(matches!(
            recompute(&input, 5.0),
            Err(TimingError::InvalidHint { index: 0, .. })
        ));
    }

    #[test]
    fn test_collapsed_segment_rejected() {
        assert!(matches!(
            recompute(&drafts(&["a", "b", "c"]), 0.001),
            Err(TimingError::CollapsedSegment { .. })
        ));
    }

    #[test]
    fn test_malformed_roi_rejected() {
        let mut draft = SegmentDraft::new("a");
        draft.crop_data = Some(CropData {
            roi: Some(WireRoi {
                xmin: 0.0,
                ymin: 0.0,
                xmax: 1200.0,
                ymax: 500.0,
            }),
            ..Default::default()
        });
        assert_eq!(
            recompute(&[draft], 2.0),
            Err(TimingError::MalformedRoi { index: 0 })
        );
    }

    #[test]
    fn test_identity_travels_with_segment() {
        let mut first = SegmentDraft::new("a");
        first.effect = Effect::ZoomIn;
        first.ken_burns = Some(KenBurns {
            enabled: true,
            preset: MotionPreset::PanBottomTop,
        });
        first
            .extra
            .insert("image_url".to_string(), Value::from("/media/a"));
        let second = SegmentDraft::new("b");

        let segments = recompute(&[second, first], 4.0).unwrap();
        assert_eq!(segments[1].asset_reference, "a");
        assert_eq!(segments[1].effect, Effect::ZoomIn);
        assert_eq!(segments[1].motion(), Some(&MotionPreset::PanBottomTop));
        assert_eq!(segments[1].extra["image_url"], "/media/a");
        assert_eq!(segments[1].start, 2.0);
    }

    proptest! {
        #[test]
        fn prop_recompute_is_contiguous(
            hints in prop::collection::vec(prop::option::of(0.1f64..10.0), 1..40),
            total in 1.0f64..600.0,
        ) {
            let input: Vec<SegmentDraft> = hints
                .iter()
                .enumerate()
                .map(|(i, hint)| SegmentDraft {
                    duration_hint: *hint,
                    ..SegmentDraft::new(format!("img_{i}.jpg"))
                })
                .collect();

            if let Ok(segments) = recompute(&input, total) {
                prop_assert_eq!(segments.len(), input.len());
                prop_assert_eq!(segments[0].start, 0.0);
                for pair in segments.windows(2) {
                    prop_assert_eq!(pair[0].end, pair[1].start);
                    prop_assert!(pair[1].start > pair[0].start);
                }
                for s in &segments {
                    prop_assert!(s.duration > 0.0);
                    prop_assert!((s.end - s.start - s.duration).abs() < 1e-9);
                }
                let sum: f64 = segments.iter().map(|s| s.duration).sum();
                prop_assert!((sum - total).abs() < 1e-3 * segments.len() as f64);
                prop_assert!((segments[segments.len() - 1].end - total).abs() <= 5e-4);
            }
        }

        #[test]
        fn prop_even_split_never_collapses_for_reasonable_totals(
            count in 1usize..50,
            total in 1.0f64..600.0,
        ) {
            let input: Vec<SegmentDraft> =
                (0..count).map(|i| SegmentDraft::new(format!("{i}.png"))).collect();
            prop_assert!(recompute(&input, total).is_ok());
        }
    }
}
