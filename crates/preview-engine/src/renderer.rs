//! Per-frame composition.
//!
//! [`compose_frame`] decides what a preview frame shows at a playback time:
//! the active segment, its asset (or a placeholder while the asset is
//! pending or failed), the transform, and the diagnostic overlay. It reads
//! the timeline and never mutates it.

use std::sync::Arc;

use storyreel_motion_core::{compute, local_progress, Transform};
use storyreel_project_model::{RoiBox, Timeline};

use crate::assets::{AssetCache, AssetHandle, DecodedAsset};

/// Label drawn while an asset is still loading.
pub const LOADING_LABEL: &str = "Loading Asset...";

/// A single frame's composition instructions.
#[derive(Debug, Clone)]
pub struct FrameComposition {
    /// Playback time in seconds.
    pub time_secs: f64,

    /// Active segment, `None` for an empty timeline.
    pub segment_index: Option<usize>,

    pub content: FrameContent,

    pub overlay: Option<Overlay>,
}

/// What fills the frame.
#[derive(Debug, Clone)]
pub enum FrameContent {
    /// Nothing to show (no segments).
    Blank,

    /// A loaded asset drawn through a transform.
    Asset {
        asset: Arc<DecodedAsset>,
        transform: Transform,
    },

    /// Solid fill with a label. `failed` separates load errors from loads
    /// still in flight.
    Placeholder { label: String, failed: bool },
}

/// Diagnostic overlay instructions.
#[derive(Debug, Clone, PartialEq)]
pub struct Overlay {
    /// Segment label (`index + 1 / count · reference · preset`).
    pub label: String,

    /// ROI of the active segment, in source-image coordinates.
    pub roi: Option<RoiBox>,

    pub elapsed_secs: f64,
    pub total_secs: f64,
}

impl Overlay {
    /// `mm:ss.cc / mm:ss.cc`
    pub fn timestamp(&self) -> String {
        format!(
            "{} / {}",
            format_clock(self.elapsed_secs),
            format_clock(self.total_secs)
        )
    }
}

impl FrameComposition {
    pub fn is_placeholder(&self) -> bool {
        matches!(self.content, FrameContent::Placeholder { .. })
    }

    pub fn transform(&self) -> Option<Transform> {
        match &self.content {
            FrameContent::Asset { transform, .. } => Some(*transform),
            _ => None,
        }
    }
}

/// Compose the frame shown at playback time `time_secs`.
///
/// Order within the call is fixed: segment lookup, asset resolution,
/// transform compute. A pending or failed asset yields a placeholder and no
/// transform.
pub fn compose_frame(
    timeline: &Timeline,
    time_secs: f64,
    assets: &mut AssetCache,
    show_overlay: bool,
) -> FrameComposition {
    let visual = timeline.visual_time(time_secs);
    let Some(index) = timeline.segment_index_at(visual) else {
        return FrameComposition {
            time_secs,
            segment_index: None,
            content: FrameContent::Blank,
            overlay: None,
        };
    };
    let segment = &timeline.segments[index];

    let content = match assets.resolve(&segment.asset_reference) {
        AssetHandle::Ready(asset) => FrameContent::Asset {
            asset,
            transform: compute(segment, local_progress(segment, visual)),
        },
        AssetHandle::Pending => FrameContent::Placeholder {
            label: LOADING_LABEL.to_string(),
            failed: false,
        },
        AssetHandle::Failed(e) => {
            tracing::trace!(error = %e, "Drawing placeholder for failed asset");
            FrameContent::Placeholder {
                label: format!("Unavailable: {}", segment.asset_reference),
                failed: true,
            }
        }
    };

    let overlay = show_overlay.then(|| Overlay {
        label: format!(
            "{}/{} {} [{}]",
            index + 1,
            timeline.segments.len(),
            segment.asset_reference,
            segment
                .motion()
                .map(|preset| preset.as_str())
                .unwrap_or("static")
        ),
        roi: segment.roi(),
        elapsed_secs: time_secs,
        total_secs: timeline.span(),
    });

    FrameComposition {
        time_secs,
        segment_index: Some(index),
        content,
        overlay,
    }
}

fn format_clock(secs: f64) -> String {
    let centis = (secs.max(0.0) * 100.0).round() as u64;
    format!(
        "{:02}:{:02}.{:02}",
        centis / 6000,
        (centis / 100) % 60,
        centis % 100
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::{AssetLoader, LoadError};
    use async_trait::async_trait;
    use image::RgbaImage;
    use std::time::Duration;
    use storyreel_project_model::{recompute, KenBurns, MediaKind, MotionPreset, SegmentDraft};

    struct InstantLoader;

    #[async_trait]
    impl AssetLoader for InstantLoader {
        async fn load(&self, reference: &str) -> Result<DecodedAsset, LoadError> {
            if reference == "broken.jpg" {
                return Err(LoadError::Corrupt {
                    reference: reference.to_string(),
                });
            }
            Ok(DecodedAsset {
                kind: MediaKind::Image,
                image: RgbaImage::new(8, 8),
            })
        }
    }

    fn timeline() -> Timeline {
        let drafts: Vec<SegmentDraft> = ["a.jpg", "broken.jpg"]
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
            segments: recompute(&drafts, 4.0).unwrap(),
            total_duration: 4.0,
            ..Default::default()
        }
    }

    async fn warm(cache: &mut AssetCache, timeline: &Timeline) {
        for segment in &timeline.segments {
            cache.resolve(&segment.asset_reference);
        }
        for _ in 0..20 {
            tokio::task::yield_now().await;
            cache.pump();
        }
    }

    #[tokio::test]
    async fn test_pending_asset_draws_loading_placeholder() {
        let mut cache = AssetCache::new(Arc::new(InstantLoader), Duration::from_secs(1));
        let frame = compose_frame(&timeline(), 1.0, &mut cache, false);
        assert_eq!(frame.segment_index, Some(0));
        assert!(matches!(
            frame.content,
            FrameContent::Placeholder { ref label, failed: false } if label == LOADING_LABEL
        ));
        assert!(frame.transform().is_none());
    }

    #[tokio::test]
    async fn test_ready_asset_gets_transform() {
        let tl = timeline();
        let mut cache = AssetCache::new(Arc::new(InstantLoader), Duration::from_secs(1));
        warm(&mut cache, &tl).await;

        let frame = compose_frame(&tl, 2.0, &mut cache, true);
        assert_eq!(frame.segment_index, Some(0));
        let transform = frame.transform().unwrap();
        assert!((transform.scale - 1.15).abs() < 1e-9);

        let overlay = frame.overlay.unwrap();
        assert_eq!(overlay.label, "1/2 a.jpg [zoom_in]");
        assert_eq!(overlay.timestamp(), "00:02.00 / 00:04.00");
    }

    #[tokio::test]
    async fn test_failed_asset_draws_failure_placeholder() {
        let tl = timeline();
        let mut cache = AssetCache::new(Arc::new(InstantLoader), Duration::from_secs(1));
        warm(&mut cache, &tl).await;

        let frame = compose_frame(&tl, 3.0, &mut cache, false);
        assert_eq!(frame.segment_index, Some(1));
        assert!(matches!(frame.content, FrameContent::Placeholder { failed: true, .. }));
    }

    #[tokio::test]
    async fn test_empty_timeline_is_blank() {
        let mut cache = AssetCache::new(Arc::new(InstantLoader), Duration::from_secs(1));
        let frame = compose_frame(&Timeline::default(), 0.0, &mut cache, true);
        assert!(matches!(frame.content, FrameContent::Blank));
        assert!(frame.overlay.is_none());
    }

    #[test]
    fn test_format_clock() {
        assert_eq!(format_clock(0.0), "00:00.00");
        assert_eq!(format_clock(75.456), "01:15.46");
        assert_eq!(format_clock(-3.0), "00:00.00");
    }
}
