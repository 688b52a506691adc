//! Render dry-run checks.
//!
//! Flags problems that would break the server-side encode before any
//! frames are rendered, and estimates the frame count. The report is
//! advisory; nothing here mutates the timeline.

use serde::{Deserialize, Serialize};
use storyreel_common::FrameRate;
use storyreel_project_model::Timeline;

/// Start drift between consecutive segments tolerated before warning.
pub const GAP_TOLERANCE_SECS: f64 = 0.05;

/// Slack between the last segment end and the visual span.
pub const END_TOLERANCE_SECS: f64 = 0.1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PreflightStatus {
    Pass,
    Warning,
    Fail,
}

/// Outcome of a dry run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreflightReport {
    pub status: PreflightStatus,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub estimated_frames: u64,
    pub fps: u32,
    /// Playback span including silence padding (seconds).
    pub span_secs: f64,
}

impl PreflightReport {
    fn new(rate: FrameRate) -> Self {
        Self {
            status: PreflightStatus::Pass,
            errors: Vec::new(),
            warnings: Vec::new(),
            estimated_frames: 0,
            fps: rate.fps(),
            span_secs: 0.0,
        }
    }

    /// Report for a project that has no timeline yet.
    pub fn missing_timeline(rate: FrameRate) -> Self {
        let mut report = Self::new(rate);
        report.fail("Missing timeline data: timeline.json");
        report
    }

    pub fn is_blocking(&self) -> bool {
        self.status == PreflightStatus::Fail
    }

    fn fail(&mut self, message: impl Into<String>) {
        self.status = PreflightStatus::Fail;
        self.errors.push(message.into());
    }

    fn warn(&mut self, message: impl Into<String>) {
        if self.status == PreflightStatus::Pass {
            self.status = PreflightStatus::Warning;
        }
        self.warnings.push(message.into());
    }
}

/// Dry-run `timeline`.
///
/// `audio_present` reports whether the narration file exists;
/// `asset_exists` is asked once per segment reference.
pub fn preflight<F>(
    timeline: &Timeline,
    rate: FrameRate,
    audio_present: bool,
    asset_exists: F,
) -> PreflightReport
where
    F: Fn(&str) -> bool,
{
    let mut report = PreflightReport::new(rate);

    if !audio_present {
        report.fail("Missing narration audio");
    }

    let span = timeline.span();
    if !(span.is_finite() && span > 0.0) {
        report.fail("Invalid total duration in timeline");
    }
    if timeline.segments.is_empty() {
        report.fail("Timeline has no segments");
    }

    let mut cursor = 0.0;
    let mut missing = Vec::new();
    for (index, segment) in timeline.segments.iter().enumerate() {
        if (segment.start - cursor).abs() > GAP_TOLERANCE_SECS {
            report.warn(format!(
                "Gap/overlap at segment {index}: expected {cursor:.3}s, got {:.3}s",
                segment.start
            ));
        }
        if segment.duration <= 0.0 {
            report.fail(format!("Segment {index} has non-positive duration"));
        }
        if let Some(Err(e)) = segment.crop_data.as_ref().and_then(|c| c.normalized_roi()) {
            report.fail(format!("Segment {index}: {e}"));
        }
        if !asset_exists(&segment.asset_reference) {
            missing.push(segment.asset_reference.as_str());
        }
        cursor = segment.end;
    }
    if !missing.is_empty() {
        report.fail(format!("Missing media files: {}", missing.join(", ")));
    }

    let end_drift = (cursor - timeline.total_duration).abs();
    if !timeline.segments.is_empty() && end_drift > END_TOLERANCE_SECS {
        report.warn(format!(
            "Timeline end mismatch: segments end at {cursor:.3}s, expected {:.3}s",
            timeline.total_duration
        ));
    }

    if let Some(audio) = timeline.total_audio_duration {
        let padded = timeline.silence_start() + timeline.total_duration + timeline.silence_end();
        if (audio - padded).abs() > END_TOLERANCE_SECS {
            report.warn(format!(
                "Narration is {audio:.3}s but silence plus visuals cover {padded:.3}s"
            ));
        }
    }

    report.span_secs = span;
    report.estimated_frames = rate.frames_in(span);

    tracing::info!(
        status = ?report.status,
        errors = report.errors.len(),
        warnings = report.warnings.len(),
        estimated_frames = report.estimated_frames,
        "Pre-flight complete"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use storyreel_project_model::{recompute, SegmentDraft};

    fn timeline() -> Timeline {
        let drafts: Vec<SegmentDraft> =
            ["a.jpg", "b.jpg"].iter().map(|n| SegmentDraft::new(*n)).collect();
        Timeline {
            segments: recompute(&drafts, 4.0).unwrap(),
            total_duration: 4.0,
            total_audio_duration: Some(7.0),
            silence_start_duration: Some(1.5),
            silence_end_duration: Some(1.5),
            ..Default::default()
        }
    }

    #[test]
    fn test_clean_timeline_passes() {
        let report = preflight(&timeline(), FrameRate::new(30), true, |_| true);
        assert_eq!(report.status, PreflightStatus::Pass);
        assert_eq!(report.estimated_frames, 210);
        assert!(report.errors.is_empty());
    }

    #[test]
    fn test_missing_assets_fail() {
        let report = preflight(&timeline(), FrameRate::new(30), true, |r| r != "b.jpg");
        assert!(report.is_blocking());
        assert_eq!(report.errors, vec!["Missing media files: b.jpg".to_string()]);
    }

    #[test]
    fn test_missing_audio_fails() {
        let report = preflight(&timeline(), FrameRate::new(30), false, |_| true);
        assert!(report.is_blocking());
    }

    #[test]
    fn test_gap_warns() {
        let mut tl = timeline();
        tl.segments[1].start += 0.2;
        let report = preflight(&tl, FrameRate::new(30), true, |_| true);
        assert_eq!(report.status, PreflightStatus::Warning);
        assert!(report.warnings[0].contains("segment 1"));
    }

    #[test]
    fn test_audio_mismatch_warns() {
        let mut tl = timeline();
        tl.total_audio_duration = Some(9.0);
        let report = preflight(&tl, FrameRate::new(24), true, |_| true);
        assert_eq!(report.status, PreflightStatus::Warning);
        assert_eq!(report.estimated_frames, 216);
    }

    #[test]
    fn test_malformed_roi_fails() {
        let mut tl = timeline();
        tl.segments[0].crop_data = Some(storyreel_project_model::CropData {
            roi: Some(storyreel_project_model::WireRoi {
                xmin: 600.0,
                ymin: 0.0,
                xmax: 200.0,
                ymax: 900.0,
            }),
            ..Default::default()
        });
        let report = preflight(&tl, FrameRate::new(30), true, |_| true);
        assert!(report.is_blocking());
        assert!(report.errors[0].starts_with("Segment 0: malformed ROI"));
    }

    #[test]
    fn test_missing_timeline_report() {
        let report = PreflightReport::missing_timeline(FrameRate::new(30));
        assert!(report.is_blocking());
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["status"], "FAIL");
    }
}
