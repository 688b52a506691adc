//! Timeline: the ordered segment table consumed by the preview and the
//! server-side encoder.
//!
//! Segment `start`/`end` are measured in *visual time*, which begins at the
//! end of the leading silence. Playback time `t` maps to visual time
//! `t - silence_start_duration`. Unknown JSON fields are kept in `extra`
//! maps so a load/edit/save cycle never drops data this crate does not own.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::roi::{RoiBox, RoiError, WireRoi};
use crate::timing::{recompute, round_millis, SegmentDraft, TimingError, TIMING_TOLERANCE_SECS};

/// Root timeline value (`timeline.json`).
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Timeline {
    /// Ordered, contiguous visual segments.
    #[serde(default)]
    pub segments: Vec<Segment>,

    /// Visual span covered by the segments (seconds).
    #[serde(default)]
    pub total_duration: f64,

    /// Length of the narration track including silence padding.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_audio_duration: Option<f64>,

    /// Leading non-visual padding (seconds).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub silence_start_duration: Option<f64>,

    /// Trailing non-visual padding (seconds).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub silence_end_duration: Option<f64>,

    /// Narration and background music tracks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio: Option<AudioTracks>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One visual clip occupying a contiguous span of the timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    /// Key of the image or clip (file name relative to the project input).
    #[serde(rename = "image")]
    pub asset_reference: String,

    pub start: f64,
    pub end: f64,
    pub duration: f64,

    /// Encoder-side effect tag.
    #[serde(default)]
    pub effect: Effect,

    /// Preview pan/zoom motion.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ken_burns: Option<KenBurns>,

    /// Detector output for the subject of the image.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crop_data: Option<CropData>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Encoder effect tag. Unknown tags are carried through untouched.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Effect {
    ZoomIn,
    ZoomOut,
    PanLeft,
    PanRight,
    #[default]
    None,
    Other(String),
}

/// Ken Burns preset tag. Unknown tags are carried through and produce no
/// motion.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum MotionPreset {
    #[default]
    Subtle,
    ZoomIn,
    ZoomOut,
    PanLeftRight,
    PanBottomTop,
    Other(String),
}

/// Per-segment motion descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KenBurns {
    pub enabled: bool,
    #[serde(default)]
    pub preset: MotionPreset,
}

/// Subject detection result attached to a segment.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CropData {
    /// Region of interest on the 0..1000 wire scale.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub roi: Option<WireRoi>,

    /// Detected subject kind (for example `face`).
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Audio block of the timeline.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AudioTracks {
    /// Narration track; its presence makes the audio the playback clock.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice: Option<AudioTrack>,

    /// Background music.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bgm: Option<AudioTrack>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A single audio file reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioTrack {
    pub file: String,

    #[serde(default = "default_volume")]
    pub volume: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ducking: Option<bool>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn default_volume() -> f64 {
    1.0
}

/// Kind of media behind an asset reference, judged by extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    pub const IMAGE_EXTENSIONS: [&'static str; 4] = ["jpg", "jpeg", "png", "webp"];
    pub const VIDEO_EXTENSIONS: [&'static str; 3] = ["mp4", "webm", "mov"];

    /// Classify a reference. `None` for extensions the preview cannot show.
    pub fn from_reference(reference: &str) -> Option<Self> {
        let ext = reference.rsplit_once('.')?.1.to_ascii_lowercase();
        if Self::IMAGE_EXTENSIONS.contains(&ext.as_str()) {
            Some(Self::Image)
        } else if Self::VIDEO_EXTENSIONS.contains(&ext.as_str()) {
            Some(Self::Video)
        } else {
            None
        }
    }
}

impl Timeline {
    /// Parse a timeline and bring legacy layouts in line with the model.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let mut timeline: Timeline = serde_json::from_str(json)?;
        timeline.normalize_legacy_layout();
        Ok(timeline)
    }

    /// Older generators laid segments out after the leading silence and
    /// omitted `total_duration`. Rebase segments to start at zero and derive
    /// the visual span from them.
    ///
    /// The visuals keep their playback position: a positive offset becomes
    /// the leading silence, replacing a missing or disagreeing value.
    pub fn normalize_legacy_layout(&mut self) {
        let (Some(first), Some(last)) = (self.segments.first(), self.segments.last()) else {
            return;
        };
        let offset = first.start;
        let span = round_millis(last.end - first.start);

        if offset.abs() > TIMING_TOLERANCE_SECS {
            tracing::debug!(offset, "Rebasing legacy segment layout to zero");
            for segment in &mut self.segments {
                segment.start = round_millis(segment.start - offset);
                segment.end = round_millis(segment.end - offset);
            }

            if offset > 0.0 {
                let offset = round_millis(offset);
                match self.silence_start_duration {
                    Some(recorded) if (recorded - offset).abs() <= TIMING_TOLERANCE_SECS => {}
                    recorded => {
                        if let Some(recorded) = recorded {
                            tracing::warn!(
                                recorded,
                                offset,
                                "Leading silence disagrees with segment layout, using layout"
                            );
                        }
                        self.silence_start_duration = Some(offset);
                    }
                }
            }
        }
        if self.total_duration <= 0.0 {
            self.total_duration = span;
        }
    }

    /// Leading silence, never negative.
    pub fn silence_start(&self) -> f64 {
        self.silence_start_duration.unwrap_or(0.0).max(0.0)
    }

    /// Trailing silence, never negative.
    pub fn silence_end(&self) -> f64 {
        self.silence_end_duration.unwrap_or(0.0).max(0.0)
    }

    /// Full playback span: silence padding plus the visual span, or the
    /// narration length if that is longer.
    pub fn span(&self) -> f64 {
        let padded = self.silence_start() + self.total_duration.max(0.0) + self.silence_end();
        match self.total_audio_duration {
            Some(audio) if audio.is_finite() => padded.max(audio),
            _ => padded,
        }
    }

    /// Map a playback time to visual (segment) time.
    pub fn visual_time(&self, playback_secs: f64) -> f64 {
        playback_secs - self.silence_start()
    }

    /// Narration file that drives the playback clock, if any.
    pub fn audio_reference(&self) -> Option<&str> {
        self.audio
            .as_ref()
            .and_then(|a| a.voice.as_ref())
            .map(|v| v.file.as_str())
    }

    /// Index of the segment spanning `visual_secs`.
    ///
    /// Times before the first segment map to the first, times at or past
    /// the end map to the last; a time that falls in no segment (a gap in a
    /// malformed table) falls back to the first. `None` only when empty.
    pub fn segment_index_at(&self, visual_secs: f64) -> Option<usize> {
        let last = self.segments.len().checked_sub(1)?;
        if visual_secs.is_nan() || visual_secs < self.segments[0].start {
            return Some(0);
        }
        if visual_secs >= self.segments[last].end {
            return Some(last);
        }
        let idx = self.segments.partition_point(|s| s.end <= visual_secs);
        if idx <= last && self.segments[idx].contains(visual_secs) {
            Some(idx)
        } else {
            Some(0)
        }
    }

    /// Identity-carrying drafts of the current segments, with each
    /// segment's duration as its hint.
    pub fn drafts(&self) -> Vec<SegmentDraft> {
        self.segments.iter().map(SegmentDraft::from).collect()
    }

    /// A copy of this timeline with its segment table recomputed from
    /// `drafts` against the current `total_duration`.
    pub fn with_segments(&self, drafts: &[SegmentDraft]) -> Result<Timeline, TimingError> {
        let segments = recompute(drafts, self.total_duration)?;
        Ok(Timeline {
            segments,
            total_duration: round_millis(self.total_duration),
            ..self.clone()
        })
    }

    /// Replace the segment list with `drafts` laid out across the current
    /// `total_duration`. On error the timeline is left untouched.
    pub fn retime(&mut self, drafts: &[SegmentDraft]) -> Result<(), TimingError> {
        self.segments = recompute(drafts, self.total_duration)?;
        Ok(())
    }

    /// Check the timing-table invariants and every ROI.
    pub fn validate(&self) -> Result<(), TimingError> {
        if self.segments.is_empty() {
            return Err(TimingError::EmptySegments);
        }
        if !(self.total_duration.is_finite() && self.total_duration > 0.0) {
            return Err(TimingError::NonPositiveTotal {
                total: self.total_duration,
            });
        }

        let mut cursor = self.segments[0].start;
        for (index, segment) in self.segments.iter().enumerate() {
            if (segment.start - cursor).abs() > TIMING_TOLERANCE_SECS {
                return Err(TimingError::Discontinuous {
                    index,
                    expected: cursor,
                    found: segment.start,
                });
            }
            if segment.duration <= 0.0
                || (segment.end - segment.start - segment.duration).abs() > TIMING_TOLERANCE_SECS
            {
                return Err(TimingError::CollapsedSegment { index });
            }
            if let Some(Err(_)) = segment.crop_data.as_ref().and_then(CropData::normalized_roi) {
                return Err(TimingError::MalformedRoi { index });
            }
            cursor = segment.end;
        }
        Ok(())
    }
}

impl Segment {
    /// Whether `visual_secs` falls in `[start, end)`.
    pub fn contains(&self, visual_secs: f64) -> bool {
        visual_secs >= self.start && visual_secs < self.end
    }

    /// Active motion preset; `None` when Ken Burns is absent or disabled.
    pub fn motion(&self) -> Option<&MotionPreset> {
        self.ken_burns
            .as_ref()
            .filter(|kb| kb.enabled)
            .map(|kb| &kb.preset)
    }

    /// Normalized ROI, when present and well-formed.
    pub fn roi(&self) -> Option<RoiBox> {
        self.crop_data
            .as_ref()
            .and_then(CropData::normalized_roi)
            .and_then(Result::ok)
    }

    pub fn media_kind(&self) -> Option<MediaKind> {
        MediaKind::from_reference(&self.asset_reference)
    }
}

impl CropData {
    /// Normalize the wire ROI. `None` when the detector found nothing.
    pub fn normalized_roi(&self) -> Option<Result<RoiBox, RoiError>> {
        self.roi.as_ref().map(RoiBox::from_wire)
    }
}

impl Effect {
    /// Effects assigned round-robin to freshly generated segments.
    pub fn generation_cycle() -> [Effect; 5] {
        [
            Effect::ZoomIn,
            Effect::ZoomOut,
            Effect::PanLeft,
            Effect::PanRight,
            Effect::None,
        ]
    }

    pub fn as_str(&self) -> &str {
        match self {
            Effect::ZoomIn => "zoom_in",
            Effect::ZoomOut => "zoom_out",
            Effect::PanLeft => "pan_left",
            Effect::PanRight => "pan_right",
            Effect::None => "none",
            Effect::Other(tag) => tag,
        }
    }
}

impl From<String> for Effect {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "zoom_in" => Effect::ZoomIn,
            "zoom_out" => Effect::ZoomOut,
            "pan_left" => Effect::PanLeft,
            "pan_right" => Effect::PanRight,
            "none" | "" => Effect::None,
            _ => Effect::Other(tag),
        }
    }
}

impl From<Effect> for String {
    fn from(effect: Effect) -> Self {
        match effect {
            Effect::Other(tag) => tag,
            known => known.as_str().to_string(),
        }
    }
}

impl FromStr for Effect {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Effect::from(s.to_string()))
    }
}

impl fmt::Display for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl MotionPreset {
    pub fn as_str(&self) -> &str {
        match self {
            MotionPreset::Subtle => "subtle",
            MotionPreset::ZoomIn => "zoom_in",
            MotionPreset::ZoomOut => "zoom_out",
            MotionPreset::PanLeftRight => "pan_left_right",
            MotionPreset::PanBottomTop => "pan_bottom_top",
            MotionPreset::Other(tag) => tag,
        }
    }

    /// Zoom-style presets, which aim at the ROI when one is known.
    pub fn is_roi_aware(&self) -> bool {
        matches!(
            self,
            MotionPreset::Subtle | MotionPreset::ZoomIn | MotionPreset::ZoomOut
        )
    }
}

impl From<String> for MotionPreset {
    fn from(tag: String) -> Self {
        match tag.as_str() {
            "subtle" | "" => MotionPreset::Subtle,
            "zoom_in" => MotionPreset::ZoomIn,
            "zoom_out" => MotionPreset::ZoomOut,
            "pan_left_right" => MotionPreset::PanLeftRight,
            "pan_bottom_top" => MotionPreset::PanBottomTop,
            _ => MotionPreset::Other(tag),
        }
    }
}

impl From<MotionPreset> for String {
    fn from(preset: MotionPreset) -> Self {
        match preset {
            MotionPreset::Other(tag) => tag,
            known => known.as_str().to_string(),
        }
    }
}

impl FromStr for MotionPreset {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(MotionPreset::from(s.to_string()))
    }
}

impl fmt::Display for MotionPreset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
