use std::path::PathBuf;

use storyreel_common::FrameRate;
use storyreel_motion_core::{preflight, sample_motion, transform_at, PreflightStatus};
use storyreel_project_model::Timeline;

fn load_fixture_timeline() -> Timeline {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
        .join("fixtures")
        .join("sample-project")
        .join("timeline.json");

    let content = std::fs::read_to_string(path).expect("fixture timeline should be readable");
    Timeline::from_json(&content).expect("fixture timeline should parse")
}

#[test]
fn fixture_transforms_at_known_times() {
    let timeline = load_fixture_timeline();
    timeline.validate().expect("fixture should be well formed");

    // Leading silence holds the first frame at rest.
    let (index, rest) = transform_at(&timeline, 0.25).unwrap();
    assert_eq!(index, 0);
    assert!(rest.is_identity());

    // Halfway through the ROI-aimed zoom.
    let (index, mid) = transform_at(&timeline, 1.5).unwrap();
    assert_eq!(index, 0);
    assert!((mid.scale - 1.075).abs() < 1e-9);
    assert!((mid.translate_x - 1.125).abs() < 1e-9);
    assert!((mid.translate_y + 0.9375).abs() < 1e-9);

    let (index, pan_start) = transform_at(&timeline, 2.5).unwrap();
    assert_eq!(index, 1);
    assert_eq!(pan_start.scale, 1.3);
    assert!((pan_start.translate_x + 11.5).abs() < 1e-9);

    // Disabled Ken Burns, and the trailing silence holds the last segment.
    assert!(transform_at(&timeline, 6.0).unwrap().1.is_identity());
    assert_eq!(transform_at(&timeline, 6.8).unwrap().0, 2);
}

#[test]
fn fixture_motion_samples_cover_the_span() {
    let timeline = load_fixture_timeline();
    let samples = sample_motion(&timeline, FrameRate::new(30));

    assert_eq!(samples.len(), 211);
    assert_eq!(samples.first().unwrap().segment_index, 0);
    assert_eq!(samples.last().unwrap().segment_index, 2);

    let mut previous = 0;
    for sample in &samples {
        assert!(sample.segment_index >= previous, "segment order regressed");
        previous = sample.segment_index;
        let t = sample.transform;
        assert!(t.translate_x.abs() <= t.max_offset() + 1e-9 || t.scale == 1.3);
    }
}

#[test]
fn fixture_preflight() {
    let timeline = load_fixture_timeline();

    let clean = preflight(&timeline, FrameRate::new(30), true, |_| true);
    assert_eq!(clean.status, PreflightStatus::Pass);
    assert_eq!(clean.estimated_frames, 210);

    let missing = preflight(&timeline, FrameRate::new(30), true, |r| r != "sunset.webp");
    assert_eq!(missing.status, PreflightStatus::Fail);
    assert_eq!(missing.errors, vec!["Missing media files: sunset.webp"]);
}
