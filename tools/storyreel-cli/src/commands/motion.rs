//! Print sampled Ken Burns transforms.

use storyreel_common::FrameRate;
use storyreel_motion_core::sample_motion;

use super::Workspace;

pub async fn run(
    workspace: &Workspace,
    project: String,
    fps: Option<u32>,
    json: bool,
) -> anyhow::Result<()> {
    let timeline = workspace.timeline(&project).await?;
    let rate = FrameRate::new(fps.unwrap_or(workspace.config.preview.fps));
    let frames = sample_motion(&timeline, rate);

    if json {
        let samples: Vec<serde_json::Value> = frames
            .iter()
            .map(|frame| {
                serde_json::json!({
                    "time": frame.time_secs,
                    "segment": frame.segment_index,
                    "scale": frame.transform.scale,
                    "translate_x": frame.transform.translate_x,
                    "translate_y": frame.transform.translate_y,
                    "css": frame.css_transform(),
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&samples)?);
        return Ok(());
    }

    println!(
        "Motion for '{project}': {} frames @ {}fps",
        frames.len(),
        rate.fps()
    );
    for frame in &frames {
        println!(
            "  {:>8.3}s  #{:<3} {}",
            frame.time_secs,
            frame.segment_index,
            frame.css_transform()
        );
    }
    Ok(())
}
