//! Show project information.

use storyreel_project_model::{ApiError, TimelineApi};

use super::Workspace;

pub async fn run(workspace: &Workspace, project: String) -> anyhow::Result<()> {
    let p = workspace
        .store
        .load_project(&project)
        .map_err(|e| anyhow::anyhow!("Failed to load project: {e}"))?;

    println!("Project: {}", p.name);
    println!("  ID: {}", p.id);
    println!("  Created: {}", p.created_at);
    println!("  Modified: {}", p.modified_at);
    println!();

    let media = workspace
        .store
        .list_media(&project)
        .map_err(|e| anyhow::anyhow!("Failed to list media: {e}"))?;
    let voice = workspace.store.voice_path(&project);
    println!("Inputs:");
    println!("  Media files: {}", media.len());
    println!(
        "  Narration: {}",
        if voice.exists() { "present" } else { "missing" }
    );
    println!("  Crop entries: {}", workspace.store.load_crops(&project).len());
    println!();

    let timeline = match workspace.store.fetch_timeline(&project).await {
        Ok(timeline) => timeline,
        Err(ApiError::NotFound { .. }) => {
            println!("Timeline: not generated");
            return Ok(());
        }
        Err(e) => return Err(anyhow::anyhow!("Failed to load timeline: {e}")),
    };

    println!("Timeline:");
    println!("  Segments: {}", timeline.segments.len());
    println!("  Visual span: {:.3}s", timeline.total_duration);
    println!(
        "  Silence: {:.2}s lead, {:.2}s tail",
        timeline.silence_start(),
        timeline.silence_end()
    );
    println!("  Playback span: {:.3}s", timeline.span());
    if let Some(audio) = timeline.audio_reference() {
        println!("  Narration track: {audio}");
    }
    println!();

    for (index, segment) in timeline.segments.iter().enumerate() {
        let motion = segment
            .motion()
            .map(|preset| preset.to_string())
            .unwrap_or_else(|| "static".to_string());
        println!(
            "  [{index:>2}] {:>7.3}s → {:>7.3}s  {:<24} effect={:<10} motion={}{}",
            segment.start,
            segment.end,
            segment.asset_reference,
            segment.effect,
            motion,
            if segment.roi().is_some() { " roi" } else { "" }
        );
    }

    if let Err(e) = timeline.validate() {
        println!();
        println!("Warning: timeline is not well formed: {e}");
    }

    Ok(())
}
