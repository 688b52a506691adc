//! Generate a timeline from the project's media and narration.

use storyreel_project_model::{Dependency, TimelineApi};

use super::Workspace;

pub async fn run(workspace: &Workspace, project: String) -> anyhow::Result<()> {
    println!("Generating timeline for project: {project}");

    let timeline = match workspace.store.generate_timeline(&project).await {
        Ok(timeline) => timeline,
        Err(e) => {
            return Err(match e.missing_dependency() {
                Some(Dependency::Images) => anyhow::anyhow!(
                    "No media found in {}. Add images before generating.",
                    workspace.store.asset_root(&project).display()
                ),
                Some(Dependency::Audio) => anyhow::anyhow!(
                    "No narration at {}. Produce the voice track before generating.",
                    workspace.store.voice_path(&project).display()
                ),
                None => anyhow::anyhow!("Failed to generate timeline: {e}"),
            });
        }
    };

    println!("  Segments: {}", timeline.segments.len());
    println!("  Visual span: {:.3}s", timeline.total_duration);
    println!("  Playback span: {:.3}s", timeline.span());
    if let Some(first) = timeline.segments.first() {
        println!("  Per segment: {:.3}s", first.duration);
    }
    println!(
        "\nTimeline written to {}",
        workspace.store.timeline_path(&project).display()
    );

    Ok(())
}
