//! Segment edits committed straight to the project's timeline.

use storyreel_common::DurationPolicy;
use storyreel_preview_engine::{EditorResult, SegmentEditor};
use storyreel_project_model::{Effect, MotionPreset};

use super::Workspace;

pub async fn reorder(
    workspace: &Workspace,
    project: String,
    from: usize,
    to: usize,
    policy: Option<DurationPolicy>,
) -> anyhow::Result<()> {
    let policy = policy.unwrap_or(workspace.config.preview.duration_policy);
    apply(workspace, &project, policy, |editor| editor.reorder(from, to)).await?;
    println!("Moved segment {from} to position {to} ({policy:?})");
    Ok(())
}

pub async fn effect(
    workspace: &Workspace,
    project: String,
    index: usize,
    effect: String,
) -> anyhow::Result<()> {
    let effect = Effect::from(effect);
    let policy = workspace.config.preview.duration_policy;
    apply(workspace, &project, policy, |editor| {
        editor.set_effect(index, effect.clone())
    })
    .await?;
    println!("Segment {index} effect set to {effect}");
    Ok(())
}

pub async fn ken_burns(
    workspace: &Workspace,
    project: String,
    index: usize,
    preset: Option<String>,
    enabled: Option<bool>,
) -> anyhow::Result<()> {
    if preset.is_none() && enabled.is_none() {
        anyhow::bail!("Nothing to change: pass --preset, --enable or --disable");
    }

    let preset = preset.map(MotionPreset::from);
    let policy = workspace.config.preview.duration_policy;
    apply(workspace, &project, policy, |editor| {
        if let Some(preset) = &preset {
            editor.set_ken_burns_preset(index, preset.clone())?;
        }
        if let Some(enabled) = enabled {
            editor.toggle_ken_burns(index, enabled)?;
        }
        Ok(())
    })
    .await?;
    println!("Segment {index} motion updated");
    Ok(())
}

/// Load the timeline, apply one edit and commit it.
async fn apply<F>(
    workspace: &Workspace,
    project: &str,
    policy: DurationPolicy,
    edit: F,
) -> anyhow::Result<()>
where
    F: FnOnce(&mut SegmentEditor) -> EditorResult<()>,
{
    let timeline = workspace.timeline(project).await?;
    let mut editor = SegmentEditor::new(timeline, policy);

    edit(&mut editor).map_err(|e| anyhow::anyhow!("Failed to edit timeline: {e}"))?;
    editor
        .commit(&workspace.store, project)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to save timeline: {e}"))?;

    println!("Timeline for '{project}':");
    for (index, segment) in editor.timeline().segments.iter().enumerate() {
        println!(
            "  [{index:>2}] {:>7.3}s → {:>7.3}s  {}",
            segment.start, segment.end, segment.asset_reference
        );
    }
    Ok(())
}
