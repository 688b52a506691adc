//! Render dry run for a StoryReel project.

use storyreel_common::FrameRate;
use storyreel_motion_core::{preflight, PreflightReport, PreflightStatus};
use storyreel_project_model::{ApiError, TimelineApi};

use super::Workspace;

const REPORT_FILE: &str = "dry_run_report.json";

pub async fn run(workspace: &Workspace, project: String, fps: Option<u32>) -> anyhow::Result<()> {
    let store = &workspace.store;
    store
        .load_project(&project)
        .map_err(|e| anyhow::anyhow!("Failed to load project: {e}"))?;

    let project_dir = store.project_dir(&project);
    println!("Validating project at: {}", project_dir.display());

    let rate = FrameRate::new(fps.unwrap_or(workspace.config.preview.fps));
    let report = match store.fetch_timeline(&project).await {
        Ok(timeline) => {
            let audio = timeline
                .audio_reference()
                .map(|file| project_dir.join(file))
                .unwrap_or_else(|| store.voice_path(&project));
            let asset_root = store.asset_root(&project);
            preflight(&timeline, rate, audio.is_file(), |reference| {
                asset_root.join(reference).is_file()
            })
        }
        Err(ApiError::NotFound { .. }) => PreflightReport::missing_timeline(rate),
        Err(e) => return Err(anyhow::anyhow!("Failed to load timeline: {e}")),
    };

    let report_path = project_dir.join(REPORT_FILE);
    std::fs::write(&report_path, serde_json::to_string_pretty(&report)?)
        .map_err(|e| anyhow::anyhow!("Failed to write {}: {e}", report_path.display()))?;

    println!("  Status: {:?}", report.status);
    println!(
        "  Estimated frames: {} ({:.3}s @ {}fps)",
        report.estimated_frames, report.span_secs, report.fps
    );
    if !report.errors.is_empty() {
        println!("\nErrors:");
        for error in &report.errors {
            println!("  - {error}");
        }
    }
    if !report.warnings.is_empty() {
        println!("\nWarnings:");
        for warning in &report.warnings {
            println!("  - {warning}");
        }
    }
    println!("\nReport written to {}", report_path.display());

    if report.status == PreflightStatus::Fail {
        anyhow::bail!("Pre-flight failed with {} error(s)", report.errors.len());
    }
    Ok(())
}
