//! Render preview frames for a StoryReel project.

use std::path::PathBuf;
use std::sync::Arc;

use storyreel_common::{FrameRate, ManualClock, MonotonicSource, SystemClock};
use storyreel_preview_engine::{AssetCache, FsAssetLoader, PreviewSession, RasterSurface};

use super::Workspace;

/// Command-line overrides for a preview render.
pub struct PreviewArgs {
    pub output: Option<PathBuf>,
    pub fps: Option<u32>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub every: u32,
    pub start: Option<f64>,
    pub end: Option<f64>,
    pub overlay: bool,
    pub realtime: bool,
}

pub async fn run(workspace: &Workspace, project: String, args: PreviewArgs) -> anyhow::Result<()> {
    let defaults = &workspace.config.preview;
    let timeline = workspace.timeline(&project).await?;
    if let Err(e) = timeline.validate() {
        anyhow::bail!("Timeline is not previewable: {e}");
    }

    let rate = FrameRate::new(args.fps.unwrap_or(defaults.fps));
    let width = args.width.unwrap_or(defaults.width);
    let height = args.height.unwrap_or(defaults.height);
    let span = timeline.span();
    let start = args.start.unwrap_or(0.0).clamp(0.0, span);
    let end = args.end.unwrap_or(span).clamp(start, span);
    let every = args.every.max(1) as u64;

    let output = args
        .output
        .unwrap_or_else(|| workspace.store.project_dir(&project).join("preview"));
    std::fs::create_dir_all(&output)
        .map_err(|e| anyhow::anyhow!("Failed to create {}: {e}", output.display()))?;

    println!("Previewing project: {project}");
    println!("  Segments: {}", timeline.segments.len());
    println!("  Range: {start:.3}s → {end:.3}s of {span:.3}s");
    println!("  Surface: {width}x{height} @ {}fps", rate.fps());

    let loader = Arc::new(FsAssetLoader::new(workspace.store.asset_root(&project)));
    let assets = AssetCache::new(loader, defaults.asset_timeout());
    let mut surface = RasterSurface::new(width, height);

    if args.realtime {
        let source: Arc<dyn MonotonicSource> = Arc::new(SystemClock::start());
        let mut session =
            PreviewSession::new(timeline, assets, source, rate).with_overlay(args.overlay);
        session.seek(start);
        session.play();
        let ticks = session
            .run(&mut surface)
            .await
            .map_err(|e| anyhow::anyhow!("Preview failed: {e}"))?;
        session.stop();

        let last = output.join("last_frame.png");
        surface
            .save_png(&last)
            .map_err(|e| anyhow::anyhow!("Failed to write {}: {e}", last.display()))?;
        println!("\nPlayed {ticks} ticks, last frame written to {}", last.display());
        return Ok(());
    }

    // Headless: a manual clock advances exactly one frame per tick.
    let clock = Arc::new(ManualClock::new());
    let source: Arc<dyn MonotonicSource> = clock.clone();
    let mut session =
        PreviewSession::new(timeline, assets, source, rate).with_overlay(args.overlay);

    let pending = session.wait_for_assets(defaults.asset_timeout()).await;
    if pending > 0 {
        tracing::warn!(pending, "Assets still loading; affected frames show placeholders");
    }

    session.seek(start);
    session.play();

    let frames = rate.frames_in(end - start);
    let mut written = 0u64;
    for frame in 0..=frames {
        if frame > 0 {
            clock.advance(rate.interval());
        }
        let composed = session
            .tick(&mut surface)
            .map_err(|e| anyhow::anyhow!("Preview failed at frame {frame}: {e}"))?;
        // Reaching the end rewinds and pauses; that frame is not part of the range.
        if composed.is_none() || (frame > 0 && !session.state().is_playing) {
            break;
        }

        if frame % every == 0 {
            let path = output.join(format!("frame_{frame:05}.png"));
            surface
                .save_png(&path)
                .map_err(|e| anyhow::anyhow!("Failed to write {}: {e}", path.display()))?;
            written += 1;
        }
    }

    tracing::debug!(cached = session.assets().len(), "Preview render finished");
    session.stop();

    println!("\nWrote {written} frame(s) to {}", output.display());
    Ok(())
}
