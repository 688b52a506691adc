pub mod edit;
pub mod generate;
pub mod info;
pub mod init;
pub mod motion;
pub mod preview;
pub mod validate;

use std::path::PathBuf;

use storyreel_common::AppConfig;
use storyreel_project_model::{ApiError, FsProjectStore, Timeline, TimelineApi};

/// Configuration plus the project store every command works against.
pub struct Workspace {
    pub config: AppConfig,
    pub store: FsProjectStore,
}

impl Workspace {
    pub fn new(config: AppConfig, projects_dir: Option<PathBuf>) -> Self {
        let root = projects_dir.unwrap_or_else(|| config.projects_dir.clone());
        let store = FsProjectStore::new(root).with_generation(config.generation.clone());
        Self { config, store }
    }

    /// The persisted timeline, with a hint when none has been generated.
    pub async fn timeline(&self, project: &str) -> anyhow::Result<Timeline> {
        match self.store.fetch_timeline(project).await {
            Ok(timeline) => Ok(timeline),
            Err(ApiError::NotFound { .. }) => Err(anyhow::anyhow!(
                "Project '{project}' has no timeline yet. Run `storyreel generate {project}` first."
            )),
            Err(e) => Err(anyhow::anyhow!("Failed to load timeline: {e}")),
        }
    }
}
