//! Project metadata and the filesystem project store.
//!
//! A project directory looks like:
//!
//! ```text
//! <projects_dir>/<id>/
//!     project.json      metadata
//!     input/            images, clips, crops.json
//!     audio/voice.mp3   narration
//!     timeline.json     generated or edited timeline
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use storyreel_common::{GenerationDefaults, StoryreelError};

use crate::api::{ApiError, Dependency, TimelineApi};
use crate::timeline::{AudioTrack, AudioTracks, CropData, Effect, KenBurns, MediaKind, Timeline};
use crate::timing::{recompute, round_millis, SegmentDraft};

const PROJECT_FILE: &str = "project.json";
const TIMELINE_FILE: &str = "timeline.json";
const CROPS_FILE: &str = "crops.json";
const INPUT_DIR: &str = "input";
const VOICE_FILE: &str = "audio/voice.mp3";
const BGM_FILE: &str = "bgm.mp3";
const BGM_VOLUME: f64 = 0.15;

/// Project metadata (`project.json`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    /// Schema version.
    pub version: String,

    /// Directory name and identifier.
    pub id: String,

    /// Human-readable project name.
    pub name: String,

    /// Creation timestamp (RFC 3339).
    pub created_at: String,

    /// Last modified timestamp (RFC 3339).
    pub modified_at: String,
}

impl Project {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        let now = chrono::Utc::now().to_rfc3339();
        Self {
            version: "1.0".to_string(),
            id: id.into(),
            name: name.into(),
            created_at: now.clone(),
            modified_at: now,
        }
    }
}

/// Errors that can occur when working with projects.
#[derive(Debug, thiserror::Error)]
pub enum ProjectError {
    #[error("I/O error at {path}: {source}")]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Parse error in {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Invalid project: {message}")]
    ValidationError { message: String },
}

impl From<ProjectError> for StoryreelError {
    fn from(err: ProjectError) -> Self {
        match err {
            ProjectError::IoError { path, source }
                if source.kind() == std::io::ErrorKind::NotFound =>
            {
                StoryreelError::FileNotFound { path }
            }
            other => StoryreelError::project(other.to_string()),
        }
    }
}

/// Measures the length of the narration track.
pub trait AudioProbe: Send + Sync {
    fn duration_secs(&self, path: &Path) -> Result<f64, ProjectError>;
}

/// Probe backed by the `ffprobe` binary.
#[derive(Debug, Clone, Copy, Default)]
pub struct FfprobeAudioProbe;

impl AudioProbe for FfprobeAudioProbe {
    fn duration_secs(&self, path: &Path) -> Result<f64, ProjectError> {
        let output = Command::new("ffprobe")
            .args([
                "-v",
                "error",
                "-show_entries",
                "format=duration",
                "-of",
                "default=noprint_wrappers=1:nokey=1",
            ])
            .arg(path)
            .output()
            .map_err(|e| ProjectError::IoError {
                path: path.to_path_buf(),
                source: e,
            })?;

        if !output.status.success() {
            return Err(ProjectError::ValidationError {
                message: format!(
                    "ffprobe failed on {}: {}",
                    path.display(),
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            });
        }

        let text = String::from_utf8_lossy(&output.stdout);
        text.trim()
            .parse::<f64>()
            .map_err(|_| ProjectError::ValidationError {
                message: format!("unreadable duration {:?} for {}", text.trim(), path.display()),
            })
    }
}

/// Probe that reports a fixed length. Used for headless runs and tests.
#[derive(Debug, Clone, Copy)]
pub struct FixedDurationProbe(pub f64);

impl AudioProbe for FixedDurationProbe {
    fn duration_secs(&self, _path: &Path) -> Result<f64, ProjectError> {
        Ok(self.0)
    }
}

/// Filesystem-backed [`TimelineApi`].
#[derive(Clone)]
pub struct FsProjectStore {
    root: PathBuf,
    generation: GenerationDefaults,
    probe: Arc<dyn AudioProbe>,
}

impl std::fmt::Debug for FsProjectStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FsProjectStore")
            .field("root", &self.root)
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}

impl FsProjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            generation: GenerationDefaults::default(),
            probe: Arc::new(FfprobeAudioProbe),
        }
    }

    pub fn with_generation(mut self, generation: GenerationDefaults) -> Self {
        self.generation = generation;
        self
    }

    pub fn with_probe(mut self, probe: Arc<dyn AudioProbe>) -> Self {
        self.probe = probe;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn project_dir(&self, project_id: &str) -> PathBuf {
        self.root.join(project_id)
    }

    /// Directory asset references resolve against.
    pub fn asset_root(&self, project_id: &str) -> PathBuf {
        self.project_dir(project_id).join(INPUT_DIR)
    }

    pub fn timeline_path(&self, project_id: &str) -> PathBuf {
        self.project_dir(project_id).join(TIMELINE_FILE)
    }

    pub fn voice_path(&self, project_id: &str) -> PathBuf {
        self.project_dir(project_id).join(VOICE_FILE)
    }

    /// Create a new project with the standard directory structure.
    pub fn create(&self, project_id: &str, name: &str) -> Result<Project, ProjectError> {
        if project_id.is_empty() || project_id.contains(['/', '\\']) || project_id == ".." {
            return Err(ProjectError::ValidationError {
                message: format!("invalid project id {project_id:?}"),
            });
        }
        let dir = self.project_dir(project_id);
        if dir.join(PROJECT_FILE).exists() {
            return Err(ProjectError::ValidationError {
                message: format!("project {project_id} already exists"),
            });
        }

        for subdir in [INPUT_DIR, "audio"] {
            let path = dir.join(subdir);
            std::fs::create_dir_all(&path).map_err(|e| ProjectError::IoError { path, source: e })?;
        }

        let project = Project::new(project_id, name);
        write_json_atomic(&dir.join(PROJECT_FILE), &project)?;
        tracing::info!(project_id, path = %dir.display(), "Created project");
        Ok(project)
    }

    pub fn load_project(&self, project_id: &str) -> Result<Project, ProjectError> {
        read_json(&self.project_dir(project_id).join(PROJECT_FILE))
    }

    /// Read the persisted timeline, normalizing legacy layouts.
    pub fn load_timeline(&self, project_id: &str) -> Result<Timeline, ProjectError> {
        let mut timeline: Timeline = read_json(&self.timeline_path(project_id))?;
        timeline.normalize_legacy_layout();
        Ok(timeline)
    }

    /// Write the timeline through a temp file so readers never see a
    /// partial document.
    pub fn save_timeline(&self, project_id: &str, timeline: &Timeline) -> Result<(), ProjectError> {
        write_json_atomic(&self.timeline_path(project_id), timeline)?;
        self.touch(project_id);
        Ok(())
    }

    /// Visual media in `input/`, sorted by name.
    pub fn list_media(&self, project_id: &str) -> Result<Vec<String>, ProjectError> {
        let dir = self.asset_root(project_id);
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(ProjectError::IoError { path: dir, source: e }),
        };

        let mut media: Vec<String> = entries
            .filter_map(Result::ok)
            .filter(|entry| entry.path().is_file())
            .filter_map(|entry| entry.file_name().into_string().ok())
            .filter(|name| MediaKind::from_reference(name).is_some())
            .collect();
        media.sort();
        Ok(media)
    }

    /// Detector output keyed by file name. A missing or unreadable file
    /// yields no crops.
    pub fn load_crops(&self, project_id: &str) -> BTreeMap<String, CropData> {
        let path = self.asset_root(project_id).join(CROPS_FILE);
        if !path.exists() {
            return BTreeMap::new();
        }
        match read_json(&path) {
            Ok(crops) => crops,
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring unreadable crop data");
                BTreeMap::new()
            }
        }
    }

    /// Lay the project's media out across the usable narration span.
    pub fn build_timeline(&self, project_id: &str) -> Result<Timeline, ApiError> {
        let media = self.list_media(project_id)?;
        if media.is_empty() {
            return Err(ApiError::MissingDependency {
                project_id: project_id.to_string(),
                missing: Dependency::Images,
            });
        }

        let voice_path = self.voice_path(project_id);
        if !voice_path.exists() {
            return Err(ApiError::MissingDependency {
                project_id: project_id.to_string(),
                missing: Dependency::Audio,
            });
        }

        let audio_duration = self.probe.duration_secs(&voice_path)?;
        let silence_start = self.generation.silence_start_secs.max(0.0);
        let silence_end = self.generation.silence_end_secs.max(0.0);
        let usable = audio_duration - silence_start - silence_end;
        if !(usable.is_finite() && usable > 0.0) {
            return Err(ProjectError::ValidationError {
                message: format!(
                    "narration too short: {audio_duration:.3}s leaves no room after {:.3}s of silence",
                    silence_start + silence_end
                ),
            }
            .into());
        }

        let crops = self.load_crops(project_id);
        let ken_burns = self
            .generation
            .default_ken_burns
            .as_deref()
            .map(|preset| KenBurns {
                enabled: true,
                preset: preset.to_string().into(),
            });
        let drafts: Vec<SegmentDraft> = media
            .iter()
            .zip(Effect::generation_cycle().into_iter().cycle())
            .map(|(name, effect)| SegmentDraft {
                effect,
                ken_burns: ken_burns.clone(),
                crop_data: crops.get(name).cloned(),
                ..SegmentDraft::new(name.clone())
            })
            .collect();

        let segments = recompute(&drafts, usable)?;
        let per_segment = round_millis(usable / media.len() as f64);

        let mut extra = Map::new();
        extra.insert("project_id".to_string(), Value::from(project_id));
        extra.insert("usable_duration".to_string(), Value::from(round_millis(usable)));
        extra.insert(
            "metadata".to_string(),
            json!({
                "generated_at": chrono::Utc::now().to_rfc3339(),
                "num_images": media.len(),
                "duration_per_image": per_segment,
            }),
        );

        tracing::info!(
            project_id,
            segments = segments.len(),
            audio_secs = audio_duration,
            usable_secs = usable,
            "Generated timeline"
        );

        Ok(Timeline {
            segments,
            total_duration: round_millis(usable),
            total_audio_duration: Some(round_millis(audio_duration)),
            silence_start_duration: Some(silence_start),
            silence_end_duration: Some(silence_end),
            audio: Some(AudioTracks {
                voice: Some(AudioTrack {
                    file: VOICE_FILE.to_string(),
                    volume: 1.0,
                    ducking: None,
                    extra: Map::new(),
                }),
                bgm: Some(AudioTrack {
                    file: BGM_FILE.to_string(),
                    volume: BGM_VOLUME,
                    ducking: Some(true),
                    extra: Map::new(),
                }),
                extra: Map::new(),
            }),
            extra,
        })
    }

    fn touch(&self, project_id: &str) {
        let path = self.project_dir(project_id).join(PROJECT_FILE);
        let Ok(mut project) = read_json::<Project>(&path) else {
            return;
        };
        project.modified_at = chrono::Utc::now().to_rfc3339();
        if let Err(e) = write_json_atomic(&path, &project) {
            tracing::warn!(error = %e, "Failed to update project timestamp");
        }
    }
}

#[async_trait]
impl TimelineApi for FsProjectStore {
    async fn fetch_timeline(&self, project_id: &str) -> Result<Timeline, ApiError> {
        if !self.timeline_path(project_id).exists() {
            return Err(ApiError::NotFound {
                project_id: project_id.to_string(),
            });
        }
        Ok(self.load_timeline(project_id)?)
    }

    async fn generate_timeline(&self, project_id: &str) -> Result<Timeline, ApiError> {
        let timeline = self.build_timeline(project_id)?;
        self.save_timeline(project_id, &timeline)
            .map_err(|e| ApiError::Persistence {
                project_id: project_id.to_string(),
                message: e.to_string(),
            })?;
        Ok(timeline)
    }

    async fn update_timeline(&self, project_id: &str, timeline: &Timeline) -> Result<(), ApiError> {
        timeline.validate()?;
        if !self.project_dir(project_id).is_dir() {
            return Err(ApiError::NotFound {
                project_id: project_id.to_string(),
            });
        }
        self.save_timeline(project_id, timeline)
            .map_err(|e| ApiError::Persistence {
                project_id: project_id.to_string(),
                message: e.to_string(),
            })?;
        tracing::info!(project_id, segments = timeline.segments.len(), "Saved timeline");
        Ok(())
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, ProjectError> {
    let text = std::fs::read_to_string(path).map_err(|e| ProjectError::IoError {
        path: path.to_path_buf(),
        source: e,
    })?;
    serde_json::from_str(&text).map_err(|e| ProjectError::ParseError {
        path: path.to_path_buf(),
        source: e,
    })
}

fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<(), ProjectError> {
    let json = serde_json::to_string_pretty(value).map_err(|e| ProjectError::ParseError {
        path: path.to_path_buf(),
        source: e,
    })?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, json).map_err(|e| ProjectError::IoError {
        path: tmp.clone(),
        source: e,
    })?;
    std::fs::rename(&tmp, path).map_err(|e| ProjectError::IoError {
        path: path.to_path_buf(),
        source: e,
    })
}
