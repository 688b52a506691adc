//! Application configuration.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{StoryreelError, StoryreelResult};

/// Global application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Directory where projects are stored.
    pub projects_dir: PathBuf,

    /// Interactive preview settings.
    pub preview: PreviewDefaults,

    /// Timeline generation settings.
    pub generation: GenerationDefaults,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// Default preview parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewDefaults {
    /// Nominal tick rate of the preview loop.
    pub fps: u32,

    /// Preview surface size in pixels (9:16 by default).
    pub width: u32,
    pub height: u32,

    /// Seconds before a pending asset load is declared failed.
    pub asset_timeout_secs: f64,

    /// Whether the diagnostic overlay (label, ROI box, timestamp) is drawn.
    pub show_overlay: bool,

    /// How segment durations are re-derived when the editor commits.
    pub duration_policy: DurationPolicy,
}

/// Policy for re-deriving segment durations on commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DurationPolicy {
    /// Every segment gets `total_duration / count`.
    EvenSplit,
    /// Authored durations travel with their segment and are rescaled to
    /// the total.
    #[default]
    PreserveAuthored,
}

/// Default parameters for server-style timeline generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationDefaults {
    /// Leading silence in the narration track (seconds).
    pub silence_start_secs: f64,

    /// Trailing silence in the narration track (seconds).
    pub silence_end_secs: f64,

    /// Ken Burns preset assigned to generated segments (`None` = no motion).
    pub default_ken_burns: Option<String>,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "storyreel=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,

    /// Optional log file path.
    pub file: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            projects_dir: dirs_default_projects(),
            preview: PreviewDefaults::default(),
            generation: GenerationDefaults::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for PreviewDefaults {
    fn default() -> Self {
        Self {
            fps: 60,
            width: 360,
            height: 640,
            asset_timeout_secs: DEFAULT_ASSET_TIMEOUT_SECS,
            show_overlay: true,
            duration_policy: DurationPolicy::default(),
        }
    }
}

impl Default for GenerationDefaults {
    fn default() -> Self {
        Self {
            silence_start_secs: 1.5,
            silence_end_secs: 1.5,
            default_ken_burns: Some("subtle".to_string()),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

/// Longest asset load the preview will wait for.
pub const MAX_ASSET_TIMEOUT_SECS: f64 = 600.0;

const DEFAULT_ASSET_TIMEOUT_SECS: f64 = 15.0;

impl PreviewDefaults {
    /// Asset load timeout as a `Duration`. Non-positive or non-finite values
    /// fall back to the default; huge ones are capped.
    pub fn asset_timeout(&self) -> std::time::Duration {
        let secs = if self.asset_timeout_secs.is_finite() && self.asset_timeout_secs > 0.0 {
            self.asset_timeout_secs.min(MAX_ASSET_TIMEOUT_SECS)
        } else {
            DEFAULT_ASSET_TIMEOUT_SECS
        };
        std::time::Duration::from_secs_f64(secs)
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        let config_path = config_file_path();
        if config_path.exists() {
            match Self::load_from(&config_path) {
                Ok(config) => return config,
                Err(e) => {
                    tracing::warn!("Failed to load config at {:?}: {}", config_path, e);
                }
            }
        }
        Self::default()
    }

    /// Load config from an explicit path.
    pub fn load_from(path: &Path) -> StoryreelResult<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the preview cannot run with.
    pub fn validate(&self) -> StoryreelResult<()> {
        if self.preview.width == 0 || self.preview.height == 0 {
            return Err(StoryreelError::config("preview surface must be non-empty"));
        }
        let timeout = self.preview.asset_timeout_secs;
        if !(timeout > 0.0 && timeout <= MAX_ASSET_TIMEOUT_SECS) {
            return Err(StoryreelError::config(format!(
                "asset_timeout_secs must be in (0, {MAX_ASSET_TIMEOUT_SECS}], got {timeout}"
            )));
        }
        if self.generation.silence_start_secs < 0.0 || self.generation.silence_end_secs < 0.0 {
            return Err(StoryreelError::config("silence padding must be >= 0"));
        }
        Ok(())
    }

    /// Save config to the standard location.
    pub fn save(&self) -> Result<(), std::io::Error> {
        let config_path = config_file_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(config_path, json)
    }
}

/// Standard config file location.
fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("storyreel").join("config.json")
}

/// Default projects directory.
fn dirs_default_projects() -> PathBuf {
    let base = std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".local").join("share")
        });
    base.join("storyreel").join("projects")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_preview_contract() {
        let config = AppConfig::default();
        assert_eq!(config.preview.fps, 60);
        assert_eq!(config.preview.asset_timeout(), std::time::Duration::from_secs(15));
        assert_eq!(config.preview.duration_policy, DurationPolicy::PreserveAuthored);
        assert!((config.generation.silence_start_secs - 1.5).abs() < 1e-9);
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let parsed: AppConfig =
            serde_json::from_str(r#"{"preview":{"fps":30,"duration_policy":"even_split"}}"#)
                .unwrap();
        assert_eq!(parsed.preview.fps, 30);
        assert_eq!(parsed.preview.width, 360);
        assert_eq!(parsed.preview.duration_policy, DurationPolicy::EvenSplit);
        assert_eq!(parsed.logging.level, "info");
    }

    #[test]
    fn test_invalid_timeout_falls_back() {
        let preview = PreviewDefaults {
            asset_timeout_secs: -2.0,
            ..Default::default()
        };
        assert_eq!(preview.asset_timeout(), std::time::Duration::from_secs(15));
    }

    #[test]
    fn test_huge_timeout_is_capped_and_rejected() {
        let preview = PreviewDefaults {
            asset_timeout_secs: 1e30,
            ..Default::default()
        };
        assert_eq!(
            preview.asset_timeout(),
            std::time::Duration::from_secs_f64(MAX_ASSET_TIMEOUT_SECS)
        );

        let path = std::env::temp_dir().join("storyreel_test_config_huge_timeout.json");
        std::fs::write(&path, r#"{"preview":{"asset_timeout_secs":1e30}}"#).unwrap();
        let err = AppConfig::load_from(&path).unwrap_err();
        assert!(matches!(err, StoryreelError::Config { .. }));
        std::fs::remove_file(&path).ok();
    }

    #[test]
    fn test_load_from_rejects_empty_surface() {
        let path = std::env::temp_dir().join("storyreel_test_config_empty_surface.json");
        std::fs::write(&path, r#"{"preview":{"width":0}}"#).unwrap();
        let err = AppConfig::load_from(&path).unwrap_err();
        assert!(matches!(err, StoryreelError::Config { .. }));
        std::fs::remove_file(&path).ok();
    }
}
