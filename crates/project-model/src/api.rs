//! Timeline persistence contract.
//!
//! The preview core never touches storage directly; it fetches, generates
//! and updates timelines through [`TimelineApi`]. [`crate::FsProjectStore`]
//! is the filesystem implementation used by the CLI.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use storyreel_common::StoryreelError;

use crate::project::ProjectError;
use crate::timeline::Timeline;
use crate::timing::TimingError;

/// Upstream input that generation requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dependency {
    Audio,
    Images,
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dependency::Audio => f.write_str("audio"),
            Dependency::Images => f.write_str("images"),
        }
    }
}

/// Errors reported by a [`TimelineApi`].
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("no timeline for project {project_id}")]
    NotFound { project_id: String },

    /// Generation was attempted before its inputs exist. Callers route the
    /// user to the missing step instead of showing a generic failure.
    #[error("project {project_id} is missing {missing}")]
    MissingDependency {
        project_id: String,
        missing: Dependency,
    },

    #[error("timeline rejected: {0}")]
    InvalidTimeline(#[from] TimingError),

    #[error("failed to persist timeline for {project_id}: {message}")]
    Persistence { project_id: String, message: String },

    #[error(transparent)]
    Project(#[from] ProjectError),
}

impl ApiError {
    /// The missing prerequisite, when this is a dependency failure.
    pub fn missing_dependency(&self) -> Option<Dependency> {
        match self {
            ApiError::MissingDependency { missing, .. } => Some(*missing),
            _ => None,
        }
    }
}

/// Fetch, generate and persist project timelines.
#[async_trait]
pub trait TimelineApi: Send + Sync {
    /// Current persisted timeline, or [`ApiError::NotFound`].
    async fn fetch_timeline(&self, project_id: &str) -> Result<Timeline, ApiError>;

    /// Build a fresh timeline from the project's media and narration.
    async fn generate_timeline(&self, project_id: &str) -> Result<Timeline, ApiError>;

    /// Persist an edited timeline.
    async fn update_timeline(&self, project_id: &str, timeline: &Timeline) -> Result<(), ApiError>;
}

impl From<ApiError> for StoryreelError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::MissingDependency { missing, .. } => {
                StoryreelError::dependency(missing.to_string())
            }
            ApiError::InvalidTimeline(e) => StoryreelError::invalid_timing(e.to_string()),
            ApiError::Persistence { .. } => StoryreelError::persistence(err.to_string()),
            ApiError::NotFound { .. } | ApiError::Project(_) => {
                StoryreelError::project(err.to_string())
            }
        }
    }
}

impl From<TimingError> for StoryreelError {
    fn from(err: TimingError) -> Self {
        StoryreelError::invalid_timing(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dependency_error_maps_to_dependency() {
        let err = ApiError::MissingDependency {
            project_id: "p1".to_string(),
            missing: Dependency::Images,
        };
        assert_eq!(err.missing_dependency(), Some(Dependency::Images));
        let top: StoryreelError = err.into();
        assert!(top.is_dependency());
        assert_eq!(top.to_string(), "Missing prerequisite: images");
    }

    #[test]
    fn test_dependency_wire_name() {
        assert_eq!(serde_json::to_string(&Dependency::Audio).unwrap(), "\"audio\"");
    }

    #[test]
    fn test_timing_error_maps_to_invalid_timing() {
        let top: StoryreelError = TimingError::EmptySegments.into();
        assert!(matches!(top, StoryreelError::InvalidTiming { .. }));
    }
}
