//! Error types shared across StoryReel crates.

use std::path::PathBuf;

/// Top-level error type for StoryReel operations.
///
/// Crate-level errors (timing, asset loading, persistence) convert into this
/// type at the edges where several subsystems meet.
#[derive(Debug, thiserror::Error)]
pub enum StoryreelError {
    #[error("Invalid timing: {message}")]
    InvalidTiming { message: String },

    #[error("Asset load failed: {message}")]
    Load { message: String },

    #[error("Missing prerequisite: {missing}")]
    Dependency { missing: String },

    #[error("Persistence error: {message}")]
    Persistence { message: String },

    #[error("Playback error: {message}")]
    Playback { message: String },

    #[error("Render error: {message}")]
    Render { message: String },

    #[error("Project error: {message}")]
    Project { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using StoryreelError.
pub type StoryreelResult<T> = Result<T, StoryreelError>;

impl StoryreelError {
    pub fn invalid_timing(msg: impl Into<String>) -> Self {
        Self::InvalidTiming {
            message: msg.into(),
        }
    }

    pub fn load(msg: impl Into<String>) -> Self {
        Self::Load {
            message: msg.into(),
        }
    }

    pub fn dependency(missing: impl Into<String>) -> Self {
        Self::Dependency {
            missing: missing.into(),
        }
    }

    pub fn persistence(msg: impl Into<String>) -> Self {
        Self::Persistence {
            message: msg.into(),
        }
    }

    pub fn playback(msg: impl Into<String>) -> Self {
        Self::Playback {
            message: msg.into(),
        }
    }

    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render {
            message: msg.into(),
        }
    }

    pub fn project(msg: impl Into<String>) -> Self {
        Self::Project {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    /// Whether the caller can route the user to a missing upstream step
    /// instead of showing a generic failure.
    pub fn is_dependency(&self) -> bool {
        matches!(self, Self::Dependency { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dependency_error_is_distinguishable() {
        let err = StoryreelError::dependency("images");
        assert!(err.is_dependency());
        assert_eq!(err.to_string(), "Missing prerequisite: images");

        let err = StoryreelError::persistence("disk full");
        assert!(!err.is_dependency());
    }

    #[test]
    fn test_io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: StoryreelError = io.into();
        assert!(matches!(err, StoryreelError::Io(_)));
    }
}
