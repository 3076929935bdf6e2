//! Error types shared across Kamishibai crates.

use std::path::PathBuf;

/// Top-level error type for Kamishibai operations.
#[derive(Debug, thiserror::Error)]
pub enum KamishibaiError {
    /// The narration synthesis collaborator is unreachable or refused the request.
    #[error("Narration synthesis error: {message}")]
    Synthesis { message: String },

    /// No usable encoder binary was found or it could not be started.
    #[error("Encoder unavailable: {message}")]
    EncoderUnavailable { message: String },

    /// An encoder invocation inside a named render stage returned failure.
    /// The encoder diagnostic is carried verbatim.
    #[error("{stage} stage failed: {message}")]
    Stage { stage: String, message: String },

    /// Disk error on audio cache read or write.
    #[error("Audio cache error: {message}")]
    Cache { message: String },

    /// Input rejected before any encoder invocation (bad resolution string,
    /// empty scene list, conflicting audio settings).
    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

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

/// Result type alias using KamishibaiError.
pub type KamishibaiResult<T> = Result<T, KamishibaiError>;

impl KamishibaiError {
    pub fn synthesis(msg: impl Into<String>) -> Self {
        Self::Synthesis {
            message: msg.into(),
        }
    }

    pub fn encoder_unavailable(msg: impl Into<String>) -> Self {
        Self::EncoderUnavailable {
            message: msg.into(),
        }
    }

    pub fn stage(stage: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Stage {
            stage: stage.into(),
            message: msg.into(),
        }
    }

    pub fn cache(msg: impl Into<String>) -> Self {
        Self::Cache {
            message: msg.into(),
        }
    }

    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput {
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
}
