use std::path::PathBuf;

use crate::annotations::AnnotationKind;

/// Errors produced by the annotation-driven evaluation pipeline.
///
/// Timeouts are scoped to a single annotation kind and never abort sibling
/// requests; malformed artifacts are fatal for that artifact's load; external
/// service failures signal systemic misconfiguration and stop the run.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// One annotation kind exceeded the bounded wait for its long-running
    /// operation. Sibling requests keep running.
    #[error("annotation request for {kind} timed out after {timeout_secs}s")]
    RequestTimeout {
        kind: AnnotationKind,
        timeout_secs: u64,
    },

    /// The artifact file is missing, not valid JSON, or lacks the expected
    /// top-level shape.
    #[error("malformed annotation artifact {path}: {reason}")]
    MalformedArtifact { path: PathBuf, reason: String },

    /// Knowledge Graph or annotation service failure that indicates a
    /// configuration problem (e.g. bad API key). Re-raised after logging.
    #[error("external service error: {0}")]
    ExternalService(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl PipelineError {
    pub fn malformed(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::MalformedArtifact {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;
