//! The fit-adjustment loop: generate, measure, decide, repeat.

use thiserror::Error;

use crate::llm_client::LlmError;

pub mod artifacts;
pub mod handlers;
pub mod orchestrator;
pub mod policy;

pub use orchestrator::Tailor;
pub use policy::FitPolicy;

/// Failures that abort a tailoring run. Compilation problems are not here:
/// they degrade to text estimation instead of failing the run.
#[derive(Debug, Error)]
pub enum TailorError {
    #[error("No resume loaded. Please upload a resume first.")]
    NoResumeLoaded,

    #[error("A tailoring request is already in progress")]
    Busy,

    #[error("Language model credential is missing or invalid: {0}")]
    Auth(String),

    #[error("Language model request failed: {0}")]
    Upstream(String),

    #[error("Language model request timed out after {secs}s")]
    Timeout { secs: u64 },

    #[error("Tailoring failed: {0}")]
    Internal(String),
}

impl TailorError {
    /// Stable machine-readable kind, used as the API error code.
    pub fn kind(&self) -> &'static str {
        match self {
            TailorError::NoResumeLoaded => "NO_RESUME_LOADED",
            TailorError::Busy => "BUSY",
            TailorError::Auth(_) => "LLM_AUTH_ERROR",
            TailorError::Upstream(_) => "UPSTREAM_ERROR",
            TailorError::Timeout { .. } => "UPSTREAM_TIMEOUT",
            TailorError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl From<LlmError> for TailorError {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::MissingApiKey | LlmError::Unauthorized { .. } => {
                TailorError::Auth(err.to_string())
            }
            LlmError::Timeout { secs } => TailorError::Timeout { secs },
            other => TailorError::Upstream(other.to_string()),
        }
    }
}
