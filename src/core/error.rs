use thiserror::Error;

/// Failure taxonomy for the generation pipeline and the viva engine.
///
/// Foreign-key races are handled inside the persistence layer and never
/// surface here; everything unexpected collapses into `Fatal` so the
/// transport (HTTP status or queue redelivery) can apply its own policy.
#[derive(Debug, Error)]
pub(crate) enum PipelineError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("missing prerequisite documents: {0}")]
    MissingPrerequisites(String),
    #[error(transparent)]
    Fatal(#[from] anyhow::Error),
}

impl PipelineError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    pub(crate) fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub(crate) fn missing(message: impl Into<String>) -> Self {
        Self::MissingPrerequisites(message.into())
    }
}
