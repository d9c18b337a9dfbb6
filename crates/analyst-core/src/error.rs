//! Engine error taxonomy

use crate::llm::ModelError;
use analyst_frame::FrameError;
use analyst_plan::PlanError;
use uuid::Uuid;

/// Errors surfaced by the analysis engine
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The model never produced a valid plan within the retry budget
    #[error("no valid plan after {attempts} attempts: {last_error}")]
    PlanGenerationFailed {
        /// Model calls spent
        attempts: u32,
        /// Rejection reason of the final attempt
        last_error: PlanError,
    },

    /// Plan validation failure outside the generation loop
    #[error(transparent)]
    Plan(#[from] PlanError),

    /// Dataset could not be loaded or is malformed
    #[error(transparent)]
    Dataset(#[from] FrameError),

    /// Model transport failure
    #[error(transparent)]
    Model(#[from] ModelError),

    /// No session with this id (never created, expired, or evicted)
    #[error("session {0} not found")]
    SessionNotFound(Uuid),

    /// Session exists but has no dataset attached yet
    #[error("session {0} has no dataset loaded")]
    DatasetNotFound(Uuid),

    /// A run is already executing in this session
    #[error("session {0} already has a run in progress")]
    RunInProgress(Uuid),

    /// Input exceeds a configured capacity limit
    #[error("resource limit exceeded: {0}")]
    ResourceExhausted(String),

    /// The execution task died before producing a summary
    #[error("plan execution aborted: {0}")]
    Execution(String),
}
