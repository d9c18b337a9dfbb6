//! Plan execution and artifact storage
//!
//! Takes validated plans from `analyst-plan` and runs them deterministically
//! against an immutable dataset version, leaving a complete artifact trail
//! behind: one artifact per step, including failed and skipped steps.
//!
//! Execution is degradation-first. A step failure never aborts the run;
//! it fails the step, cascades a skip to its transitive dependents, and
//! lets independent branches finish.

pub mod artifact;
mod ops;
pub mod runner;
pub mod store;

pub use artifact::{
    Artifact, ArtifactPayload, ChartSpec, SkipCause, StatsTable, StepStatus,
};
pub use ops::OpError;
pub use runner::{PlanRunner, RunStatus, RunSummary, StepOutcome};
pub use store::ArtifactStore;
