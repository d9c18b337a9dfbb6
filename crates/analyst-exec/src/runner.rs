//! Deterministic plan execution
//!
//! Runs a validated [`Plan`] step by step in its precomputed order, storing
//! one [`Artifact`] per step. A step failure is contained: the step and its
//! transitive dependents degrade, independent branches keep running.
//! Cancellation is observed between steps; a step that has started runs to
//! completion.

use crate::artifact::{Artifact, ArtifactPayload, SkipCause, StepStatus};
use crate::ops::{self, OpError};
use crate::store::ArtifactStore;
use analyst_frame::Frame;
use analyst_plan::{InputRef, Plan, Step, StepId, StepOp};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use ulid::Ulid;

/// How a run as a whole ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Every step reached a terminal state by execution
    Completed,
    /// The run was cancelled; remaining steps were skipped
    Cancelled,
    /// An internal inconsistency stopped the run early
    Aborted,
}

/// Terminal record for one step within a run
#[derive(Debug, Clone, Serialize)]
pub struct StepOutcome {
    /// Step identifier
    pub step_id: StepId,
    /// Wire name of the operation kind
    pub operation: &'static str,
    /// How the step ended
    pub status: StepStatus,
}

/// Summary of one plan execution
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    /// Unique, sortable run identifier
    pub run_id: Ulid,
    /// Overall outcome
    pub status: RunStatus,
    /// Per-step outcomes in execution order
    pub steps: Vec<StepOutcome>,
    /// When execution started
    pub started_at: DateTime<Utc>,
    /// When execution finished
    pub finished_at: DateTime<Utc>,
}

impl RunSummary {
    /// Count of steps that produced a payload
    #[must_use]
    pub fn succeeded(&self) -> usize {
        self.steps.iter().filter(|s| s.status.is_success()).count()
    }
}

/// Executes validated plans against a dataset version
#[derive(Debug, Default)]
pub struct PlanRunner;

impl PlanRunner {
    /// Run `plan` against `dataset`, storing every artifact in `store`
    ///
    /// Never returns an error: failures are recorded per step and the
    /// summary reports the overall status.
    pub fn run(
        plan: &Plan,
        dataset: &Arc<Frame>,
        store: &ArtifactStore,
        cancel: &CancellationToken,
    ) -> RunSummary {
        let run_id = Ulid::new();
        let started_at = Utc::now();
        let span = tracing::info_span!("plan_run", %run_id, steps = plan.len());
        let _guard = span.enter();
        tracing::info!(dataset = dataset.name(), version = dataset.version(), "run started");

        let mut status = RunStatus::Completed;
        let mut outcomes = Vec::with_capacity(plan.len());
        let mut skip: HashMap<StepId, SkipCause> = HashMap::new();

        let order: Vec<&Step> = plan.execution_order().collect();
        for (position, step) in order.iter().enumerate() {
            if status == RunStatus::Completed && cancel.is_cancelled() {
                tracing::info!(remaining = order.len() - position, "run cancelled");
                status = RunStatus::Cancelled;
            }
            match status {
                RunStatus::Cancelled => {
                    skip.entry(step.id.clone()).or_insert(SkipCause::Cancelled);
                }
                RunStatus::Aborted => {
                    skip.entry(step.id.clone()).or_insert(SkipCause::Aborted);
                }
                RunStatus::Completed => {}
            }

            if let Some(cause) = skip.get(&step.id) {
                let artifact = Artifact::skipped(step.id.clone(), step.op.kind(), cause.clone());
                outcomes.push(outcome_of(&artifact));
                store.put(artifact);
                continue;
            }

            let artifact = match Self::execute(step, dataset, store) {
                Ok(payload) => Artifact::succeeded(step.id.clone(), step.op.kind(), payload),
                Err(ExecError::Step(err)) => {
                    tracing::warn!(step = %step.id, error = %err, "step failed");
                    for downstream in plan.downstream_of(&step.id) {
                        skip.entry(downstream)
                            .or_insert_with(|| SkipCause::UpstreamFailed(step.id.clone()));
                    }
                    Artifact::failed(step.id.clone(), step.op.kind(), err.to_string())
                }
                Err(ExecError::MissingArtifact(reference)) => {
                    tracing::error!(step = %step.id, %reference, "dependency artifact missing");
                    status = RunStatus::Aborted;
                    Artifact::skipped(step.id.clone(), step.op.kind(), SkipCause::Aborted)
                }
            };
            outcomes.push(outcome_of(&artifact));
            store.put(artifact);
        }

        let summary = RunSummary {
            run_id,
            status,
            steps: outcomes,
            started_at,
            finished_at: Utc::now(),
        };
        tracing::info!(
            status = ?summary.status,
            succeeded = summary.succeeded(),
            "run finished"
        );
        summary
    }

    fn execute(
        step: &Step,
        dataset: &Arc<Frame>,
        store: &ArtifactStore,
    ) -> Result<ArtifactPayload, ExecError> {
        let inputs = resolve_inputs(step, dataset, store)?;
        let payload = match &step.op {
            StepOp::Filter(p) => ops::filter::run(p, tabular(&inputs[0])?)?,
            StepOp::Aggregate(p) => ops::aggregate::run(p, tabular(&inputs[0])?)?,
            StepOp::Transform(p) => ops::transform::run(p, tabular(&inputs[0])?)?,
            StepOp::StatTest(p) => ops::stat_test::run(p, tabular(&inputs[0])?)?,
            StepOp::Visualize(p) => {
                let (reference, _) = &inputs[0];
                ops::visualize::run(p, reference, tabular(&inputs[0])?)?
            }
            StepOp::Narrate(p) => ops::narrate::run(p, &inputs)?,
        };
        Ok(payload)
    }
}

enum ExecError {
    /// Recoverable per-step failure
    Step(OpError),
    /// A dependency's artifact is absent from the store
    MissingArtifact(String),
}

impl From<OpError> for ExecError {
    fn from(err: OpError) -> Self {
        Self::Step(err)
    }
}

fn resolve_inputs(
    step: &Step,
    dataset: &Arc<Frame>,
    store: &ArtifactStore,
) -> Result<Vec<(String, ArtifactPayload)>, ExecError> {
    step.inputs
        .iter()
        .map(|input| match input {
            InputRef::Dataset => Ok((
                input.to_string(),
                ArtifactPayload::Table(Arc::clone(dataset)),
            )),
            InputRef::Step(id) => {
                let artifact = store
                    .get(id)
                    .ok_or_else(|| ExecError::MissingArtifact(id.to_string()))?;
                let payload = artifact
                    .payload
                    .ok_or_else(|| ExecError::MissingArtifact(id.to_string()))?;
                Ok((input.to_string(), payload))
            }
        })
        .collect()
}

fn tabular((reference, payload): &(String, ArtifactPayload)) -> Result<&Frame, ExecError> {
    payload.as_table().map(|f| f.as_ref()).ok_or_else(|| {
        ExecError::Step(OpError::bad_column(
            reference.clone(),
            "input is not tabular",
        ))
    })
}

fn outcome_of(artifact: &Artifact) -> StepOutcome {
    StepOutcome {
        step_id: artifact.step_id.clone(),
        operation: artifact.operation,
        status: artifact.status.clone(),
    }
}
