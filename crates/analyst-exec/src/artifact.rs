//! Artifacts, the stored outputs of executed steps
//!
//! Every step that reaches a terminal state leaves an [`Artifact`] behind,
//! including failed and skipped steps: the artifact trail is the honest
//! record of what the analysis did and did not accomplish.

use analyst_frame::{Frame, Value};
use analyst_plan::{MarkType, StepId};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

/// Terminal state of one step
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum StepStatus {
    /// Step ran and produced a payload
    Succeeded,
    /// Step ran and failed recoverably
    Failed {
        /// Operator-facing error description
        error: String,
    },
    /// Step never ran
    Skipped {
        /// Why it was skipped
        cause: SkipCause,
    },
}

impl StepStatus {
    /// Whether the step produced a usable payload
    #[inline]
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Succeeded)
    }
}

/// Why a step was skipped instead of executed
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipCause {
    /// A transitive input failed
    UpstreamFailed(StepId),
    /// The run was cancelled before this step
    Cancelled,
    /// The run aborted on an unrecoverable error
    Aborted,
}

impl std::fmt::Display for SkipCause {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UpstreamFailed(id) => write!(f, "upstream step '{id}' failed"),
            Self::Cancelled => write!(f, "run cancelled"),
            Self::Aborted => write!(f, "run aborted"),
        }
    }
}

/// Declarative chart specification
///
/// Rendering is an external collaborator's job; the engine only describes
/// the chart and names the data it draws from.
#[derive(Debug, Clone, Serialize)]
pub struct ChartSpec {
    /// Mark type
    pub mark: MarkType,
    /// x-axis field
    pub x: String,
    /// y-axis field, if any
    pub y: Option<String>,
    /// Chart title
    pub title: Option<String>,
    /// Reference to the data the chart reads (`dataset` or a step id)
    pub data: String,
    /// Row count of the referenced data at execution time
    pub data_rows: usize,
}

/// Small table of named statistics
#[derive(Debug, Clone, Serialize)]
pub struct StatsTable {
    /// What was computed, e.g. `welch_t_test`
    pub title: String,
    /// Metric name/value pairs in presentation order
    pub metrics: Vec<(String, Value)>,
}

impl StatsTable {
    /// Look up one metric by name
    #[must_use]
    pub fn metric(&self, name: &str) -> Option<&Value> {
        self.metrics.iter().find(|(n, _)| n == name).map(|(_, v)| v)
    }
}

/// Payload of a successful step
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ArtifactPayload {
    /// A new dataset version
    Table(Arc<Frame>),
    /// Statistics
    Stats(StatsTable),
    /// Chart specification
    Chart(ChartSpec),
    /// Narrative fragment
    Text(String),
}

impl ArtifactPayload {
    /// Table view, if this payload is tabular
    #[inline]
    #[must_use]
    pub fn as_table(&self) -> Option<&Arc<Frame>> {
        match self {
            Self::Table(f) => Some(f),
            _ => None,
        }
    }
}

/// Output of one executed (or skipped) step
#[derive(Debug, Clone, Serialize)]
pub struct Artifact {
    /// Producing step
    pub step_id: StepId,
    /// Wire name of the operation kind
    pub operation: &'static str,
    /// Terminal status
    pub status: StepStatus,
    /// Payload, present only for successes
    pub payload: Option<ArtifactPayload>,
    /// When the executor stored this artifact
    pub produced_at: DateTime<Utc>,
}

impl Artifact {
    /// Successful artifact
    #[must_use]
    pub fn succeeded(step_id: StepId, operation: &'static str, payload: ArtifactPayload) -> Self {
        Self {
            step_id,
            operation,
            status: StepStatus::Succeeded,
            payload: Some(payload),
            produced_at: Utc::now(),
        }
    }

    /// Recoverable failure artifact
    #[must_use]
    pub fn failed(step_id: StepId, operation: &'static str, error: String) -> Self {
        Self {
            step_id,
            operation,
            status: StepStatus::Failed { error },
            payload: None,
            produced_at: Utc::now(),
        }
    }

    /// Skipped-step artifact
    #[must_use]
    pub fn skipped(step_id: StepId, operation: &'static str, cause: SkipCause) -> Self {
        Self {
            step_id,
            operation,
            status: StepStatus::Skipped { cause },
            payload: None,
            produced_at: Utc::now(),
        }
    }
}
