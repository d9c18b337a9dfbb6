//! Operation kernels
//!
//! One module per step kind. Every kernel is a pure function from validated
//! parameters and resolved inputs to an [`ArtifactPayload`]; failures here
//! are recoverable: they degrade the step, never the run.
//!
//! Shared policy, enforced by every kernel:
//! - missing values propagate as missing and are excluded from aggregates,
//!   never coerced to zero;
//! - integer division promotes to floating point; non-finite results become
//!   missing.

pub(crate) mod aggregate;
pub(crate) mod filter;
pub(crate) mod narrate;
pub(crate) mod stat_test;
pub(crate) mod transform;
pub(crate) mod visualize;

/// A recoverable per-step failure
#[derive(Debug, Clone, thiserror::Error)]
pub enum OpError {
    /// Column is absent or carries an unusable type at execution time
    ///
    /// Validation should make this unreachable, but the executor never
    /// trusts that; running against a stale frame degrades the step.
    #[error("column '{column}': {detail}")]
    BadColumn { column: String, detail: String },

    /// Operation has no data to work with
    #[error("empty input: {0}")]
    EmptyInput(String),

    /// Statistic is undefined for this input
    #[error("degenerate input: {0}")]
    Degenerate(String),
}

impl OpError {
    pub(crate) fn bad_column(column: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::BadColumn {
            column: column.into(),
            detail: detail.into(),
        }
    }
}

/// Non-missing numeric values of a column
pub(crate) fn numeric_values(
    frame: &analyst_frame::Frame,
    column: &str,
) -> Result<Vec<f64>, OpError> {
    let col = frame
        .column(column)
        .ok_or_else(|| OpError::bad_column(column, "not present"))?;
    if !col.ty.is_numeric() {
        return Err(OpError::bad_column(
            column,
            format!("expected numeric, found {}", col.ty),
        ));
    }
    Ok(col.values.iter().filter_map(|v| v.as_f64()).collect())
}
