//! Plan parsing and validation errors
//!
//! Any of these rejects the entire candidate plan; partial plans are never
//! accepted, since partial execution against unvalidated references risks
//! corrupting session state.

use crate::step::StepId;

/// Why a candidate plan was rejected
#[derive(Debug, Clone, thiserror::Error)]
pub enum PlanError {
    /// Raw text did not decode into the plan wire contract
    #[error("malformed plan structure: {0}")]
    MalformedStructure(String),

    /// Step names an operation outside the closed set
    #[error("step {step}: unknown operation '{operation}'")]
    UnknownOperation { step: StepId, operation: String },

    /// Step references a column the input does not provide, or with an
    /// incompatible type
    #[error("step {step}: schema mismatch on column '{column}': {detail}")]
    SchemaMismatch {
        step: StepId,
        column: String,
        detail: String,
    },

    /// The step graph contains a cycle
    #[error("cyclic dependency: {}", format_path(path))]
    CyclicDependency { path: Vec<StepId> },

    /// Step input names neither the dataset nor any step in the plan
    #[error("step {step}: dangling reference '{reference}'")]
    DanglingReference { step: StepId, reference: String },

    /// Two steps share an id
    #[error("duplicate step id: {0}")]
    DuplicateStep(StepId),
}

fn format_path(path: &[StepId]) -> String {
    path.iter()
        .map(StepId::as_str)
        .collect::<Vec<_>>()
        .join(" -> ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_mismatch_names_the_column() {
        let err = PlanError::SchemaMismatch {
            step: "s1".into(),
            column: "profit".into(),
            detail: "not present in schema".into(),
        };
        assert!(err.to_string().contains("profit"));
    }

    #[test]
    fn cycle_shows_path() {
        let err = PlanError::CyclicDependency {
            path: vec!["a".into(), "b".into(), "a".into()],
        };
        assert_eq!(err.to_string(), "cyclic dependency: a -> b -> a");
    }
}
