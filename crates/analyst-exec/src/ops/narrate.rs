//! Narrative fragments
//!
//! Summarises the step's inputs into deterministic prose. The wording is a
//! pure function of the input artifacts, so re-running a plan reproduces the
//! same narrative byte for byte.

use crate::artifact::ArtifactPayload;
use crate::ops::OpError;
use analyst_plan::NarrateParams;
use std::fmt::Write as _;

pub(crate) fn run(
    params: &NarrateParams,
    inputs: &[(String, ArtifactPayload)],
) -> Result<ArtifactPayload, OpError> {
    if inputs.is_empty() {
        return Err(OpError::EmptyInput("narrate has no inputs".into()));
    }
    let mut out = String::new();
    if let Some(title) = &params.title {
        let _ = writeln!(out, "{title}");
        out.push('\n');
    }
    for (reference, payload) in inputs {
        let _ = writeln!(out, "- {}", describe(reference, payload));
    }
    Ok(ArtifactPayload::Text(out.trim_end().to_string()))
}

fn describe(reference: &str, payload: &ArtifactPayload) -> String {
    match payload {
        ArtifactPayload::Table(frame) => {
            let columns: Vec<&str> = frame.column_names().collect();
            format!(
                "`{reference}` holds {} rows across {} columns ({}).",
                frame.row_count(),
                frame.column_count(),
                columns.join(", ")
            )
        }
        ArtifactPayload::Stats(table) => {
            let metrics: Vec<String> = table
                .metrics
                .iter()
                .map(|(name, value)| format!("{name} = {value}"))
                .collect();
            format!("`{reference}` ({}): {}.", table.title, metrics.join(", "))
        }
        ArtifactPayload::Chart(spec) => {
            let axes = match &spec.y {
                Some(y) => format!("{y} by {}", spec.x),
                None => spec.x.clone(),
            };
            format!(
                "`{reference}` charts {axes} over {} rows.",
                spec.data_rows
            )
        }
        ArtifactPayload::Text(text) => {
            format!("`{reference}`: {text}")
        }
    }
}
