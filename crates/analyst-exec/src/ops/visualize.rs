//! Chart specification building
//!
//! Produces a declarative [`ChartSpec`] naming the data it reads; no pixels
//! are drawn here.

use crate::artifact::{ArtifactPayload, ChartSpec};
use crate::ops::OpError;
use analyst_frame::Frame;
use analyst_plan::VisualizeParams;

pub(crate) fn run(
    params: &VisualizeParams,
    data_ref: &str,
    input: &Frame,
) -> Result<ArtifactPayload, OpError> {
    for column in std::iter::once(&params.x).chain(params.y.as_ref()) {
        if input.column(column).is_none() {
            return Err(OpError::bad_column(column, "not present"));
        }
    }
    Ok(ArtifactPayload::Chart(ChartSpec {
        mark: params.mark,
        x: params.x.clone(),
        y: params.y.clone(),
        title: params.title.clone(),
        data: data_ref.to_string(),
        data_rows: input.row_count(),
    }))
}
