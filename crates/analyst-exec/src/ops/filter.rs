//! Row filtering
//!
//! Keeps rows where `column ⟨cmp⟩ literal` holds. A comparison involving a
//! missing cell (or an incomparable pair) is false: the row is excluded, it
//! is never treated as matching zero.

use crate::artifact::ArtifactPayload;
use crate::ops::OpError;
use analyst_frame::Frame;
use analyst_plan::{Comparator, FilterParams};
use std::cmp::Ordering;
use std::sync::Arc;

pub(crate) fn run(params: &FilterParams, input: &Frame) -> Result<ArtifactPayload, OpError> {
    let column = input
        .column(&params.column)
        .ok_or_else(|| OpError::bad_column(&params.column, "not present"))?;

    let mask: Vec<bool> = column
        .values
        .iter()
        .map(|cell| match cell.partial_cmp_cell(&params.value) {
            Some(ord) => matches(params.op, ord),
            None => false,
        })
        .collect();

    Ok(ArtifactPayload::Table(Arc::new(input.filter_rows(&mask))))
}

fn matches(op: Comparator, ord: Ordering) -> bool {
    match op {
        Comparator::Eq => ord == Ordering::Equal,
        Comparator::Ne => ord != Ordering::Equal,
        Comparator::Lt => ord == Ordering::Less,
        Comparator::Le => ord != Ordering::Greater,
        Comparator::Gt => ord == Ordering::Greater,
        Comparator::Ge => ord != Ordering::Less,
    }
}
