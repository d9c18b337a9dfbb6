//! Aggregation
//!
//! Produces a one-row table (no grouping) or one row per group. Missing
//! values are excluded from every function; an all-missing group yields a
//! missing aggregate rather than zero. Rows whose group key is missing are
//! dropped from grouping entirely.

use crate::artifact::ArtifactPayload;
use crate::ops::OpError;
use analyst_frame::{ColumnType, Frame, Value};
use analyst_plan::{AggFunc, AggregateParams};
use std::collections::HashMap;
use std::sync::Arc;

pub(crate) fn run(params: &AggregateParams, input: &Frame) -> Result<ArtifactPayload, OpError> {
    let value_col = input
        .column(&params.column)
        .ok_or_else(|| OpError::bad_column(&params.column, "not present"))?;
    if params.func != AggFunc::Count && !value_col.ty.is_numeric() {
        return Err(OpError::bad_column(
            &params.column,
            format!("cannot {:?} a {} column", params.func, value_col.ty),
        ));
    }

    let out_name = params.func.output_column(&params.column);
    let out_ty = output_type(params.func, value_col.ty);

    let frame = match &params.group_by {
        None => {
            let agg = apply(params.func, value_col.values.iter());
            Frame::from_columns(input.name(), vec![(out_name, out_ty, vec![agg])])
        }
        Some(group) => {
            let group_col = input
                .column(group)
                .ok_or_else(|| OpError::bad_column(group, "not present"))?;

            // first-appearance group order keeps output deterministic
            let mut order: Vec<Value> = Vec::new();
            let mut buckets: HashMap<String, Vec<&Value>> = HashMap::new();
            for (key, value) in group_col.values.iter().zip(value_col.values.iter()) {
                if key.is_missing() {
                    continue;
                }
                let bucket = buckets.entry(key.to_string()).or_insert_with(|| {
                    order.push(key.clone());
                    Vec::new()
                });
                bucket.push(value);
            }

            let mut keys = Vec::with_capacity(order.len());
            let mut aggs = Vec::with_capacity(order.len());
            for key in order {
                let bucket = &buckets[&key.to_string()];
                aggs.push(apply(params.func, bucket.iter().copied()));
                keys.push(key);
            }
            Frame::from_columns(
                input.name(),
                vec![
                    (group.clone(), group_col.ty, keys),
                    (out_name, out_ty, aggs),
                ],
            )
        }
    }
    .map_err(|e| OpError::bad_column(&params.column, e.to_string()))?;

    Ok(ArtifactPayload::Table(Arc::new(frame)))
}

fn output_type(func: AggFunc, input: ColumnType) -> ColumnType {
    match func {
        AggFunc::Count => ColumnType::Int,
        AggFunc::Mean => ColumnType::Float,
        AggFunc::Sum | AggFunc::Min | AggFunc::Max => input,
    }
}

/// Apply one function over the non-missing values of an iterator of cells
fn apply<'a>(func: AggFunc, values: impl Iterator<Item = &'a Value>) -> Value {
    let present: Vec<&Value> = values.filter(|v| !v.is_missing()).collect();
    match func {
        AggFunc::Count => Value::Int(present.len() as i64),
        AggFunc::Sum => sum(&present),
        AggFunc::Mean => {
            if present.is_empty() {
                Value::Missing
            } else {
                let total: f64 = present.iter().filter_map(|v| v.as_f64()).sum();
                Value::finite_float(total / present.len() as f64)
            }
        }
        AggFunc::Min => extremum(&present, std::cmp::Ordering::Less),
        AggFunc::Max => extremum(&present, std::cmp::Ordering::Greater),
    }
}

fn sum(present: &[&Value]) -> Value {
    if present.is_empty() {
        return Value::Missing;
    }
    // all-int sums stay integral; i128 accumulator sidesteps i64 overflow
    if present.iter().all(|v| v.as_i64().is_some()) {
        let total: i128 = present.iter().filter_map(|v| v.as_i64()).map(i128::from).sum();
        return i64::try_from(total)
            .map(Value::Int)
            .unwrap_or_else(|_| Value::finite_float(total as f64));
    }
    Value::finite_float(present.iter().filter_map(|v| v.as_f64()).sum())
}

fn extremum(present: &[&Value], want: std::cmp::Ordering) -> Value {
    let mut best: Option<&Value> = None;
    for v in present {
        best = match best {
            None => Some(v),
            Some(b) => {
                if v.partial_cmp_cell(b) == Some(want) {
                    Some(v)
                } else {
                    Some(b)
                }
            }
        };
    }
    best.cloned().unwrap_or(Value::Missing)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame() -> Frame {
        Frame::from_columns(
            "sales",
            vec![
                (
                    "region".into(),
                    ColumnType::Text,
                    vec![
                        Value::from("east"),
                        Value::from("west"),
                        Value::from("east"),
                        Value::Missing,
                    ],
                ),
                (
                    "revenue".into(),
                    ColumnType::Float,
                    vec![
                        Value::Float(10.0),
                        Value::Missing,
                        Value::Float(5.0),
                        Value::Float(99.0),
                    ],
                ),
            ],
        )
        .unwrap()
    }

    fn run_agg(func: AggFunc, group_by: Option<&str>) -> Arc<Frame> {
        let params = AggregateParams {
            column: "revenue".into(),
            func,
            group_by: group_by.map(String::from),
        };
        match run(&params, &frame()).unwrap() {
            ArtifactPayload::Table(f) => f,
            other => panic!("unexpected payload: {other:?}"),
        }
    }

    #[test]
    fn sum_excludes_missing() {
        let out = run_agg(AggFunc::Sum, None);
        assert_eq!(out.row_count(), 1);
        assert_eq!(
            out.column("sum_revenue").unwrap().value(0).as_f64(),
            Some(114.0)
        );
    }

    #[test]
    fn grouped_mean_in_first_appearance_order() {
        let out = run_agg(AggFunc::Mean, Some("region"));
        // missing group key row dropped
        assert_eq!(out.row_count(), 2);
        assert_eq!(out.column("region").unwrap().value(0), &Value::from("east"));
        assert_eq!(
            out.column("mean_revenue").unwrap().value(0).as_f64(),
            Some(7.5)
        );
        // the "west" group is all-missing: aggregate is missing, not zero
        assert!(out.column("mean_revenue").unwrap().value(1).is_missing());
    }

    #[test]
    fn count_counts_non_missing_only() {
        let out = run_agg(AggFunc::Count, None);
        assert_eq!(out.column("count_revenue").unwrap().value(0), &Value::Int(3));
    }

    #[test]
    fn int_sum_stays_int() {
        let f = Frame::from_columns(
            "t",
            vec![(
                "n".into(),
                ColumnType::Int,
                vec![Value::Int(2), Value::Int(3)],
            )],
        )
        .unwrap();
        let params = AggregateParams {
            column: "n".into(),
            func: AggFunc::Sum,
            group_by: None,
        };
        match run(&params, &f).unwrap() {
            ArtifactPayload::Table(out) => {
                assert_eq!(out.column("sum_n").unwrap().value(0), &Value::Int(5));
            }
            other => panic!("unexpected payload: {other:?}"),
        }
    }

    #[test]
    fn sum_over_text_is_recoverable() {
        let params = AggregateParams {
            column: "region".into(),
            func: AggFunc::Sum,
            group_by: None,
        };
        assert!(matches!(
            run(&params, &frame()),
            Err(OpError::BadColumn { .. })
        ));
    }
}
