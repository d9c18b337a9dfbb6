//! Statistical tests
//!
//! Welch's unequal-variance t-test and Pearson correlation. The t-test draws
//! each sample from its column independently, skipping missing cells; the
//! correlation uses pairwise-complete rows only. Inputs too small or too flat
//! to define the statistic fail the step with [`OpError::Degenerate`].

use crate::artifact::{ArtifactPayload, StatsTable};
use crate::ops::{numeric_values, OpError};
use analyst_frame::{Frame, Value};
use analyst_plan::StatTestParams;

pub(crate) fn run(params: &StatTestParams, input: &Frame) -> Result<ArtifactPayload, OpError> {
    let table = match params {
        StatTestParams::TTest { column_a, column_b } => welch_t(input, column_a, column_b)?,
        StatTestParams::Correlation { column_a, column_b } => pearson(input, column_a, column_b)?,
    };
    Ok(ArtifactPayload::Stats(table))
}

fn welch_t(input: &Frame, column_a: &str, column_b: &str) -> Result<StatsTable, OpError> {
    let a = numeric_values(input, column_a)?;
    let b = numeric_values(input, column_b)?;
    if a.len() < 2 || b.len() < 2 {
        return Err(OpError::Degenerate(
            "t-test needs at least two observations per sample".into(),
        ));
    }
    let (mean_a, var_a) = mean_and_variance(&a);
    let (mean_b, var_b) = mean_and_variance(&b);
    let se_a = var_a / a.len() as f64;
    let se_b = var_b / b.len() as f64;
    if se_a + se_b == 0.0 {
        return Err(OpError::Degenerate(
            "both samples have zero variance".into(),
        ));
    }
    let t = (mean_a - mean_b) / (se_a + se_b).sqrt();
    // Welch-Satterthwaite degrees of freedom
    let df = (se_a + se_b).powi(2)
        / (se_a.powi(2) / (a.len() as f64 - 1.0) + se_b.powi(2) / (b.len() as f64 - 1.0));

    Ok(StatsTable {
        title: "welch_t_test".into(),
        metrics: vec![
            ("t_statistic".into(), Value::finite_float(t)),
            ("degrees_of_freedom".into(), Value::finite_float(df)),
            (format!("mean_{column_a}"), Value::finite_float(mean_a)),
            (format!("mean_{column_b}"), Value::finite_float(mean_b)),
            (format!("n_{column_a}"), Value::Int(a.len() as i64)),
            (format!("n_{column_b}"), Value::Int(b.len() as i64)),
        ],
    })
}

fn pearson(input: &Frame, column_a: &str, column_b: &str) -> Result<StatsTable, OpError> {
    let (a, b) = pairwise_complete(input, column_a, column_b)?;
    if a.len() < 2 {
        return Err(OpError::Degenerate(
            "correlation needs at least two complete pairs".into(),
        ));
    }
    let n = a.len() as f64;
    let mean_a = a.iter().sum::<f64>() / n;
    let mean_b = b.iter().sum::<f64>() / n;
    let mut cov = 0.0;
    let mut ss_a = 0.0;
    let mut ss_b = 0.0;
    for (&x, &y) in a.iter().zip(&b) {
        let dx = x - mean_a;
        let dy = y - mean_b;
        cov += dx * dy;
        ss_a += dx * dx;
        ss_b += dy * dy;
    }
    if ss_a == 0.0 || ss_b == 0.0 {
        return Err(OpError::Degenerate(
            "correlation undefined for a constant column".into(),
        ));
    }
    let r = cov / (ss_a.sqrt() * ss_b.sqrt());

    Ok(StatsTable {
        title: "pearson_correlation".into(),
        metrics: vec![
            ("r".into(), Value::finite_float(r)),
            ("n_pairs".into(), Value::Int(a.len() as i64)),
        ],
    })
}

/// Rows where both columns hold a numeric value
fn pairwise_complete(
    input: &Frame,
    column_a: &str,
    column_b: &str,
) -> Result<(Vec<f64>, Vec<f64>), OpError> {
    let col_a = checked_numeric(input, column_a)?;
    let col_b = checked_numeric(input, column_b)?;
    let mut a = Vec::new();
    let mut b = Vec::new();
    for row in 0..input.row_count() {
        if let (Some(x), Some(y)) = (col_a.value(row).as_f64(), col_b.value(row).as_f64()) {
            a.push(x);
            b.push(y);
        }
    }
    Ok((a, b))
}

fn checked_numeric<'a>(
    input: &'a Frame,
    column: &str,
) -> Result<&'a analyst_frame::Column, OpError> {
    let col = input
        .column(column)
        .ok_or_else(|| OpError::bad_column(column, "not present"))?;
    if !col.ty.is_numeric() {
        return Err(OpError::bad_column(
            column,
            format!("expected numeric, found {}", col.ty),
        ));
    }
    Ok(col)
}

/// Sample mean and unbiased sample variance
fn mean_and_variance(xs: &[f64]) -> (f64, f64) {
    let n = xs.len() as f64;
    let mean = xs.iter().sum::<f64>() / n;
    let var = xs.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1.0);
    (mean, var)
}

#[cfg(test)]
mod tests {
    use super::*;
    use analyst_frame::ColumnType;

    fn two_column_frame(a: Vec<Value>, b: Vec<Value>) -> Frame {
        Frame::from_columns(
            "t",
            vec![
                ("a".into(), ColumnType::Float, a),
                ("b".into(), ColumnType::Float, b),
            ],
        )
        .unwrap()
    }

    fn stats(payload: ArtifactPayload) -> StatsTable {
        match payload {
            ArtifactPayload::Stats(t) => t,
            other => panic!("unexpected payload: {other:?}"),
        }
    }

    #[test]
    fn welch_t_on_identical_samples_is_zero() {
        let frame = two_column_frame(
            vec![Value::Float(1.0), Value::Float(2.0), Value::Float(3.0)],
            vec![Value::Float(1.0), Value::Float(2.0), Value::Float(3.0)],
        );
        let params = StatTestParams::TTest {
            column_a: "a".into(),
            column_b: "b".into(),
        };
        let table = stats(run(&params, &frame).unwrap());
        assert_eq!(table.metric("t_statistic"), Some(&Value::Float(0.0)));
        assert_eq!(table.metric("n_a"), Some(&Value::Int(3)));
    }

    #[test]
    fn welch_t_skips_missing_per_column() {
        let frame = two_column_frame(
            vec![Value::Float(1.0), Value::Missing, Value::Float(3.0)],
            vec![Value::Float(5.0), Value::Float(6.0), Value::Float(7.0)],
        );
        let params = StatTestParams::TTest {
            column_a: "a".into(),
            column_b: "b".into(),
        };
        let table = stats(run(&params, &frame).unwrap());
        assert_eq!(table.metric("n_a"), Some(&Value::Int(2)));
        assert_eq!(table.metric("n_b"), Some(&Value::Int(3)));
    }

    #[test]
    fn perfect_correlation() {
        let frame = two_column_frame(
            vec![Value::Float(1.0), Value::Float(2.0), Value::Float(3.0)],
            vec![Value::Float(2.0), Value::Float(4.0), Value::Float(6.0)],
        );
        let params = StatTestParams::Correlation {
            column_a: "a".into(),
            column_b: "b".into(),
        };
        let table = stats(run(&params, &frame).unwrap());
        let r = table.metric("r").and_then(Value::as_f64).unwrap();
        assert!((r - 1.0).abs() < 1e-12);
    }

    #[test]
    fn correlation_drops_incomplete_pairs() {
        let frame = two_column_frame(
            vec![Value::Float(1.0), Value::Missing, Value::Float(3.0)],
            vec![Value::Float(2.0), Value::Float(9.0), Value::Missing],
        );
        let params = StatTestParams::Correlation {
            column_a: "a".into(),
            column_b: "b".into(),
        };
        let err = run(&params, &frame).unwrap_err();
        // only one complete pair survives
        assert!(matches!(err, OpError::Degenerate(_)));
    }

    #[test]
    fn constant_column_is_degenerate() {
        let frame = two_column_frame(
            vec![Value::Float(4.0), Value::Float(4.0), Value::Float(4.0)],
            vec![Value::Float(1.0), Value::Float(2.0), Value::Float(3.0)],
        );
        let params = StatTestParams::Correlation {
            column_a: "a".into(),
            column_b: "b".into(),
        };
        assert!(matches!(
            run(&params, &frame).unwrap_err(),
            OpError::Degenerate(_)
        ));
    }

    #[test]
    fn text_column_is_a_bad_column() {
        let frame = Frame::from_columns(
            "t",
            vec![
                ("a".into(), ColumnType::Text, vec![Value::from("x")]),
                ("b".into(), ColumnType::Float, vec![Value::Float(1.0)]),
            ],
        )
        .unwrap();
        let params = StatTestParams::TTest {
            column_a: "a".into(),
            column_b: "b".into(),
        };
        assert!(matches!(
            run(&params, &frame).unwrap_err(),
            OpError::BadColumn { .. }
        ));
    }
}
