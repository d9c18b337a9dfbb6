//! Transforms: derived columns and seeded sampling
//!
//! Derive evaluates a row-wise arithmetic expression. Missing operands
//! propagate missing; integer division promotes to float; division by zero
//! and overflow become missing cells. Sampling draws from an RNG seeded by
//! the plan itself, so re-running a plan reproduces the same rows.

use crate::artifact::ArtifactPayload;
use crate::ops::OpError;
use analyst_frame::{ColumnType, Frame, Value};
use analyst_plan::{ArithOp, Operand, TransformParams};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::sync::Arc;

pub(crate) fn run(params: &TransformParams, input: &Frame) -> Result<ArtifactPayload, OpError> {
    match params {
        TransformParams::Derive {
            target,
            left,
            op,
            right,
        } => derive(input, target, left, *op, right),
        TransformParams::Sample { fraction, seed } => sample(input, *fraction, *seed),
    }
}

fn derive(
    input: &Frame,
    target: &str,
    left: &Operand,
    op: ArithOp,
    right: &Operand,
) -> Result<ArtifactPayload, OpError> {
    let lhs = resolve(input, left)?;
    let rhs = resolve(input, right)?;

    let float_out = op == ArithOp::Div
        || lhs.ty() == ColumnType::Float
        || rhs.ty() == ColumnType::Float;
    let out_ty = if float_out {
        ColumnType::Float
    } else {
        ColumnType::Int
    };

    let values: Vec<Value> = (0..input.row_count())
        .map(|row| evaluate(&lhs.at(row), op, &rhs.at(row), float_out))
        .collect();

    let frame = input
        .with_column(target, out_ty, values)
        .map_err(|e| OpError::bad_column(target, e.to_string()))?;
    Ok(ArtifactPayload::Table(Arc::new(frame)))
}

fn evaluate(left: &Value, op: ArithOp, right: &Value, float_out: bool) -> Value {
    let (Some(a), Some(b)) = (left.as_f64(), right.as_f64()) else {
        return Value::Missing;
    };
    if float_out {
        let out = match op {
            ArithOp::Add => a + b,
            ArithOp::Sub => a - b,
            ArithOp::Mul => a * b,
            ArithOp::Div => a / b,
        };
        return Value::finite_float(out);
    }
    // both operands integral by construction
    let (Some(a), Some(b)) = (left.as_i64(), right.as_i64()) else {
        return Value::Missing;
    };
    let out = match op {
        ArithOp::Add => a.checked_add(b),
        ArithOp::Sub => a.checked_sub(b),
        ArithOp::Mul => a.checked_mul(b),
        ArithOp::Div => unreachable!("division always produces floats"),
    };
    out.map(Value::Int).unwrap_or(Value::Missing)
}

fn sample(input: &Frame, fraction: f64, seed: u64) -> Result<ArtifactPayload, OpError> {
    if input.row_count() == 0 {
        return Err(OpError::EmptyInput("no rows to sample".into()));
    }
    let amount = ((input.row_count() as f64) * fraction).round().max(1.0) as usize;
    let amount = amount.min(input.row_count());

    let mut rng = StdRng::seed_from_u64(seed);
    let mut indices: Vec<usize> =
        rand::seq::index::sample(&mut rng, input.row_count(), amount).into_vec();
    // preserve original row order within the sample
    indices.sort_unstable();

    Ok(ArtifactPayload::Table(Arc::new(input.take_rows(&indices))))
}

/// A resolved operand: a borrowed column or a broadcast literal
enum Resolved<'a> {
    Column(&'a analyst_frame::Column),
    Literal(Value),
}

impl Resolved<'_> {
    fn ty(&self) -> ColumnType {
        match self {
            Resolved::Column(c) => c.ty,
            Resolved::Literal(v) => v.column_type().unwrap_or(ColumnType::Float),
        }
    }

    fn at(&self, row: usize) -> Value {
        match self {
            Resolved::Column(c) => c.value(row).clone(),
            Resolved::Literal(v) => v.clone(),
        }
    }
}

fn resolve<'a>(input: &'a Frame, operand: &Operand) -> Result<Resolved<'a>, OpError> {
    match operand {
        Operand::Column { column } => {
            let col = input
                .column(column)
                .ok_or_else(|| OpError::bad_column(column, "not present"))?;
            if !col.ty.is_numeric() {
                return Err(OpError::bad_column(
                    column,
                    format!("expected numeric, found {}", col.ty),
                ));
            }
            Ok(Resolved::Column(col))
        }
        Operand::Literal(v) => {
            if v.as_f64().is_none() {
                return Err(OpError::Degenerate("non-numeric literal operand".into()));
            }
            Ok(Resolved::Literal(v.clone()))
        }
    }
}
