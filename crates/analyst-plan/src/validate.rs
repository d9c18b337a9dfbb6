//! Plan validation
//!
//! Turns raw model text into a validated [`Plan`] or rejects it whole.
//! Pipeline: structural decode, per-step parameter decoding, reference
//! resolution, cycle detection, then a shape-propagation walk that checks
//! every column reference against the schema each step actually sees.

use crate::error::PlanError;
use crate::graph::Plan;
use crate::step::{
    AggFunc, AggregateParams, ArithOp, FilterParams, InputRef, NarrateParams, Operand,
    StatTestParams, Step, StepId, StepOp, TransformParams, VisualizeParams,
};
use crate::wire::{extract_payload, RawPlan, DATASET_REF};
use analyst_frame::{ColumnDef, ColumnType, Schema};
use std::collections::{HashMap, HashSet};

/// What a step's output looks like to its dependents
#[derive(Debug, Clone)]
pub enum StepShape {
    /// A table with a known schema
    Tabular(Schema),
    /// A statistics table (opaque to column references)
    Stats,
    /// A chart specification
    Chart,
    /// A text fragment
    Text,
}

/// Parse raw model text and validate it against the dataset schema
///
/// # Errors
/// Any [`PlanError`] rejects the entire plan; no partial acceptance.
pub fn parse_and_validate(raw: &str, schema: &Schema) -> Result<Plan, PlanError> {
    let payload = extract_payload(raw);
    let raw_plan: RawPlan = serde_json::from_str(payload)
        .map_err(|e| PlanError::MalformedStructure(e.to_string()))?;
    validate(raw_plan, schema)
}

/// Validate an already-decoded raw plan
pub fn validate(raw: RawPlan, schema: &Schema) -> Result<Plan, PlanError> {
    if raw.steps.is_empty() {
        return Err(PlanError::MalformedStructure("plan has no steps".into()));
    }

    // unique ids
    let mut seen = HashSet::new();
    for s in &raw.steps {
        if !seen.insert(s.id.as_str()) {
            return Err(PlanError::DuplicateStep(StepId::new(&s.id)));
        }
    }
    let known_ids: HashSet<&str> = seen;

    // decode params, resolve references
    let mut steps = Vec::with_capacity(raw.steps.len());
    for (index, rs) in raw.steps.iter().enumerate() {
        let id = StepId::new(&rs.id);
        let op = decode_op(&id, &rs.operation, rs.params.clone())?;

        let mut inputs = Vec::with_capacity(rs.inputs.len());
        for reference in &rs.inputs {
            if reference == DATASET_REF {
                inputs.push(InputRef::Dataset);
            } else if known_ids.contains(reference.as_str()) {
                inputs.push(InputRef::Step(StepId::new(reference)));
            } else {
                return Err(PlanError::DanglingReference {
                    step: id,
                    reference: reference.clone(),
                });
            }
        }
        check_arity(&id, &op, inputs.len())?;
        steps.push(Step {
            id,
            op,
            inputs,
            index,
        });
    }

    // acyclicity + deterministic order
    let plan = Plan::build(steps)?;

    // shape propagation in execution order
    let mut shapes: HashMap<StepId, StepShape> = HashMap::new();
    for step in plan.execution_order() {
        let shape = check_step(step, schema, &shapes)?;
        shapes.insert(step.id.clone(), shape);
    }

    tracing::debug!(steps = plan.len(), "plan accepted");
    Ok(plan)
}

fn decode_op(
    id: &StepId,
    operation: &str,
    params: serde_json::Value,
) -> Result<StepOp, PlanError> {
    let malformed = |e: serde_json::Error| {
        PlanError::MalformedStructure(format!("step {id}: bad {operation} params: {e}"))
    };
    match operation {
        "filter" => Ok(StepOp::Filter(
            serde_json::from_value::<FilterParams>(params).map_err(malformed)?,
        )),
        "aggregate" => Ok(StepOp::Aggregate(
            serde_json::from_value::<AggregateParams>(params).map_err(malformed)?,
        )),
        "transform" => {
            let p = serde_json::from_value::<TransformParams>(params).map_err(malformed)?;
            if let TransformParams::Sample { fraction, .. } = &p {
                if !(*fraction > 0.0 && *fraction <= 1.0) {
                    return Err(PlanError::MalformedStructure(format!(
                        "step {id}: sample fraction {fraction} outside (0, 1]"
                    )));
                }
            }
            Ok(StepOp::Transform(p))
        }
        "stat_test" => Ok(StepOp::StatTest(
            serde_json::from_value::<StatTestParams>(params).map_err(malformed)?,
        )),
        "visualize" => Ok(StepOp::Visualize(
            serde_json::from_value::<VisualizeParams>(params).map_err(malformed)?,
        )),
        "narrate" => Ok(StepOp::Narrate(if params.is_null() {
            NarrateParams::default()
        } else {
            serde_json::from_value::<NarrateParams>(params).map_err(malformed)?
        })),
        other => Err(PlanError::UnknownOperation {
            step: id.clone(),
            operation: other.to_string(),
        }),
    }
}

fn check_arity(id: &StepId, op: &StepOp, inputs: usize) -> Result<(), PlanError> {
    let ok = match op {
        StepOp::Narrate(_) => inputs >= 1,
        _ => inputs == 1,
    };
    if ok {
        Ok(())
    } else {
        Err(PlanError::MalformedStructure(format!(
            "step {id}: {} takes {} input(s), found {inputs}",
            op.kind(),
            if matches!(op, StepOp::Narrate(_)) { "at least 1" } else { "exactly 1" },
        )))
    }
}

/// Schema a single tabular input presents to `step`
fn tabular_input<'a>(
    step: &Step,
    schema: &'a Schema,
    shapes: &'a HashMap<StepId, StepShape>,
) -> Result<&'a Schema, PlanError> {
    match &step.inputs[0] {
        InputRef::Dataset => Ok(schema),
        InputRef::Step(id) => match shapes.get(id) {
            Some(StepShape::Tabular(s)) => Ok(s),
            Some(_) => Err(PlanError::SchemaMismatch {
                step: step.id.clone(),
                column: String::new(),
                detail: format!("input step '{id}' does not produce a table"),
            }),
            // execution order guarantees the shape exists
            None => unreachable!("input shape missing for {id}"),
        },
    }
}

fn require_column(
    step: &StepId,
    schema: &Schema,
    column: &str,
) -> Result<ColumnType, PlanError> {
    schema
        .column_type(column)
        .ok_or_else(|| PlanError::SchemaMismatch {
            step: step.clone(),
            column: column.to_string(),
            detail: "not present in schema".into(),
        })
}

fn require_numeric(
    step: &StepId,
    schema: &Schema,
    column: &str,
) -> Result<ColumnType, PlanError> {
    let ty = require_column(step, schema, column)?;
    if ty.is_numeric() {
        Ok(ty)
    } else {
        Err(PlanError::SchemaMismatch {
            step: step.clone(),
            column: column.to_string(),
            detail: format!("expected a numeric column, found {ty}"),
        })
    }
}

fn check_step(
    step: &Step,
    schema: &Schema,
    shapes: &HashMap<StepId, StepShape>,
) -> Result<StepShape, PlanError> {
    match &step.op {
        StepOp::Filter(p) => {
            let input = tabular_input(step, schema, shapes)?;
            let ty = require_column(&step.id, input, &p.column)?;
            let compatible = match ty {
                ColumnType::Int | ColumnType::Float => {
                    p.value.as_f64().is_some()
                }
                ColumnType::Bool => matches!(p.value, analyst_frame::Value::Bool(_)),
                ColumnType::Text => matches!(p.value, analyst_frame::Value::Text(_)),
            };
            if !compatible {
                return Err(PlanError::SchemaMismatch {
                    step: step.id.clone(),
                    column: p.column.clone(),
                    detail: format!("literal is not comparable with a {ty} column"),
                });
            }
            Ok(StepShape::Tabular(input.clone()))
        }
        StepOp::Aggregate(p) => {
            let input = tabular_input(step, schema, shapes)?;
            let value_ty = if p.func == AggFunc::Count {
                require_column(&step.id, input, &p.column)?
            } else {
                require_numeric(&step.id, input, &p.column)?
            };
            let mut columns = Vec::new();
            if let Some(group) = &p.group_by {
                let group_ty = require_column(&step.id, input, group)?;
                columns.push(ColumnDef::new(group.clone(), group_ty));
            }
            columns.push(ColumnDef::new(
                p.func.output_column(&p.column),
                aggregate_output_type(p.func, value_ty),
            ));
            Ok(StepShape::Tabular(Schema::new(columns)))
        }
        StepOp::Transform(p) => {
            let input = tabular_input(step, schema, shapes)?;
            match p {
                TransformParams::Derive {
                    target,
                    left,
                    op,
                    right,
                } => {
                    if input.has_column(target) {
                        return Err(PlanError::SchemaMismatch {
                            step: step.id.clone(),
                            column: target.clone(),
                            detail: "derived column already exists".into(),
                        });
                    }
                    let lt = operand_type(&step.id, input, left)?;
                    let rt = operand_type(&step.id, input, right)?;
                    let out_ty = if *op == ArithOp::Div
                        || lt == ColumnType::Float
                        || rt == ColumnType::Float
                    {
                        ColumnType::Float
                    } else {
                        ColumnType::Int
                    };
                    let mut columns = input.columns.clone();
                    columns.push(ColumnDef::new(target.clone(), out_ty));
                    Ok(StepShape::Tabular(Schema::new(columns)))
                }
                TransformParams::Sample { .. } => Ok(StepShape::Tabular(input.clone())),
            }
        }
        StepOp::StatTest(p) => {
            let input = tabular_input(step, schema, shapes)?;
            let (a, b) = match p {
                StatTestParams::TTest { column_a, column_b }
                | StatTestParams::Correlation { column_a, column_b } => (column_a, column_b),
            };
            require_numeric(&step.id, input, a)?;
            require_numeric(&step.id, input, b)?;
            Ok(StepShape::Stats)
        }
        StepOp::Visualize(p) => {
            let input = tabular_input(step, schema, shapes)?;
            require_column(&step.id, input, &p.x)?;
            if let Some(y) = &p.y {
                require_column(&step.id, input, y)?;
            }
            Ok(StepShape::Chart)
        }
        StepOp::Narrate(_) => Ok(StepShape::Text),
    }
}

fn operand_type(
    step: &StepId,
    schema: &Schema,
    operand: &Operand,
) -> Result<ColumnType, PlanError> {
    match operand {
        Operand::Column { column } => require_numeric(step, schema, column),
        Operand::Literal(v) => match v.column_type() {
            Some(t) if t.is_numeric() => Ok(t),
            _ => Err(PlanError::MalformedStructure(format!(
                "step {step}: derive operand literal must be numeric"
            ))),
        },
    }
}

/// Output type of an aggregation over a column of `input` type
fn aggregate_output_type(func: AggFunc, input: ColumnType) -> ColumnType {
    match func {
        AggFunc::Count => ColumnType::Int,
        AggFunc::Mean => ColumnType::Float,
        AggFunc::Sum | AggFunc::Min | AggFunc::Max => input,
    }
}
