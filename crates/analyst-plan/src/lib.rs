//! analyst-plan: the plan wire contract, parser, and validator
//!
//! Model output is untrusted: it can hallucinate operations, reference
//! columns that do not exist, or wire steps into cycles. This crate turns
//! raw model text into a [`Plan`], a proof-carrying value whose existence
//! means the step graph is acyclic, every reference resolves, and every
//! parameter record matched its operation's schema. Rejection is
//! all-or-nothing; the executor never sees a partial plan.

pub mod error;
pub mod graph;
pub mod step;
pub mod validate;
pub mod wire;

pub use error::PlanError;
pub use graph::Plan;
pub use step::{
    AggFunc, AggregateParams, ArithOp, Comparator, FilterParams, InputRef, MarkType,
    NarrateParams, Operand, StatTestParams, Step, StepId, StepOp, TransformParams,
    VisualizeParams,
};
pub use validate::{parse_and_validate, validate, StepShape};
pub use wire::{extract_payload, wire_schema, RawPlan, RawStep, DATASET_REF};
