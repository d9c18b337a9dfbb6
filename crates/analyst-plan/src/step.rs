//! Typed steps
//!
//! The closed set of operations a plan may contain. The plan's shape is
//! model-authored and unknown at build time, so every kind carries a typed
//! parameter record that is decoded and checked eagerly at parse time;
//! nothing reaches the executor unchecked.

use analyst_frame::Value;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Model-authored step identifier, unique within a plan
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct StepId(pub String);

impl StepId {
    /// Wrap a raw id
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Raw id string
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for StepId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// Resolved step input: the session dataset or a prior step's output
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum InputRef {
    /// The literal `"dataset"` reference
    Dataset,
    /// Output of another step in the same plan
    Step(StepId),
}

impl fmt::Display for InputRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Dataset => write!(f, "dataset"),
            Self::Step(id) => write!(f, "{id}"),
        }
    }
}

/// Comparison operator for filter steps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Comparator {
    #[serde(alias = "==", alias = "=")]
    Eq,
    #[serde(alias = "!=")]
    Ne,
    #[serde(alias = "<")]
    Lt,
    #[serde(alias = "<=")]
    Le,
    #[serde(alias = ">")]
    Gt,
    #[serde(alias = ">=")]
    Ge,
}

/// Parameters of a filter step
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct FilterParams {
    /// Column the predicate reads
    pub column: String,
    /// Comparison operator
    pub op: Comparator,
    /// Literal to compare against
    pub value: Value,
}

/// Aggregation function
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum AggFunc {
    Sum,
    Mean,
    Min,
    Max,
    Count,
}

impl AggFunc {
    /// Name used for the output column, e.g. `sum_revenue`
    #[must_use]
    pub fn output_column(self, column: &str) -> String {
        let prefix = match self {
            Self::Sum => "sum",
            Self::Mean => "mean",
            Self::Min => "min",
            Self::Max => "max",
            Self::Count => "count",
        };
        format!("{prefix}_{column}")
    }
}

/// Parameters of an aggregate step
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct AggregateParams {
    /// Column to aggregate
    pub column: String,
    /// Aggregation function
    pub func: AggFunc,
    /// Optional grouping column
    #[serde(default)]
    pub group_by: Option<String>,
}

/// Arithmetic operator for derived columns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ArithOp {
    #[serde(alias = "+")]
    Add,
    #[serde(alias = "-")]
    Sub,
    #[serde(alias = "*")]
    Mul,
    #[serde(alias = "/")]
    Div,
}

/// One operand of a derived-column expression
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum Operand {
    /// A column reference, written `{"column": "revenue"}`
    Column {
        /// Referenced column
        column: String,
    },
    /// A literal value
    Literal(Value),
}

/// Parameters of a transform step
///
/// `derive` adds a computed column; `sample` draws a seeded random subset.
/// The seed is required: sampling is the one operation that would otherwise
/// be non-deterministic, and re-running a plan must reproduce its artifacts.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "kind", rename_all = "snake_case", deny_unknown_fields)]
pub enum TransformParams {
    /// Derive a new column from an arithmetic expression
    Derive {
        /// Name of the new column
        target: String,
        /// Left operand
        left: Operand,
        /// Operator
        op: ArithOp,
        /// Right operand
        right: Operand,
    },
    /// Seeded random row sample
    Sample {
        /// Fraction of rows to keep, in (0, 1]
        fraction: f64,
        /// Explicit RNG seed
        seed: u64,
    },
}

/// Parameters of a statistical-test step
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "test", rename_all = "snake_case", deny_unknown_fields)]
pub enum StatTestParams {
    /// Welch two-sample t-test between two numeric columns
    TTest {
        /// First sample column
        column_a: String,
        /// Second sample column
        column_b: String,
    },
    /// Pearson correlation between two numeric columns
    Correlation {
        /// First column
        column_a: String,
        /// Second column
        column_b: String,
    },
}

/// Chart mark type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum MarkType {
    Bar,
    Line,
    Point,
    Area,
}

/// Parameters of a visualize step
///
/// Produces a declarative chart specification; rendering belongs to an
/// external collaborator.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct VisualizeParams {
    /// Mark type
    pub mark: MarkType,
    /// Column encoded on the x axis
    pub x: String,
    /// Column encoded on the y axis, if any
    #[serde(default)]
    pub y: Option<String>,
    /// Chart title
    #[serde(default)]
    pub title: Option<String>,
}

/// Parameters of a narrate step
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct NarrateParams {
    /// Optional heading for the narrative fragment
    #[serde(default)]
    pub title: Option<String>,
}

/// A step's operation with its validated parameter record
#[derive(Debug, Clone)]
pub enum StepOp {
    Filter(FilterParams),
    Aggregate(AggregateParams),
    Transform(TransformParams),
    StatTest(StatTestParams),
    Visualize(VisualizeParams),
    Narrate(NarrateParams),
}

impl StepOp {
    /// Wire name of the operation kind
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Filter(_) => "filter",
            Self::Aggregate(_) => "aggregate",
            Self::Transform(_) => "transform",
            Self::StatTest(_) => "stat_test",
            Self::Visualize(_) => "visualize",
            Self::Narrate(_) => "narrate",
        }
    }
}

/// One validated, immutable plan step
#[derive(Debug, Clone)]
pub struct Step {
    /// Model-authored id
    pub id: StepId,
    /// Operation and parameters
    pub op: StepOp,
    /// Resolved inputs
    pub inputs: Vec<InputRef>,
    /// Position in the original declaration order (deterministic tie-break)
    pub index: usize,
}
