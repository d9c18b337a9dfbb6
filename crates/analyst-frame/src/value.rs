//! Cell values and column types
//!
//! Every cell in a [`Frame`](crate::Frame) holds a [`Value`]. A column
//! declares a [`ColumnType`], and the frame invariant is that every
//! non-missing value in the column matches it. `Missing` is a first-class
//! sentinel: numeric operations propagate it, they never coerce it to zero.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Declared type of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    /// 64-bit signed integer
    Int,
    /// 64-bit floating point
    Float,
    /// Boolean
    Bool,
    /// UTF-8 text
    Text,
}

impl ColumnType {
    /// Whether values of this type can be used in arithmetic
    #[inline]
    #[must_use]
    pub fn is_numeric(self) -> bool {
        matches!(self, Self::Int | Self::Float)
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Int => "int",
            Self::Float => "float",
            Self::Bool => "bool",
            Self::Text => "text",
        };
        write!(f, "{s}")
    }
}

/// One cell value
///
/// Wire form is untagged JSON: numbers, strings, booleans, and `null` for
/// missing. Integer-looking numbers decode as `Int`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum Value {
    /// Boolean
    Bool(bool),
    /// Integer
    Int(i64),
    /// Float
    Float(f64),
    /// Text
    Text(String),
    /// Missing sentinel (JSON `null`)
    Missing,
}

impl Value {
    /// Runtime type, or `None` for missing
    #[inline]
    #[must_use]
    pub fn column_type(&self) -> Option<ColumnType> {
        match self {
            Self::Int(_) => Some(ColumnType::Int),
            Self::Float(_) => Some(ColumnType::Float),
            Self::Bool(_) => Some(ColumnType::Bool),
            Self::Text(_) => Some(ColumnType::Text),
            Self::Missing => None,
        }
    }

    /// Whether this is the missing sentinel
    #[inline]
    #[must_use]
    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Missing)
    }

    /// Whether this value may live in a column of `ty`
    ///
    /// Missing is admissible everywhere. `Int` values are admissible in
    /// `Float` columns (widening); nothing else cross-types.
    #[must_use]
    pub fn admissible_in(&self, ty: ColumnType) -> bool {
        match self.column_type() {
            None => true,
            Some(t) if t == ty => true,
            Some(ColumnType::Int) => ty == ColumnType::Float,
            Some(_) => false,
        }
    }

    /// Numeric view, widening ints to floats
    #[inline]
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(*i as f64),
            Self::Float(f) => Some(*f),
            _ => None,
        }
    }

    /// Integer view (no float narrowing)
    #[inline]
    #[must_use]
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Compare two values for filtering
    ///
    /// Numeric values compare across `Int`/`Float`. Text compares
    /// lexicographically, booleans as `false < true`. Any comparison
    /// involving missing or mismatched types yields `None`, which filter
    /// predicates treat as "excluded".
    #[must_use]
    pub fn partial_cmp_cell(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Self::Text(a), Self::Text(b)) => Some(a.cmp(b)),
            (Self::Bool(a), Self::Bool(b)) => Some(a.cmp(b)),
            _ => {
                let a = self.as_f64()?;
                let b = other.as_f64()?;
                a.partial_cmp(&b)
            }
        }
    }

    /// Equality for filtering, with the same cross-type rules as
    /// [`partial_cmp_cell`](Self::partial_cmp_cell)
    #[inline]
    #[must_use]
    pub fn eq_cell(&self, other: &Value) -> bool {
        self.partial_cmp_cell(other) == Some(Ordering::Equal)
    }

    /// Float constructor that folds non-finite results into missing
    ///
    /// Division by zero and overflow produce `Missing`, never `inf`/`NaN`
    /// cells.
    #[inline]
    #[must_use]
    pub fn finite_float(f: f64) -> Self {
        if f.is_finite() {
            Self::Float(f)
        } else {
            Self::Missing
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Text(s) => write!(f, "{s}"),
            Self::Missing => write!(f, ""),
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::finite_float(v)
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}
