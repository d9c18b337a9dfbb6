//! Frame schemas and prompt-facing summaries
//!
//! A [`Schema`] is the ordered list of declared columns. A
//! [`SchemaSummary`] is the bounded description sent to the language-model
//! service: names, types, row count, missing counts, and a capped handful of
//! sample values, never full row data, to keep prompts bounded.

use crate::value::{ColumnType, Value};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One declared column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDef {
    /// Column name (unique within a schema)
    pub name: String,
    /// Declared type
    pub ty: ColumnType,
}

impl ColumnDef {
    /// Create a column definition
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>, ty: ColumnType) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

/// Ordered column list of a frame
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    /// Columns in declaration order
    pub columns: Vec<ColumnDef>,
}

impl Schema {
    /// Build from column definitions
    #[inline]
    #[must_use]
    pub fn new(columns: Vec<ColumnDef>) -> Self {
        Self { columns }
    }

    /// Declared type of `name`, if the column exists
    #[must_use]
    pub fn column_type(&self, name: &str) -> Option<ColumnType> {
        self.columns.iter().find(|c| c.name == name).map(|c| c.ty)
    }

    /// Whether the schema declares `name`
    #[inline]
    #[must_use]
    pub fn has_column(&self, name: &str) -> bool {
        self.column_type(name).is_some()
    }

    /// Column names in declaration order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }

    /// Number of columns
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Whether the schema is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for c in &self.columns {
            if !first {
                write!(f, ", ")?;
            }
            write!(f, "{}:{}", c.name, c.ty)?;
            first = false;
        }
        Ok(())
    }
}

/// Per-column slice of a [`SchemaSummary`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ColumnSummary {
    /// Column name
    pub name: String,
    /// Declared type
    pub ty: ColumnType,
    /// Count of missing cells
    pub missing: usize,
    /// Up to a handful of leading non-missing values
    pub sample: Vec<Value>,
}

/// Bounded, prompt-safe description of a frame
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchemaSummary {
    /// Dataset name (file stem of the upload)
    pub dataset: String,
    /// Total row count
    pub row_count: usize,
    /// Column descriptions in declaration order
    pub columns: Vec<ColumnSummary>,
}

impl SchemaSummary {
    /// Render as compact JSON for prompt embedding
    #[must_use]
    pub fn to_prompt_json(&self) -> String {
        // serde_json only fails on non-string map keys; none here
        serde_json::to_string(self).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> Schema {
        Schema::new(vec![
            ColumnDef::new("date", ColumnType::Text),
            ColumnDef::new("revenue", ColumnType::Float),
        ])
    }

    #[test]
    fn lookup_by_name() {
        let s = schema();
        assert_eq!(s.column_type("revenue"), Some(ColumnType::Float));
        assert_eq!(s.column_type("profit"), None);
        assert!(s.has_column("date"));
    }

    #[test]
    fn display_is_compact() {
        assert_eq!(schema().to_string(), "date:text, revenue:float");
    }
}
