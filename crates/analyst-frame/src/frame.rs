//! Immutable column-major frames
//!
//! A [`Frame`] is one version of a tabular dataset. Frames are never mutated
//! in place: transform steps build a new frame, sharing untouched columns
//! through `Arc`. A superseded version stays alive exactly as long as some
//! artifact still holds it.

use crate::error::FrameError;
use crate::schema::{ColumnDef, ColumnSummary, Schema, SchemaSummary};
use crate::value::{ColumnType, Value};
use indexmap::IndexMap;
use serde::Serialize;
use std::sync::Arc;

/// Sample values carried per column in a [`SchemaSummary`]
const SUMMARY_SAMPLE_ROWS: usize = 5;

/// One typed column, cheaply cloneable
#[derive(Debug, Clone, Serialize)]
pub struct Column {
    /// Declared type
    pub ty: ColumnType,
    /// Cell values, one per row
    pub values: Arc<Vec<Value>>,
}

impl Column {
    /// Build a column, checking every cell against the declared type
    pub fn new(name: &str, ty: ColumnType, values: Vec<Value>) -> Result<Self, FrameError> {
        for (row, v) in values.iter().enumerate() {
            if !v.admissible_in(ty) {
                return Err(FrameError::TypeMismatch {
                    column: name.to_string(),
                    row,
                    expected: ty,
                });
            }
        }
        Ok(Self {
            ty,
            values: Arc::new(values),
        })
    }

    /// Cell at `row`
    #[inline]
    #[must_use]
    pub fn value(&self, row: usize) -> &Value {
        &self.values[row]
    }

    /// Count of missing cells
    #[must_use]
    pub fn missing_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_missing()).count()
    }
}

/// One immutable version of a tabular dataset
#[derive(Debug, Clone, Serialize)]
pub struct Frame {
    name: String,
    version: u64,
    row_count: usize,
    columns: IndexMap<String, Column>,
}

impl Frame {
    /// Build a frame from `(name, type, values)` triples
    ///
    /// # Errors
    /// Rejects duplicate column names, ragged column lengths, and cells that
    /// do not match their declared type.
    pub fn from_columns(
        name: impl Into<String>,
        columns: Vec<(String, ColumnType, Vec<Value>)>,
    ) -> Result<Self, FrameError> {
        let name = name.into();
        if columns.is_empty() {
            return Err(FrameError::EmptyInput(name));
        }
        let row_count = columns[0].2.len();
        let mut map = IndexMap::with_capacity(columns.len());
        for (col_name, ty, values) in columns {
            if values.len() != row_count {
                return Err(FrameError::LengthMismatch {
                    column: col_name,
                    expected: row_count,
                    actual: values.len(),
                });
            }
            let column = Column::new(&col_name, ty, values)?;
            if map.insert(col_name.clone(), column).is_some() {
                return Err(FrameError::DuplicateColumn(col_name));
            }
        }
        Ok(Self {
            name,
            version: 1,
            row_count,
            columns: map,
        })
    }

    /// Dataset name
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Version number within the dataset lineage
    #[inline]
    #[must_use]
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Number of rows
    #[inline]
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.row_count
    }

    /// Number of columns
    #[inline]
    #[must_use]
    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    /// Column by name
    #[inline]
    #[must_use]
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.get(name)
    }

    /// Column by name, as an error-carrying lookup
    pub fn require_column(&self, name: &str) -> Result<&Column, FrameError> {
        self.column(name)
            .ok_or_else(|| FrameError::UnknownColumn(name.to_string()))
    }

    /// Column names in declaration order
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.keys().map(String::as_str)
    }

    /// Iterate `(name, column)` pairs in declaration order
    pub fn columns(&self) -> impl Iterator<Item = (&str, &Column)> {
        self.columns.iter().map(|(n, c)| (n.as_str(), c))
    }

    /// Declared schema
    #[must_use]
    pub fn schema(&self) -> Schema {
        Schema::new(
            self.columns
                .iter()
                .map(|(n, c)| ColumnDef::new(n.clone(), c.ty))
                .collect(),
        )
    }

    /// Prompt-facing summary with capped sample values
    #[must_use]
    pub fn summary(&self) -> SchemaSummary {
        let columns = self
            .columns
            .iter()
            .map(|(n, c)| ColumnSummary {
                name: n.clone(),
                ty: c.ty,
                missing: c.missing_count(),
                sample: c
                    .values
                    .iter()
                    .filter(|v| !v.is_missing())
                    .take(SUMMARY_SAMPLE_ROWS)
                    .cloned()
                    .collect(),
            })
            .collect();
        SchemaSummary {
            dataset: self.name.clone(),
            row_count: self.row_count,
            columns,
        }
    }

    /// New version keeping rows where `mask` is true
    ///
    /// # Panics
    /// Debug-asserts that the mask covers every row.
    #[must_use]
    pub fn filter_rows(&self, mask: &[bool]) -> Self {
        debug_assert_eq!(mask.len(), self.row_count);
        let indices: Vec<usize> = mask
            .iter()
            .enumerate()
            .filter_map(|(i, keep)| keep.then_some(i))
            .collect();
        self.take_rows(&indices)
    }

    /// New version containing the given rows, in the given order
    #[must_use]
    pub fn take_rows(&self, indices: &[usize]) -> Self {
        let columns = self
            .columns
            .iter()
            .map(|(n, c)| {
                let values: Vec<Value> =
                    indices.iter().map(|&i| c.values[i].clone()).collect();
                (
                    n.clone(),
                    Column {
                        ty: c.ty,
                        values: Arc::new(values),
                    },
                )
            })
            .collect();
        Self {
            name: self.name.clone(),
            version: self.version + 1,
            row_count: indices.len(),
            columns,
        }
    }

    /// New version with an extra column appended
    ///
    /// Existing columns are shared, not copied.
    ///
    /// # Errors
    /// Rejects duplicate names, wrong lengths, and ill-typed cells.
    pub fn with_column(
        &self,
        name: impl Into<String>,
        ty: ColumnType,
        values: Vec<Value>,
    ) -> Result<Self, FrameError> {
        let name = name.into();
        if self.columns.contains_key(&name) {
            return Err(FrameError::DuplicateColumn(name));
        }
        if values.len() != self.row_count {
            return Err(FrameError::LengthMismatch {
                column: name,
                expected: self.row_count,
                actual: values.len(),
            });
        }
        let column = Column::new(&name, ty, values)?;
        let mut columns = self.columns.clone();
        columns.insert(name, column);
        Ok(Self {
            name: self.name.clone(),
            version: self.version + 1,
            row_count: self.row_count,
            columns,
        })
    }
}
