//! Frame and ingestion errors

use crate::value::ColumnType;

/// Errors raised by frame construction and ingestion
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// Two columns share a name
    #[error("duplicate column: {0}")]
    DuplicateColumn(String),

    /// Referenced column does not exist
    #[error("unknown column: {0}")]
    UnknownColumn(String),

    /// A cell's runtime type does not match its column's declared type
    #[error("type mismatch in column {column} at row {row}: expected {expected}")]
    TypeMismatch {
        column: String,
        row: usize,
        expected: ColumnType,
    },

    /// Column lengths disagree
    #[error("column {column} has {actual} rows, expected {expected}")]
    LengthMismatch {
        column: String,
        expected: usize,
        actual: usize,
    },

    /// Input had no usable rows or columns
    #[error("empty input: {0}")]
    EmptyInput(String),

    /// File extension not handled by the ingestion boundary
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Underlying reader failed
    #[error("read failed: {0}")]
    ReadFailed(String),
}
