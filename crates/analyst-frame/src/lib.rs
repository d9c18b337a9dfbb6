//! analyst-frame: typed tabular dataset handles
//!
//! The leaf crate of the workspace: immutable column-major [`Frame`]s with
//! declared schemas, a missing-value sentinel that is never coerced away,
//! and the ingestion boundary (delimited text and spreadsheets) that turns
//! user uploads into typed frames with an honest malformed-row report.

pub mod error;
pub mod frame;
pub mod ingest;
pub mod schema;
pub mod value;

pub use error::FrameError;
pub use frame::{Column, Frame};
pub use ingest::{ingest_delimited, ingest_path, IngestReport, MalformedRow};
pub use schema::{ColumnDef, ColumnSummary, Schema, SchemaSummary};
pub use value::{ColumnType, Value};
