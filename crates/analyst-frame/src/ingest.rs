//! Dataset ingestion boundary
//!
//! Accepts delimited text (delimiter sniffed) or a spreadsheet and produces
//! a typed [`Frame`] plus an [`IngestReport`]. Column types are inferred
//! from the data. Malformed rows are reported, never silently dropped;
//! empty cells become [`Value::Missing`] rather than zero.

use crate::error::FrameError;
use crate::frame::Frame;
use crate::value::{ColumnType, Value};
use calamine::{open_workbook_auto, Reader};
use std::path::Path;

/// One rejected input row
#[derive(Debug, Clone)]
pub struct MalformedRow {
    /// 1-based line (or spreadsheet row) number
    pub line: usize,
    /// Why the row was rejected
    pub reason: String,
}

/// Outcome of one ingestion
#[derive(Debug, Clone, Default)]
pub struct IngestReport {
    /// Rows that made it into the frame
    pub rows_loaded: usize,
    /// Rows rejected, with reasons
    pub malformed: Vec<MalformedRow>,
}

/// Ingest a file by extension: `.csv`/`.tsv`/`.txt` as delimited text,
/// `.xlsx`/`.xls` via calamine
///
/// The frame is named after the file stem.
pub fn ingest_path(path: &Path) -> Result<(Frame, IngestReport), FrameError> {
    let name = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("dataset")
        .to_string();
    let ext = path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    match ext.as_str() {
        "csv" | "tsv" | "txt" => {
            let content = std::fs::read_to_string(path)
                .map_err(|e| FrameError::ReadFailed(e.to_string()))?;
            ingest_delimited(&name, &content)
        }
        "xlsx" | "xls" => ingest_spreadsheet(&name, path),
        other => Err(FrameError::UnsupportedFormat(other.to_string())),
    }
}

/// Ingest delimited text, sniffing the delimiter
pub fn ingest_delimited(name: &str, content: &str) -> Result<(Frame, IngestReport), FrameError> {
    ingest_delimited_with(name, content, sniff_delimiter(content))
}

/// Ingest delimited text with an explicit delimiter
pub fn ingest_delimited_with(
    name: &str,
    content: &str,
    delimiter: u8,
) -> Result<(Frame, IngestReport), FrameError> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());

    let mut records = reader.records();
    let headers = match records.next() {
        Some(r) => r.map_err(|e| FrameError::ReadFailed(e.to_string()))?,
        None => return Err(FrameError::EmptyInput(name.to_string())),
    };
    let headers: Vec<String> = headers
        .iter()
        .enumerate()
        .map(|(i, h)| {
            let h = h.trim();
            if h.is_empty() {
                format!("column_{i}")
            } else {
                h.to_string()
            }
        })
        .collect();

    let mut rows: Vec<Vec<String>> = Vec::new();
    let mut malformed = Vec::new();
    for (idx, record) in records.enumerate() {
        // 1-based, counting the header line
        let line = idx + 2;
        let record = match record {
            Ok(r) => r,
            Err(e) => {
                malformed.push(MalformedRow {
                    line,
                    reason: format!("unreadable record: {e}"),
                });
                continue;
            }
        };
        if record.len() != headers.len() {
            malformed.push(MalformedRow {
                line,
                reason: format!("expected {} fields, found {}", headers.len(), record.len()),
            });
            continue;
        }
        rows.push(record.iter().map(|f| f.trim().to_string()).collect());
    }

    finish(name, headers, rows, malformed)
}

/// Ingest the first worksheet of a spreadsheet
fn ingest_spreadsheet(name: &str, path: &Path) -> Result<(Frame, IngestReport), FrameError> {
    let mut workbook =
        open_workbook_auto(path).map_err(|e| FrameError::ReadFailed(e.to_string()))?;
    let sheet = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| FrameError::EmptyInput(name.to_string()))?;
    let range = workbook
        .worksheet_range(&sheet)
        .map_err(|e| FrameError::ReadFailed(e.to_string()))?;

    let mut row_iter = range.rows();
    let headers: Vec<String> = match row_iter.next() {
        Some(r) => r
            .iter()
            .enumerate()
            .map(|(i, c)| {
                let h = c.to_string().trim().to_string();
                if h.is_empty() {
                    format!("column_{i}")
                } else {
                    h
                }
            })
            .collect(),
        None => return Err(FrameError::EmptyInput(name.to_string())),
    };

    let mut rows = Vec::new();
    let mut malformed = Vec::new();
    for (idx, row) in row_iter.enumerate() {
        let line = idx + 2;
        if row.len() > headers.len() {
            malformed.push(MalformedRow {
                line,
                reason: format!("expected {} cells, found {}", headers.len(), row.len()),
            });
            continue;
        }
        // trailing cells a sheet leaves blank come through short; pad them
        let mut cells: Vec<String> = row.iter().map(|c| c.to_string().trim().to_string()).collect();
        cells.resize(headers.len(), String::new());
        rows.push(cells);
    }

    finish(name, headers, rows, malformed)
}

fn finish(
    name: &str,
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
    malformed: Vec<MalformedRow>,
) -> Result<(Frame, IngestReport), FrameError> {
    if rows.is_empty() {
        return Err(FrameError::EmptyInput(name.to_string()));
    }
    let rows_loaded = rows.len();
    if !malformed.is_empty() {
        tracing::warn!(
            dataset = name,
            rejected = malformed.len(),
            "ingestion rejected malformed rows"
        );
    }

    let mut columns = Vec::with_capacity(headers.len());
    for (col_idx, header) in headers.iter().enumerate() {
        let cells: Vec<&str> = rows.iter().map(|r| r[col_idx].as_str()).collect();
        let ty = infer_type(&cells);
        let values: Vec<Value> = cells.iter().map(|c| parse_cell(c, ty)).collect();
        columns.push((header.clone(), ty, values));
    }

    let frame = Frame::from_columns(name, columns)?;
    Ok((
        frame,
        IngestReport {
            rows_loaded,
            malformed,
        },
    ))
}

/// Detect the most likely field delimiter by checking consistency across the
/// first few lines
///
/// For each candidate (tab, semicolon, comma, pipe), count fields per line;
/// the delimiter producing the most consistent field count (>1 field) wins.
#[must_use]
pub fn sniff_delimiter(content: &str) -> u8 {
    let candidates: &[u8] = &[b'\t', b';', b',', b'|'];
    let sample_lines: Vec<&str> = content.lines().take(10).collect();
    if sample_lines.is_empty() {
        return b',';
    }

    let mut best = b',';
    let mut best_score = 0u64;
    for &delim in candidates {
        let counts: Vec<usize> = sample_lines
            .iter()
            .map(|line| {
                csv::ReaderBuilder::new()
                    .delimiter(delim)
                    .has_headers(false)
                    .flexible(true)
                    .from_reader(line.as_bytes())
                    .records()
                    .next()
                    .and_then(|r| r.ok())
                    .map(|r| r.len())
                    .unwrap_or(1)
            })
            .collect();

        if counts.first().copied().unwrap_or(0) <= 1 {
            continue;
        }
        let target = counts[0];
        let consistent = counts.iter().filter(|&&c| c == target).count() as u64;
        let score = consistent * target as u64;
        if score > best_score {
            best_score = score;
            best = delim;
        }
    }
    best
}

/// Infer the narrowest type that admits every non-empty cell
fn infer_type(cells: &[&str]) -> ColumnType {
    let present: Vec<&&str> = cells.iter().filter(|c| !c.is_empty()).collect();
    if present.is_empty() {
        return ColumnType::Text;
    }
    if present.iter().all(|c| c.parse::<i64>().is_ok()) {
        return ColumnType::Int;
    }
    if present.iter().all(|c| c.parse::<f64>().is_ok()) {
        return ColumnType::Float;
    }
    if present.iter().all(|c| c.eq_ignore_ascii_case("true") || c.eq_ignore_ascii_case("false")) {
        return ColumnType::Bool;
    }
    ColumnType::Text
}

/// Parse one cell under an inferred type; empty cells stay missing
fn parse_cell(cell: &str, ty: ColumnType) -> Value {
    if cell.is_empty() {
        return Value::Missing;
    }
    match ty {
        ColumnType::Int => cell.parse().map(Value::Int).unwrap_or(Value::Missing),
        ColumnType::Float => cell.parse().map(Value::finite_float).unwrap_or(Value::Missing),
        ColumnType::Bool => Value::Bool(cell.eq_ignore_ascii_case("true")),
        ColumnType::Text => Value::Text(cell.to_string()),
    }
}
