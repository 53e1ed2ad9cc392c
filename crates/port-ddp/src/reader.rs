use std::fs;
use std::io::{Cursor, Read};
use std::path::Path;

use polars::prelude::*;
use port_core::flatten::{denest, find_least_nested, DenestedRecord};
use port_core::text::fix_latin1_string;
use port_core::timestamps::{normalize_timestamps, RawValue};
use serde_json::Value;
use tracing::{debug, error};

use crate::errors::{DdpError, Result};

const ZIP_MAGIC: &[u8] = b"PK\x03\x04";
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Values sampled when deciding how to normalize a timestamp column.
pub const TIMESTAMP_SAMPLE_SIZE: usize = 20;

fn strip_bom(bytes: &[u8]) -> &[u8] {
    bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes)
}

pub fn is_zip(bytes: &[u8]) -> bool {
    bytes.starts_with(ZIP_MAGIC)
}

/// Reads CSV bytes with a header row into a DataFrame of string columns.
///
/// Rows shorter than the header are padded with empty strings and longer rows
/// are truncated. Invalid UTF-8 is replaced rather than rejected.
pub fn read_csv_from_bytes(bytes: &[u8]) -> Result<DataFrame> {
    let content = String::from_utf8_lossy(strip_bom(bytes));
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(content.as_bytes());

    let header: Vec<String> = reader.headers()?.iter().map(|h| h.trim().to_string()).collect();
    if header.is_empty() || header.iter().all(String::is_empty) {
        return Ok(DataFrame::default());
    }

    let mut columns: Vec<Vec<String>> = vec![Vec::new(); header.len()];
    for (line_index, record) in reader.records().enumerate() {
        let record = record?;
        if record.len() != header.len() {
            debug!(
                "row {} has {} fields, header has {}",
                line_index + 1,
                record.len(),
                header.len()
            );
        }
        for (idx, values) in columns.iter_mut().enumerate() {
            values.push(record.get(idx).unwrap_or_default().to_string());
        }
    }

    let columns: Vec<Column> = header
        .iter()
        .zip(columns)
        .map(|(name, values)| Series::new(name.as_str().into(), values).into())
        .collect();
    Ok(DataFrame::new(columns)?)
}

/// Reads a DDP from memory: either a zip archive, whose first `.csv` entry is
/// read, or a bare CSV file.
pub fn read_ddp_bytes(bytes: &[u8]) -> Result<DataFrame> {
    if !is_zip(bytes) {
        return read_csv_from_bytes(bytes);
    }

    let mut archive = ::zip::ZipArchive::new(Cursor::new(bytes))?;
    for index in 0..archive.len() {
        let mut entry = archive.by_index(index)?;
        if entry.is_dir() || !entry.name().to_ascii_lowercase().ends_with(".csv") {
            continue;
        }
        debug!("reading '{}' from archive", entry.name());
        // declared sizes come from the archive and are not trusted
        let mut content = Vec::new();
        entry.read_to_end(&mut content)?;
        return read_csv_from_bytes(&content);
    }

    Err(DdpError::EmptyArchive { expected: ".csv" })
}

pub fn read_ddp_file(path: impl AsRef<Path>) -> Result<DataFrame> {
    let bytes = fs::read(path.as_ref())?;
    read_ddp_bytes(&bytes)
}

/// Reads a DDP into a table, logging failures and returning an empty table
/// instead.
pub fn read_csv_from_file_to_df(path: impl AsRef<Path>) -> DataFrame {
    let path = path.as_ref();
    match read_ddp_file(path) {
        Ok(df) => df,
        Err(err) => {
            error!("could not read '{}': {}", path.display(), err);
            DataFrame::default()
        }
    }
}

/// Denests every record of a JSON export. The document may be a list of
/// records or a single record.
pub fn read_json_records(bytes: &[u8]) -> Result<Vec<DenestedRecord>> {
    let document: Value = serde_json::from_slice(strip_bom(bytes))?;
    match document {
        Value::Array(items) => Ok(items.iter().map(denest).collect()),
        object @ Value::Object(_) => Ok(vec![denest(&object)]),
        other => Err(DdpError::UnsupportedFormat {
            reason: format!("expected a JSON list or object, found {}", json_kind(&other)),
        }),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Text,
    Timestamp,
}

/// Picks one output column out of denested records, using the least nested key
/// that contains `key`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSelector {
    pub column: String,
    pub key: String,
    pub kind: ColumnKind,
}

impl ColumnSelector {
    pub fn text(column: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            key: key.into(),
            kind: ColumnKind::Text,
        }
    }

    pub fn timestamp(column: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            key: key.into(),
            kind: ColumnKind::Timestamp,
        }
    }
}

/// Builds a table with one row per record and one column per selector.
///
/// Text columns get latin-1 mojibake repaired; timestamp columns are
/// normalized to ISO 8601 as a whole, so epoch seconds and free-form dates are
/// both handled.
pub fn records_to_df(records: &[DenestedRecord], selectors: &[ColumnSelector]) -> Result<DataFrame> {
    let columns: Vec<Column> = selectors
        .iter()
        .map(|selector| {
            let raw: Vec<String> = records
                .iter()
                .map(|record| find_least_nested(record, &selector.key))
                .collect();
            let values: Vec<String> = match selector.kind {
                ColumnKind::Text => raw.iter().map(|value| fix_latin1_string(value)).collect(),
                ColumnKind::Timestamp => {
                    let raw: Vec<RawValue> = raw.into_iter().map(RawValue::Text).collect();
                    normalize_timestamps(&raw, TIMESTAMP_SAMPLE_SIZE)
                }
            };
            Series::new(selector.column.as_str().into(), values).into()
        })
        .collect();

    Ok(DataFrame::new(columns)?)
}
