//! Upload decoding: raw bytes plus a filename in, a [`Dataset`] out.
//!
//! The format is chosen from the filename extension. CSV goes through the
//! `csv` crate, Excel workbooks through `calamine`. After the initial parse,
//! [`normalize_index_column`] runs once to fold a leading unlabeled index
//! column into the dataset's row index.

use crate::data::{normalize_headers, Dataset, Value};
use crate::error::{DashError, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use calamine::{open_workbook_auto_from_rs, Data, Reader};
use std::io::Cursor;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use tracing::{debug, info, warn};

/// Prefix pandas gives to blank header cells.
pub const UNNAMED_PREFIX: &str = "Unnamed";

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Csv,
    Workbook,
}

impl SourceFormat {
    pub fn from_filename(filename: &str) -> Option<Self> {
        let extension = Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())?
            .to_ascii_lowercase();

        match extension.as_str() {
            "csv" => Some(SourceFormat::Csv),
            "xls" | "xlsx" | "xlsm" | "xlsb" => Some(SourceFormat::Workbook),
            _ => None,
        }
    }
}

/// Decode an uploaded file.
pub fn decode(bytes: &[u8], filename: &str) -> Result<Dataset> {
    let format = SourceFormat::from_filename(filename)
        .ok_or_else(|| DashError::UnsupportedFormat(filename.to_string()))?;

    debug!(filename, bytes = bytes.len(), ?format, "decoding upload");

    let (headers, rows) = match format {
        SourceFormat::Csv => read_csv(bytes),
        SourceFormat::Workbook => read_workbook(bytes),
    }
    .map_err(|reason| {
        warn!(filename, %reason, "failed to decode upload");
        DashError::decode(filename, reason)
    })?;

    let dataset = Dataset::from_records(filename, normalize_headers(headers), rows)?;
    let dataset = normalize_index_column(dataset);

    info!(
        filename,
        rows = dataset.row_count(),
        columns = dataset.column_count(),
        "decoded dataset"
    );
    Ok(dataset)
}

/// Decode a browser upload given as a `data:<mime>;base64,<payload>` URL.
pub fn decode_upload(contents: &str, filename: &str) -> Result<Dataset> {
    if SourceFormat::from_filename(filename).is_none() {
        return Err(DashError::UnsupportedFormat(filename.to_string()));
    }

    let (header, payload) = contents
        .split_once(',')
        .ok_or_else(|| DashError::decode(filename, "upload is not a data URL"))?;
    if !header.starts_with("data:") || !header.ends_with(";base64") {
        return Err(DashError::decode(
            filename,
            format!("unexpected upload header '{}'", header),
        ));
    }

    let bytes = STANDARD
        .decode(payload.trim())
        .map_err(|e| DashError::decode(filename, format!("invalid base64 payload: {}", e)))?;

    decode(&bytes, filename)
}

/// Treat the first column as the row index when the header row contains an
/// `Unnamed` placeholder.
///
/// This mirrors re-reading the file with the first column as index. It fires
/// when *any* column carries the placeholder prefix, including a real column
/// that happens to be called "Unnamed...".
pub fn normalize_index_column(dataset: Dataset) -> Dataset {
    let has_placeholder = dataset
        .column_names()
        .any(|name| name.starts_with(UNNAMED_PREFIX));

    if has_placeholder {
        debug!(source = dataset.source(), "using first column as row index");
        dataset.with_first_column_as_index()
    } else {
        dataset
    }
}

type RawTable = (Vec<String>, Vec<Vec<Value>>);

fn read_csv(bytes: &[u8]) -> std::result::Result<RawTable, String> {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(bytes);

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| e.to_string())?
        .iter()
        .map(str::to_string)
        .collect();

    if headers.is_empty() {
        return Err("no columns to parse from file".to_string());
    }

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| e.to_string())?;
        rows.push(
            record
                .iter()
                .map(|field| Value::Text(field.to_string()))
                .collect(),
        );
    }

    Ok((headers, rows))
}

/// calamine can panic on malformed workbooks; surface that as a decode error.
fn read_workbook(bytes: &[u8]) -> std::result::Result<RawTable, String> {
    panic::catch_unwind(AssertUnwindSafe(|| read_first_sheet(bytes))).unwrap_or_else(|payload| {
        let detail = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());
        Err(format!("workbook reader failed: {}", detail))
    })
}

fn read_first_sheet(bytes: &[u8]) -> std::result::Result<RawTable, String> {
    let mut workbook =
        open_workbook_auto_from_rs(Cursor::new(bytes.to_vec())).map_err(|e| e.to_string())?;

    let sheet_name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| "workbook contains no worksheets".to_string())?;

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| e.to_string())?;

    let mut rows = range.rows();
    let header_row = rows
        .next()
        .ok_or_else(|| "no columns to parse from file".to_string())?;

    let headers = header_row
        .iter()
        .map(|cell| convert_cell(cell).to_string())
        .collect();

    let rows = rows
        .map(|row| row.iter().map(convert_cell).collect())
        .collect();

    Ok((headers, rows))
}

fn convert_cell(cell: &Data) -> Value {
    match cell {
        Data::Empty => Value::Empty,
        Data::Bool(v) => Value::Text(v.to_string()),
        Data::Int(v) => Value::Number(*v as f64),
        Data::Float(v) => Value::Number(*v),
        Data::String(v) => Value::Text(v.clone()),
        Data::Error(e) => Value::Text(e.to_string()),
        Data::DateTime(v) => v
            .as_datetime()
            .map(Value::Date)
            .unwrap_or_else(|| Value::Number(v.as_f64())),
        Data::DateTimeIso(v) => Value::Text(v.clone()),
        Data::DurationIso(v) => Value::Text(v.clone()),
    }
}
