//! Tabular input loading.
//!
//! A [`TabularSource`] is a named byte stream. The name's suffix selects the
//! loader: `.csv` goes through polars, `.xlsx` through calamine (first sheet
//! only). Both loaders hand raw fields to the same storage typing pass, which
//! assigns each column a primitive type before inference runs.

use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use std::io::Cursor;
use std::path::Path;

use calamine::{Data, DataType, Reader, Xlsx};
use chrono::NaiveDateTime;
use polars::io::csv::read::CsvReadOptions;
use polars::prelude::SerReader;
use tracing::{debug, info};

use crate::error::{Result, ResultExt, TypecastError};
use crate::types::{Cell, Column, Dataset, SemanticType};
use crate::utils::{
    format_float, is_integral, is_missing_marker, parse_bool_token, parse_float, parse_integer,
};

// =============================================================================
// Sources
// =============================================================================

/// Input formats the loaders understand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Csv,
    Xlsx,
}

impl SourceFormat {
    /// Pick the format from a file name. The suffix match is case-sensitive.
    pub fn from_name(name: &str) -> Result<Self> {
        if name.ends_with(".csv") {
            Ok(Self::Csv)
        } else if name.ends_with(".xlsx") {
            Ok(Self::Xlsx)
        } else {
            Err(TypecastError::UnsupportedFormat(name.to_string()))
        }
    }
}

impl fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Csv => f.write_str("csv"),
            Self::Xlsx => f.write_str("xlsx"),
        }
    }
}

/// A readable named byte stream.
#[derive(Debug, Clone)]
pub struct TabularSource {
    name: String,
    bytes: Vec<u8>,
}

impl TabularSource {
    pub fn new(name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            bytes: bytes.into(),
        }
    }

    /// Read a file from disk, naming the source after the path.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)
            .map_err(TypecastError::from)
            .context(format!("Failed to read '{}'", path.display()))?;
        Ok(Self::new(path.to_string_lossy(), bytes))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn format(&self) -> Result<SourceFormat> {
        SourceFormat::from_name(&self.name)
    }
}

// =============================================================================
// Loading
// =============================================================================

/// Load a source into a storage-typed dataset.
pub fn load(source: &TabularSource) -> Result<Dataset> {
    let format = source.format()?;
    let mut raw_columns = match format {
        SourceFormat::Csv => read_csv(source.bytes())?,
        SourceFormat::Xlsx => read_xlsx(source.bytes())?,
    };
    dedupe_names(&mut raw_columns);

    let columns: Vec<Column> = raw_columns
        .into_iter()
        .map(|(name, values)| assign_storage_type(name, values))
        .collect();
    let dataset = Dataset::new(columns);

    info!(
        "Loaded {} rows x {} columns from '{}' ({})",
        dataset.height(),
        dataset.width(),
        source.name(),
        format
    );
    Ok(dataset)
}

/// A field as delivered by a loader, before storage typing.
#[derive(Debug, Clone, PartialEq)]
enum RawValue {
    Missing,
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    DateTime(NaiveDateTime),
}

type RawColumn = (String, Vec<RawValue>);

fn read_csv(bytes: &[u8]) -> Result<Vec<RawColumn>> {
    let bytes = skip_blank_lines(bytes);
    let header = csv_header(&bytes)?;

    // Every column is read as text; storage typing happens below.
    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .into_reader_with_file_handle(Cursor::new(bytes.into_owned()))
        .finish()
        .context("Failed to parse CSV input")?;

    df.get_columns()
        .iter()
        .enumerate()
        .map(|(index, column)| {
            let values = column
                .str()
                .context("CSV column was not read as text")?
                .into_iter()
                .map(|field| match field {
                    Some(text) if !is_missing_marker(text) => RawValue::Text(text.to_string()),
                    _ => RawValue::Missing,
                })
                .collect();
            let name = header
                .get(index)
                .cloned()
                .unwrap_or_else(|| column.name().to_string());
            Ok((name, values))
        })
        .collect()
}

/// Drop lines with no content, keeping those inside quoted fields.
///
/// A line holding only separators (`,`) is a row of missing values and
/// stays.
fn skip_blank_lines(bytes: &[u8]) -> Cow<'_, [u8]> {
    let mut kept = Vec::with_capacity(bytes.len());
    let mut in_quotes = false;
    let mut skipped = 0;

    for line in bytes.split_inclusive(|b| *b == b'\n') {
        let content = line.strip_suffix(b"\n").unwrap_or(line);
        let content = content.strip_suffix(b"\r").unwrap_or(content);
        if content.is_empty() && !in_quotes {
            skipped += 1;
            continue;
        }
        in_quotes ^= content.iter().filter(|b| **b == b'"').count() % 2 == 1;
        kept.extend_from_slice(line);
    }

    if skipped == 0 {
        return Cow::Borrowed(bytes);
    }
    debug!("Skipped {} blank CSV lines", skipped);
    Cow::Owned(kept)
}

/// Header fields as written; blank names get the spreadsheet loader's
/// `Unnamed: i` form.
fn csv_header(bytes: &[u8]) -> Result<Vec<String>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(bytes);
    let mut record = csv::StringRecord::new();
    if !reader.read_record(&mut record)? {
        return Ok(Vec::new());
    }

    Ok(record
        .iter()
        .enumerate()
        .map(|(index, field)| {
            if field.is_empty() {
                format!("Unnamed: {index}")
            } else {
                field.to_string()
            }
        })
        .collect())
}

/// Rename repeated column names to `name.1`, `name.2`, ... in order,
/// skipping suffixes that are already taken.
fn dedupe_names(columns: &mut [RawColumn]) {
    let mut counts: HashMap<String, usize> = HashMap::new();
    for (name, _) in columns.iter_mut() {
        let mut candidate = name.clone();
        let mut count = counts.get(&candidate).copied().unwrap_or(0);
        while count > 0 {
            counts.insert(candidate.clone(), count + 1);
            candidate = format!("{candidate}.{count}");
            count = counts.get(&candidate).copied().unwrap_or(0);
        }
        counts.insert(candidate.clone(), 1);
        if candidate != *name {
            debug!("Renamed duplicate column '{}' to '{}'", name, candidate);
            *name = candidate;
        }
    }
}

fn read_xlsx(bytes: &[u8]) -> Result<Vec<RawColumn>> {
    let mut workbook: Xlsx<_> = Xlsx::new(Cursor::new(bytes))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| TypecastError::Spreadsheet("workbook contains no sheets".to_string()))??;

    let mut rows = range.rows();
    let Some(header) = rows.next() else {
        return Ok(Vec::new());
    };

    let mut columns: Vec<RawColumn> = header
        .iter()
        .enumerate()
        .map(|(index, cell)| (header_name(index, cell), Vec::new()))
        .collect();

    for row in rows {
        for (index, (_, values)) in columns.iter_mut().enumerate() {
            values.push(row.get(index).map_or(RawValue::Missing, xlsx_value));
        }
    }

    debug!("Read {} spreadsheet columns", columns.len());
    Ok(columns)
}

fn header_name(index: usize, cell: &Data) -> String {
    match cell {
        Data::Empty => format!("Unnamed: {index}"),
        Data::Float(v) if is_integral(*v) => format!("{}", *v as i64),
        Data::Float(v) => format_float(*v),
        other => other.to_string(),
    }
}

fn xlsx_value(cell: &Data) -> RawValue {
    match cell {
        Data::Empty | Data::Error(_) => RawValue::Missing,
        Data::String(s) if is_missing_marker(s) => RawValue::Missing,
        Data::String(s) => RawValue::Text(s.clone()),
        Data::Int(v) => RawValue::Int(*v),
        Data::Float(v) if v.is_nan() => RawValue::Missing,
        // Whole-number spreadsheet floats load as integers.
        Data::Float(v) if is_integral(*v) => RawValue::Int(*v as i64),
        Data::Float(v) => RawValue::Float(*v),
        Data::Bool(b) => RawValue::Bool(*b),
        Data::DateTime(_) => cell
            .as_datetime()
            .map_or_else(|| RawValue::Text(cell.to_string()), RawValue::DateTime),
        Data::DateTimeIso(s) => NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f")
            .map_or_else(|_| RawValue::Text(s.clone()), RawValue::DateTime),
        Data::DurationIso(s) => RawValue::Text(s.clone()),
    }
}

// =============================================================================
// Storage Typing
// =============================================================================

/// Assign the primitive storage type the column would get from a dataframe
/// reader.
fn assign_storage_type(name: String, values: Vec<RawValue>) -> Column {
    let column = storage_type(&name, &values);
    debug!("Column '{}' loaded as {}", name, column.semantic());
    column
}

fn storage_type(name: &str, values: &[RawValue]) -> Column {
    if values.is_empty() {
        return Column::new(name, SemanticType::String, Vec::new());
    }

    let present: Vec<&RawValue> = values.iter().filter(|v| **v != RawValue::Missing).collect();
    let has_missing = present.len() < values.len();

    if present.is_empty() {
        return Column::new(name, SemanticType::Float64, vec![Cell::Missing; values.len()]);
    }

    if !has_missing
        && let Some(cells) = convert_all(values, as_integer)
    {
        return Column::new(name, SemanticType::Int64, cells.into_iter().map(Cell::Int).collect());
    }

    if let Some(cells) = convert_present(values, as_number) {
        return Column::new(name, SemanticType::Float64, cells);
    }

    if !has_missing
        && let Some(cells) = convert_all(values, as_bool)
    {
        return Column::new(
            name,
            SemanticType::Boolean,
            cells.into_iter().map(Cell::Bool).collect(),
        );
    }

    if present.iter().all(|v| matches!(v, RawValue::DateTime(_))) {
        let cells = values
            .iter()
            .map(|v| match v {
                RawValue::DateTime(dt) => Cell::DateTime(*dt),
                _ => Cell::Missing,
            })
            .collect();
        return Column::new(name, SemanticType::DateTime, cells);
    }

    let cells = values.iter().map(render_as_text).collect();
    Column::new(name, SemanticType::String, cells)
}

/// Convert every value, failing on the first one that does not fit.
fn convert_all<T>(values: &[RawValue], convert: fn(&RawValue) -> Option<T>) -> Option<Vec<T>> {
    values.iter().map(convert).collect()
}

/// Convert the non-missing values, keeping gaps as missing.
fn convert_present(
    values: &[RawValue],
    convert: fn(&RawValue) -> Option<f64>,
) -> Option<Vec<Cell>> {
    values
        .iter()
        .map(|v| match v {
            RawValue::Missing => Some(Cell::Missing),
            other => convert(other).map(Cell::float),
        })
        .collect()
}

fn as_integer(value: &RawValue) -> Option<i64> {
    match value {
        RawValue::Int(v) => Some(*v),
        RawValue::Text(s) => parse_integer(s),
        _ => None,
    }
}

fn as_number(value: &RawValue) -> Option<f64> {
    match value {
        RawValue::Int(v) => Some(*v as f64),
        RawValue::Float(v) => Some(*v),
        RawValue::Text(s) => parse_float(s),
        _ => None,
    }
}

fn as_bool(value: &RawValue) -> Option<bool> {
    match value {
        RawValue::Bool(b) => Some(*b),
        RawValue::Text(s) => parse_bool_token(s),
        _ => None,
    }
}

fn render_as_text(value: &RawValue) -> Cell {
    match value {
        RawValue::Missing => Cell::Missing,
        RawValue::Text(s) => Cell::Text(s.clone()),
        RawValue::Int(v) => Cell::Text(v.to_string()),
        RawValue::Float(v) => Cell::Text(format_float(*v)),
        RawValue::Bool(b) => Cell::Text(if *b { "True" } else { "False" }.to_string()),
        RawValue::DateTime(dt) => Cell::Text(dt.format("%Y-%m-%d %H:%M:%S").to_string()),
    }
}
