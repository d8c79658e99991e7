//! Core value model: datasets, columns, cells and semantic types.

use chrono::{NaiveDateTime, TimeDelta};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::utils::format_float;

// ============================================================================
// Semantic Types
// ============================================================================

/// The logical type assigned to a column.
///
/// Integer and float widths describe the representation the column was
/// narrowed to; cell values are always held widened (`i64` / `f64`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SemanticType {
    Boolean,
    Categorical,
    Int8,
    Int16,
    Int32,
    Int64,
    Float16,
    Float32,
    Float64,
    DateTime,
    TimeDelta,
    Complex,
    /// The untyped fallback.
    String,
}

impl SemanticType {
    /// Canonical label appended to column names on output.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Boolean => "boolean",
            Self::Categorical => "category",
            Self::Int8 => "int8",
            Self::Int16 => "int16",
            Self::Int32 => "int32",
            Self::Int64 => "int64",
            Self::Float16 => "float16",
            Self::Float32 => "float32",
            Self::Float64 => "float64",
            Self::DateTime => "datetime64",
            Self::TimeDelta => "timedelta64",
            Self::Complex => "complex128",
            Self::String => "object",
        }
    }

    pub fn is_integer(&self) -> bool {
        matches!(self, Self::Int8 | Self::Int16 | Self::Int32 | Self::Int64)
    }

    pub fn is_float(&self) -> bool {
        matches!(self, Self::Float16 | Self::Float32 | Self::Float64)
    }

    pub fn is_numeric(&self) -> bool {
        self.is_integer() || self.is_float()
    }

    /// Columns the string heuristics are allowed to look at.
    pub fn is_string_like(&self) -> bool {
        matches!(self, Self::String)
    }

    /// Inclusive value range of an integer width.
    pub fn integer_range(&self) -> Option<(i64, i64)> {
        match self {
            Self::Int8 => Some((i8::MIN as i64, i8::MAX as i64)),
            Self::Int16 => Some((i16::MIN as i64, i16::MAX as i64)),
            Self::Int32 => Some((i32::MIN as i64, i32::MAX as i64)),
            Self::Int64 => Some((i64::MIN, i64::MAX)),
            _ => None,
        }
    }
}

impl fmt::Display for SemanticType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// ============================================================================
// Complex Numbers
// ============================================================================

/// A double precision complex number.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Complex64 {
    pub re: f64,
    pub im: f64,
}

impl Complex64 {
    pub fn new(re: f64, im: f64) -> Self {
        Self { re, im }
    }
}

/// Error returned when text is not a complex literal.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("not a complex number: '{0}'")]
pub struct ParseComplexError(String);

impl FromStr for Complex64 {
    type Err = ParseComplexError;

    /// Accepts `1`, `2.5j`, `j`, `-J`, `1+2j`, `1e3-4.5e-1j` and the same
    /// wrapped in parentheses, with surrounding whitespace.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseComplexError(s.to_string());

        let mut body = s.trim();
        if let Some(inner) = body.strip_prefix('(').and_then(|b| b.strip_suffix(')')) {
            body = inner.trim();
        }
        if body.is_empty() || body.contains(char::is_whitespace) {
            return Err(err());
        }

        let Some(imaginary) = body.strip_suffix(['j', 'J']) else {
            return parse_component(body).map(|re| Complex64::new(re, 0.0)).ok_or_else(err);
        };

        // Split at the last sign that is not the start of an exponent.
        let bytes = imaginary.as_bytes();
        let split = (1..bytes.len())
            .rev()
            .find(|&i| matches!(bytes[i], b'+' | b'-') && !matches!(bytes[i - 1], b'e' | b'E'));

        let (re, im_text) = match split {
            Some(i) => (parse_component(&imaginary[..i]).ok_or_else(err)?, &imaginary[i..]),
            None => (0.0, imaginary),
        };
        let im = match im_text {
            "" | "+" => 1.0,
            "-" => -1.0,
            text => parse_component(text).ok_or_else(err)?,
        };
        Ok(Complex64::new(re, im))
    }
}

fn parse_component(text: &str) -> Option<f64> {
    // Rust accepts a leading '+' on its own; reject "+" / "-" with no digits.
    if text.is_empty() || text == "+" || text == "-" {
        return None;
    }
    text.parse::<f64>().ok()
}

impl fmt::Display for Complex64 {
    /// `(1+2j)`, `(1.5-0j)`, or `2j` when the real part is positive zero.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let im = format_component(self.im);
        if self.re == 0.0 && self.re.is_sign_positive() {
            return write!(f, "{im}j");
        }
        let sign = if self.im.is_sign_negative() && !self.im.is_nan() { "" } else { "+" };
        write!(f, "({}{sign}{im}j)", format_component(self.re))
    }
}

fn format_component(v: f64) -> String {
    if v == 0.0 && v.is_sign_negative() {
        "-0".to_string()
    } else if v.is_finite() && v.fract() == 0.0 && v.abs() < 1e16 {
        format!("{}", v as i64)
    } else {
        format_float(v)
    }
}

// ============================================================================
// Cells and Columns
// ============================================================================

/// A single value in a column.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Missing,
    Text(String),
    Bool(bool),
    Int(i64),
    Float(f64),
    DateTime(NaiveDateTime),
    Duration(TimeDelta),
    Complex(Complex64),
}

impl Cell {
    pub fn is_missing(&self) -> bool {
        matches!(self, Cell::Missing)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Cell::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Build a float cell, mapping NaN to missing.
    pub fn float(v: f64) -> Self {
        if v.is_nan() { Cell::Missing } else { Cell::Float(v) }
    }
}

impl fmt::Display for Cell {
    /// Width-agnostic rendering; the serializer refines floats and datetimes
    /// using the column's type.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Missing => Ok(()),
            Cell::Text(s) => f.write_str(s),
            Cell::Bool(true) => f.write_str("True"),
            Cell::Bool(false) => f.write_str("False"),
            Cell::Int(v) => write!(f, "{v}"),
            Cell::Float(v) => f.write_str(&format_float(*v)),
            Cell::DateTime(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S")),
            Cell::Duration(td) => f.write_str(&format_timedelta(*td)),
            Cell::Complex(c) => write!(f, "{c}"),
        }
    }
}

/// Render a duration as `D days HH:MM:SS[.ffffff]`.
///
/// Negative durations borrow a whole day: `-1 days +23:00:00`.
pub fn format_timedelta(td: TimeDelta) -> String {
    const DAY_NANOS: i128 = 86_400 * 1_000_000_000;

    let total = td.num_seconds() as i128 * 1_000_000_000 + td.subsec_nanos() as i128;
    let days = total.div_euclid(DAY_NANOS);
    let rest = total.rem_euclid(DAY_NANOS);

    let secs = rest / 1_000_000_000;
    let nanos = rest % 1_000_000_000;
    let clock = format!("{:02}:{:02}:{:02}", secs / 3600, (secs / 60) % 60, secs % 60);
    let fraction = match nanos {
        0 => String::new(),
        n if n % 1_000 == 0 => format!(".{:06}", n / 1_000),
        n => format!(".{n:09}"),
    };
    let sign = if days < 0 { "+" } else { "" };
    format!("{days} days {sign}{clock}{fraction}")
}

/// A named, typed column.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    name: String,
    semantic: SemanticType,
    cells: Vec<Cell>,
}

impl Column {
    pub fn new(name: impl Into<String>, semantic: SemanticType, cells: Vec<Cell>) -> Self {
        Self {
            name: name.into(),
            semantic,
            cells,
        }
    }

    /// Convenience constructor for raw string columns; `None` is missing.
    pub fn from_strings<S: AsRef<str>>(name: impl Into<String>, values: &[Option<S>]) -> Self {
        let cells = values
            .iter()
            .map(|v| match v {
                Some(s) => Cell::Text(s.as_ref().to_string()),
                None => Cell::Missing,
            })
            .collect();
        Self::new(name, SemanticType::String, cells)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn semantic(&self) -> SemanticType {
        self.semantic
    }

    pub fn cells(&self) -> &[Cell] {
        &self.cells
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn missing_count(&self) -> usize {
        self.cells.iter().filter(|c| c.is_missing()).count()
    }

    /// Same name, new type and values.
    pub fn with_cells(&self, semantic: SemanticType, cells: Vec<Cell>) -> Self {
        Self::new(self.name.clone(), semantic, cells)
    }

    /// Same name and values, new type tag.
    pub fn retagged(&self, semantic: SemanticType) -> Self {
        Self::new(self.name.clone(), semantic, self.cells.clone())
    }

    pub(crate) fn set_name(&mut self, name: String) {
        self.name = name;
    }
}

// ============================================================================
// Dataset
// ============================================================================

/// An ordered collection of named columns.
///
/// `height` is the row count established at load time. Columns normally all
/// have that length; the complex filter's row-dropping compatibility mode is
/// the one place a column may end up shorter.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Dataset {
    columns: Vec<Column>,
    height: usize,
}

impl Dataset {
    /// Build a dataset; the height is taken from the longest column.
    pub fn new(columns: Vec<Column>) -> Self {
        let height = columns.iter().map(Column::len).max().unwrap_or(0);
        Self { columns, height }
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn columns_mut(&mut self) -> &mut [Column] {
        &mut self.columns
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    /// Replace the column at `index`.
    pub fn replace(&mut self, index: usize, column: Column) {
        self.columns[index] = column;
    }

    /// Whether every column still has the dataset height.
    pub fn is_rectangular(&self) -> bool {
        self.columns.iter().all(|c| c.len() == self.height)
    }
}

/// Per-column outcome reported alongside the CSV output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSummary {
    /// Column name after renaming.
    pub name: String,
    /// Name as it appeared in the input.
    pub source_name: String,
    pub semantic_type: SemanticType,
    /// Detector that claimed the column during inference, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub claimed_by: Option<String>,
    pub length: usize,
    pub missing: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels() {
        assert_eq!(SemanticType::Categorical.label(), "category");
        assert_eq!(SemanticType::DateTime.label(), "datetime64");
        assert_eq!(SemanticType::Complex.label(), "complex128");
        assert_eq!(SemanticType::String.to_string(), "object");
    }

    #[test]
    fn test_integer_range() {
        assert_eq!(SemanticType::Int8.integer_range(), Some((-128, 127)));
        assert_eq!(SemanticType::Float32.integer_range(), None);
    }

    #[test]
    fn test_parse_complex() {
        assert_eq!("1+2j".parse::<Complex64>(), Ok(Complex64::new(1.0, 2.0)));
        assert_eq!("(1-2j)".parse::<Complex64>(), Ok(Complex64::new(1.0, -2.0)));
        assert_eq!(" 3.5J ".parse::<Complex64>(), Ok(Complex64::new(0.0, 3.5)));
        assert_eq!("j".parse::<Complex64>(), Ok(Complex64::new(0.0, 1.0)));
        assert_eq!("-j".parse::<Complex64>(), Ok(Complex64::new(0.0, -1.0)));
        assert_eq!("4".parse::<Complex64>(), Ok(Complex64::new(4.0, 0.0)));
        assert_eq!("1e3-2e-1j".parse::<Complex64>(), Ok(Complex64::new(1000.0, -0.2)));
        assert_eq!("2+j".parse::<Complex64>(), Ok(Complex64::new(2.0, 1.0)));
    }

    #[test]
    fn test_parse_complex_rejects() {
        assert!("abc".parse::<Complex64>().is_err());
        assert!("".parse::<Complex64>().is_err());
        assert!("1 + 2j".parse::<Complex64>().is_err());
        assert!("1+2i".parse::<Complex64>().is_err());
        assert!("+".parse::<Complex64>().is_err());
        assert!("2020-01-01".parse::<Complex64>().is_err());
    }

    #[test]
    fn test_display_complex() {
        assert_eq!(Complex64::new(1.0, 2.0).to_string(), "(1+2j)");
        assert_eq!(Complex64::new(1.5, -2.0).to_string(), "(1.5-2j)");
        assert_eq!(Complex64::new(0.0, 4.0).to_string(), "4j");
        assert_eq!(Complex64::new(3.0, 0.0).to_string(), "(3+0j)");
    }

    #[test]
    fn test_format_timedelta() {
        assert_eq!(format_timedelta(TimeDelta::hours(26)), "1 days 02:00:00");
        assert_eq!(format_timedelta(TimeDelta::seconds(1)), "0 days 00:00:01");
        assert_eq!(
            format_timedelta(TimeDelta::milliseconds(1500)),
            "0 days 00:00:01.500000"
        );
        assert_eq!(format_timedelta(TimeDelta::hours(-1)), "-1 days +23:00:00");
    }

    #[test]
    fn test_cell_display() {
        assert_eq!(Cell::Missing.to_string(), "");
        assert_eq!(Cell::Bool(true).to_string(), "True");
        assert_eq!(Cell::Float(2.0).to_string(), "2.0");
        assert_eq!(Cell::Int(-5).to_string(), "-5");
    }

    #[test]
    fn test_dataset_height_and_shape() {
        let dataset = Dataset::new(vec![
            Column::from_strings("a", &[Some("1"), Some("2")]),
            Column::from_strings("b", &[Some("x"), None]),
        ]);
        assert_eq!(dataset.height(), 2);
        assert_eq!(dataset.width(), 2);
        assert!(dataset.is_rectangular());
        assert_eq!(dataset.position("b"), Some(1));
        assert_eq!(dataset.column("b").unwrap().missing_count(), 1);
    }
}
