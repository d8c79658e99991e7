//! Column-level explicit casts.
//!
//! Each cast either produces a new column or a [`CastError`]. Value-level
//! parse failures inside a cast become missing cells; a `CastError` means
//! the column as a whole cannot be represented at the requested type.

use chrono::{DateTime, NaiveDateTime, TimeDelta};
use half::f16;
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use super::OverrideType;
use crate::inference::{Number, parse_known_datetime, parse_number};
use crate::types::{Cell, Column, SemanticType};
use crate::utils::{format_f16, format_f32, is_integral};

/// Why a column could not be cast.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CastError {
    #[error("value {value} is not a whole number")]
    NonIntegral { value: f64 },

    #[error("value {value} does not fit in {target}")]
    OutOfRange { value: i64, target: &'static str },

    #[error("value {value} has an imaginary part")]
    ComplexValue { value: String },

    #[error("value '{value}' is not boolean-like")]
    NotBoolLike { value: String },

    #[error("no zero-fill conversion to {target}")]
    UnsupportedFallback { target: &'static str },
}

/// Cast a column to the requested override type.
pub fn cast(column: &Column, target: OverrideType) -> Result<Column, CastError> {
    let semantic = target.target();
    match target {
        OverrideType::Int8 | OverrideType::Int16 | OverrideType::Int32 | OverrideType::Int64 => {
            cast_integer(column, semantic)
        }
        OverrideType::Float16 | OverrideType::Float32 | OverrideType::Float64 => {
            cast_float(column, semantic)
        }
        OverrideType::Bool => cast_bool(column),
        OverrideType::DateTime64 => Ok(cast_datetime(column)),
        OverrideType::TimeDelta => Ok(cast_timedelta(column)),
        OverrideType::Category => Ok(column.retagged(SemanticType::Categorical)),
        OverrideType::Object => Ok(cast_object(column)),
    }
}

/// Coerce to numeric, fill gaps with zero and force the requested width.
///
/// Floats truncate toward zero and out-of-range integers wrap, so this only
/// fails for targets with no numeric representation.
pub fn zero_fill(column: &Column, target: OverrideType) -> Result<Column, CastError> {
    let semantic = target.target();
    reject_complex(column)?;
    let numbers: Vec<Number> = column
        .cells()
        .iter()
        .map(|cell| to_number(cell).unwrap_or(Number::Int(0)))
        .collect();

    let cells: Vec<Cell> = if semantic.is_integer() {
        numbers
            .into_iter()
            .map(|n| {
                let whole = match n {
                    Number::Int(v) => v,
                    Number::Float(v) => v.trunc() as i64,
                };
                Cell::Int(wrap_to_width(whole, semantic))
            })
            .collect()
    } else if semantic.is_float() {
        numbers
            .into_iter()
            .map(|n| Cell::float(round_to_width(n.as_f64(), semantic)))
            .collect()
    } else if semantic == SemanticType::Boolean {
        numbers.into_iter().map(|n| Cell::Bool(n.as_f64() != 0.0)).collect()
    } else {
        return Err(CastError::UnsupportedFallback {
            target: target.label(),
        });
    };

    Ok(column.with_cells(semantic, cells))
}

/// Numeric view of a cell; `None` means it does not coerce.
fn to_number(cell: &Cell) -> Option<Number> {
    match cell {
        Cell::Missing => None,
        Cell::Int(v) => Some(Number::Int(*v)),
        Cell::Float(v) => Some(Number::Float(*v)),
        Cell::Bool(b) => Some(Number::Int(*b as i64)),
        Cell::Text(s) => parse_number(s),
        Cell::DateTime(dt) => dt.and_utc().timestamp_nanos_opt().map(Number::Int),
        Cell::Duration(td) => td.num_nanoseconds().map(Number::Int),
        Cell::Complex(c) if c.im == 0.0 => Some(Number::Float(c.re)),
        Cell::Complex(_) => None,
    }
}

/// Complex values only coerce to a real number when the imaginary part is zero.
fn reject_complex(column: &Column) -> Result<(), CastError> {
    match column.cells().iter().find_map(|cell| match cell {
        Cell::Complex(c) if c.im != 0.0 => Some(c),
        _ => None,
    }) {
        Some(c) => Err(CastError::ComplexValue {
            value: c.to_string(),
        }),
        None => Ok(()),
    }
}

fn cast_integer(column: &Column, semantic: SemanticType) -> Result<Column, CastError> {
    reject_complex(column)?;
    let (lo, hi) = semantic.integer_range().unwrap_or((i64::MIN, i64::MAX));
    let cells = column
        .cells()
        .iter()
        .map(|cell| match to_number(cell) {
            None => Ok(Cell::Missing),
            Some(Number::Float(v)) if !is_integral(v) => Err(CastError::NonIntegral { value: v }),
            Some(n) => {
                let value = match n {
                    Number::Int(v) => v,
                    Number::Float(v) => v as i64,
                };
                if value < lo || value > hi {
                    Err(CastError::OutOfRange {
                        value,
                        target: semantic.label(),
                    })
                } else {
                    Ok(Cell::Int(value))
                }
            }
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(column.with_cells(semantic, cells))
}

fn cast_float(column: &Column, semantic: SemanticType) -> Result<Column, CastError> {
    reject_complex(column)?;
    let cells = column
        .cells()
        .iter()
        .map(|cell| {
            to_number(cell).map_or(Cell::Missing, |n| {
                Cell::float(round_to_width(n.as_f64(), semantic))
            })
        })
        .collect();
    Ok(column.with_cells(semantic, cells))
}

fn cast_bool(column: &Column) -> Result<Column, CastError> {
    let not_bool_like = |cell: &Cell| CastError::NotBoolLike {
        value: cell.to_string(),
    };
    let cells = column
        .cells()
        .iter()
        .map(|cell| match cell {
            Cell::Missing => Ok(Cell::Missing),
            Cell::Bool(b) => Ok(Cell::Bool(*b)),
            Cell::Int(0) => Ok(Cell::Bool(false)),
            Cell::Int(1) => Ok(Cell::Bool(true)),
            Cell::Float(v) if *v == 0.0 => Ok(Cell::Bool(false)),
            Cell::Float(v) if *v == 1.0 => Ok(Cell::Bool(true)),
            Cell::Text(s) if s == "True" => Ok(Cell::Bool(true)),
            Cell::Text(s) if s == "False" => Ok(Cell::Bool(false)),
            other => Err(not_bool_like(other)),
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(column.with_cells(SemanticType::Boolean, cells))
}

fn cast_datetime(column: &Column) -> Column {
    let cells = column
        .cells()
        .iter()
        .map(|cell| {
            let value = match cell {
                Cell::DateTime(dt) => Some(*dt),
                Cell::Text(s) => parse_known_datetime(s),
                Cell::Int(v) => Some(from_epoch_nanos(*v)),
                Cell::Float(v) if is_integral(*v) => Some(from_epoch_nanos(*v as i64)),
                _ => None,
            };
            value.map_or(Cell::Missing, Cell::DateTime)
        })
        .collect();
    column.with_cells(SemanticType::DateTime, cells)
}

fn from_epoch_nanos(nanos: i64) -> NaiveDateTime {
    DateTime::from_timestamp_nanos(nanos).naive_utc()
}

fn cast_timedelta(column: &Column) -> Column {
    let cells = column
        .cells()
        .iter()
        .map(|cell| {
            let value = match cell {
                Cell::Duration(td) => Some(*td),
                Cell::Text(s) => parse_timedelta(s),
                Cell::Int(v) => Some(TimeDelta::nanoseconds(*v)),
                Cell::Float(v) if v.is_finite() => Some(TimeDelta::nanoseconds(v.trunc() as i64)),
                _ => None,
            };
            value.map_or(Cell::Missing, Cell::Duration)
        })
        .collect();
    column.with_cells(SemanticType::TimeDelta, cells)
}

/// Narrow float columns render at their own width once untyped.
fn cast_object(column: &Column) -> Column {
    let semantic = column.semantic();
    if semantic != SemanticType::Float32 && semantic != SemanticType::Float16 {
        return column.retagged(SemanticType::String);
    }
    let cells = column
        .cells()
        .iter()
        .map(|cell| match cell {
            Cell::Float(v) if semantic == SemanticType::Float32 => {
                Cell::Text(format_f32(*v as f32))
            }
            Cell::Float(v) => Cell::Text(format_f16(f16::from_f64(*v))),
            other => other.clone(),
        })
        .collect();
    column.with_cells(SemanticType::String, cells)
}

/// Round a value to the precision of a float width.
pub(crate) fn round_to_width(value: f64, semantic: SemanticType) -> f64 {
    match semantic {
        SemanticType::Float16 => f16::from_f64(value).to_f64(),
        SemanticType::Float32 => value as f32 as f64,
        _ => value,
    }
}

/// Two's complement wrap into an integer width.
fn wrap_to_width(value: i64, semantic: SemanticType) -> i64 {
    match semantic {
        SemanticType::Int8 => value as i8 as i64,
        SemanticType::Int16 => value as i16 as i64,
        SemanticType::Int32 => value as i32 as i64,
        _ => value,
    }
}

// =============================================================================
// Duration Parsing
// =============================================================================

const NANOS_PER_SECOND: i128 = 1_000_000_000;

static DAYS_CLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([+-]?\d+)\s*days?(?:\s*,?\s*([+-])?(\d{1,2}):(\d{2}):(\d{2})(?:\.(\d{1,9}))?)?$")
        .expect("Invalid regex: days clock")
});

static CLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([+-])?(\d+):(\d{2}):(\d{2})(?:\.(\d{1,9}))?$").expect("Invalid regex: clock")
});

static UNIT_COMPONENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([+-]?\d+(?:\.\d*)?(?:[eE][+-]?\d+)?)\s*([A-Za-z]+)\s*")
        .expect("Invalid regex: unit component")
});

/// Parse the textual duration forms explicit casts accept.
pub(crate) fn parse_timedelta(text: &str) -> Option<TimeDelta> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    let nanos = parse_days_clock(text)
        .or_else(|| parse_clock(text))
        .or_else(|| parse_units(text))
        .or_else(|| bare_nanos(text))?;
    i64::try_from(nanos).ok().map(TimeDelta::nanoseconds)
}

fn clock_nanos(hours: &str, minutes: &str, seconds: &str, fraction: Option<&str>) -> Option<i128> {
    let hours: i128 = hours.parse().ok()?;
    let minutes: i128 = minutes.parse().ok()?;
    let seconds: i128 = seconds.parse().ok()?;
    let fraction = match fraction {
        Some(digits) => format!("{digits:0<9}").parse::<i128>().ok()?,
        None => 0,
    };
    hours
        .checked_mul(60)?
        .checked_add(minutes)?
        .checked_mul(60)?
        .checked_add(seconds)?
        .checked_mul(NANOS_PER_SECOND)?
        .checked_add(fraction)
}

fn parse_days_clock(text: &str) -> Option<i128> {
    let caps = DAYS_CLOCK.captures(text)?;
    let days: i128 = caps[1].parse().ok()?;
    let total = days.checked_mul(86_400 * NANOS_PER_SECOND)?;
    let (Some(h), Some(m), Some(s)) = (caps.get(3), caps.get(4), caps.get(5)) else {
        return Some(total);
    };
    let fraction = caps.get(6).map(|f| f.as_str());
    let clock = clock_nanos(h.as_str(), m.as_str(), s.as_str(), fraction)?;
    match caps.get(2).map(|sign| sign.as_str()) {
        Some("-") => total.checked_sub(clock),
        _ => total.checked_add(clock),
    }
}

fn parse_clock(text: &str) -> Option<i128> {
    let caps = CLOCK.captures(text)?;
    let clock = clock_nanos(&caps[2], &caps[3], &caps[4], caps.get(5).map(|f| f.as_str()))?;
    match caps.get(1).map(|sign| sign.as_str()) {
        Some("-") => Some(-clock),
        _ => Some(clock),
    }
}

fn unit_nanos(unit: &str) -> Option<f64> {
    let nanos = match unit {
        "w" | "W" | "week" | "weeks" => 7.0 * 86_400e9,
        "d" | "D" | "day" | "days" => 86_400e9,
        "h" | "H" | "hr" | "hour" | "hours" => 3_600e9,
        "m" | "T" | "min" | "minute" | "minutes" => 60e9,
        "s" | "S" | "sec" | "second" | "seconds" => 1e9,
        "ms" | "L" | "milli" | "millis" | "millisecond" | "milliseconds" => 1e6,
        "us" | "U" | "micro" | "micros" | "microsecond" | "microseconds" => 1e3,
        "ns" | "N" | "nano" | "nanos" | "nanosecond" | "nanoseconds" => 1.0,
        _ => return None,
    };
    Some(nanos)
}

/// `1h30m`, `2 days 3 hours`, `-1.5s` and similar sequences.
fn parse_units(text: &str) -> Option<i128> {
    let mut consumed = 0;
    let mut total = 0.0;
    for caps in UNIT_COMPONENT.captures_iter(text) {
        let whole = caps.get(0)?;
        if whole.start() != consumed {
            return None;
        }
        consumed = whole.end();
        let amount: f64 = caps[1].parse().ok()?;
        total += amount * unit_nanos(&caps[2])?;
    }
    if consumed != text.len() || consumed == 0 || !total.is_finite() {
        return None;
    }
    Some(total.round() as i128)
}

fn bare_nanos(text: &str) -> Option<i128> {
    match parse_number(text)? {
        Number::Int(v) => Some(v as i128),
        Number::Float(v) if v.is_finite() => Some(v.trunc() as i128),
        Number::Float(_) => None,
    }
}
