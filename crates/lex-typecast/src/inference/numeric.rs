//! Numeric parsing and width narrowing.

use super::{Detection, Detector, Rejection, ratio};
use crate::types::{Cell, Column, SemanticType};
use crate::utils::{parse_float, parse_integer};

/// A parsed numeric value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Number {
    Int(i64),
    Float(f64),
}

impl Number {
    pub(crate) fn as_f64(self) -> f64 {
        match self {
            Number::Int(v) => v as f64,
            Number::Float(v) => v,
        }
    }
}

/// Parse text as an integer first, then as a float.
pub(crate) fn parse_number(text: &str) -> Option<Number> {
    parse_integer(text)
        .map(Number::Int)
        .or_else(|| parse_float(text).map(Number::Float))
}

fn cell_number(cell: &Cell) -> Option<Number> {
    match cell {
        Cell::Int(v) => Some(Number::Int(*v)),
        Cell::Float(v) => Some(Number::Float(*v)),
        Cell::Bool(b) => Some(Number::Int(*b as i64)),
        Cell::Text(s) => parse_number(s),
        _ => None,
    }
}

/// Converts mostly numeric columns to the smallest fitting width.
///
/// Integral columns with no gaps narrow to int8/16/32/64. The bounds are
/// open on both ends, so -128 and 127 already need int16. Anything else is
/// floating: float32 when no value is missing, float64 otherwise.
#[derive(Debug, Clone)]
pub struct NumericDowncaster {
    min_ratio: f64,
}

impl NumericDowncaster {
    /// `min_ratio` is inclusive.
    pub fn new(min_ratio: f64) -> Self {
        Self { min_ratio }
    }
}

impl Default for NumericDowncaster {
    fn default() -> Self {
        Self::new(0.75)
    }
}

impl Detector for NumericDowncaster {
    fn name(&self) -> &'static str {
        "numeric"
    }

    fn applies_to(&self, column: &Column) -> bool {
        let semantic = column.semantic();
        semantic.is_string_like() || semantic.is_numeric() || semantic == SemanticType::Boolean
    }

    fn detect(&self, column: &Column, _height: usize) -> Detection {
        let parsed: Vec<Option<Number>> = column.cells().iter().map(cell_number).collect();
        let count = parsed.iter().flatten().count();

        let Some(observed) = ratio(count, parsed.len()) else {
            return Detection::Rejected(Rejection::EmptyColumn);
        };
        if observed < self.min_ratio {
            return Detection::Rejected(Rejection::BelowThreshold {
                observed,
                required: self.min_ratio,
            });
        }

        // Booleans already are numeric storage.
        if column.semantic() == SemanticType::Boolean {
            return Detection::Claimed(column.clone());
        }

        let integers: Option<Vec<i64>> = parsed
            .iter()
            .map(|n| match n {
                Some(Number::Int(v)) => Some(*v),
                _ => None,
            })
            .collect();

        let converted = match integers {
            Some(values) => {
                let semantic = integer_width(&values);
                column.with_cells(semantic, values.into_iter().map(Cell::Int).collect())
            }
            None if count == parsed.len() => {
                let cells = parsed
                    .iter()
                    .flatten()
                    .map(|n| Cell::float(n.as_f64() as f32 as f64))
                    .collect();
                column.with_cells(SemanticType::Float32, cells)
            }
            None => {
                let cells = parsed
                    .iter()
                    .map(|n| n.map_or(Cell::Missing, |n| Cell::float(n.as_f64())))
                    .collect();
                column.with_cells(SemanticType::Float64, cells)
            }
        };
        Detection::Claimed(converted)
    }
}

/// Smallest signed width by open-bound comparison of the observed range.
fn integer_width(values: &[i64]) -> SemanticType {
    let (Some(&min), Some(&max)) = (values.iter().min(), values.iter().max()) else {
        return SemanticType::Int64;
    };
    let fits = |lo: i64, hi: i64| lo < min && max < hi;

    if fits(i8::MIN as i64, i8::MAX as i64) {
        SemanticType::Int8
    } else if fits(i16::MIN as i64, i16::MAX as i64) {
        SemanticType::Int16
    } else if fits(i32::MIN as i64, i32::MAX as i64) {
        SemanticType::Int32
    } else {
        SemanticType::Int64
    }
}
