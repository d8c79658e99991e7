//! Complex number filtering, the last step of the cascade.

use super::{Detection, Detector, Rejection};
use crate::config::ComplexPolicy;
use crate::types::{Cell, Column, Complex64, SemanticType};

/// Claims columns whose values are mostly complex literals.
///
/// Numbers and booleans count as complex with a zero imaginary part and
/// missing cells count as parseable. What happens to the remaining values
/// depends on the [`ComplexPolicy`].
#[derive(Debug, Clone)]
pub struct ComplexFilter {
    min_percentage: f64,
    policy: ComplexPolicy,
}

impl ComplexFilter {
    /// `min_percentage` is exclusive: the parseable share must be strictly
    /// greater.
    pub fn new(min_percentage: f64, policy: ComplexPolicy) -> Self {
        Self {
            min_percentage,
            policy,
        }
    }
}

impl Default for ComplexFilter {
    fn default() -> Self {
        Self::new(75.0, ComplexPolicy::default())
    }
}

/// `Some(cell)` when the value is complex-parseable.
fn to_complex(cell: &Cell) -> Option<Cell> {
    let value = match cell {
        Cell::Missing => return Some(Cell::Missing),
        Cell::Complex(c) => *c,
        Cell::Text(s) => s.parse::<Complex64>().ok()?,
        Cell::Int(v) => Complex64::new(*v as f64, 0.0),
        Cell::Float(v) => Complex64::new(*v, 0.0),
        Cell::Bool(b) => Complex64::new(*b as u8 as f64, 0.0),
        Cell::DateTime(_) | Cell::Duration(_) => return None,
    };
    Some(Cell::Complex(value))
}

impl Detector for ComplexFilter {
    fn name(&self) -> &'static str {
        "complex"
    }

    fn applies_to(&self, _column: &Column) -> bool {
        true
    }

    fn detect(&self, column: &Column, _height: usize) -> Detection {
        let converted: Vec<Option<Cell>> = column.cells().iter().map(to_complex).collect();
        if converted.is_empty() {
            return Detection::Rejected(Rejection::EmptyColumn);
        }

        let parseable = converted.iter().filter(|c| c.is_some()).count();
        let observed = parseable as f64 / converted.len() as f64 * 100.0;
        if observed <= self.min_percentage {
            return Detection::Rejected(Rejection::BelowThreshold {
                observed,
                required: self.min_percentage,
            });
        }

        let cells: Vec<Cell> = match self.policy {
            ComplexPolicy::MaskUnparseable => converted
                .into_iter()
                .map(|c| c.unwrap_or(Cell::Missing))
                .collect(),
            ComplexPolicy::DropUnparseable => converted.into_iter().flatten().collect(),
        };
        Detection::Claimed(column.with_cells(SemanticType::Complex, cells))
    }
}
