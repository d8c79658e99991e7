//! Boolean detection for text columns.

use super::{Detection, Detector, Rejection, ratio};
use crate::types::{Cell, Column, SemanticType};

/// Claims text columns made mostly of the exact tokens `"True"` and
/// `"False"`. Any other value, including other spellings, becomes missing.
#[derive(Debug, Clone)]
pub struct BooleanDetector {
    min_ratio: f64,
}

impl BooleanDetector {
    /// `min_ratio` is exclusive: the matched share must be strictly greater.
    pub fn new(min_ratio: f64) -> Self {
        Self { min_ratio }
    }
}

impl Default for BooleanDetector {
    fn default() -> Self {
        Self::new(0.74)
    }
}

impl Detector for BooleanDetector {
    fn name(&self) -> &'static str {
        "boolean"
    }

    fn applies_to(&self, column: &Column) -> bool {
        column.semantic().is_string_like()
    }

    fn detect(&self, column: &Column, _height: usize) -> Detection {
        let cells: Vec<Cell> = column
            .cells()
            .iter()
            .map(|cell| match cell.as_text() {
                Some("True") => Cell::Bool(true),
                Some("False") => Cell::Bool(false),
                _ => Cell::Missing,
            })
            .collect();
        let matched = cells.iter().filter(|c| !c.is_missing()).count();

        let Some(observed) = ratio(matched, cells.len()) else {
            return Detection::Rejected(Rejection::EmptyColumn);
        };
        if observed > self.min_ratio {
            Detection::Claimed(column.with_cells(SemanticType::Boolean, cells))
        } else {
            Detection::Rejected(Rejection::BelowThreshold {
                observed,
                required: self.min_ratio,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_claims_true_false_text() {
        let column = Column::from_strings("flag", &[Some("True"), Some("False"), Some("True")]);
        let Detection::Claimed(claimed) = BooleanDetector::default().detect(&column, 3) else {
            panic!("expected a claim");
        };
        assert_eq!(claimed.semantic(), SemanticType::Boolean);
        assert_eq!(
            claimed.cells(),
            &[Cell::Bool(true), Cell::Bool(false), Cell::Bool(true)]
        );
    }

    #[test]
    fn test_non_tokens_become_missing() {
        // 3 of 4 = 0.75 > 0.74
        let column = Column::from_strings(
            "flag",
            &[Some("True"), Some("False"), Some("yes"), Some("False")],
        );
        let Detection::Claimed(claimed) = BooleanDetector::default().detect(&column, 4) else {
            panic!("expected a claim");
        };
        assert_eq!(claimed.cells()[2], Cell::Missing);
    }

    #[test]
    fn test_case_sensitive_tokens() {
        let column = Column::from_strings("flag", &[Some("true"), Some("false"), Some("TRUE")]);
        assert!(matches!(
            BooleanDetector::default().detect(&column, 3),
            Detection::Rejected(Rejection::BelowThreshold { .. })
        ));
    }

    #[test]
    fn test_missing_counts_against_ratio() {
        let column = Column::from_strings("flag", &[Some("True"), None, Some("False"), None]);
        assert!(matches!(
            BooleanDetector::default().detect(&column, 4),
            Detection::Rejected(_)
        ));
    }

    #[test]
    fn test_empty_column_rejected() {
        let column = Column::from_strings::<&str>("flag", &[]);
        assert_eq!(
            BooleanDetector::default().detect(&column, 0),
            Detection::Rejected(Rejection::EmptyColumn)
        );
    }

    #[test]
    fn test_only_text_columns() {
        let column = Column::new("n", SemanticType::Int64, vec![Cell::Int(1)]);
        assert!(!BooleanDetector::default().applies_to(&column));
    }
}
