//! Categorical detection for low cardinality text columns.

use std::collections::HashSet;

use super::{Detection, Detector, Rejection, ratio};
use crate::types::{Column, SemanticType};

/// Tags a text column as categorical when it has few distinct values
/// relative to the dataset height. Values are not altered.
#[derive(Debug, Clone)]
pub struct CategoricalDetector {
    max_ratio: f64,
}

impl CategoricalDetector {
    /// `max_ratio` is exclusive: distinct/height must be strictly lower.
    pub fn new(max_ratio: f64) -> Self {
        Self { max_ratio }
    }
}

impl Default for CategoricalDetector {
    fn default() -> Self {
        Self::new(0.5)
    }
}

impl Detector for CategoricalDetector {
    fn name(&self) -> &'static str {
        "categorical"
    }

    fn applies_to(&self, column: &Column) -> bool {
        column.semantic().is_string_like()
    }

    fn detect(&self, column: &Column, height: usize) -> Detection {
        // Missing is one more distinct value when present.
        let distinct: HashSet<Option<&str>> = column.cells().iter().map(|c| c.as_text()).collect();

        let Some(observed) = ratio(distinct.len(), height) else {
            return Detection::Rejected(Rejection::EmptyColumn);
        };
        if observed < self.max_ratio {
            Detection::Claimed(column.retagged(SemanticType::Categorical))
        } else {
            Detection::Rejected(Rejection::BelowThreshold {
                observed,
                required: self.max_ratio,
            })
        }
    }
}
