//! Column type inference.
//!
//! This module provides the per-column detectors and the [`TypeCascade`]
//! that runs them in priority order:
//! - Boolean detection (`"True"` / `"False"` text)
//! - Categorical detection (low cardinality text)
//! - Numeric downcasting (smallest integer width, float32 narrowing)
//! - Date/time detection (format sampled from the first value)
//! - Complex number filtering

mod boolean;
mod categorical;
mod complex;
mod datetime;
mod numeric;

pub use boolean::BooleanDetector;
pub use categorical::CategoricalDetector;
pub use complex::ComplexFilter;
pub use datetime::DateTimeDetector;
pub use numeric::NumericDowncaster;

pub(crate) use datetime::parse_known_datetime;
pub(crate) use numeric::{Number, parse_number};

use serde::Serialize;
use std::fmt;
use tracing::debug;

use crate::config::InferenceConfig;
use crate::types::{Column, Dataset, SemanticType};

/// Why a detector declined a column.
#[derive(Debug, Clone, PartialEq)]
pub enum Rejection {
    /// The column has no values to measure.
    EmptyColumn,
    /// The measured share did not meet the detector's threshold.
    BelowThreshold { observed: f64, required: f64 },
    /// The first value is missing or matches no known format.
    NoFormat,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyColumn => f.write_str("empty column"),
            Self::BelowThreshold { observed, required } => {
                write!(f, "observed {observed:.3}, required {required:.3}")
            }
            Self::NoFormat => f.write_str("no recognizable format in first value"),
        }
    }
}

/// Outcome of running one detector on one column.
#[derive(Debug, Clone, PartialEq)]
pub enum Detection {
    /// The detector takes the column; this is the converted replacement.
    Claimed(Column),
    /// The column is left untouched.
    Rejected(Rejection),
}

/// A single step of the cascade.
///
/// Detectors never mutate their input. A claim returns a new column and a
/// rejection leaves the original in place, so a failed attempt needs no
/// rollback.
pub trait Detector: Send + Sync {
    /// Short name used in reports and logs.
    fn name(&self) -> &'static str;

    /// Whether the detector looks at columns of this type at all.
    fn applies_to(&self, column: &Column) -> bool;

    /// Measure the column against the detector's threshold.
    ///
    /// `height` is the dataset's row count, which some detectors use as the
    /// denominator instead of the column length.
    fn detect(&self, column: &Column, height: usize) -> Detection;
}

/// Per-column result of a cascade run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnReport {
    pub column: String,
    /// Detector that claimed the column, `None` if every one declined.
    pub claimed_by: Option<&'static str>,
    pub semantic_type: SemanticType,
}

/// Ordered list of detectors; the first claim wins.
///
/// # Example
///
/// ```rust,ignore
/// use lex_typecast::inference::TypeCascade;
/// use lex_typecast::InferenceConfig;
///
/// let cascade = TypeCascade::standard(&InferenceConfig::default());
/// let reports = cascade.run(&mut dataset);
/// ```
pub struct TypeCascade {
    detectors: Vec<Box<dyn Detector>>,
}

static_assertions::assert_impl_all!(TypeCascade: Send, Sync);

impl TypeCascade {
    /// An empty cascade that claims nothing.
    pub fn new() -> Self {
        Self {
            detectors: Vec::new(),
        }
    }

    /// Boolean, categorical, numeric, date/time, complex.
    pub fn standard(config: &InferenceConfig) -> Self {
        Self::new()
            .with_detector(BooleanDetector::new(config.boolean_ratio))
            .with_detector(CategoricalDetector::new(config.categorical_ratio))
            .with_detector(NumericDowncaster::new(config.numeric_ratio))
            .with_detector(DateTimeDetector::new(config.datetime_percentage))
            .with_detector(ComplexFilter::new(
                config.complex_percentage,
                config.complex_policy,
            ))
    }

    /// Append a detector at the lowest priority.
    pub fn with_detector(mut self, detector: impl Detector + 'static) -> Self {
        self.detectors.push(Box::new(detector));
        self
    }

    /// Insert a detector at `index`, shifting lower priorities down.
    pub fn insert(&mut self, index: usize, detector: Box<dyn Detector>) {
        let index = index.min(self.detectors.len());
        self.detectors.insert(index, detector);
    }

    /// Remove the first detector with the given name.
    pub fn remove(&mut self, name: &str) -> Option<Box<dyn Detector>> {
        let index = self.detectors.iter().position(|d| d.name() == name)?;
        Some(self.detectors.remove(index))
    }

    pub fn detector_names(&self) -> Vec<&'static str> {
        self.detectors.iter().map(|d| d.name()).collect()
    }

    /// Run the detectors on one column until one claims it.
    ///
    /// Returns the (possibly unchanged) column and the claiming detector.
    pub fn classify(&self, column: &Column, height: usize) -> (Column, Option<&'static str>) {
        for detector in &self.detectors {
            if !detector.applies_to(column) {
                continue;
            }
            match detector.detect(column, height) {
                Detection::Claimed(converted) => {
                    debug!(
                        "Column '{}' claimed by {} as {}",
                        column.name(),
                        detector.name(),
                        converted.semantic()
                    );
                    return (converted, Some(detector.name()));
                }
                Detection::Rejected(reason) => {
                    debug!(
                        "Column '{}' rejected by {}: {}",
                        column.name(),
                        detector.name(),
                        reason
                    );
                }
            }
        }
        (column.clone(), None)
    }

    /// Classify every column of the dataset in place.
    pub fn run(&self, dataset: &mut Dataset) -> Vec<ColumnReport> {
        let height = dataset.height();
        let mut reports = Vec::with_capacity(dataset.width());

        for index in 0..dataset.width() {
            let (column, claimed_by) = self.classify(&dataset.columns()[index], height);
            reports.push(ColumnReport {
                column: column.name().to_string(),
                claimed_by,
                semantic_type: column.semantic(),
            });
            dataset.replace(index, column);
        }

        reports
    }
}

impl Default for TypeCascade {
    fn default() -> Self {
        Self::standard(&InferenceConfig::default())
    }
}

impl fmt::Debug for TypeCascade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeCascade")
            .field("detectors", &self.detector_names())
            .finish()
    }
}

/// Share of `part` in `total`, or `None` when there is nothing to measure.
pub(crate) fn ratio(part: usize, total: usize) -> Option<f64> {
    (total > 0).then(|| part as f64 / total as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Cell;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Wraps a detector and counts how often it is consulted.
    struct Counting<D> {
        inner: D,
        calls: Arc<AtomicUsize>,
    }

    impl<D: Detector> Detector for Counting<D> {
        fn name(&self) -> &'static str {
            self.inner.name()
        }

        fn applies_to(&self, column: &Column) -> bool {
            self.inner.applies_to(column)
        }

        fn detect(&self, column: &Column, height: usize) -> Detection {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inner.detect(column, height)
        }
    }

    /// Claims every column as int64 without looking at it.
    struct ClaimEverything;

    impl Detector for ClaimEverything {
        fn name(&self) -> &'static str {
            "claim-everything"
        }

        fn applies_to(&self, _column: &Column) -> bool {
            true
        }

        fn detect(&self, column: &Column, _height: usize) -> Detection {
            Detection::Claimed(column.retagged(SemanticType::Int64))
        }
    }

    fn counting<D: Detector>(inner: D) -> (Counting<D>, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (
            Counting {
                inner,
                calls: Arc::clone(&calls),
            },
            calls,
        )
    }

    #[test]
    fn test_standard_order() {
        let cascade = TypeCascade::default();
        assert_eq!(
            cascade.detector_names(),
            vec!["boolean", "categorical", "numeric", "datetime", "complex"]
        );
    }

    #[test]
    fn test_first_claim_stops_cascade() {
        let (boolean, boolean_calls) = counting(BooleanDetector::default());
        let (categorical, categorical_calls) = counting(CategoricalDetector::default());
        let (numeric, numeric_calls) = counting(NumericDowncaster::default());
        let cascade = TypeCascade::new()
            .with_detector(boolean)
            .with_detector(categorical)
            .with_detector(numeric);

        let mut dataset = Dataset::new(vec![Column::from_strings(
            "flag",
            &[Some("True"), Some("False"), Some("True")],
        )]);
        let reports = cascade.run(&mut dataset);

        assert_eq!(reports[0].claimed_by, Some("boolean"));
        assert_eq!(boolean_calls.load(Ordering::SeqCst), 1);
        assert_eq!(categorical_calls.load(Ordering::SeqCst), 0);
        assert_eq!(numeric_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_rejection_passes_column_on_unchanged() {
        let (numeric, numeric_calls) = counting(NumericDowncaster::default());
        let cascade = TypeCascade::new()
            .with_detector(BooleanDetector::default())
            .with_detector(numeric);

        let original = Column::from_strings("name", &[Some("a"), Some("b"), Some("c")]);
        let (column, claimed_by) = cascade.classify(&original, 3);

        assert_eq!(claimed_by, None);
        assert_eq!(column, original);
        assert_eq!(numeric_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_custom_detector_insertion_and_removal() {
        let mut cascade = TypeCascade::default();
        cascade.insert(0, Box::new(ClaimEverything));
        assert_eq!(cascade.detector_names()[0], "claim-everything");

        let (column, claimed_by) =
            cascade.classify(&Column::from_strings("x", &[Some("True")]), 1);
        assert_eq!(claimed_by, Some("claim-everything"));
        assert_eq!(column.semantic(), SemanticType::Int64);

        assert!(cascade.remove("claim-everything").is_some());
        assert!(cascade.remove("claim-everything").is_none());
        assert_eq!(cascade.detector_names().len(), 5);
    }

    #[test]
    fn test_run_reports_every_column() {
        let mut dataset = Dataset::new(vec![
            Column::from_strings("flag", &[Some("True"), Some("False"), Some("True")]),
            Column::new(
                "n",
                SemanticType::Int64,
                vec![Cell::Int(1), Cell::Int(2), Cell::Int(300)],
            ),
            Column::from_strings(
                "when",
                &[Some("2020-01-01"), Some("2020-02-01"), Some("2020-03-09")],
            ),
        ]);

        let reports = TypeCascade::default().run(&mut dataset);
        let summary: Vec<(Option<&str>, SemanticType)> = reports
            .iter()
            .map(|r| (r.claimed_by, r.semantic_type))
            .collect();

        assert_eq!(
            summary,
            vec![
                (Some("boolean"), SemanticType::Boolean),
                (Some("numeric"), SemanticType::Int16),
                (Some("datetime"), SemanticType::DateTime),
            ]
        );
        assert_eq!(dataset.columns()[1].semantic(), SemanticType::Int16);
    }

    #[test]
    fn test_ratio() {
        assert_eq!(ratio(1, 4), Some(0.25));
        assert_eq!(ratio(0, 0), None);
    }
}
