//! Date/time detection with a format sampled from the first value.

use chrono::{NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;

use super::{Detection, Detector, Rejection};
use crate::types::{Cell, Column, SemanticType};

/// A strftime format with a regex that enforces its field widths.
///
/// chrono accepts years of any length, so the regex pins `%Y` to exactly
/// four digits and the remaining fields to one or two.
struct DateFormat {
    format: &'static str,
    shape: Regex,
    date_only: bool,
}

impl DateFormat {
    fn new(format: &'static str) -> Self {
        let mut shape = String::from("^");
        let mut chars = format.chars();
        while let Some(c) = chars.next() {
            if c == '%' {
                match chars.next() {
                    Some('Y') => shape.push_str(r"\d{4}"),
                    Some(_) => shape.push_str(r"\d{1,2}"),
                    None => {}
                }
            } else {
                shape.push_str(&regex::escape(&c.to_string()));
            }
        }
        shape.push('$');

        Self {
            format,
            shape: Regex::new(&shape).expect("Invalid regex: date format"),
            date_only: !format.contains("%H"),
        }
    }

    fn parse(&self, text: &str) -> Option<NaiveDateTime> {
        if !self.shape.is_match(text) {
            return None;
        }
        if self.date_only {
            NaiveDate::parse_from_str(text, self.format)
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        } else {
            NaiveDateTime::parse_from_str(text, self.format).ok()
        }
    }
}

// Candidate formats in priority order - compiled once at startup
static DATE_FORMATS: Lazy<Vec<DateFormat>> = Lazy::new(|| {
    [
        "%Y/%m/%d",
        "%Y-%m-%d",
        "%m/%d/%Y",
        "%m-%d-%Y",
        "%d/%m/%Y",
        "%d-%m-%Y",
        "%Y/%m/%d %H:%M:%S",
        "%Y-%m-%d %H:%M:%S",
        "%m/%d/%Y %H:%M:%S",
        "%m-%d-%Y %H:%M:%S",
        "%d/%m/%Y %H:%M:%S",
        "%d-%m-%Y %H:%M:%S",
    ]
    .into_iter()
    .map(DateFormat::new)
    .collect()
});

// ISO forms accepted by explicit datetime casts
const ISO_FORMATS: [&str; 3] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
];

/// Parse text with any known format, ISO forms included.
pub(crate) fn parse_known_datetime(text: &str) -> Option<NaiveDateTime> {
    let text = text.trim();
    DATE_FORMATS
        .iter()
        .find_map(|f| f.parse(text))
        .or_else(|| {
            ISO_FORMATS
                .iter()
                .find_map(|f| NaiveDateTime::parse_from_str(text, f).ok())
        })
}

/// Claims text columns whose values parse with the format of the first
/// value.
#[derive(Debug, Clone)]
pub struct DateTimeDetector {
    min_percentage: f64,
}

impl DateTimeDetector {
    /// `min_percentage` is inclusive.
    pub fn new(min_percentage: f64) -> Self {
        Self { min_percentage }
    }
}

impl Default for DateTimeDetector {
    fn default() -> Self {
        Self::new(75.0)
    }
}

impl Detector for DateTimeDetector {
    fn name(&self) -> &'static str {
        "datetime"
    }

    fn applies_to(&self, column: &Column) -> bool {
        column.semantic().is_string_like()
    }

    fn detect(&self, column: &Column, _height: usize) -> Detection {
        let Some(first) = column.cells().first() else {
            return Detection::Rejected(Rejection::EmptyColumn);
        };
        let Some(format) = first
            .as_text()
            .and_then(|text| DATE_FORMATS.iter().find(|f| f.parse(text).is_some()))
        else {
            return Detection::Rejected(Rejection::NoFormat);
        };

        let cells: Vec<Cell> = column
            .cells()
            .iter()
            .map(|cell| {
                cell.as_text()
                    .and_then(|text| format.parse(text))
                    .map_or(Cell::Missing, Cell::DateTime)
            })
            .collect();
        let parsed = cells.iter().filter(|c| !c.is_missing()).count();
        let observed = parsed as f64 / cells.len() as f64 * 100.0;

        if observed >= self.min_percentage {
            Detection::Claimed(column.with_cells(SemanticType::DateTime, cells))
        } else {
            Detection::Rejected(Rejection::BelowThreshold {
                observed,
                required: self.min_percentage,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn date(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap()
    }

    #[test]
    fn test_iso_dates_claimed() {
        let column = Column::from_strings("when", &[Some("2020-01-01"), Some("2020-02-01")]);
        let Detection::Claimed(claimed) = DateTimeDetector::default().detect(&column, 2) else {
            panic!("expected a claim");
        };
        assert_eq!(claimed.semantic(), SemanticType::DateTime);
        assert_eq!(
            claimed.cells(),
            &[
                Cell::DateTime(date(2020, 1, 1)),
                Cell::DateTime(date(2020, 2, 1))
            ]
        );
    }

    #[test]
    fn test_first_value_picks_format() {
        // 03/04/2021 reads month-first, so 25/12/2021 no longer parses
        let column = Column::from_strings(
            "when",
            &[Some("03/04/2021"), Some("25/12/2021"), Some("05/06/2021"), Some("07/08/2021")],
        );
        let Detection::Claimed(claimed) = DateTimeDetector::default().detect(&column, 4) else {
            panic!("expected a claim");
        };
        assert_eq!(claimed.cells()[0], Cell::DateTime(date(2021, 3, 4)));
        assert_eq!(claimed.cells()[1], Cell::Missing);
    }

    #[test]
    fn test_unpadded_fields_and_times() {
        assert_eq!(parse_known_datetime("2021-3-4"), Some(date(2021, 3, 4)));
        assert_eq!(
            parse_known_datetime("2021/03/04 7:05:09"),
            NaiveDate::from_ymd_opt(2021, 3, 4)
                .unwrap()
                .and_hms_opt(7, 5, 9)
        );
    }

    #[test]
    fn test_year_must_have_four_digits() {
        assert_eq!(parse_known_datetime("21-03-04"), None);
        assert_eq!(parse_known_datetime("12021-03-04"), None);
    }

    #[test]
    fn test_iso_t_separator_only_for_casts() {
        let column = Column::from_strings("when", &[Some("2020-01-01T10:00:00")]);
        assert_eq!(
            DateTimeDetector::default().detect(&column, 1),
            Detection::Rejected(Rejection::NoFormat)
        );
        assert!(parse_known_datetime("2020-01-01T10:00:00").is_some());
    }

    #[test]
    fn test_missing_first_value_rejected() {
        let column = Column::from_strings("when", &[None, Some("2020-01-01")]);
        assert_eq!(
            DateTimeDetector::default().detect(&column, 2),
            Detection::Rejected(Rejection::NoFormat)
        );
    }

    #[test]
    fn test_below_threshold() {
        let column = Column::from_strings(
            "when",
            &[Some("2020-01-01"), Some("soon"), Some("later"), Some("2020-01-03")],
        );
        assert!(matches!(
            DateTimeDetector::default().detect(&column, 4),
            Detection::Rejected(Rejection::BelowThreshold { .. })
        ));
    }

    #[test]
    fn test_empty_column_rejected() {
        let column = Column::from_strings::<&str>("when", &[]);
        assert_eq!(
            DateTimeDetector::default().detect(&column, 0),
            Detection::Rejected(Rejection::EmptyColumn)
        );
    }
}
