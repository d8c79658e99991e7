//! Column renaming and CSV serialization.

use chrono::Timelike;
use half::f16;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use crate::error::{Result, TypecastError};
use crate::types::{Cell, Column, Dataset, SemanticType};
use crate::utils::{format_f16, format_f32, format_float};

// Parenthesized groups, shortest match first
static PARENTHESIZED: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\(.*?\)").expect("Invalid regex: parenthesized group"));

/// Annotates column names with their final type label.
///
/// Existing `(...)` groups are stripped first, so `Revenue(old)` typed as
/// float32 becomes `Revenue(float32)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ColumnRenamer;

impl ColumnRenamer {
    pub fn rename(&self, name: &str, semantic: SemanticType) -> String {
        let stripped = PARENTHESIZED.replace_all(name, "");
        format!("{}({})", stripped, semantic.label())
    }

    /// Rename every column of the dataset in place.
    pub fn apply(&self, dataset: &mut Dataset) {
        for column in dataset.columns_mut() {
            let renamed = self.rename(column.name(), column.semantic());
            debug!("Renaming '{}' to '{}'", column.name(), renamed);
            column.set_name(renamed);
        }
    }
}

/// Writes a dataset as UTF-8 CSV.
///
/// The header holds the column names, there is no index column, fields are
/// quoted only when needed and missing values are empty. Columns shorter
/// than the dataset height are emitted top-aligned and padded.
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvSerializer;

impl CsvSerializer {
    pub fn serialize(&self, dataset: &Dataset) -> Result<Vec<u8>> {
        if dataset.width() == 0 {
            return Ok(Vec::new());
        }

        let mut writer = csv::Writer::from_writer(Vec::new());
        writer.write_record(dataset.columns().iter().map(Column::name))?;

        let renderers: Vec<ColumnRenderer> =
            dataset.columns().iter().map(ColumnRenderer::new).collect();
        let mut record: Vec<String> = Vec::with_capacity(dataset.width());
        for row in 0..dataset.height() {
            record.clear();
            record.extend(dataset.columns().iter().zip(&renderers).map(|(column, renderer)| {
                column
                    .cells()
                    .get(row)
                    .map_or_else(String::new, |cell| renderer.render(cell))
            }));
            writer.write_record(&record)?;
        }

        writer
            .into_inner()
            .map_err(|e| TypecastError::Io(e.into_error()))
    }
}

/// Per-column rendering choices made once before writing rows.
struct ColumnRenderer {
    semantic: SemanticType,
    date_only: bool,
}

impl ColumnRenderer {
    fn new(column: &Column) -> Self {
        let date_only = column.cells().iter().all(|cell| match cell {
            Cell::DateTime(dt) => {
                dt.time().num_seconds_from_midnight() == 0 && dt.nanosecond() == 0
            }
            _ => true,
        });
        Self {
            semantic: column.semantic(),
            date_only,
        }
    }

    fn render(&self, cell: &Cell) -> String {
        match cell {
            Cell::Float(v) => match self.semantic {
                SemanticType::Float32 => format_f32(*v as f32),
                SemanticType::Float16 => format_f16(f16::from_f64(*v)),
                _ => format_float(*v),
            },
            Cell::DateTime(dt) if self.date_only => dt.format("%Y-%m-%d").to_string(),
            Cell::DateTime(dt) => dt.format("%Y-%m-%d %H:%M:%S%.f").to_string(),
            other => other.to_string(),
        }
    }
}
