//! Custom error types for the type conversion pipeline.
//!
//! Pipeline-level failures (unsupported input format, unknown override
//! label, unreadable input) are reported through [`TypecastError`] and abort
//! the whole conversion. Value-level coercion failures never reach this
//! type: they degrade to missing cells and are judged by the detector
//! thresholds instead.
//!
//! Errors are serializable so a front end can show them without parsing
//! the message.

use serde::Serialize;
use serde::ser::SerializeStruct;
use thiserror::Error;

/// The main error type for the type conversion pipeline.
#[derive(Error, Debug)]
pub enum TypecastError {
    /// The source name does not end in a recognized tabular extension.
    #[error("Unsupported file format for '{0}'. Only CSV and Excel files are supported.")]
    UnsupportedFormat(String),

    /// The override map requests a type outside the closed label set.
    #[error("Unsupported type '{label}' requested for column '{column}'")]
    UnsupportedTypeLabel { column: String, label: String },

    /// The override map is valid JSON but not an object of column -> label.
    #[error("Invalid type override map: {0}")]
    InvalidOverrideMap(String),

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The workbook was opened but holds nothing we can read.
    #[error("Spreadsheet error: {0}")]
    Spreadsheet(String),

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Polars error wrapper (CSV ingestion).
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// XLSX reader error wrapper.
    #[error("XLSX error: {0}")]
    Xlsx(#[from] calamine::XlsxError),

    /// CSV writer error wrapper.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<TypecastError>,
    },
}

impl TypecastError {
    /// Add context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        TypecastError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Get error code for front end handling.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::UnsupportedFormat(_) => "UNSUPPORTED_FORMAT",
            Self::UnsupportedTypeLabel { .. } => "UNSUPPORTED_TYPE_LABEL",
            Self::InvalidOverrideMap(_) => "INVALID_OVERRIDE_MAP",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::Spreadsheet(_) => "SPREADSHEET_ERROR",
            Self::Io(_) => "IO_ERROR",
            Self::Polars(_) => "POLARS_ERROR",
            Self::Xlsx(_) => "XLSX_ERROR",
            Self::Csv(_) => "CSV_ERROR",
            Self::Json(_) => "JSON_ERROR",
            Self::WithContext { source, .. } => source.error_code(),
        }
    }

    /// Whether the caller sent something we refuse to handle, as opposed to
    /// input we failed to read.
    pub fn is_rejected_input(&self) -> bool {
        match self {
            Self::UnsupportedFormat(_)
            | Self::UnsupportedTypeLabel { .. }
            | Self::InvalidOverrideMap(_)
            | Self::Json(_) => true,
            Self::WithContext { source, .. } => source.is_rejected_input(),
            _ => false,
        }
    }
}

/// Errors are serialized as a struct with `code` and `message` fields.
impl Serialize for TypecastError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("TypecastError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Result type alias for conversion operations.
pub type Result<T> = std::result::Result<T, TypecastError>;

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, polars::error::PolarsError> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| TypecastError::Polars(e).with_context(context))
    }
}
