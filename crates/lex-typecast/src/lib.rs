//! Column Type Inference and Conversion Library
//!
//! Infers a best-fit semantic type for every column of an uploaded table,
//! optionally applies caller-supplied type overrides, and re-serializes the
//! result as CSV with each column name annotated by its final type.
//!
//! # Overview
//!
//! - **Loading**: CSV (via Polars) and single-sheet XLSX (via calamine), with
//!   load-time storage typing of obvious integer, float, boolean and date
//!   columns
//! - **Inference Cascade**: boolean, categorical, numeric downcasting,
//!   date/time and complex detection, first claim wins
//! - **Overrides**: a closed set of type labels with a zero-fill fallback
//!   for failed numeric casts
//! - **Output**: column names annotated as `name(label)`, CSV bytes plus a
//!   per-column summary
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use lex_typecast::{InferencePipeline, OverridePipeline, TabularSource};
//!
//! let source = TabularSource::from_path("sales.csv")?;
//!
//! // Option 1: infer every column
//! let output = InferencePipeline::builder().build()?.run(&source)?;
//!
//! // Option 2: infer, then force some types
//! let output = OverridePipeline::builder()
//!     .build()?
//!     .run(&source, r#"{"Revenue": "float64", "Region": "category"}"#)?;
//!
//! for column in output.columns() {
//!     println!("{} <- {}", column.name, column.source_name);
//! }
//! ```
//!
//! # Configuration
//!
//! Use [`InferenceConfig`] to adjust thresholds and compatibility policies:
//!
//! ```rust,ignore
//! use lex_typecast::config::*;
//!
//! let config = InferenceConfig::builder()
//!     .categorical_ratio(0.5)                        // distinct/rows below 50%
//!     .complex_policy(ComplexPolicy::DropUnparseable)
//!     .fallback_policy(FallbackPolicy::Sticky)
//!     .build()?;
//! ```
//!
//! # Custom Cascades
//!
//! Detectors implement [`inference::Detector`]; a [`TypeCascade`] is just an
//! ordered list of them and can be rebuilt without touching the pipelines:
//!
//! ```rust,ignore
//! use lex_typecast::inference::{TypeCascade, NumericDowncaster, DateTimeDetector};
//!
//! let cascade = TypeCascade::new()
//!     .with_detector(DateTimeDetector::default())
//!     .with_detector(NumericDowncaster::default());
//! let pipeline = InferencePipeline::builder().cascade(cascade).build()?;
//! ```

pub mod config;
pub mod error;
pub mod inference;
pub mod output;
pub mod overrides;
pub mod pipeline;
pub mod reader;
pub mod types;
pub mod utils;

// Re-exports for convenient access
pub use config::{
    ComplexPolicy, ConfigValidationError, FallbackPolicy, InferenceConfig, InferenceConfigBuilder,
};
pub use error::{Result as TypecastResult, ResultExt, TypecastError};
pub use inference::{ColumnReport, Detection, Detector, Rejection, TypeCascade};
pub use output::{ColumnRenamer, CsvSerializer};
pub use overrides::{
    CastError, OverrideEngine, OverrideEntry, OverrideOutcome, OverrideReport, OverrideType,
    TypeOverrideMap,
};
pub use pipeline::{
    ConversionOutput, InferencePipeline, InferencePipelineBuilder, OverridePipeline,
    OverridePipelineBuilder,
};
pub use reader::{SourceFormat, TabularSource};
pub use types::{Cell, Column, ColumnSummary, Complex64, Dataset, SemanticType};
