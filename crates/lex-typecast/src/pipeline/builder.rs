//! Inference and override pipelines.
//!
//! This module provides the two entry points and their builders. Both load
//! a [`TabularSource`], type every column, rename and serialize; the
//! override pipeline applies a [`TypeOverrideMap`] in between.

use std::io::Cursor;
use std::time::Instant;

use serde::Serialize;
use tracing::{debug, info};

use crate::config::{ConfigValidationError, InferenceConfig};
use crate::error::Result;
use crate::inference::{ColumnReport, TypeCascade};
use crate::output::{ColumnRenamer, CsvSerializer};
use crate::overrides::{OverrideEngine, OverrideReport, TypeOverrideMap};
use crate::reader::{self, TabularSource};
use crate::types::{ColumnSummary, Dataset};

/// CSV bytes plus what happened to every column.
#[derive(Debug, Clone, Serialize)]
pub struct ConversionOutput {
    #[serde(skip)]
    csv: Vec<u8>,
    columns: Vec<ColumnSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    overrides: Option<OverrideReport>,
}

impl ConversionOutput {
    pub fn csv(&self) -> &[u8] {
        &self.csv
    }

    pub fn columns(&self) -> &[ColumnSummary] {
        &self.columns
    }

    /// Per-entry override outcomes, for override runs only.
    pub fn overrides(&self) -> Option<&OverrideReport> {
        self.overrides.as_ref()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.csv
    }

    /// A reader positioned at the start of the CSV.
    pub fn into_reader(self) -> Cursor<Vec<u8>> {
        Cursor::new(self.csv)
    }
}

/// Rename, serialize and summarize a typed dataset.
fn finish(
    mut dataset: Dataset,
    reports: &[ColumnReport],
    overrides: Option<OverrideReport>,
) -> Result<ConversionOutput> {
    let source_names: Vec<String> = dataset
        .columns()
        .iter()
        .map(|c| c.name().to_string())
        .collect();

    ColumnRenamer.apply(&mut dataset);
    let csv = CsvSerializer.serialize(&dataset)?;

    let columns = dataset
        .columns()
        .iter()
        .zip(source_names)
        .enumerate()
        .map(|(index, (column, source_name))| ColumnSummary {
            name: column.name().to_string(),
            source_name,
            semantic_type: column.semantic(),
            claimed_by: reports
                .get(index)
                .and_then(|r| r.claimed_by)
                .map(str::to_string),
            length: column.len(),
            missing: column.missing_count(),
        })
        .collect();

    debug!("Serialized {} bytes of CSV", csv.len());
    Ok(ConversionOutput {
        csv,
        columns,
        overrides,
    })
}

// =============================================================================
// Inference
// =============================================================================

/// Infers a type for every column and re-serializes the dataset.
///
/// Use [`InferencePipeline::builder()`] to create a pipeline with custom
/// configuration.
///
/// # Example
///
/// ```rust,ignore
/// use lex_typecast::{InferencePipeline, TabularSource};
///
/// let source = TabularSource::from_path("sales.csv")?;
/// let output = InferencePipeline::builder().build()?.run(&source)?;
/// std::io::copy(&mut output.into_reader(), &mut std::io::stdout())?;
/// ```
#[derive(Debug)]
pub struct InferencePipeline {
    config: InferenceConfig,
    cascade: TypeCascade,
}

static_assertions::assert_impl_all!(InferencePipeline: Send, Sync);

impl InferencePipeline {
    /// Create a new pipeline builder.
    pub fn builder() -> InferencePipelineBuilder {
        InferencePipelineBuilder::default()
    }

    pub fn config(&self) -> &InferenceConfig {
        &self.config
    }

    /// Load, infer, rename and serialize.
    pub fn run(&self, source: &TabularSource) -> Result<ConversionOutput> {
        let start_time = Instant::now();
        info!("Inferring column types for '{}'", source.name());

        let mut dataset = reader::load(source)?;
        let reports = self.infer(&mut dataset);
        let output = finish(dataset, &reports, None)?;

        info!(
            "Inference finished for {} columns in {:.2?}",
            output.columns().len(),
            start_time.elapsed()
        );
        Ok(output)
    }

    /// Type the columns of an already loaded dataset.
    pub fn infer(&self, dataset: &mut Dataset) -> Vec<ColumnReport> {
        self.cascade.run(dataset)
    }
}

/// Builder for [`InferencePipeline`].
#[derive(Debug, Default)]
pub struct InferencePipelineBuilder {
    config: Option<InferenceConfig>,
    cascade: Option<TypeCascade>,
}

impl InferencePipelineBuilder {
    /// Set the pipeline configuration.
    pub fn config(mut self, config: InferenceConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Replace the standard cascade built from the configuration.
    pub fn cascade(mut self, cascade: TypeCascade) -> Self {
        self.cascade = Some(cascade);
        self
    }

    /// Build the pipeline.
    ///
    /// Returns an error if the configuration is invalid.
    pub fn build(self) -> std::result::Result<InferencePipeline, ConfigValidationError> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        let cascade = self
            .cascade
            .unwrap_or_else(|| TypeCascade::standard(&config));
        Ok(InferencePipeline { config, cascade })
    }
}

// =============================================================================
// Overrides
// =============================================================================

/// Infers types, applies caller overrides, then re-serializes.
///
/// # Example
///
/// ```rust,ignore
/// use lex_typecast::{OverridePipeline, TabularSource};
///
/// let source = TabularSource::from_path("sales.csv")?;
/// let output = OverridePipeline::builder()
///     .build()?
///     .run(&source, r#"{"Revenue": "float64", "Region": "category"}"#)?;
/// ```
#[derive(Debug)]
pub struct OverridePipeline {
    config: InferenceConfig,
    engine: OverrideEngine,
}

static_assertions::assert_impl_all!(OverridePipeline: Send, Sync);

impl OverridePipeline {
    /// Create a new pipeline builder.
    pub fn builder() -> OverridePipelineBuilder {
        OverridePipelineBuilder::default()
    }

    pub fn config(&self) -> &InferenceConfig {
        &self.config
    }

    /// Parse a JSON override map and run it.
    ///
    /// The map is validated before the source is read, so an unsupported
    /// label produces no output at all.
    pub fn run(&self, source: &TabularSource, types: &str) -> Result<ConversionOutput> {
        let map = TypeOverrideMap::from_json(types)?;
        self.run_with_map(source, &map)
    }

    pub fn run_with_map(
        &self,
        source: &TabularSource,
        map: &TypeOverrideMap,
    ) -> Result<ConversionOutput> {
        let start_time = Instant::now();
        info!(
            "Applying {} type overrides to '{}'",
            map.len(),
            source.name()
        );

        let mut dataset = reader::load(source)?;
        let report = self.engine.apply(&mut dataset, map);
        let inference = report.inference.clone();
        let output = finish(dataset, &inference, Some(report))?;

        info!(
            "Override run finished for {} columns in {:.2?}",
            output.columns().len(),
            start_time.elapsed()
        );
        Ok(output)
    }
}

/// Builder for [`OverridePipeline`].
#[derive(Debug, Default)]
pub struct OverridePipelineBuilder {
    config: Option<InferenceConfig>,
    cascade: Option<TypeCascade>,
}

impl OverridePipelineBuilder {
    /// Set the pipeline configuration.
    pub fn config(mut self, config: InferenceConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Replace the normalization cascade.
    pub fn cascade(mut self, cascade: TypeCascade) -> Self {
        self.cascade = Some(cascade);
        self
    }

    /// Build the pipeline.
    ///
    /// Returns an error if the configuration is invalid.
    pub fn build(self) -> std::result::Result<OverridePipeline, ConfigValidationError> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        let cascade = self
            .cascade
            .unwrap_or_else(|| TypeCascade::standard(&config));
        let engine = OverrideEngine::new(cascade, config.fallback_policy);
        Ok(OverridePipeline { config, engine })
    }
}
