//! Configuration types for the type conversion pipeline.
//!
//! This module provides the detector thresholds and compatibility policies
//! using the builder pattern for flexible and ergonomic pipeline setup.

use serde::{Deserialize, Serialize};

/// How the complex filter treats values it cannot parse once it claims a
/// column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ComplexPolicy {
    /// Replace unparseable values with missing; the row count is preserved.
    #[default]
    MaskUnparseable,
    /// Remove unparseable rows from the claimed column only. The column ends
    /// up shorter than its siblings and is emitted top-aligned.
    DropUnparseable,
}

/// How the override engine decides whether to attempt the zero-fill
/// fallback after a failed cast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum FallbackPolicy {
    /// Decide per column: fall back whenever the requested label is numeric.
    #[default]
    PerColumn,
    /// Carry one flag across the whole override loop. It is raised by every
    /// successful numeric cast and lowered when a fallback is attempted.
    Sticky,
}

/// Configuration for the inference and override pipelines.
///
/// Use [`InferenceConfig::builder()`] to create a new configuration
/// with fluent API.
///
/// # Example
///
/// ```rust,ignore
/// use lex_typecast::config::{InferenceConfig, ComplexPolicy};
///
/// let config = InferenceConfig::builder()
///     .categorical_ratio(0.3)
///     .complex_policy(ComplexPolicy::DropUnparseable)
///     .build()?;
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InferenceConfig {
    /// Share of `"True"`/`"False"` values a string column needs to become
    /// boolean (strictly greater than). Default: 0.74
    pub boolean_ratio: f64,

    /// Distinct-to-height ratio below which a string column becomes
    /// categorical (strictly less than). Default: 0.5
    pub categorical_ratio: f64,

    /// Share of numerically parseable values needed for the numeric
    /// downcaster to claim a column (at least). Default: 0.75
    pub numeric_ratio: f64,

    /// Percentage of values that must parse with the sampled date format
    /// (at least). Default: 75.0
    pub datetime_percentage: f64,

    /// Percentage of complex-parseable values needed (strictly greater
    /// than). Default: 75.0
    pub complex_percentage: f64,

    /// Default: MaskUnparseable
    pub complex_policy: ComplexPolicy,

    /// Default: PerColumn
    pub fallback_policy: FallbackPolicy,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            boolean_ratio: 0.74,
            categorical_ratio: 0.5,
            numeric_ratio: 0.75,
            datetime_percentage: 75.0,
            complex_percentage: 75.0,
            complex_policy: ComplexPolicy::default(),
            fallback_policy: FallbackPolicy::default(),
        }
    }
}

impl InferenceConfig {
    /// Create a new configuration builder.
    pub fn builder() -> InferenceConfigBuilder {
        InferenceConfigBuilder::default()
    }

    /// Validate the configuration and return errors if invalid.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        for (field, value) in [
            ("boolean_ratio", self.boolean_ratio),
            ("categorical_ratio", self.categorical_ratio),
            ("numeric_ratio", self.numeric_ratio),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigValidationError::InvalidRatio {
                    field: field.to_string(),
                    value,
                });
            }
        }

        for (field, value) in [
            ("datetime_percentage", self.datetime_percentage),
            ("complex_percentage", self.complex_percentage),
        ] {
            if !(0.0..=100.0).contains(&value) {
                return Err(ConfigValidationError::InvalidPercentage {
                    field: field.to_string(),
                    value,
                });
            }
        }

        Ok(())
    }
}

/// Errors that can occur during configuration validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Invalid ratio for '{field}': {value} (must be between 0.0 and 1.0)")]
    InvalidRatio { field: String, value: f64 },

    #[error("Invalid percentage for '{field}': {value} (must be between 0 and 100)")]
    InvalidPercentage { field: String, value: f64 },
}

impl From<ConfigValidationError> for crate::error::TypecastError {
    fn from(err: ConfigValidationError) -> Self {
        crate::error::TypecastError::InvalidConfig(err.to_string())
    }
}

/// Builder for [`InferenceConfig`] with fluent API.
#[derive(Debug, Default)]
pub struct InferenceConfigBuilder {
    boolean_ratio: Option<f64>,
    categorical_ratio: Option<f64>,
    numeric_ratio: Option<f64>,
    datetime_percentage: Option<f64>,
    complex_percentage: Option<f64>,
    complex_policy: Option<ComplexPolicy>,
    fallback_policy: Option<FallbackPolicy>,
}

impl InferenceConfigBuilder {
    /// Set the boolean detector threshold.
    ///
    /// # Arguments
    /// * `ratio` - Value between 0.0 and 1.0 (e.g., 0.74 = more than 74%)
    pub fn boolean_ratio(mut self, ratio: f64) -> Self {
        self.boolean_ratio = Some(ratio);
        self
    }

    /// Set the categorical detector threshold.
    ///
    /// # Arguments
    /// * `ratio` - Value between 0.0 and 1.0 (e.g., 0.5 = fewer distinct
    ///   values than half the rows)
    pub fn categorical_ratio(mut self, ratio: f64) -> Self {
        self.categorical_ratio = Some(ratio);
        self
    }

    /// Set the numeric downcaster threshold.
    pub fn numeric_ratio(mut self, ratio: f64) -> Self {
        self.numeric_ratio = Some(ratio);
        self
    }

    /// Set the datetime detector threshold, in percent.
    pub fn datetime_percentage(mut self, percentage: f64) -> Self {
        self.datetime_percentage = Some(percentage);
        self
    }

    /// Set the complex filter threshold, in percent.
    pub fn complex_percentage(mut self, percentage: f64) -> Self {
        self.complex_percentage = Some(percentage);
        self
    }

    /// Choose between masking and dropping unparseable complex values.
    pub fn complex_policy(mut self, policy: ComplexPolicy) -> Self {
        self.complex_policy = Some(policy);
        self
    }

    /// Choose how override failures decide on the zero-fill fallback.
    pub fn fallback_policy(mut self, policy: FallbackPolicy) -> Self {
        self.fallback_policy = Some(policy);
        self
    }

    /// Build the configuration.
    ///
    /// Returns a validated `InferenceConfig` or an error if validation fails.
    pub fn build(self) -> Result<InferenceConfig, ConfigValidationError> {
        let defaults = InferenceConfig::default();
        let config = InferenceConfig {
            boolean_ratio: self.boolean_ratio.unwrap_or(defaults.boolean_ratio),
            categorical_ratio: self.categorical_ratio.unwrap_or(defaults.categorical_ratio),
            numeric_ratio: self.numeric_ratio.unwrap_or(defaults.numeric_ratio),
            datetime_percentage: self
                .datetime_percentage
                .unwrap_or(defaults.datetime_percentage),
            complex_percentage: self
                .complex_percentage
                .unwrap_or(defaults.complex_percentage),
            complex_policy: self.complex_policy.unwrap_or_default(),
            fallback_policy: self.fallback_policy.unwrap_or_default(),
        };

        config.validate()?;
        Ok(config)
    }
}
