//! Caller-supplied type overrides.
//!
//! This module provides:
//! - The closed set of override labels ([`OverrideType`])
//! - Parsing of the JSON column -> label map ([`TypeOverrideMap`])
//! - The [`OverrideEngine`] that normalizes a dataset with the cascade and
//!   then applies each override with its zero-fill fallback

pub mod converters;

use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use tracing::{debug, info, warn};

use crate::config::FallbackPolicy;
use crate::error::{Result, TypecastError};
use crate::inference::{ColumnReport, TypeCascade};
use crate::types::{Dataset, SemanticType};

pub use converters::CastError;

/// A type a caller may request for a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(into = "&'static str")]
pub enum OverrideType {
    Int8,
    Int16,
    Int32,
    Int64,
    Float16,
    Float32,
    Float64,
    Bool,
    DateTime64,
    TimeDelta,
    Category,
    Object,
}

impl OverrideType {
    pub const ALL: [OverrideType; 12] = [
        Self::Int8,
        Self::Int16,
        Self::Int32,
        Self::Int64,
        Self::Float16,
        Self::Float32,
        Self::Float64,
        Self::Bool,
        Self::DateTime64,
        Self::TimeDelta,
        Self::Category,
        Self::Object,
    ];

    /// The label as written in an override map.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Int8 => "int8",
            Self::Int16 => "int16",
            Self::Int32 => "int32",
            Self::Int64 => "int64",
            Self::Float16 => "float16",
            Self::Float32 => "float32",
            Self::Float64 => "float64",
            Self::Bool => "bool",
            Self::DateTime64 => "datetime64",
            Self::TimeDelta => "timedelta",
            Self::Category => "category",
            Self::Object => "object",
        }
    }

    /// The semantic type a successful cast produces.
    pub fn target(&self) -> SemanticType {
        match self {
            Self::Int8 => SemanticType::Int8,
            Self::Int16 => SemanticType::Int16,
            Self::Int32 => SemanticType::Int32,
            Self::Int64 => SemanticType::Int64,
            Self::Float16 => SemanticType::Float16,
            Self::Float32 => SemanticType::Float32,
            Self::Float64 => SemanticType::Float64,
            Self::Bool => SemanticType::Boolean,
            Self::DateTime64 => SemanticType::DateTime,
            Self::TimeDelta => SemanticType::TimeDelta,
            Self::Category => SemanticType::Categorical,
            Self::Object => SemanticType::String,
        }
    }

    pub fn is_numeric(&self) -> bool {
        self.target().is_numeric()
    }
}

/// A label outside the closed override set.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unsupported type label '{0}'")]
pub struct UnknownLabel(pub String);

impl FromStr for OverrideType {
    type Err = UnknownLabel;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.label() == s)
            .ok_or_else(|| UnknownLabel(s.to_string()))
    }
}

impl From<OverrideType> for &'static str {
    fn from(value: OverrideType) -> Self {
        value.label()
    }
}

impl fmt::Display for OverrideType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Ordered column -> override type mapping.
///
/// Every label is validated when the map is built, so an unknown label is
/// reported before any column is touched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TypeOverrideMap {
    entries: Vec<(String, OverrideType)>,
}

impl TypeOverrideMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a JSON object of column name to label, keeping key order.
    pub fn from_json(json: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(json)?;
        let Value::Object(object) = value else {
            return Err(TypecastError::InvalidOverrideMap(format!(
                "expected a JSON object, got {}",
                json_kind(&value)
            )));
        };

        let mut map = Self::new();
        for (column, label) in object {
            let label = match label {
                Value::String(s) => s,
                other => other.to_string(),
            };
            map = map.try_with(column, &label)?;
        }
        Ok(map)
    }

    /// Append an entry from a raw label.
    pub fn try_with(mut self, column: impl Into<String>, label: &str) -> Result<Self> {
        let column = column.into();
        let override_type =
            label
                .parse::<OverrideType>()
                .map_err(|_| TypecastError::UnsupportedTypeLabel {
                    column: column.clone(),
                    label: label.to_string(),
                })?;
        self.entries.push((column, override_type));
        Ok(self)
    }

    /// Append an already typed entry.
    pub fn with(mut self, column: impl Into<String>, override_type: OverrideType) -> Self {
        self.entries.push((column.into(), override_type));
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, OverrideType)> {
        self.entries.iter().map(|(c, t)| (c.as_str(), *t))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// What happened to one override entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum OverrideOutcome {
    /// The cast succeeded.
    Applied,
    /// The cast failed and the zero-fill fallback produced the column.
    FellBack { reason: String },
    /// The column keeps its inferred type.
    Unchanged { reason: String },
    /// No column of that name exists.
    ColumnNotFound,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OverrideEntry {
    pub column: String,
    pub requested: OverrideType,
    #[serde(flatten)]
    pub outcome: OverrideOutcome,
}

/// Result of an override run: the normalization pass plus every entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct OverrideReport {
    pub inference: Vec<ColumnReport>,
    pub entries: Vec<OverrideEntry>,
}

impl OverrideReport {
    pub fn applied_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| e.outcome == OverrideOutcome::Applied)
            .count()
    }
}

/// Normalizes a dataset with the cascade, then applies an override map.
#[derive(Debug)]
pub struct OverrideEngine {
    cascade: TypeCascade,
    policy: FallbackPolicy,
}

static_assertions::assert_impl_all!(OverrideEngine: Send, Sync);

impl OverrideEngine {
    pub fn new(cascade: TypeCascade, policy: FallbackPolicy) -> Self {
        Self { cascade, policy }
    }

    pub fn policy(&self) -> FallbackPolicy {
        self.policy
    }

    /// Run the cascade and apply every entry in map order.
    pub fn apply(&self, dataset: &mut Dataset, map: &TypeOverrideMap) -> OverrideReport {
        info!("Normalizing {} columns before overrides", dataset.width());
        let inference = self.cascade.run(dataset);

        info!(
            "Applying {} type overrides ({:?} fallback)",
            map.len(),
            self.policy
        );
        // Only consulted by the sticky policy.
        let mut numeric_flag = false;
        let mut entries = Vec::with_capacity(map.len());

        for (name, requested) in map.iter() {
            let outcome = match dataset.position(name) {
                None => {
                    warn!("Override for unknown column '{}' skipped", name);
                    OverrideOutcome::ColumnNotFound
                }
                Some(index) => self.apply_one(dataset, index, requested, &mut numeric_flag),
            };
            entries.push(OverrideEntry {
                column: name.to_string(),
                requested,
                outcome,
            });
        }

        OverrideReport { inference, entries }
    }

    fn apply_one(
        &self,
        dataset: &mut Dataset,
        index: usize,
        requested: OverrideType,
        numeric_flag: &mut bool,
    ) -> OverrideOutcome {
        let column = &dataset.columns()[index];
        let name = column.name().to_string();

        let error = match converters::cast(column, requested) {
            Ok(converted) => {
                debug!("Column '{}' cast to {}", name, requested);
                dataset.replace(index, converted);
                if requested.is_numeric() {
                    *numeric_flag = true;
                }
                return OverrideOutcome::Applied;
            }
            Err(error) => error,
        };
        debug!("Cast of '{}' to {} failed: {}", name, requested, error);

        let attempt_fallback = match self.policy {
            FallbackPolicy::PerColumn => requested.is_numeric(),
            FallbackPolicy::Sticky => std::mem::take(numeric_flag),
        };
        if !attempt_fallback {
            return OverrideOutcome::Unchanged {
                reason: error.to_string(),
            };
        }

        match converters::zero_fill(&dataset.columns()[index], requested) {
            Ok(filled) => {
                debug!("Column '{}' zero-filled to {}", name, requested);
                dataset.replace(index, filled);
                OverrideOutcome::FellBack {
                    reason: error.to_string(),
                }
            }
            Err(fallback_error) => {
                warn!(
                    "Fallback for column '{}' to {} failed: {}",
                    name, requested, fallback_error
                );
                OverrideOutcome::Unchanged {
                    reason: format!("{error}; {fallback_error}"),
                }
            }
        }
    }
}

impl Default for OverrideEngine {
    fn default() -> Self {
        Self::new(TypeCascade::default(), FallbackPolicy::default())
    }
}
