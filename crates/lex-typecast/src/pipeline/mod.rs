//! Pipeline module.
//!
//! This module provides the inference and override entry points.

mod builder;

pub use builder::{
    ConversionOutput, InferencePipeline, InferencePipelineBuilder, OverridePipeline,
    OverridePipelineBuilder,
};
