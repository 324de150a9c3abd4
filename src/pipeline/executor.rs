use crate::config::{Config, ConfigError};
use crate::pipeline::definition::{DefinitionError, PipelineDefinition};
use docflow_keypath::KeyPath;
use docflow_transform::{
    TransformConfig, TransformError, TransformationEngine, Transformed, ValidationError,
};
use serde_json::Value;
use std::path::PathBuf;
use thiserror::Error;

/// Error type for loading and running pipelines
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to read '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to decode pipeline definition: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Invalid pipeline definition: {0}")]
    Definition(#[from] DefinitionError),

    #[error("Step {step}: no enabled field at '{path}'")]
    UnknownField { step: usize, path: KeyPath },

    #[error("Step {step} rejected: {source}")]
    Step {
        step: usize,
        #[source]
        source: ValidationError,
    },

    #[error("Invalid field: {0}")]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Transform(#[from] TransformError),
}

/// A named, fully built pipeline ready to run documents
#[derive(Debug, Clone)]
pub struct Pipeline {
    pub name: String,
    pub description: String,
    pub engine: TransformationEngine,
}

impl Pipeline {
    pub fn from_definition(
        definition: &PipelineDefinition,
        config: TransformConfig,
    ) -> Result<Self, PipelineError> {
        Ok(Self {
            name: definition.name.clone(),
            description: definition.description.clone(),
            engine: definition.build_engine(config)?,
        })
    }

    /// Load the pipeline `name` from the config, using its `[engine]` settings
    pub fn load(name: &str, config: &Config) -> Result<Self, PipelineError> {
        let entry = config.pipeline(name)?;
        let definition = PipelineDefinition::from_file(config.definition_path(entry))?;
        let mut pipeline = Self::from_definition(&definition, config.engine.clone())?;
        pipeline.name = name.to_string();
        if !entry.description.is_empty() {
            pipeline.description = entry.description.clone();
        }
        tracing::info!(
            pipeline = name,
            definition = %definition.name,
            "Loaded pipeline"
        );
        Ok(pipeline)
    }
}

/// Runs documents through a built pipeline
pub struct PipelineExecutor;

impl PipelineExecutor {
    /// Transform one document.
    ///
    /// Per-value failures come back in `Transformed::errors` unless the
    /// pipeline's engine is configured with `fail_on_error`, in which case
    /// they are returned as `PipelineError::Transform`.
    #[tracing::instrument(skip(pipeline, document), fields(
        pipeline = pipeline.name.as_str()
    ))]
    pub fn run(pipeline: &Pipeline, document: &Value) -> Result<Transformed, PipelineError> {
        tracing::debug!("Executing pipeline");
        let transformed = pipeline.engine.try_transform(document)?;
        if !transformed.is_clean() {
            tracing::info!(
                errors = transformed.error_count(),
                "Pipeline finished with errors"
            );
        }
        Ok(transformed)
    }

    /// Transform each document independently; one failure does not stop the rest
    pub fn run_batch(
        pipeline: &Pipeline,
        documents: &[Value],
    ) -> Vec<Result<Transformed, PipelineError>> {
        documents
            .iter()
            .map(|document| Self::run(pipeline, document))
            .collect()
    }
}
