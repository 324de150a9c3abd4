use crate::config::logging_config::LoggingConfig;
use docflow_transform::TransformConfig;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing_subscriber::EnvFilter;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid log level '{0}'")]
    InvalidLogLevel(String),

    #[error("log_to_file is enabled but log_file_path is empty")]
    MissingLogFilePath,

    #[error("Failed to open log file '{path}': {source}")]
    LogFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to initialise logging: {0}")]
    Logging(String),

    #[error("max_errors_per_document must be at least 1")]
    InvalidErrorCap,

    #[error("Pipeline '{0}' has no definition_path")]
    MissingDefinition(String),

    #[error("Pipeline '{0}' not found")]
    UnknownPipeline(String),
}

/// Top-level `docflow` configuration file
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub engine: TransformConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub pipelines: HashMap<String, PipelineConfig>,
    /// Directory relative definition paths are resolved against
    #[serde(skip)]
    pub base_dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    #[serde(default)]
    pub description: String,
    pub definition_path: String,
}

impl Config {
    /// Read, parse and validate a TOML config file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config: Config = toml::from_str(&text)?;
        config.base_dir = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if EnvFilter::try_new(&self.logging.log_level).is_err() {
            return Err(ConfigError::InvalidLogLevel(self.logging.log_level.clone()));
        }
        if self.logging.log_to_file && self.logging.log_file_path.trim().is_empty() {
            return Err(ConfigError::MissingLogFilePath);
        }
        if self.engine.max_errors_per_document == Some(0) {
            return Err(ConfigError::InvalidErrorCap);
        }
        for (name, pipeline) in &self.pipelines {
            if pipeline.definition_path.trim().is_empty() {
                return Err(ConfigError::MissingDefinition(name.clone()));
            }
        }
        Ok(())
    }

    pub fn pipeline(&self, name: &str) -> Result<&PipelineConfig, ConfigError> {
        self.pipelines
            .get(name)
            .ok_or_else(|| ConfigError::UnknownPipeline(name.to_string()))
    }

    /// Definition file of a pipeline, relative paths taken from the config's directory
    pub fn definition_path(&self, pipeline: &PipelineConfig) -> PathBuf {
        let path = Path::new(&pipeline.definition_path);
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }
}
