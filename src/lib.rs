//! `docflow`: declarative JSON document transformation pipelines.
//!
//! Pipelines are JSON definitions (a sample document plus ordered steps)
//! built into a [`docflow_transform::TransformationEngine`] and run over
//! documents by the [`pipeline::PipelineExecutor`]. The TOML [`config::Config`]
//! names the available pipelines and carries engine and logging settings.

pub mod config;
pub mod pipeline;

use crate::config::{ConfigError, LoggingConfig};
use std::sync::Mutex;
use tracing_subscriber::{self, prelude::*, EnvFilter};

/// Install the global tracing subscriber.
///
/// Logs go to stderr, and additionally to `log_file_path` when `log_to_file`
/// is set. `RUST_LOG` overrides `log_level`.
pub fn init_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&logging.log_level))
        .map_err(|_| ConfigError::InvalidLogLevel(logging.log_level.clone()))?;

    let file_layer = if logging.log_to_file {
        let file = std::fs::File::create(&logging.log_file_path).map_err(|source| {
            ConfigError::LogFile {
                path: logging.log_file_path.clone().into(),
                source,
            }
        })?;
        Some(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_file(true)
                .with_line_number(true)
                .with_writer(Mutex::new(file)),
        )
    } else {
        None
    };

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_file(true)
        .with_line_number(true)
        .with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(stderr_layer)
        .try_init()
        .map_err(|e| ConfigError::Logging(e.to_string()))
}
