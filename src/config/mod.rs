pub mod config;
mod logging_config;

pub use config::{Config, ConfigError, PipelineConfig};
pub use logging_config::LoggingConfig;
