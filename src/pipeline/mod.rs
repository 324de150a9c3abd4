pub mod definition;
pub mod executor;

#[cfg(test)]
mod tests;

// Re-exports for convenience
pub use definition::{DefinitionError, PipelineDefinition, RawPipeline, RawStep, Step, StepAction};
pub use executor::{Pipeline, PipelineError, PipelineExecutor};
