use anyhow::Context;
use clap::{Parser, Subcommand};
use docflow::config::{Config, LoggingConfig};
use docflow::pipeline::{Pipeline, PipelineDefinition, PipelineExecutor};
use docflow_transform::TransformConfig;
use serde_json::Value;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "docflow",
    about = "Run declarative JSON document transformation pipelines"
)]
struct Cli {
    #[command(subcommand)]
    cmd: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Transform a JSON document (or an array of documents) with a configured pipeline
    Run {
        #[arg(short, long)]
        config: PathBuf,
        #[arg(short, long)]
        pipeline: String,
        input: PathBuf,
    },
    /// Print the fields of the engine built from a pipeline definition
    Schema {
        #[arg(short, long)]
        definition: PathBuf,
    },
    /// Print the persisted form of the engine built from a pipeline definition
    Snapshot {
        #[arg(short, long)]
        definition: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    match cli.cmd {
        Cmd::Run {
            config,
            pipeline,
            input,
        } => {
            let config = Config::from_file(&config)?;
            docflow::init_logging(&config.logging)?;
            let pipeline = Pipeline::load(&pipeline, &config)?;

            let text = std::fs::read_to_string(&input)
                .with_context(|| format!("reading {}", input.display()))?;
            let input: Value = serde_json::from_str(&text)?;

            match input {
                Value::Array(documents) => {
                    let mut outputs = Vec::with_capacity(documents.len());
                    for (index, result) in PipelineExecutor::run_batch(&pipeline, &documents)
                        .into_iter()
                        .enumerate()
                    {
                        match result {
                            Ok(transformed) => {
                                for error in &transformed.errors {
                                    eprintln!("document {}: {}", index, error);
                                }
                                outputs.push(transformed.document);
                            }
                            Err(e) => {
                                eprintln!("document {}: {}", index, e);
                                outputs.push(Value::Null);
                            }
                        }
                    }
                    println!("{}", serde_json::to_string_pretty(&outputs)?);
                }
                document => {
                    let transformed = PipelineExecutor::run(&pipeline, &document)?;
                    for error in &transformed.errors {
                        eprintln!("{}", error);
                    }
                    if transformed.suppressed_errors > 0 {
                        eprintln!("... {} more error(s)", transformed.suppressed_errors);
                    }
                    println!("{}", serde_json::to_string_pretty(&transformed.document)?);
                }
            }
            Ok(())
        }
        Cmd::Schema { definition } => {
            docflow::init_logging(&LoggingConfig::default())?;
            let definition = PipelineDefinition::from_file(&definition)?;
            let engine = definition.build_engine(TransformConfig::default())?;
            for field in engine.fields() {
                println!(
                    "{}\t{}\t{}{}",
                    field.id,
                    field.output_path,
                    field.props.field_type,
                    if field.enabled { "" } else { "\t(disabled)" }
                );
            }
            Ok(())
        }
        Cmd::Snapshot { definition } => {
            docflow::init_logging(&LoggingConfig::default())?;
            let definition = PipelineDefinition::from_file(&definition)?;
            let engine = definition.build_engine(TransformConfig::default())?;
            println!("{}", engine.to_json()?);
            Ok(())
        }
    }
}
