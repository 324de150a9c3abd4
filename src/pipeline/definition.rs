use crate::pipeline::executor::PipelineError;
use docflow_keypath::KeyPath;
use docflow_transform::{
    ArithmeticOperator, CastTarget, DeriveSpec, FieldProps, FieldType, JoinSpec, NodeSpec,
    SplitSpec, SumSpec, TransformConfig, TransformationEngine, ValueOp,
};
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum DefinitionError {
    #[error("Step {step}: {source}")]
    Path {
        step: usize,
        #[source]
        source: docflow_keypath::PathError,
    },

    #[error("Step {step}: {reason}")]
    Step { step: usize, reason: String },

    #[error("Extra field '{path}': {source}")]
    FieldPath {
        path: String,
        #[source]
        source: docflow_keypath::PathError,
    },

    #[error("Sample document must be a JSON object")]
    SampleNotObject,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
pub enum RawStep {
    #[serde(rename = "rename")]
    Rename { field: String, to: String },

    #[serde(rename = "duplicate")]
    Duplicate { field: String, to: String },

    #[serde(rename = "delete")]
    Delete { field: String },

    #[serde(rename = "split")]
    Split {
        field: String,
        delimiter: String,
        into: Vec<String>,
    },

    #[serde(rename = "derive")]
    Derive { field: String, into: Vec<RawDerived> },

    #[serde(rename = "join")]
    Join {
        fields: Vec<String>,
        #[serde(default)]
        delimiter: String,
        into: String,
    },

    #[serde(rename = "sum")]
    Sum { fields: Vec<String>, into: String },

    #[serde(rename = "uppercase")]
    Uppercase { field: String },

    #[serde(rename = "lowercase")]
    Lowercase { field: String },

    #[serde(rename = "substring")]
    Substring {
        field: String,
        from: usize,
        #[serde(default)]
        length: Option<usize>,
    },

    #[serde(rename = "append")]
    Append { field: String, text: String },

    #[serde(rename = "prepend")]
    Prepend { field: String, text: String },

    #[serde(rename = "replace")]
    Replace {
        field: String,
        find: String,
        replace: String,
    },

    #[serde(rename = "arithmetic")]
    Arithmetic {
        field: String,
        operator: ArithmeticOperator,
        operand: f64,
    },

    #[serde(rename = "cast")]
    Cast { field: String, to: CastTarget },

    #[serde(rename = "load")]
    Load { fields: Vec<String> },

    #[serde(rename = "store")]
    Store { fields: Vec<String> },
}

/// One derived field: where it goes and how it is computed from the input
#[derive(Debug, Deserialize)]
pub struct RawDerived {
    pub path: String,
    pub op: ValueOp,
}

/// A field the sample does not show, declared with its type
#[derive(Debug, Deserialize)]
pub struct RawField {
    pub path: String,
    #[serde(flatten)]
    pub field_type: FieldType,
}

#[derive(Debug, Deserialize)]
pub struct RawPipeline {
    pub name: String,
    pub version: u32,
    #[serde(default)]
    pub description: String,
    pub sample: Value,
    #[serde(default)]
    pub fields: Vec<RawField>,
    #[serde(default)]
    pub steps: Vec<RawStep>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StepAction {
    Apply(NodeSpec),
    Delete,
}

/// A step with its input paths parsed, not yet resolved to field ids
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub inputs: Vec<KeyPath>,
    pub action: StepAction,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineDefinition {
    pub name: String,
    pub version: u32,
    pub description: String,
    pub sample: Value,
    pub fields: Vec<(KeyPath, FieldType)>,
    pub steps: Vec<Step>,
}

impl TryFrom<RawPipeline> for PipelineDefinition {
    type Error = DefinitionError;

    fn try_from(raw: RawPipeline) -> Result<Self, Self::Error> {
        if !raw.sample.is_object() {
            return Err(DefinitionError::SampleNotObject);
        }

        let mut fields = Vec::with_capacity(raw.fields.len());
        for field in raw.fields {
            let path = KeyPath::parse(&field.path).map_err(|source| DefinitionError::FieldPath {
                path: field.path.clone(),
                source,
            })?;
            fields.push((path, field.field_type));
        }

        let mut steps = Vec::with_capacity(raw.steps.len());
        for (index, raw_step) in raw.steps.into_iter().enumerate() {
            steps.push(convert_step(index, raw_step)?);
        }

        Ok(PipelineDefinition {
            name: raw.name,
            version: raw.version,
            description: raw.description,
            sample: raw.sample,
            fields,
            steps,
        })
    }
}

fn convert_step(step: usize, raw: RawStep) -> Result<Step, DefinitionError> {
    let parse = |path: &str| {
        KeyPath::parse(path).map_err(|source| DefinitionError::Path { step, source })
    };
    let parse_all = |paths: &[String]| paths.iter().map(|p| parse(p)).collect::<Result<Vec<_>, _>>();
    let require = |ok: bool, reason: &str| {
        if ok {
            Ok(())
        } else {
            Err(DefinitionError::Step {
                step,
                reason: reason.to_string(),
            })
        }
    };
    let simple = |field: &str, op: ValueOp| -> Result<Step, DefinitionError> {
        Ok(Step {
            inputs: vec![parse(field)?],
            action: StepAction::Apply(NodeSpec::Simple { op }),
        })
    };

    match raw {
        RawStep::Rename { field, to } => Ok(Step {
            inputs: vec![parse(&field)?],
            action: StepAction::Apply(NodeSpec::Rename { new_path: parse(&to)? }),
        }),
        RawStep::Duplicate { field, to } => Ok(Step {
            inputs: vec![parse(&field)?],
            action: StepAction::Apply(NodeSpec::Duplicate { new_path: parse(&to)? }),
        }),
        RawStep::Delete { field } => Ok(Step {
            inputs: vec![parse(&field)?],
            action: StepAction::Delete,
        }),
        RawStep::Split {
            field,
            delimiter,
            into,
        } => {
            require(!into.is_empty(), "split requires at least one target in 'into'")?;
            Ok(Step {
                inputs: vec![parse(&field)?],
                action: StepAction::Apply(NodeSpec::Split(SplitSpec {
                    delimiter,
                    new_fields: parse_all(&into)?,
                })),
            })
        }
        RawStep::Derive { field, into } => {
            require(!into.is_empty(), "derive requires at least one target in 'into'")?;
            let mut new_fields = Vec::with_capacity(into.len());
            let mut ops = Vec::with_capacity(into.len());
            for derived in into {
                new_fields.push(parse(&derived.path)?);
                ops.push(derived.op);
            }
            Ok(Step {
                inputs: vec![parse(&field)?],
                action: StepAction::Apply(NodeSpec::Derive(DeriveSpec { new_fields, ops })),
            })
        }
        RawStep::Join {
            fields,
            delimiter,
            into,
        } => {
            require(!fields.is_empty(), "join requires 'fields'")?;
            Ok(Step {
                inputs: parse_all(&fields)?,
                action: StepAction::Apply(NodeSpec::Join(JoinSpec {
                    delimiter,
                    new_field: parse(&into)?,
                })),
            })
        }
        RawStep::Sum { fields, into } => {
            require(!fields.is_empty(), "sum requires 'fields'")?;
            Ok(Step {
                inputs: parse_all(&fields)?,
                action: StepAction::Apply(NodeSpec::Sum(SumSpec {
                    new_field: parse(&into)?,
                })),
            })
        }
        RawStep::Uppercase { field } => simple(&field, ValueOp::Uppercase),
        RawStep::Lowercase { field } => simple(&field, ValueOp::Lowercase),
        RawStep::Substring {
            field,
            from,
            length,
        } => simple(&field, ValueOp::Substring { from, length }),
        RawStep::Append { field, text } => simple(&field, ValueOp::Append { text }),
        RawStep::Prepend { field, text } => simple(&field, ValueOp::Prepend { text }),
        RawStep::Replace {
            field,
            find,
            replace,
        } => simple(&field, ValueOp::Replace { find, replace }),
        RawStep::Arithmetic {
            field,
            operator,
            operand,
        } => simple(&field, ValueOp::Arithmetic { operator, operand }),
        RawStep::Cast { field, to } => simple(&field, ValueOp::Cast { to }),
        RawStep::Load { fields } => Ok(Step {
            inputs: parse_all(&fields)?,
            action: StepAction::Apply(NodeSpec::Load),
        }),
        RawStep::Store { fields } => Ok(Step {
            inputs: parse_all(&fields)?,
            action: StepAction::Apply(NodeSpec::Store),
        }),
    }
}

impl PipelineDefinition {
    pub fn from_json_str(json: &str) -> Result<Self, PipelineError> {
        let raw: RawPipeline = serde_json::from_str(json)?;
        Ok(PipelineDefinition::try_from(raw)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, PipelineError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| PipelineError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    /// Ingest the sample, declare the extra fields, then apply the steps in order.
    ///
    /// Step inputs are looked up among the fields enabled at that point, so a
    /// step can use fields created or renamed by earlier steps.
    pub fn build_engine(&self, config: TransformConfig) -> Result<TransformationEngine, PipelineError> {
        let mut engine = TransformationEngine::with_config(config);
        engine.add_sample_document(&self.sample);

        for (path, field_type) in &self.fields {
            engine.add_field(path.clone(), FieldProps::new(field_type.clone()), None)?;
        }

        for (step, Step { inputs, action }) in self.steps.iter().enumerate() {
            let ids = inputs
                .iter()
                .map(|path| {
                    engine
                        .field_by_path(path)
                        .ok_or_else(|| PipelineError::UnknownField {
                            step,
                            path: path.clone(),
                        })
                })
                .collect::<Result<Vec<_>, _>>()?;

            match action {
                StepAction::Apply(spec) => {
                    engine
                        .add_transformation_node(spec.clone(), &ids)
                        .map_err(|source| PipelineError::Step { step, source })?;
                }
                StepAction::Delete => {
                    for id in ids {
                        let disabled = engine.delete_field(id);
                        debug!(step, field = %id, disabled = disabled.len(), "Deleted field");
                    }
                }
            }
        }

        info!(
            pipeline = %self.name,
            version = self.version,
            fields = engine.field_count(),
            nodes = engine.node_count(),
            "Built pipeline engine"
        );
        Ok(engine)
    }
}
