use crate::field::{FieldId, FieldType};
use docflow_keypath::KeyPath;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Arena index of a transformation node
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// A node input: the field and the path it lived at when the node was added.
///
/// The path is kept even if the field is later renamed, because at this
/// node's position in execution the value is still found there.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldRef {
    pub field: FieldId,
    pub path: KeyPath,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArithmeticOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
}

impl ArithmeticOperator {
    pub fn apply(self, value: f64, operand: f64) -> f64 {
        match self {
            ArithmeticOperator::Add => value + operand,
            ArithmeticOperator::Subtract => value - operand,
            ArithmeticOperator::Multiply => value * operand,
            ArithmeticOperator::Divide => value / operand,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CastTarget {
    String,
    Number,
    Boolean,
}

impl CastTarget {
    pub fn field_type(self) -> FieldType {
        match self {
            CastTarget::String => FieldType::String,
            CastTarget::Number => FieldType::Number,
            CastTarget::Boolean => FieldType::Boolean,
        }
    }
}

/// Value-to-value operations, applied in place or as the per-field
/// expression of a [`DeriveSpec`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ValueOp {
    Uppercase,
    Lowercase,
    /// Character-based; `length: None` runs to the end of the string
    Substring {
        from: usize,
        #[serde(default)]
        length: Option<usize>,
    },
    Append {
        text: String,
    },
    Prepend {
        text: String,
    },
    Replace {
        find: String,
        replace: String,
    },
    Arithmetic {
        operator: ArithmeticOperator,
        operand: f64,
    },
    Cast {
        to: CastTarget,
    },
}

impl ValueOp {
    pub fn kind(&self) -> NodeKind {
        match self {
            ValueOp::Uppercase => NodeKind::Uppercase,
            ValueOp::Lowercase => NodeKind::Lowercase,
            ValueOp::Substring { .. } => NodeKind::Substring,
            ValueOp::Append { .. } => NodeKind::Append,
            ValueOp::Prepend { .. } => NodeKind::Prepend,
            ValueOp::Replace { .. } => NodeKind::Replace,
            ValueOp::Arithmetic { .. } => NodeKind::Arithmetic,
            ValueOp::Cast { .. } => NodeKind::Cast,
        }
    }

    /// Declared type of the values this operation produces
    pub fn output_type(&self) -> FieldType {
        match self {
            ValueOp::Arithmetic { .. } => FieldType::Number,
            ValueOp::Cast { to } => to.field_type(),
            _ => FieldType::String,
        }
    }
}

/// Split a string field into several new fields at the same nesting level
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitSpec {
    pub delimiter: String,
    pub new_fields: Vec<KeyPath>,
}

/// Compute several new fields from one input, one operation per field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeriveSpec {
    pub new_fields: Vec<KeyPath>,
    pub ops: Vec<ValueOp>,
}

/// Concatenate several fields into one string field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JoinSpec {
    pub delimiter: String,
    pub new_field: KeyPath,
}

/// Add several numeric fields into one
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SumSpec {
    pub new_field: KeyPath,
}

/// Kind-specific payload of a transformation node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NodeSpec {
    Identity,
    Load,
    Store,
    Rename { new_path: KeyPath },
    Duplicate { new_path: KeyPath },
    Split(SplitSpec),
    Derive(DeriveSpec),
    Join(JoinSpec),
    Sum(SumSpec),
    Simple { op: ValueOp },
}

/// How a node participates in execution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    /// Identity and the load/store boundary markers
    Marker,
    /// Rename and duplicate
    Move,
    Simple,
    Fork,
    Combine,
}

impl NodeSpec {
    pub fn kind(&self) -> NodeKind {
        match self {
            NodeSpec::Identity => NodeKind::Identity,
            NodeSpec::Load => NodeKind::Load,
            NodeSpec::Store => NodeKind::Store,
            NodeSpec::Rename { .. } => NodeKind::Rename,
            NodeSpec::Duplicate { .. } => NodeKind::Duplicate,
            NodeSpec::Split(_) => NodeKind::Split,
            NodeSpec::Derive(_) => NodeKind::Derive,
            NodeSpec::Join(_) => NodeKind::Join,
            NodeSpec::Sum(_) => NodeKind::Sum,
            NodeSpec::Simple { op } => op.kind(),
        }
    }

    pub fn category(&self) -> Category {
        match self {
            NodeSpec::Identity | NodeSpec::Load | NodeSpec::Store => Category::Marker,
            NodeSpec::Rename { .. } | NodeSpec::Duplicate { .. } => Category::Move,
            NodeSpec::Split(_) | NodeSpec::Derive(_) => Category::Fork,
            NodeSpec::Join(_) | NodeSpec::Sum(_) => Category::Combine,
            NodeSpec::Simple { .. } => Category::Simple,
        }
    }

    /// Paths of the fields this node declares
    pub fn new_paths(&self) -> Vec<&KeyPath> {
        match self {
            NodeSpec::Duplicate { new_path } => vec![new_path],
            NodeSpec::Split(spec) => spec.new_fields.iter().collect(),
            NodeSpec::Derive(spec) => spec.new_fields.iter().collect(),
            NodeSpec::Join(spec) => vec![&spec.new_field],
            NodeSpec::Sum(spec) => vec![&spec.new_field],
            _ => Vec::new(),
        }
    }

    pub fn creates_fields(&self) -> bool {
        !self.new_paths().is_empty()
    }
}

/// Flat tag of a node's kind, for messages and logging
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Identity,
    Load,
    Store,
    Rename,
    Duplicate,
    Split,
    Derive,
    Join,
    Sum,
    Uppercase,
    Lowercase,
    Substring,
    Append,
    Prepend,
    Replace,
    Arithmetic,
    Cast,
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NodeKind::Identity => "identity",
            NodeKind::Load => "load",
            NodeKind::Store => "store",
            NodeKind::Rename => "rename",
            NodeKind::Duplicate => "duplicate",
            NodeKind::Split => "split",
            NodeKind::Derive => "derive",
            NodeKind::Join => "join",
            NodeKind::Sum => "sum",
            NodeKind::Uppercase => "uppercase",
            NodeKind::Lowercase => "lowercase",
            NodeKind::Substring => "substring",
            NodeKind::Append => "append",
            NodeKind::Prepend => "prepend",
            NodeKind::Replace => "replace",
            NodeKind::Arithmetic => "arithmetic",
            NodeKind::Cast => "cast",
        };
        f.write_str(name)
    }
}

/// A vertex of the schema graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformationNode {
    pub id: NodeId,
    pub inputs: Vec<FieldRef>,
    pub spec: NodeSpec,
    /// Fields registered by this node, in registration order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub outputs: Vec<FieldId>,
}

impl TransformationNode {
    pub fn kind(&self) -> NodeKind {
        self.spec.kind()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_spec_serde_shape() {
        let spec = NodeSpec::Simple {
            op: ValueOp::Arithmetic {
                operator: ArithmeticOperator::Multiply,
                operand: 10.0,
            },
        };
        let value = serde_json::to_value(&spec).unwrap();
        assert_eq!(
            value,
            json!({"kind": "simple", "op": {"type": "arithmetic", "operator": "multiply", "operand": 10.0}})
        );
        let back: NodeSpec = serde_json::from_value(value).unwrap();
        assert_eq!(back, spec);

        let split: NodeSpec = serde_json::from_value(json!({
            "kind": "split",
            "delimiter": " ",
            "new_fields": [["first"], ["last"]]
        }))
        .unwrap();
        assert_eq!(split.kind(), NodeKind::Split);
        assert_eq!(split.category(), Category::Fork);
        assert_eq!(split.new_paths().len(), 2);
    }

    #[test]
    fn test_value_op_output_types() {
        assert_eq!(ValueOp::Uppercase.output_type(), FieldType::String);
        assert_eq!(
            ValueOp::Cast { to: CastTarget::Boolean }.output_type(),
            FieldType::Boolean
        );
        assert_eq!(NodeKind::Substring.to_string(), "substring");
    }
}
