use crate::node::NodeId;
use docflow_keypath::KeyPath;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Stable field identifier, never reused within one engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldId(pub u32);

impl FieldId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for FieldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Declared type of a field's values
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FieldType {
    String,
    Number,
    Boolean,
    Object,
    Array { element: Box<FieldType> },
    GeoPoint,
    /// Only `null` observed so far, or conflicting observations
    Unknown,
}

impl FieldType {
    pub fn array_of(element: FieldType) -> Self {
        FieldType::Array {
            element: Box::new(element),
        }
    }

    /// Type of a single sample value
    pub fn infer(value: &Value) -> Self {
        match value {
            Value::Null => FieldType::Unknown,
            Value::Bool(_) => FieldType::Boolean,
            Value::Number(_) => FieldType::Number,
            Value::String(_) => FieldType::String,
            Value::Object(map) => {
                let is_geo = map.len() == 2
                    && map.get("lat").map_or(false, Value::is_number)
                    && map.get("lon").map_or(false, Value::is_number);
                if is_geo {
                    FieldType::GeoPoint
                } else {
                    FieldType::Object
                }
            }
            Value::Array(items) => FieldType::array_of(
                items
                    .iter()
                    .map(FieldType::infer)
                    .reduce(|a, b| a.merge(&b))
                    .unwrap_or(FieldType::Unknown),
            ),
        }
    }

    /// Combine two observations of the same field.
    ///
    /// `Unknown` yields to anything; disagreeing concrete types collapse to
    /// `Unknown`.
    pub fn merge(&self, other: &FieldType) -> FieldType {
        match (self, other) {
            (FieldType::Unknown, known) | (known, FieldType::Unknown) => known.clone(),
            (FieldType::Array { element: a }, FieldType::Array { element: b }) => {
                FieldType::array_of(a.merge(b))
            }
            (a, b) if a == b => a.clone(),
            _ => FieldType::Unknown,
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, FieldType::Unknown)
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::String => write!(f, "string"),
            FieldType::Number => write!(f, "number"),
            FieldType::Boolean => write!(f, "boolean"),
            FieldType::Object => write!(f, "object"),
            FieldType::Array { element } => write!(f, "array<{}>", element),
            FieldType::GeoPoint => write!(f, "geo_point"),
            FieldType::Unknown => write!(f, "unknown"),
        }
    }
}

/// Declared type plus free-form display/validation metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldProps {
    pub field_type: FieldType,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metadata: BTreeMap<String, Value>,
}

impl FieldProps {
    pub fn new(field_type: FieldType) -> Self {
        Self {
            field_type,
            metadata: BTreeMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}

impl Default for FieldProps {
    fn default() -> Self {
        Self::new(FieldType::Unknown)
    }
}

/// One entry of the schema registry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub id: FieldId,
    /// Where the field's value lives after its whole chain has run
    pub output_path: KeyPath,
    /// Where the field was read from in the source document, if it came from one
    pub input_path: Option<KeyPath>,
    pub props: FieldProps,
    pub enabled: bool,
    /// Node that created this field, `None` for ingested and hand-registered fields
    pub origin: Option<NodeId>,
    /// First node of the field's chain
    pub identity: NodeId,
}
