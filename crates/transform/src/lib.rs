//! Document transformation engine.
//!
//! A [`TransformationEngine`] keeps a registry of fields (one per schema
//! path) and a graph of transformation nodes. Every field owns a linear chain
//! of nodes that starts at its identity node. Running a document walks the
//! graph in dependency order and rewrites the document in place, matching
//! wildcard paths against concrete array elements.
//!
//! ```
//! use docflow_keypath::KeyPath;
//! use docflow_transform::{NodeSpec, TransformationEngine, ValueOp};
//! use serde_json::json;
//!
//! let doc = json!({"rows": [{"name": "ann"}, {"name": "bob"}]});
//! let mut engine = TransformationEngine::from_sample_document(&doc);
//! let name = engine.field_by_path(&KeyPath::parse("rows[*].name").unwrap()).unwrap();
//! engine
//!     .add_transformation_node(NodeSpec::Simple { op: ValueOp::Uppercase }, &[name])
//!     .unwrap();
//!
//! let out = engine.transform(&doc);
//! assert_eq!(out.document, json!({"rows": [{"name": "ANN"}, {"name": "BOB"}]}));
//! ```

mod config;
mod engine;
mod error;
mod execution;
mod field;
mod graph;
mod ingest;
mod node;
mod snapshot;
mod transformations;
mod traversal;
mod wiring;

pub use config::TransformConfig;
pub use engine::TransformationEngine;
pub use error::{RestoreError, Result, TransformError, ValidationError, VisitError, VisitErrorKind};
pub use execution::Transformed;
pub use field::{Field, FieldId, FieldProps, FieldType};
pub use graph::{Edge, EdgeKind, SchemaGraph};
pub use node::{
    ArithmeticOperator, CastTarget, Category, DeriveSpec, FieldRef, JoinSpec, NodeId, NodeKind,
    NodeSpec, SplitSpec, SumSpec, TransformationNode, ValueOp,
};
pub use snapshot::{EngineSnapshot, SNAPSHOT_VERSION};
pub use transformations::{CombineTransformation, ForkTransformation, SimpleTransformation};
