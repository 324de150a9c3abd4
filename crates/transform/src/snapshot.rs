//! Flat persisted form of an engine: field table, node table and edge list.
//!
//! Ids and ordering are kept exactly, so a restored engine produces the same
//! output as the one it was taken from. The runtime [`TransformConfig`] is
//! carried along; snapshots without one restore with the defaults.

use crate::config::TransformConfig;
use crate::engine::{check_input_count, TransformationEngine};
use crate::error::RestoreError;
use crate::field::Field;
use crate::graph::{Edge, SchemaGraph};
use crate::node::{NodeSpec, TransformationNode};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::info;

pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineSnapshot {
    pub version: u32,
    pub fields: Vec<Field>,
    pub nodes: Vec<TransformationNode>,
    pub edges: Vec<Edge>,
    #[serde(default)]
    pub config: TransformConfig,
}

impl TransformationEngine {
    pub fn to_snapshot(&self) -> EngineSnapshot {
        EngineSnapshot {
            version: SNAPSHOT_VERSION,
            fields: self.fields.clone(),
            nodes: self.graph.nodes().to_vec(),
            edges: self.graph.edges().to_vec(),
            config: self.config.clone(),
        }
    }

    /// Rebuild an engine, checking every cross reference first
    pub fn from_snapshot(snapshot: EngineSnapshot) -> Result<Self, RestoreError> {
        check_snapshot(&snapshot)?;

        let mut graph = SchemaGraph::new();
        for node in snapshot.nodes {
            let id = graph.add_node(node.spec, node.inputs);
            graph.node_mut(id).outputs = node.outputs;
        }
        for edge in snapshot.edges {
            graph.add_edge(edge.from, edge.to, edge.kind, edge.field);
        }

        info!(
            fields = snapshot.fields.len(),
            nodes = graph.node_count(),
            "restored engine from snapshot"
        );
        Ok(Self {
            fields: snapshot.fields,
            graph,
            config: snapshot.config,
        })
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(&self.to_snapshot())
    }

    pub fn from_json(json: &str) -> Result<Self, RestoreError> {
        let snapshot: EngineSnapshot = serde_json::from_str(json)?;
        Self::from_snapshot(snapshot)
    }
}

fn check_snapshot(snapshot: &EngineSnapshot) -> Result<(), RestoreError> {
    if snapshot.version != SNAPSHOT_VERSION {
        return Err(RestoreError::Version(snapshot.version));
    }
    let field_count = snapshot.fields.len();
    let node_count = snapshot.nodes.len();

    for (i, field) in snapshot.fields.iter().enumerate() {
        if field.id.index() != i {
            return Err(RestoreError::inconsistent(format!(
                "field at position {} has id {}",
                i, field.id
            )));
        }
        let identity = snapshot.nodes.get(field.identity.index()).ok_or_else(|| {
            RestoreError::inconsistent(format!("field {} has no identity node", field.id))
        })?;
        let owns_identity = matches!(identity.spec, NodeSpec::Identity)
            && identity.inputs.len() == 1
            && identity.inputs[0].field == field.id;
        if !owns_identity {
            return Err(RestoreError::inconsistent(format!(
                "node {} is not the identity of field {}",
                field.identity, field.id
            )));
        }
        if let Some(origin) = field.origin {
            if origin.index() >= node_count {
                return Err(RestoreError::inconsistent(format!(
                    "field {} originates from unknown node {}",
                    field.id, origin
                )));
            }
        }
    }

    for (i, node) in snapshot.nodes.iter().enumerate() {
        if node.id.index() != i {
            return Err(RestoreError::inconsistent(format!(
                "node at position {} has id {}",
                i, node.id
            )));
        }
        check_input_count(&node.spec, node.inputs.len())
            .map_err(|e| RestoreError::inconsistent(format!("node {}: {}", node.id, e)))?;
        let refs = node.inputs.iter().map(|r| r.field).chain(node.outputs.iter().copied());
        for field in refs {
            if field.index() >= field_count {
                return Err(RestoreError::inconsistent(format!(
                    "node {} references unknown field {}",
                    node.id, field
                )));
            }
        }
    }

    let mut continued = HashSet::new();
    for edge in &snapshot.edges {
        if edge.to.index() >= node_count || edge.field.index() >= field_count {
            return Err(RestoreError::inconsistent(format!(
                "edge {} -> {} references an unknown node or field",
                edge.from, edge.to
            )));
        }
        if edge.from >= edge.to {
            return Err(RestoreError::inconsistent(format!(
                "edge {} -> {} points backwards",
                edge.from, edge.to
            )));
        }
        if !continued.insert((edge.from, edge.field)) {
            return Err(RestoreError::inconsistent(format!(
                "node {} continues the chain of field {} twice",
                edge.from, edge.field
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::FieldId;
    use crate::node::{NodeId, ValueOp};
    use docflow_keypath::KeyPath;
    use serde_json::json;

    fn engine() -> TransformationEngine {
        let mut engine = TransformationEngine::from_sample_document(&json!({"a": "x", "b": [1]}));
        let a = engine.field_by_path(&KeyPath::parse("a").unwrap()).unwrap();
        engine
            .add_transformation_node(NodeSpec::Simple { op: ValueOp::Uppercase }, &[a])
            .unwrap();
        engine
    }

    #[test]
    fn test_snapshot_round_trip_preserves_everything() {
        let original = engine();
        let json = original.to_json().unwrap();
        let restored = TransformationEngine::from_json(&json).unwrap();

        assert_eq!(restored.to_snapshot(), original.to_snapshot());
        assert_eq!(restored.all_field_ids(), original.all_field_ids());
        let a = FieldId(0);
        assert_eq!(restored.transformations(a), original.transformations(a));
    }

    #[test]
    fn test_snapshot_keeps_runtime_config() {
        let mut original = engine();
        original.set_config(TransformConfig {
            fail_on_error: true,
            drop_disabled_fields: false,
            max_errors_per_document: Some(3),
        });
        let restored = TransformationEngine::from_json(&original.to_json().unwrap()).unwrap();
        assert_eq!(restored.config(), original.config());

        // snapshots written without a config fall back to the defaults
        let mut value: serde_json::Value = serde_json::from_str(&original.to_json().unwrap()).unwrap();
        value.as_object_mut().unwrap().remove("config");
        let restored = TransformationEngine::from_json(&value.to_string()).unwrap();
        assert_eq!(restored.config(), &TransformConfig::default());
    }

    #[test]
    fn test_rejects_wrong_version_and_bad_json() {
        let mut snapshot = engine().to_snapshot();
        snapshot.version = 7;
        assert!(matches!(
            TransformationEngine::from_snapshot(snapshot),
            Err(RestoreError::Version(7))
        ));
        assert!(matches!(
            TransformationEngine::from_json("{"),
            Err(RestoreError::Decode(_))
        ));
    }

    #[test]
    fn test_rejects_dangling_references() {
        let mut snapshot = engine().to_snapshot();
        snapshot.edges[0].field = FieldId(99);
        assert!(matches!(
            TransformationEngine::from_snapshot(snapshot),
            Err(RestoreError::Inconsistent(_))
        ));

        let mut snapshot = engine().to_snapshot();
        snapshot.fields[0].identity = NodeId(1);
        assert!(matches!(
            TransformationEngine::from_snapshot(snapshot),
            Err(RestoreError::Inconsistent(_))
        ));
    }

    #[test]
    fn test_rejects_backward_and_branching_edges() {
        let mut snapshot = engine().to_snapshot();
        let edge = snapshot.edges[0].clone();
        snapshot.edges[0].from = edge.to;
        snapshot.edges[0].to = edge.from;
        assert!(TransformationEngine::from_snapshot(snapshot).is_err());

        let mut snapshot = engine().to_snapshot();
        let duplicate = snapshot.edges[0].clone();
        snapshot.edges.push(duplicate);
        assert!(TransformationEngine::from_snapshot(snapshot).is_err());
    }
}
