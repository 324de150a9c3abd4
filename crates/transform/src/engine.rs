use crate::config::TransformConfig;
use crate::error::ValidationError;
use crate::field::{Field, FieldId, FieldProps, FieldType};
use crate::graph::{EdgeKind, SchemaGraph};
use crate::node::{
    ArithmeticOperator, Category, FieldRef, NodeId, NodeKind, NodeSpec, TransformationNode,
    ValueOp,
};
use docflow_keypath::{are_local, divergent_wildcards, KeyPath, Segment};
use serde_json::Value;
use tracing::{debug, info};

/// Field schema registry plus the graph of transformation nodes attached to it.
///
/// Build the schema first (`add_field`, `add_transformation_node`), then run
/// documents through [`TransformationEngine::transform`]. Transforming only
/// reads the schema, so a finished engine can be shared across threads.
#[derive(Debug, Clone, Default)]
pub struct TransformationEngine {
    pub(crate) fields: Vec<Field>,
    pub(crate) graph: SchemaGraph,
    pub(crate) config: TransformConfig,
}

impl TransformationEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: TransformConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &TransformConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: TransformConfig) {
        self.config = config;
    }

    /// Register a field at `path`, or return the enabled field already there.
    ///
    /// Missing ancestors are registered as containers on the way. Every new
    /// field gets its identity node; when `origin` is given, the originating
    /// node is linked to it with a synthetic edge.
    pub fn add_field(
        &mut self,
        path: KeyPath,
        props: FieldProps,
        origin: Option<NodeId>,
    ) -> Result<FieldId, ValidationError> {
        check_field_path(&path)?;
        if let Some(node) = origin {
            self.graph.node(node);
        }
        Ok(self.ensure_field(path, props, origin))
    }

    /// `add_field` without path validation; callers have checked the path.
    pub(crate) fn ensure_field(
        &mut self,
        path: KeyPath,
        props: FieldProps,
        origin: Option<NodeId>,
    ) -> FieldId {
        if let Some(existing) = self.field_by_path(&path) {
            return existing;
        }
        for depth in 1..path.len() {
            let ancestor = path.slice(0, depth);
            if self.field_by_path(&ancestor).is_none() {
                let container = if path.get(depth).is_index() {
                    FieldType::array_of(FieldType::Unknown)
                } else {
                    FieldType::Object
                };
                self.register_field(ancestor, FieldProps::new(container), origin);
            }
        }
        self.register_field(path, props, origin)
    }

    fn register_field(&mut self, path: KeyPath, props: FieldProps, origin: Option<NodeId>) -> FieldId {
        let id = FieldId(self.fields.len() as u32);
        let identity = self.graph.add_node(
            NodeSpec::Identity,
            vec![FieldRef {
                field: id,
                path: path.clone(),
            }],
        );
        debug!(field = %id, path = %path, field_type = %props.field_type, "registered field");
        self.fields.push(Field {
            id,
            output_path: path,
            input_path: None,
            props,
            enabled: true,
            origin,
            identity,
        });
        if let Some(node) = origin {
            self.graph.add_edge(node, identity, EdgeKind::Synthetic, id);
            self.graph.node_mut(node).outputs.push(id);
        }
        id
    }

    /// Validate and add a transformation node, then wire it into the chains
    /// of its input fields. Nothing changes when validation fails.
    pub fn add_transformation_node(
        &mut self,
        spec: NodeSpec,
        inputs: &[FieldId],
    ) -> Result<NodeId, ValidationError> {
        self.validate_node(&spec, inputs)?;
        let refs = inputs
            .iter()
            .map(|&field| FieldRef {
                field,
                path: self.field(field).output_path.clone(),
            })
            .collect();
        let kind = spec.kind();
        let id = self.graph.add_node(spec, refs);
        self.wire(id);
        info!(node = %id, kind = %kind, inputs = inputs.len(), "added transformation node");
        Ok(id)
    }

    fn validate_node(&self, spec: &NodeSpec, inputs: &[FieldId]) -> Result<(), ValidationError> {
        let kind = spec.kind();
        if matches!(spec, NodeSpec::Identity) {
            return Err(ValidationError::IdentityNode);
        }
        check_input_count(spec, inputs.len())?;
        for (i, &id) in inputs.iter().enumerate() {
            if !self.field(id).enabled {
                return Err(ValidationError::FieldDisabled(id));
            }
            if inputs[..i].contains(&id) {
                return Err(ValidationError::DuplicateInput(id));
            }
        }
        let paths: Vec<&KeyPath> = inputs.iter().map(|&id| &self.field(id).output_path).collect();

        match spec {
            NodeSpec::Identity | NodeSpec::Load | NodeSpec::Store => {}
            NodeSpec::Rename { new_path } | NodeSpec::Duplicate { new_path } => {
                let input = paths[0];
                check_field_path(new_path)?;
                check_local(new_path, input)?;
                if new_path.is_structural_prefix_of(input) || input.is_structural_prefix_of(new_path) {
                    return Err(ValidationError::invalid_metadata(
                        kind,
                        format!("'{}' and '{}' contain each other", input, new_path),
                    ));
                }
                if let Some(field) = self.field_by_path(new_path) {
                    return Err(ValidationError::PathTaken {
                        path: new_path.clone(),
                        field,
                    });
                }
            }
            NodeSpec::Split(split) => {
                if split.delimiter.is_empty() {
                    return Err(ValidationError::invalid_metadata(kind, "delimiter is empty"));
                }
                check_new_fields(kind, &split.new_fields, paths[0])?;
            }
            NodeSpec::Derive(derive) => {
                check_new_fields(kind, &derive.new_fields, paths[0])?;
                if derive.ops.len() != derive.new_fields.len() {
                    return Err(ValidationError::invalid_metadata(
                        kind,
                        format!(
                            "{} operation(s) for {} new field(s)",
                            derive.ops.len(),
                            derive.new_fields.len()
                        ),
                    ));
                }
                for op in &derive.ops {
                    check_value_op(op)?;
                }
            }
            NodeSpec::Join(_) | NodeSpec::Sum(_) => {
                let destination = spec.new_paths()[0];
                check_field_path(destination)?;
                for (i, left) in paths.iter().enumerate() {
                    for right in &paths[i + 1..] {
                        if !are_local(left, right) {
                            return Err(ValidationError::IncompatibleNesting {
                                left: (*left).clone(),
                                right: (*right).clone(),
                            });
                        }
                    }
                }
                for input in &paths {
                    check_local(destination, input)?;
                    if divergent_wildcards(input, destination).map_or(false, |n| n > 1) {
                        return Err(ValidationError::IndependentDimensions {
                            input: (*input).clone(),
                            output: destination.clone(),
                        });
                    }
                }
            }
            NodeSpec::Simple { op } => check_value_op(op)?,
        }
        Ok(())
    }

    /// # Panics
    /// Panics on an id this engine never issued.
    pub fn field(&self, id: FieldId) -> &Field {
        match self.fields.get(id.index()) {
            Some(field) => field,
            None => panic!("unknown field {}", id),
        }
    }

    pub(crate) fn field_mut(&mut self, id: FieldId) -> &mut Field {
        match self.fields.get_mut(id.index()) {
            Some(field) => field,
            None => panic!("unknown field {}", id),
        }
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn field_path(&self, id: FieldId) -> &KeyPath {
        &self.field(id).output_path
    }

    pub fn output_key_path(&self, id: FieldId) -> &KeyPath {
        &self.field(id).output_path
    }

    pub fn input_key_path(&self, id: FieldId) -> Option<&KeyPath> {
        self.field(id).input_path.as_ref()
    }

    pub fn field_type(&self, id: FieldId) -> &FieldType {
        &self.field(id).props.field_type
    }

    pub fn field_enabled(&self, id: FieldId) -> bool {
        self.field(id).enabled
    }

    pub fn all_field_ids(&self) -> Vec<FieldId> {
        self.fields.iter().map(|f| f.id).collect()
    }

    pub fn enabled_field_ids(&self) -> Vec<FieldId> {
        self.fields.iter().filter(|f| f.enabled).map(|f| f.id).collect()
    }

    /// Enabled field at a structurally equal path
    pub fn field_by_path(&self, path: &KeyPath) -> Option<FieldId> {
        self.fields
            .iter()
            .find(|f| f.enabled && f.output_path.structurally_equals(path))
            .map(|f| f.id)
    }

    pub fn node(&self, id: NodeId) -> &TransformationNode {
        self.graph.node(id)
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// Read-only view of the schema graph
    pub fn graph(&self) -> &SchemaGraph {
        &self.graph
    }

    pub fn set_field_metadata(&mut self, id: FieldId, key: impl Into<String>, value: Value) {
        self.field_mut(id).props.metadata.insert(key.into(), value);
    }

    /// Disable a field and everything below it. Fields are never removed so
    /// node inputs keep pointing at valid ids.
    pub fn delete_field(&mut self, id: FieldId) -> Vec<FieldId> {
        let root = self.field(id).output_path.clone();
        let mut disabled = vec![id];
        disabled.extend(
            self.fields
                .iter()
                .filter(|f| f.id != id && f.enabled && root.is_structural_prefix_of(&f.output_path))
                .filter(|f| f.output_path.len() > root.len())
                .map(|f| f.id),
        );
        for &field in &disabled {
            self.field_mut(field).enabled = false;
        }
        info!(field = %id, path = %root, cascade = disabled.len() - 1, "deleted field");
        disabled
    }

    /// Toggle one field without cascading. Re-enabling fails when another
    /// enabled field has taken the path in the meantime.
    pub fn set_field_enabled(&mut self, id: FieldId, enabled: bool) -> Result<(), ValidationError> {
        if enabled && !self.field(id).enabled {
            let path = self.field(id).output_path.clone();
            if let Some(field) = self.field_by_path(&path) {
                return Err(ValidationError::PathTaken { path, field });
            }
        }
        self.field_mut(id).enabled = enabled;
        Ok(())
    }
}

fn check_field_path(path: &KeyPath) -> Result<(), ValidationError> {
    match path.segments().first() {
        None => Err(ValidationError::EmptyPath),
        Some(Segment::Name(_)) => Ok(()),
        Some(_) => Err(ValidationError::LeadingIndex(path.clone())),
    }
}

fn check_local(output: &KeyPath, input: &KeyPath) -> Result<(), ValidationError> {
    if are_local(output, input) {
        Ok(())
    } else {
        Err(ValidationError::NonLocalOutput {
            path: output.clone(),
            input: input.clone(),
        })
    }
}

fn check_new_fields(kind: NodeKind, new_fields: &[KeyPath], input: &KeyPath) -> Result<(), ValidationError> {
    if new_fields.is_empty() {
        return Err(ValidationError::MissingNewFields(kind));
    }
    for path in new_fields {
        check_field_path(path)?;
        check_local(path, input)?;
    }
    Ok(())
}

pub(crate) fn check_input_count(spec: &NodeSpec, found: usize) -> Result<(), ValidationError> {
    let kind = spec.kind();
    let (ok, expected) = match spec.category() {
        Category::Marker if matches!(spec, NodeSpec::Identity) => (found == 1, "1"),
        Category::Marker | Category::Combine => (found >= 1, "at least 1"),
        Category::Move | Category::Simple | Category::Fork => (found == 1, "1"),
    };
    if ok {
        Ok(())
    } else {
        Err(ValidationError::InputCount {
            kind,
            expected,
            found,
        })
    }
}

fn check_value_op(op: &ValueOp) -> Result<(), ValidationError> {
    let kind = op.kind();
    match op {
        ValueOp::Arithmetic { operator, operand } => {
            if !operand.is_finite() {
                return Err(ValidationError::invalid_metadata(kind, "operand is not finite"));
            }
            if *operator == ArithmeticOperator::Divide && *operand == 0.0 {
                return Err(ValidationError::invalid_metadata(kind, "division by zero"));
            }
        }
        ValueOp::Replace { find, .. } if find.is_empty() => {
            return Err(ValidationError::invalid_metadata(kind, "nothing to find"));
        }
        _ => {}
    }
    Ok(())
}
