//! Creation wiring: connects a freshly added node to the chains of its
//! inputs and registers the fields it declares.

use crate::engine::TransformationEngine;
use crate::field::{FieldId, FieldProps, FieldType};
use crate::graph::EdgeKind;
use crate::node::{NodeId, NodeSpec, ValueOp};
use docflow_keypath::KeyPath;
use tracing::debug;

impl TransformationEngine {
    pub(crate) fn wire(&mut self, node: NodeId) {
        let (spec, inputs) = {
            let n = self.graph.node(node);
            (n.spec.clone(), n.inputs.clone())
        };
        let kind = if spec.creates_fields() || matches!(spec, NodeSpec::Rename { .. }) {
            EdgeKind::Synthetic
        } else {
            EdgeKind::Same
        };
        for input in &inputs {
            let end = self.find_end_transformation(input.field);
            self.graph.add_edge(end, node, kind, input.field);
            debug!(from = %end, to = %node, field = %input.field, ?kind, "appended to chain");
        }

        match &spec {
            NodeSpec::Rename { new_path } => self.rebase(inputs[0].field, new_path),
            NodeSpec::Duplicate { new_path } => self.replicate(node, inputs[0].field, new_path),
            NodeSpec::Split(split) => {
                for path in &split.new_fields {
                    self.register_output(node, path, FieldType::String);
                }
            }
            NodeSpec::Derive(derive) => {
                for (path, op) in derive.new_fields.iter().zip(&derive.ops) {
                    self.register_output(node, path, op.output_type());
                }
            }
            NodeSpec::Join(join) => {
                self.register_output(node, &join.new_field, FieldType::String);
            }
            NodeSpec::Sum(sum) => {
                self.register_output(node, &sum.new_field, FieldType::Number);
            }
            NodeSpec::Simple { op: ValueOp::Cast { to } } => {
                self.field_mut(inputs[0].field).props.field_type = to.field_type();
            }
            NodeSpec::Simple { .. } | NodeSpec::Identity | NodeSpec::Load | NodeSpec::Store => {}
        }
    }

    /// Register one declared field; a field already at the path is reused
    /// and recorded as an output of the node.
    fn register_output(&mut self, node: NodeId, path: &KeyPath, field_type: FieldType) -> FieldId {
        match self.field_by_path(path) {
            Some(existing) => {
                self.graph.node_mut(node).outputs.push(existing);
                existing
            }
            None => self.ensure_field(path.clone(), FieldProps::new(field_type), Some(node)),
        }
    }

    /// Point a renamed field and its descendants at their new location.
    /// The field keeps its id.
    fn rebase(&mut self, field: FieldId, new_path: &KeyPath) {
        let old_path = self.field(field).output_path.clone();
        for id in self.preorder(field) {
            let current = &self.field(id).output_path;
            if let Some(rest) = current.strip_prefix(&old_path) {
                let rebased = new_path.concat(&rest);
                debug!(field = %id, from = %current, to = %rebased, "rebased field");
                self.field_mut(id).output_path = rebased;
            }
        }
    }

    /// Copy `source` and its descendants under `new_path`.
    ///
    /// Walks the source subtree in pre-order so a copy's parent exists before
    /// the copy itself. Each descendant copy's chain is spliced after the end
    /// of its original's chain, keeping the transformations already applied.
    fn replicate(&mut self, node: NodeId, source: FieldId, new_path: &KeyPath) {
        let source_path = self.field(source).output_path.clone();
        for original in self.preorder(source) {
            let (rest, props) = {
                let f = self.field(original);
                match f.output_path.strip_prefix(&source_path) {
                    Some(rest) => (rest, f.props.clone()),
                    None => continue,
                }
            };
            let copy = self.ensure_field(new_path.concat(&rest), props, Some(node));
            if original == source {
                continue;
            }
            let end = self.find_end_transformation(original);
            let identity = self.field(copy).identity;
            if end < identity && self.graph.next_in_chain(end, copy).is_none() {
                self.graph.add_edge(end, identity, EdgeKind::Synthetic, copy);
            }
            debug!(original = %original, copy = %copy, "replicated field");
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::engine::TransformationEngine;
    use crate::field::{FieldId, FieldProps, FieldType};
    use crate::graph::EdgeKind;
    use crate::node::{JoinSpec, NodeKind, NodeSpec, SplitSpec, SumSpec, ValueOp};
    use docflow_keypath::KeyPath;

    fn kp(s: &str) -> KeyPath {
        KeyPath::parse(s).unwrap()
    }

    fn field(engine: &mut TransformationEngine, path: &str) -> FieldId {
        engine
            .add_field(kp(path), FieldProps::new(FieldType::String), None)
            .unwrap()
    }

    #[test]
    fn test_simple_nodes_append_same_edges() {
        let mut engine = TransformationEngine::new();
        let a = field(&mut engine, "a");
        let up = engine
            .add_transformation_node(NodeSpec::Simple { op: ValueOp::Uppercase }, &[a])
            .unwrap();
        let low = engine
            .add_transformation_node(NodeSpec::Simple { op: ValueOp::Lowercase }, &[a])
            .unwrap();
        let identity = engine.field(a).identity;
        assert_eq!(engine.transformations(a), vec![identity, up, low]);
        assert!(engine.graph().in_edges(low).all(|e| e.kind == EdgeKind::Same));
    }

    #[test]
    fn test_split_registers_new_fields_with_synthetic_edges() {
        let mut engine = TransformationEngine::new();
        let name = field(&mut engine, "people[*].name");
        let split = engine
            .add_transformation_node(
                NodeSpec::Split(SplitSpec {
                    delimiter: " ".into(),
                    new_fields: vec![kp("people[*].first"), kp("people[*].last")],
                }),
                &[name],
            )
            .unwrap();

        let first = engine.field_by_path(&kp("people[*].first")).unwrap();
        let last = engine.field_by_path(&kp("people[*].last")).unwrap();
        assert_eq!(engine.node(split).outputs, vec![first, last]);
        assert_eq!(engine.field(first).origin, Some(split));
        assert_eq!(engine.field(first).input_path, None);
        assert!(engine.graph().in_edges(split).all(|e| e.kind == EdgeKind::Synthetic));
        // the input chain continues through the split
        assert_eq!(engine.find_end_transformation(name), split);
        // new fields start at their own identity
        assert_eq!(engine.transformations(first), vec![engine.field(first).identity]);
    }

    #[test]
    fn test_combine_reuses_existing_destination() {
        let mut engine = TransformationEngine::new();
        let a = field(&mut engine, "a");
        let b = field(&mut engine, "b");
        let c = field(&mut engine, "c");
        let join = engine
            .add_transformation_node(
                NodeSpec::Join(JoinSpec {
                    delimiter: ",".into(),
                    new_field: kp("c"),
                }),
                &[a, b],
            )
            .unwrap();
        assert_eq!(engine.node(join).outputs, vec![c]);
        assert_eq!(engine.field_count(), 3);
        assert_eq!(engine.find_end_transformation(a), join);
        assert_eq!(engine.find_end_transformation(b), join);
    }

    #[test]
    fn test_combine_registers_new_destination_fields() {
        let mut engine = TransformationEngine::new();
        let a = field(&mut engine, "rows[*].a");
        let b = field(&mut engine, "rows[*].b");
        let before = engine.field_count();
        let join = engine
            .add_transformation_node(
                NodeSpec::Join(JoinSpec {
                    delimiter: "-".into(),
                    new_field: kp("rows[*].label"),
                }),
                &[a, b],
            )
            .unwrap();
        let sum = engine
            .add_transformation_node(
                NodeSpec::Sum(SumSpec {
                    new_field: kp("rows[*].total"),
                }),
                &[a, b],
            )
            .unwrap();

        assert_eq!(engine.field_count(), before + 2);
        let label = engine.field_by_path(&kp("rows[*].label")).unwrap();
        let total = engine.field_by_path(&kp("rows[*].total")).unwrap();
        assert_eq!(engine.node(join).outputs, vec![label]);
        assert_eq!(engine.node(sum).outputs, vec![total]);
        assert_eq!(engine.field_type(label), &FieldType::String);
        assert_eq!(engine.field_type(total), &FieldType::Number);
        assert_eq!(engine.field(total).origin, Some(sum));
        assert_eq!(engine.transformations(a), vec![engine.field(a).identity, join, sum]);
    }

    #[test]
    fn test_rename_keeps_id_and_rebases_descendants() {
        let mut engine = TransformationEngine::new();
        let street = field(&mut engine, "address.street");
        let address = engine.field_by_path(&kp("address")).unwrap();
        let rename = engine
            .add_transformation_node(NodeSpec::Rename { new_path: kp("location") }, &[address])
            .unwrap();

        assert_eq!(engine.node(rename).kind(), NodeKind::Rename);
        assert_eq!(engine.output_key_path(address), &kp("location"));
        assert_eq!(engine.output_key_path(street), &kp("location.street"));
        assert_eq!(engine.field_by_path(&kp("location.street")), Some(street));
        assert_eq!(engine.field_by_path(&kp("address")), None);
        // the node stays anchored where the value was
        assert_eq!(engine.node(rename).inputs[0].path, kp("address"));
        assert!(engine.graph().in_edges(rename).all(|e| e.kind == EdgeKind::Synthetic));
    }

    #[test]
    fn test_duplicate_replicates_descendants_in_preorder() {
        let mut engine = TransformationEngine::new();
        let x = field(&mut engine, "src.x");
        let y = field(&mut engine, "src.y");
        let src = engine.field_by_path(&kp("src")).unwrap();
        let upper = engine
            .add_transformation_node(NodeSpec::Simple { op: ValueOp::Uppercase }, &[x])
            .unwrap();
        let dup = engine
            .add_transformation_node(NodeSpec::Duplicate { new_path: kp("copy") }, &[src])
            .unwrap();

        let copy = engine.field_by_path(&kp("copy")).unwrap();
        let copy_x = engine.field_by_path(&kp("copy.x")).unwrap();
        let copy_y = engine.field_by_path(&kp("copy.y")).unwrap();
        assert_eq!(engine.node(dup).outputs, vec![copy, copy_x, copy_y]);
        assert_eq!(engine.children(copy), vec![copy_x, copy_y]);

        // copy.x continues after the uppercase already applied to src.x
        assert!(engine
            .graph()
            .in_edges(engine.field(copy_x).identity)
            .any(|e| e.from == upper && e.field == copy_x));
        // copy.y continues after the identity of src.y
        assert!(engine
            .graph()
            .in_edges(engine.field(copy_y).identity)
            .any(|e| e.from == engine.field(y).identity));
        assert_eq!(engine.find_end_transformation(x), upper);
    }
}
