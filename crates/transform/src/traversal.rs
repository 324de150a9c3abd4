//! Walks over the field tree and over a single field's chain.
//!
//! The field tree is implied by path containment: a field is a child of
//! another when its output path is the parent's plus one segment. Only
//! enabled fields take part. Results are materialized eagerly since schemas
//! are small.

use crate::engine::TransformationEngine;
use crate::field::FieldId;
use crate::node::NodeId;

impl TransformationEngine {
    /// Enabled direct children of `id`, in registration order
    pub fn children(&self, id: FieldId) -> Vec<FieldId> {
        let parent = &self.field(id).output_path;
        self.fields
            .iter()
            .filter(|f| f.enabled && f.id != id && parent.is_structural_parent_of(&f.output_path))
            .map(|f| f.id)
            .collect()
    }

    /// Enabled top-level fields
    pub fn roots(&self) -> Vec<FieldId> {
        self.fields
            .iter()
            .filter(|f| f.enabled)
            .filter(|f| match f.output_path.parent() {
                Some(parent) if !parent.is_empty() => self.field_by_path(&parent).is_none(),
                _ => true,
            })
            .map(|f| f.id)
            .collect()
    }

    /// `id` followed by its descendants, parents before children
    pub fn preorder(&self, id: FieldId) -> Vec<FieldId> {
        let mut order = Vec::new();
        let mut stack = vec![id];
        while let Some(current) = stack.pop() {
            order.push(current);
            stack.extend(self.children(current).into_iter().rev());
        }
        order
    }

    /// Descendants of `id` before `id` itself, children before parents
    pub fn postorder(&self, id: FieldId) -> Vec<FieldId> {
        let mut order = Vec::new();
        let mut stack = vec![(id, false)];
        while let Some((current, expanded)) = stack.pop() {
            if expanded {
                order.push(current);
            } else {
                stack.push((current, true));
                stack.extend(self.children(current).into_iter().rev().map(|c| (c, false)));
            }
        }
        order
    }

    /// The chain of `id`: its identity node followed by every node appended
    /// to it, in order.
    ///
    /// # Panics
    /// Panics if the chain does not terminate within the node count.
    pub fn transformations(&self, id: FieldId) -> Vec<NodeId> {
        let mut chain = vec![self.field(id).identity];
        let mut current = chain[0];
        while let Some(next) = self.graph.next_in_chain(current, id) {
            assert!(
                chain.len() <= self.graph.node_count(),
                "chain of field {} does not terminate",
                id
            );
            chain.push(next);
            current = next;
        }
        chain
    }

    /// Last node of the chain of `id`; new nodes on the field attach here
    pub fn find_end_transformation(&self, id: FieldId) -> NodeId {
        let mut current = self.field(id).identity;
        let mut steps = 0;
        while let Some(next) = self.graph.next_in_chain(current, id) {
            steps += 1;
            assert!(
                steps <= self.graph.node_count(),
                "chain of field {} does not terminate",
                id
            );
            current = next;
        }
        current
    }

    /// Order in which `transform` runs nodes. Every edge is respected, so
    /// each chain runs in order and a node reading another field runs after
    /// that field's producers.
    pub fn execution_order(&self) -> Vec<NodeId> {
        self.graph.topological_order()
    }
}
