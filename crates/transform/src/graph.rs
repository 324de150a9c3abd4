//! Schema graph: transformation nodes in an arena plus labelled edges.
//!
//! Every edge carries the field whose chain it belongs to. A field's chain is
//! found by starting at its identity node and repeatedly following the one
//! out-edge labelled with that field. Edges always point from a lower node id
//! to a higher one, so ascending id order is a valid execution order and the
//! graph can never contain a cycle.

use crate::field::FieldId;
use crate::node::{FieldRef, NodeId, NodeSpec, TransformationNode};
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::BinaryHeap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    /// The field's value flows through unchanged in shape
    Same,
    /// Leads into a node that creates, consumes or relocates a field
    Synthetic,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    pub from: NodeId,
    pub to: NodeId,
    pub kind: EdgeKind,
    pub field: FieldId,
}

/// Adjacency-list graph owned by one engine
#[derive(Debug, Clone, Default)]
pub struct SchemaGraph {
    nodes: Vec<TransformationNode>,
    edges: Vec<Edge>,
    /// Edge indices by source node
    outgoing: Vec<Vec<usize>>,
    /// Edge indices by target node
    incoming: Vec<Vec<usize>>,
}

impl SchemaGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn add_node(&mut self, spec: NodeSpec, inputs: Vec<FieldRef>) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(TransformationNode {
            id,
            inputs,
            spec,
            outputs: Vec::new(),
        });
        self.outgoing.push(Vec::new());
        self.incoming.push(Vec::new());
        id
    }

    /// Add an edge to `field`'s chain.
    ///
    /// # Panics
    /// Panics if `from` is not older than `to`, or if `from` already continues
    /// the chain of `field`; either would break chain linearity.
    pub(crate) fn add_edge(&mut self, from: NodeId, to: NodeId, kind: EdgeKind, field: FieldId) {
        self.node(from);
        self.node(to);
        assert!(
            from < to,
            "edge {} -> {} for field {} points backwards",
            from,
            to,
            field
        );
        assert!(
            self.next_in_chain(from, field).is_none(),
            "node {} already continues the chain of field {}",
            from,
            field
        );
        let index = self.edges.len();
        self.outgoing[from.index()].push(index);
        self.incoming[to.index()].push(index);
        self.edges.push(Edge {
            from,
            to,
            kind,
            field,
        });
    }

    /// # Panics
    /// Panics on an id this graph never issued.
    pub fn node(&self, id: NodeId) -> &TransformationNode {
        match self.nodes.get(id.index()) {
            Some(node) => node,
            None => panic!("unknown node {}", id),
        }
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut TransformationNode {
        match self.nodes.get_mut(id.index()) {
            Some(node) => node,
            None => panic!("unknown node {}", id),
        }
    }

    pub fn nodes(&self) -> &[TransformationNode] {
        &self.nodes
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn out_edges(&self, id: NodeId) -> impl Iterator<Item = &Edge> {
        self.outgoing[self.node(id).id.index()]
            .iter()
            .map(move |&i| &self.edges[i])
    }

    pub fn in_edges(&self, id: NodeId) -> impl Iterator<Item = &Edge> {
        self.incoming[self.node(id).id.index()]
            .iter()
            .map(move |&i| &self.edges[i])
    }

    /// The node following `id` in `field`'s chain
    pub fn next_in_chain(&self, id: NodeId, field: FieldId) -> Option<NodeId> {
        self.out_edges(id).find(|e| e.field == field).map(|e| e.to)
    }

    /// Kahn's algorithm, always releasing the smallest ready id first.
    ///
    /// # Panics
    /// Panics if the graph contains a cycle.
    pub fn topological_order(&self) -> Vec<NodeId> {
        let mut in_degree: Vec<usize> = self.incoming.iter().map(Vec::len).collect();
        let mut ready: BinaryHeap<Reverse<NodeId>> = self
            .nodes
            .iter()
            .filter(|n| in_degree[n.id.index()] == 0)
            .map(|n| Reverse(n.id))
            .collect();

        let mut sorted = Vec::with_capacity(self.nodes.len());
        while let Some(Reverse(id)) = ready.pop() {
            sorted.push(id);
            for edge in self.out_edges(id) {
                let degree = &mut in_degree[edge.to.index()];
                *degree -= 1;
                if *degree == 0 {
                    ready.push(Reverse(edge.to));
                }
            }
        }

        assert!(
            sorted.len() == self.nodes.len(),
            "schema graph contains a cycle ({} of {} nodes ordered)",
            sorted.len(),
            self.nodes.len()
        );
        sorted
    }
}
