use crate::style::{EdgeStyle, NodeStyle};
use flowlens_core::{GraphEdge, GraphNode, InternalId, NodeKind, RawGraph};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::ops::Index;

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisualNode {
    pub internal_id: InternalId,
    pub raw_id: String,
    pub label: String,
    pub kind: NodeKind,
    pub file: Option<String>,

    // Visual properties
    pub position: Vec2,
    pub size: Vec2,
    pub style: NodeStyle,

    // Overlay state
    pub active: bool,
    pub focused: bool,
    pub collapsed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisualEdge {
    pub internal_id: usize,
    pub source: InternalId,
    pub target: InternalId,
    pub relation_label: String,
    pub style: EdgeStyle,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModelNode {
    pub id: InternalId,
    pub raw_id: String,
    pub kind: NodeKind,
    pub file: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModelEdge {
    pub source: InternalId,
    pub target: InternalId,
    pub relation: String,
}

/// Normalized form of a `RawGraph`: unique nodes in first-occurrence order
/// and only those edges whose endpoints both exist.
#[derive(Debug, Default)]
pub struct GraphModel {
    nodes: Vec<ModelNode>,
    edges: Vec<ModelEdge>,
    pub node_map: HashMap<String, InternalId>,
}

impl GraphModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_raw(raw: &RawGraph) -> Self {
        let mut model = Self::new();
        for node in &raw.nodes {
            model.add_node(node);
        }
        for edge in &raw.edges {
            model.add_edge(edge);
        }
        model
    }

    /// Returns the internal id of the node, allocating one on first sight.
    /// Later duplicates keep the first occurrence's attributes.
    pub fn add_node(&mut self, node: &GraphNode) -> InternalId {
        if let Some(&existing) = self.node_map.get(&node.id) {
            tracing::debug!(
                "Discarding duplicate node '{}' (kept as {})",
                node.id,
                existing
            );
            return existing;
        }

        let id = InternalId(self.nodes.len());
        self.nodes.push(ModelNode {
            id,
            raw_id: node.id.clone(),
            kind: node.kind,
            file: node.file.clone(),
        });
        self.node_map.insert(node.id.clone(), id);
        id
    }

    pub fn add_edge(&mut self, edge: &GraphEdge) -> bool {
        match (
            self.node_map.get(&edge.source),
            self.node_map.get(&edge.target),
        ) {
            (Some(&source), Some(&target)) => {
                self.edges.push(ModelEdge {
                    source,
                    target,
                    relation: edge.relation.clone(),
                });
                true
            }
            _ => {
                tracing::debug!(
                    "Dropping dangling edge {} -> {} ({})",
                    edge.source,
                    edge.target,
                    edge.relation
                );
                false
            }
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn nodes(&self) -> &[ModelNode] {
        &self.nodes
    }

    pub fn edges(&self) -> &[ModelEdge] {
        &self.edges
    }

    pub fn node_indices(&self) -> impl Iterator<Item = InternalId> {
        (0..self.nodes.len()).map(InternalId)
    }
}

impl Index<InternalId> for GraphModel {
    type Output = ModelNode;
    fn index(&self, index: InternalId) -> &Self::Output {
        &self.nodes[index.0]
    }
}
