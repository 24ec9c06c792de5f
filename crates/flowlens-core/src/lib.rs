use serde::{Deserialize, Serialize};
use std::fmt;

pub mod error;

pub use error::CoreError;

/// Position of a node in the deduplicated node list of one layout pass.
///
/// Assigned in first-occurrence order of raw ids, so it is stable for a given
/// `RawGraph` ordering but carries no meaning across refetches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct InternalId(pub usize);

impl fmt::Display for InternalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[allow(non_camel_case_types)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    FUNCTION,
    FILE,
    MODULE,
    CLASS,
    VARIABLE,
    #[default]
    #[serde(other)]
    OTHER,
}

impl NodeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::FUNCTION => "function",
            NodeKind::FILE => "file",
            NodeKind::MODULE => "module",
            NodeKind::CLASS => "class",
            NodeKind::VARIABLE => "variable",
            NodeKind::OTHER => "other",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct GraphNode {
    pub id: String, // e.g., "src/app.py:run:42"
    #[serde(rename = "type", default)]
    pub kind: NodeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct GraphEdge {
    pub source: String,
    pub target: String,
    /// Free-text relation such as "calls" or "imports".
    #[serde(rename = "type", default)]
    pub relation: String,
}

/// Graph payload as delivered by the analysis backend.
///
/// Nothing about it is trusted: ids may repeat, edges may point at unknown
/// nodes, and cycles or self-loops are allowed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct RawGraph {
    #[serde(default)]
    pub nodes: Vec<GraphNode>,
    #[serde(default)]
    pub edges: Vec<GraphEdge>,
}

impl RawGraph {
    pub fn new(nodes: Vec<GraphNode>, edges: Vec<GraphEdge>) -> Self {
        Self { nodes, edges }
    }

    pub fn from_json(text: &str) -> Result<Self, CoreError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_graph_from_backend_json() {
        let json = r#"{
            "nodes": [
                {"id": "app.py:main:1", "type": "function", "file": "app.py"},
                {"id": "app.py", "type": "file"}
            ],
            "edges": [{"source": "app.py", "target": "app.py:main:1", "type": "contains"}]
        }"#;

        let graph = RawGraph::from_json(json).unwrap();
        assert_eq!(graph.node_count(), 2);
        assert_eq!(graph.edge_count(), 1);
        assert_eq!(graph.nodes[0].kind, NodeKind::FUNCTION);
        assert_eq!(graph.nodes[0].file.as_deref(), Some("app.py"));
        assert_eq!(graph.nodes[1].file, None);
        assert_eq!(graph.edges[0].relation, "contains");
    }

    #[test]
    fn test_unknown_node_type_decodes_as_other() {
        let json = r#"{"nodes": [{"id": "x", "type": "lambda"}], "edges": []}"#;
        let graph = RawGraph::from_json(json).unwrap();
        assert_eq!(graph.nodes[0].kind, NodeKind::OTHER);
    }

    #[test]
    fn test_missing_arrays_decode_as_empty() {
        let graph = RawGraph::from_json("{}").unwrap();
        assert!(graph.is_empty());
        assert_eq!(graph.edge_count(), 0);
    }

    #[test]
    fn test_invalid_json_is_an_error() {
        let err = RawGraph::from_json("{\"nodes\": 3}").unwrap_err();
        assert!(matches!(err, CoreError::InvalidGraph(_)));
    }

    #[test]
    fn test_node_kind_serializes_lowercase() {
        let json = serde_json::to_string(&NodeKind::CLASS).unwrap();
        assert_eq!(json, "\"class\"");
        assert_eq!(NodeKind::VARIABLE.to_string(), "variable");
    }
}
