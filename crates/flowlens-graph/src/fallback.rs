use crate::graph::{VisualEdge, VisualNode};
use serde::Serialize;
use std::fmt::Write;

/// Maximum number of labels listed when the renderer is unavailable.
pub const DEFAULT_FALLBACK_CAP: usize = 30;

/// Plain listing of the graph for hosts where the canvas failed to mount.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FallbackView {
    pub labels: Vec<String>,
    pub node_count: usize,
    pub edge_count: usize,
    /// Labels left out because of the cap
    pub omitted: usize,
}

impl FallbackView {
    pub fn build(nodes: &[VisualNode], edges: &[VisualEdge]) -> Self {
        Self::with_cap(nodes, edges, DEFAULT_FALLBACK_CAP)
    }

    pub fn with_cap(nodes: &[VisualNode], edges: &[VisualEdge], cap: usize) -> Self {
        let mut ordered: Vec<&VisualNode> = nodes.iter().collect();
        ordered.sort_by_key(|node| node.internal_id);

        let labels: Vec<String> = ordered
            .iter()
            .take(cap)
            .map(|node| node.label.clone())
            .collect();

        Self {
            omitted: nodes.len() - labels.len(),
            labels,
            node_count: nodes.len(),
            edge_count: edges.len(),
        }
    }

    pub fn is_truncated(&self) -> bool {
        self.omitted > 0
    }

    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "Graph renderer unavailable. Showing {} node(s) and {} edge(s) as text.",
            self.node_count, self.edge_count
        );
        for label in &self.labels {
            let _ = writeln!(out, "- {}", label);
        }
        if self.is_truncated() {
            let _ = writeln!(out, "... and {} more", self.omitted);
        }
        out
    }
}
