use crate::graph::{VisualEdge, VisualNode};
use crate::style::{DIMMED_EDGE_OPACITY, DIMMED_NODE_OPACITY, Palette};
use crate::visibility::{CollapsedSet, VisibleGraph};
use flowlens_core::InternalId;
use serde::Serialize;
use std::collections::HashSet;

/// Final projection handed to the rendering host.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StyledGraph {
    pub nodes: Vec<VisualNode>,
    pub edges: Vec<VisualEdge>,
    pub hovered: Option<InternalId>,
}

pub struct HighlightEngine;

impl HighlightEngine {
    /// The hovered node plus every node sharing a visible edge with it.
    pub fn active_nodes(edges: &[VisualEdge], hovered: InternalId) -> HashSet<InternalId> {
        let mut active = HashSet::from([hovered]);
        for edge in edges {
            if edge.source == hovered {
                active.insert(edge.target);
            } else if edge.target == hovered {
                active.insert(edge.source);
            }
        }
        active
    }

    fn mark_collapsed(node: &mut VisualNode, palette: &Palette) {
        node.collapsed = true;
        node.style.border = palette.accent_alt;
        node.style.border_dashed = true;
    }

    /// Produce a fresh styled copy of `visible`; the input is left untouched.
    pub fn apply(
        visible: &VisibleGraph,
        collapsed: &CollapsedSet,
        hovered: Option<InternalId>,
        palette: &Palette,
    ) -> StyledGraph {
        // A hover target that is hidden or unknown counts as no hover.
        let hovered =
            hovered.filter(|id| visible.nodes.iter().any(|node| node.internal_id == *id));

        let mut nodes: Vec<VisualNode> = visible.nodes.clone();
        for node in &mut nodes {
            if collapsed.contains(node.internal_id) {
                Self::mark_collapsed(node, palette);
            }
        }

        let mut edges: Vec<VisualEdge> = visible.edges.clone();

        let Some(hovered_id) = hovered else {
            return StyledGraph {
                nodes,
                edges,
                hovered: None,
            };
        };

        let active = Self::active_nodes(&visible.edges, hovered_id);

        for node in &mut nodes {
            if active.contains(&node.internal_id) {
                node.active = true;
                node.focused = node.internal_id == hovered_id;
                node.style.opacity = 1.0;
                node.style.border = palette.accent;
                if node.focused {
                    node.style.border_width = 2.0;
                }
            } else {
                node.style.opacity = DIMMED_NODE_OPACITY;
            }
        }

        for edge in &mut edges {
            let touches = edge.source == hovered_id || edge.target == hovered_id;
            edge.active = touches;
            if touches {
                edge.style.color = palette.accent_alt;
                edge.style.width = 2.0;
                edge.style.animated = true;
                edge.style.opacity = 1.0;
            } else {
                edge.style.color = palette.edge;
                edge.style.width = 1.0;
                edge.style.animated = false;
                edge.style.opacity = DIMMED_EDGE_OPACITY;
            }
        }

        StyledGraph {
            nodes,
            edges,
            hovered,
        }
    }
}
