use crate::graph::{ModelEdge, ModelNode, Vec2, VisualEdge, VisualNode};
use crate::style::{Palette, get_edge_style, get_node_style};
use flowlens_core::NodeKind;

/// Default character budget for node labels.
pub const DEFAULT_LABEL_BUDGET: usize = 42;

const ELLIPSIS: char = '…';

/// Converts normalized model entities into visual entities carrying labels
/// and palette-derived baseline styles.
pub struct VisualConverter<'a> {
    palette: &'a Palette,
    label_budget: usize,
}

impl<'a> VisualConverter<'a> {
    pub fn new(palette: &'a Palette, label_budget: usize) -> Self {
        Self {
            palette,
            label_budget,
        }
    }

    pub fn node(&self, node: &ModelNode, position: Vec2, size: Vec2) -> VisualNode {
        VisualNode {
            internal_id: node.id,
            raw_id: node.raw_id.clone(),
            label: format_label(node.kind, &node.raw_id, self.label_budget),
            kind: node.kind,
            file: node.file.clone(),
            position,
            size,
            style: get_node_style(node.kind, self.palette),
            active: false,
            focused: false,
            collapsed: false,
        }
    }

    pub fn edge(&self, index: usize, edge: &ModelEdge) -> VisualEdge {
        VisualEdge {
            internal_id: index,
            source: edge.source,
            target: edge.target,
            relation_label: edge.relation.clone(),
            style: get_edge_style(self.palette),
            active: false,
        }
    }
}

/// Extract the readable function name from a composite id such as
/// `pkg/mod.py:handler:17`. Ids without a usable segment are returned whole.
pub fn function_name(raw_id: &str) -> &str {
    let segments: Vec<&str> = raw_id.split(':').collect();
    if segments.len() < 2 {
        return raw_id;
    }
    let name = segments[segments.len() - 2].trim();
    if name.is_empty() { raw_id } else { name }
}

pub fn format_label(kind: NodeKind, raw_id: &str, budget: usize) -> String {
    let text = match kind {
        NodeKind::FUNCTION => function_name(raw_id).to_string(),
        _ => format!("{}: {}", kind, raw_id),
    };
    truncate(&text, budget)
}

/// Truncate to at most `budget` characters, ending in an ellipsis when cut.
pub fn truncate(text: &str, budget: usize) -> String {
    if text.chars().count() <= budget {
        return text.to_string();
    }
    if budget == 0 {
        return String::new();
    }
    let mut out: String = text.chars().take(budget - 1).collect();
    out.push(ELLIPSIS);
    out
}
