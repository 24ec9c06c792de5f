use crate::graph::{VisualEdge, VisualNode};
use flowlens_core::InternalId;
use std::collections::{BTreeSet, HashMap, HashSet};

/// User-toggled collapse roots for one laid-out graph.
///
/// Only ids of the graph it was created for can enter the set; loading a new
/// graph means creating a new set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CollapsedSet {
    roots: BTreeSet<InternalId>,
    node_count: usize,
}

impl CollapsedSet {
    pub fn new(node_count: usize) -> Self {
        Self {
            roots: BTreeSet::new(),
            node_count,
        }
    }

    /// Flip the collapse state of `id`. Returns the new state, or `None` when
    /// the id does not belong to the current graph.
    pub fn toggle(&mut self, id: InternalId) -> Option<bool> {
        if id.0 >= self.node_count {
            tracing::debug!("Ignoring collapse toggle for unknown node {}", id);
            return None;
        }
        if self.roots.remove(&id) {
            Some(false)
        } else {
            self.roots.insert(id);
            Some(true)
        }
    }

    pub fn contains(&self, id: InternalId) -> bool {
        self.roots.contains(&id)
    }

    pub fn iter(&self) -> impl Iterator<Item = InternalId> + '_ {
        self.roots.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.roots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }

    pub fn node_count(&self) -> usize {
        self.node_count
    }

    pub fn clear(&mut self) {
        self.roots.clear();
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct VisibleGraph {
    pub nodes: Vec<VisualNode>,
    pub edges: Vec<VisualEdge>,
    pub hidden: HashSet<InternalId>,
}

impl VisibleGraph {
    pub fn is_visible(&self, id: InternalId) -> bool {
        !self.hidden.contains(&id)
    }
}

pub struct VisibilityEngine;

impl VisibilityEngine {
    /// Hide everything reachable downstream of each collapse root.
    ///
    /// A traversal stops at any other collapse root: that root stays visible
    /// and what lies below it is governed by its own entry.
    pub fn hidden_nodes(edges: &[VisualEdge], collapsed: &CollapsedSet) -> HashSet<InternalId> {
        let mut outgoing: HashMap<InternalId, Vec<InternalId>> = HashMap::new();
        for edge in edges {
            outgoing.entry(edge.source).or_default().push(edge.target);
        }

        let mut hidden = HashSet::new();
        for root in collapsed.iter() {
            let mut stack = vec![root];
            let mut seen = HashSet::from([root]);

            while let Some(current) = stack.pop() {
                let Some(targets) = outgoing.get(&current) else {
                    continue;
                };
                for &target in targets {
                    if collapsed.contains(target) || !seen.insert(target) {
                        continue;
                    }
                    hidden.insert(target);
                    stack.push(target);
                }
            }
        }

        hidden
    }

    pub fn apply(
        nodes: &[VisualNode],
        edges: &[VisualEdge],
        collapsed: &CollapsedSet,
    ) -> VisibleGraph {
        let hidden = Self::hidden_nodes(edges, collapsed);

        let nodes = nodes
            .iter()
            .filter(|node| !hidden.contains(&node.internal_id))
            .cloned()
            .collect();
        let edges = edges
            .iter()
            .filter(|edge| !hidden.contains(&edge.source) && !hidden.contains(&edge.target))
            .cloned()
            .collect();

        VisibleGraph {
            nodes,
            edges,
            hidden,
        }
    }
}
