use crate::converter::{DEFAULT_LABEL_BUDGET, VisualConverter};
use crate::graph::{GraphModel, Vec2, VisualEdge, VisualNode};
use crate::style::Palette;
use flowlens_core::{InternalId, RawGraph};
use std::cmp::Ordering;
use std::collections::HashMap;
use thiserror::Error;

pub const NODE_WIDTH: f32 = 180.0;
pub const NODE_HEIGHT: f32 = 48.0;
pub const NODE_SPACING: f32 = 40.0;
pub const RANK_SPACING: f32 = 72.0;

// Grid used when a node cannot be placed by the layouter.
const GRID_COLUMNS: usize = 5;
const GRID_ORIGIN: Vec2 = Vec2 { x: 120.0, y: 80.0 };
const GRID_STEP: Vec2 = Vec2 { x: 220.0, y: 140.0 };

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LayoutError {
    #[error("layout failed: {0}")]
    Failed(String),
}

pub trait Layouter {
    fn execute(&self, model: &GraphModel) -> Result<HashMap<InternalId, Vec2>, LayoutError>;
}

#[derive(Default)]
struct Relations {
    edges: Vec<(InternalId, InternalId)>,
    incoming: HashMap<InternalId, Vec<InternalId>>,
    outgoing: HashMap<InternalId, Vec<InternalId>>,
}

/// Layered (Sugiyama-style) layout: longest-path ranking, median-based
/// crossing reduction, then fixed-size coordinate assignment.
///
/// Ranks flow top to bottom; order within a rank runs left to right and each
/// rank is centred on `x = 0`.
#[derive(Debug, Clone)]
pub struct LayeredLayouter {
    pub node_size: Vec2,
    /// Horizontal gap between neighbours in one rank
    pub node_spacing: f32,
    /// Vertical gap between consecutive ranks
    pub rank_spacing: f32,
    /// Number of down+up crossing reduction sweeps
    pub ordering_passes: usize,
}

impl Default for LayeredLayouter {
    fn default() -> Self {
        Self {
            node_size: Vec2::new(NODE_WIDTH, NODE_HEIGHT),
            node_spacing: NODE_SPACING,
            rank_spacing: RANK_SPACING,
            ordering_passes: Self::DEFAULT_ORDERING_PASSES,
        }
    }
}

impl LayeredLayouter {
    pub const DEFAULT_ORDERING_PASSES: usize = 4;
    /// Maximum iterations for ranking convergence
    const MAX_RANKING_ITERATIONS: usize = 1000;

    fn build_relations(model: &GraphModel) -> Relations {
        let mut relations = Relations::default();

        for edge in model.edges() {
            if edge.source == edge.target {
                continue;
            }
            relations.edges.push((edge.source, edge.target));
            relations
                .incoming
                .entry(edge.target)
                .or_default()
                .push(edge.source);
            relations
                .outgoing
                .entry(edge.source)
                .or_default()
                .push(edge.target);
        }

        relations
    }

    /// Longest path from sources. Cycles keep raising ranks until the
    /// iteration bound is hit, so the loop always terminates.
    fn assign_ranks(node_count: usize, relations: &Relations) -> Vec<usize> {
        let mut ranks = vec![0usize; node_count];

        let max_iterations = (node_count + 2).min(Self::MAX_RANKING_ITERATIONS);
        let mut converged = false;
        for _ in 0..max_iterations {
            let mut changed = false;
            for &(source, target) in &relations.edges {
                if ranks[target.0] <= ranks[source.0] {
                    ranks[target.0] = ranks[source.0] + 1;
                    changed = true;
                }
            }

            if !changed {
                converged = true;
                break;
            }
        }

        if !converged {
            tracing::debug!(
                "Ranking stopped after {} iterations (graph contains cycles)",
                max_iterations
            );
        }

        Self::compress_ranks(&mut ranks);
        ranks
    }

    fn compress_ranks(ranks: &mut [usize]) {
        let mut unique_ranks: Vec<usize> = ranks.to_vec();
        unique_ranks.sort_unstable();
        unique_ranks.dedup();

        let remap: HashMap<usize, usize> = unique_ranks
            .iter()
            .enumerate()
            .map(|(i, &rank)| (rank, i))
            .collect();

        for rank in ranks.iter_mut() {
            if let Some(&new_rank) = remap.get(rank) {
                *rank = new_rank;
            }
        }
    }

    fn build_layers(ranks: &[usize]) -> Vec<Vec<InternalId>> {
        let layer_count = ranks.iter().copied().max().map_or(0, |max| max + 1);
        let mut layers = vec![Vec::new(); layer_count];
        // Ids are visited in ascending order, which seeds each layer by first occurrence.
        for (idx, &rank) in ranks.iter().enumerate() {
            layers[rank].push(InternalId(idx));
        }
        layers
    }

    fn update_positions(layers: &[Vec<InternalId>], positions: &mut [usize]) {
        for layer in layers {
            for (order, &node) in layer.iter().enumerate() {
                positions[node.0] = order;
            }
        }
    }

    fn median_position(
        node: InternalId,
        neighbors: &HashMap<InternalId, Vec<InternalId>>,
        positions: &[usize],
    ) -> Option<f32> {
        let list = neighbors.get(&node)?;
        let mut values: Vec<f32> = list.iter().map(|n| positions[n.0] as f32).collect();
        if values.is_empty() {
            return None;
        }
        values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
        let mid = values.len() / 2;
        if values.len() % 2 == 1 {
            Some(values[mid])
        } else {
            Some((values[mid - 1] + values[mid]) * 0.5)
        }
    }

    fn order_layer_by_median(
        layer: &mut [InternalId],
        neighbors: &HashMap<InternalId, Vec<InternalId>>,
        positions: &[usize],
    ) {
        // Nodes without neighbours keep their current slot as their score.
        let scores: HashMap<InternalId, f32> = layer
            .iter()
            .map(|&node| {
                let score = Self::median_position(node, neighbors, positions)
                    .unwrap_or(positions[node.0] as f32);
                (node, score)
            })
            .collect();

        layer.sort_by(|a, b| {
            scores[a]
                .partial_cmp(&scores[b])
                .unwrap_or(Ordering::Equal)
                .then_with(|| positions[a.0].cmp(&positions[b.0]))
                .then_with(|| a.cmp(b))
        });
    }

    fn reduce_crossings(
        &self,
        layers: &mut [Vec<InternalId>],
        relations: &Relations,
        node_count: usize,
    ) {
        if layers.len() <= 1 {
            return;
        }

        let mut positions = vec![0usize; node_count];
        Self::update_positions(layers, &mut positions);

        for _ in 0..self.ordering_passes {
            for rank in 1..layers.len() {
                if layers[rank].len() <= 1 {
                    continue;
                }
                Self::order_layer_by_median(&mut layers[rank], &relations.incoming, &positions);
                Self::update_positions(layers, &mut positions);
            }
            for rank in (0..layers.len() - 1).rev() {
                if layers[rank].len() <= 1 {
                    continue;
                }
                Self::order_layer_by_median(&mut layers[rank], &relations.outgoing, &positions);
                Self::update_positions(layers, &mut positions);
            }
        }
    }

    fn place_layers(&self, layers: &[Vec<InternalId>]) -> HashMap<InternalId, Vec2> {
        let mut positions = HashMap::new();
        let step_x = self.node_size.x + self.node_spacing;
        let step_y = self.node_size.y + self.rank_spacing;

        for (rank, layer) in layers.iter().enumerate() {
            let extent = layer.len() as f32 * self.node_size.x
                + layer.len().saturating_sub(1) as f32 * self.node_spacing;
            let start_x = -extent / 2.0;
            let y = rank as f32 * step_y;

            for (order, &node) in layer.iter().enumerate() {
                positions.insert(node, Vec2::new(start_x + order as f32 * step_x, y));
            }
        }

        positions
    }
}

impl Layouter for LayeredLayouter {
    fn execute(&self, model: &GraphModel) -> Result<HashMap<InternalId, Vec2>, LayoutError> {
        let node_count = model.node_count();
        if node_count == 0 {
            return Ok(HashMap::new());
        }

        let relations = Self::build_relations(model);
        let ranks = Self::assign_ranks(node_count, &relations);
        let mut layers = Self::build_layers(&ranks);
        self.reduce_crossings(&mut layers, &relations, node_count);

        Ok(self.place_layers(&layers))
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayoutResult {
    pub nodes: Vec<VisualNode>,
    pub edges: Vec<VisualEdge>,
    /// Number of nodes placed on the fallback grid
    pub fallback_count: usize,
}

/// Turns a `RawGraph` into positioned, styled visual entities.
///
/// `compute` never fails: a layouter error or a non-finite coordinate sends
/// the affected nodes to a deterministic grid slot derived from their index.
pub struct LayoutEngine {
    layouter: Box<dyn Layouter + Send + Sync>,
    label_budget: usize,
}

impl Default for LayoutEngine {
    fn default() -> Self {
        Self::new(Box::new(LayeredLayouter::default()), DEFAULT_LABEL_BUDGET)
    }
}

impl LayoutEngine {
    pub fn new(layouter: Box<dyn Layouter + Send + Sync>, label_budget: usize) -> Self {
        Self {
            layouter,
            label_budget,
        }
    }

    pub fn with_label_budget(mut self, label_budget: usize) -> Self {
        self.label_budget = label_budget;
        self
    }

    pub fn grid_position(index: usize) -> Vec2 {
        Vec2::new(
            GRID_ORIGIN.x + (index % GRID_COLUMNS) as f32 * GRID_STEP.x,
            GRID_ORIGIN.y + (index / GRID_COLUMNS) as f32 * GRID_STEP.y,
        )
    }

    pub fn compute(&self, raw: &RawGraph, palette: &Palette) -> LayoutResult {
        let model = GraphModel::from_raw(raw);
        self.compute_model(&model, palette)
    }

    pub fn compute_model(&self, model: &GraphModel, palette: &Palette) -> LayoutResult {
        let positions = match self.layouter.execute(model) {
            Ok(positions) => positions,
            Err(e) => {
                tracing::warn!("{}; placing {} nodes on grid", e, model.node_count());
                HashMap::new()
            }
        };

        let converter = VisualConverter::new(palette, self.label_budget);
        let size = Vec2::new(NODE_WIDTH, NODE_HEIGHT);
        let mut fallback_count = 0;

        let nodes = model
            .nodes()
            .iter()
            .map(|node| {
                let position = match positions.get(&node.id) {
                    Some(pos) if pos.is_finite() => *pos,
                    _ => {
                        fallback_count += 1;
                        Self::grid_position(node.id.0)
                    }
                };
                converter.node(node, position, size)
            })
            .collect();

        if fallback_count > 0 {
            tracing::debug!("{} node(s) placed on fallback grid", fallback_count);
        }

        let edges = model
            .edges()
            .iter()
            .enumerate()
            .map(|(idx, edge)| converter.edge(idx, edge))
            .collect();

        LayoutResult {
            nodes,
            edges,
            fallback_count,
        }
    }
}
