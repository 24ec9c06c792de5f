use crate::render_health::RenderHealth;
use flowlens_core::{InternalId, RawGraph};
use flowlens_events::{Event, EventBus};
use flowlens_graph::{
    CollapsedSet, DEFAULT_FALLBACK_CAP, FallbackView, HighlightEngine, LayoutEngine, LayoutResult,
    Palette, StyledGraph, VisibilityEngine, VisibleGraph,
};

/// Interactive state of the graph view and its derived projections.
///
/// Every transition recomputes the projections from the committed
/// `RawGraph` plus the current toggles, so readers never see a mix of two
/// generations.
pub struct GraphViewStore {
    engine: LayoutEngine,
    bus: EventBus,
    fallback_cap: usize,

    generation: u64,
    // Bumped whenever the committed node set is replaced or restyled.
    epoch: u64,
    raw: RawGraph,
    palette: Palette,
    collapsed: CollapsedSet,
    hovered: Option<InternalId>,
    render_health: RenderHealth,

    // Derived
    layout: LayoutResult,
    visible: VisibleGraph,
    styled: StyledGraph,
}

impl GraphViewStore {
    pub fn new(engine: LayoutEngine, palette: Palette, bus: EventBus) -> Self {
        Self {
            engine,
            bus,
            fallback_cap: DEFAULT_FALLBACK_CAP,
            generation: 0,
            epoch: 0,
            raw: RawGraph::default(),
            palette,
            collapsed: CollapsedSet::default(),
            hovered: None,
            render_health: RenderHealth::Pending,
            layout: LayoutResult::default(),
            visible: VisibleGraph::default(),
            styled: StyledGraph::default(),
        }
    }

    pub fn with_fallback_cap(mut self, cap: usize) -> Self {
        self.fallback_cap = cap;
        self
    }

    /// Commit a new graph. Collapse and hover state start over.
    pub fn load_graph(&mut self, raw: RawGraph) -> u64 {
        self.generation += 1;
        self.raw = raw;
        self.hovered = None;
        self.layout = self.engine.compute(&self.raw, &self.palette);
        self.collapsed = CollapsedSet::new(self.layout.nodes.len());
        self.recompute_visibility();
        self.next_epoch();

        tracing::debug!(
            "Graph generation {} committed with {} node(s), {} edge(s)",
            self.generation,
            self.layout.nodes.len(),
            self.layout.edges.len()
        );
        self.bus.publish(Event::GraphLoaded {
            generation: self.generation,
            node_count: self.layout.nodes.len(),
            edge_count: self.layout.edges.len(),
        });
        self.generation
    }

    /// Flip the collapse state of `id`; `None` when the id is not part of the
    /// current graph.
    pub fn toggle_collapse(&mut self, id: InternalId) -> Option<bool> {
        let collapsed = self.collapsed.toggle(id)?;
        self.recompute_visibility();
        self.next_epoch();
        self.bus.publish(Event::NodeToggled { id, collapsed });
        Some(collapsed)
    }

    pub fn set_hover(&mut self, id: Option<InternalId>) {
        if self.hovered == id {
            return;
        }
        self.hovered = id;
        self.recompute_highlight();
        self.bus.publish(Event::HoverChanged { id });
    }

    /// Swap the palette and rebuild every embedded style. Returns `false`
    /// when the palette is unchanged.
    pub fn set_palette(&mut self, palette: Palette) -> bool {
        if self.palette == palette {
            return false;
        }
        self.palette = palette;
        self.layout = self.engine.compute(&self.raw, &self.palette);
        self.recompute_visibility();
        self.next_epoch();
        self.bus.publish(Event::ThemeChanged);
        true
    }

    /// Record the mount verdict for the node set committed at `epoch`.
    /// Verdicts for older epochs are ignored.
    pub fn set_render_health(&mut self, epoch: u64, health: RenderHealth) -> bool {
        if epoch != self.epoch || self.render_health == health {
            return false;
        }
        self.render_health = health;
        if health.is_settled() {
            self.bus.publish(Event::RenderHealthChanged {
                generation: self.generation,
                mounted: health == RenderHealth::Healthy,
            });
        }
        true
    }

    fn next_epoch(&mut self) {
        self.epoch += 1;
        self.render_health = RenderHealth::Pending;
    }

    fn recompute_visibility(&mut self) {
        self.visible =
            VisibilityEngine::apply(&self.layout.nodes, &self.layout.edges, &self.collapsed);
        self.recompute_highlight();
    }

    fn recompute_highlight(&mut self) {
        self.styled =
            HighlightEngine::apply(&self.visible, &self.collapsed, self.hovered, &self.palette);
    }

    /// Look up a node of the current graph by its backend id.
    pub fn resolve_id(&self, raw_id: &str) -> Option<InternalId> {
        self.layout
            .nodes
            .iter()
            .find(|node| node.raw_id == raw_id)
            .map(|node| node.internal_id)
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// Whether the committed node set has anything for the host to mount.
    pub fn expects_mount(&self) -> bool {
        !self.visible.nodes.is_empty()
    }

    pub fn raw(&self) -> &RawGraph {
        &self.raw
    }

    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    pub fn collapsed(&self) -> &CollapsedSet {
        &self.collapsed
    }

    pub fn hovered(&self) -> Option<InternalId> {
        self.hovered
    }

    pub fn render_health(&self) -> RenderHealth {
        self.render_health
    }

    pub fn layout(&self) -> &LayoutResult {
        &self.layout
    }

    pub fn visible(&self) -> &VisibleGraph {
        &self.visible
    }

    pub fn styled(&self) -> &StyledGraph {
        &self.styled
    }

    /// Text listing of the current graph.
    pub fn fallback_listing(&self) -> FallbackView {
        FallbackView::with_cap(&self.layout.nodes, &self.layout.edges, self.fallback_cap)
    }

    /// The listing to show instead of the canvas, once mounting has failed.
    pub fn fallback_view(&self) -> Option<FallbackView> {
        (self.render_health == RenderHealth::Unhealthy).then(|| self.fallback_listing())
    }
}
