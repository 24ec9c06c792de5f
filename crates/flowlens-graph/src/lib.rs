pub mod converter;
pub mod fallback;
pub mod graph;
pub mod highlight;
pub mod layout;
pub mod style;
pub mod visibility;

pub use converter::{DEFAULT_LABEL_BUDGET, VisualConverter, format_label};
pub use fallback::{DEFAULT_FALLBACK_CAP, FallbackView};
pub use graph::{GraphModel, ModelEdge, ModelNode, Vec2, VisualEdge, VisualNode};
pub use highlight::{HighlightEngine, StyledGraph};
pub use layout::{LayeredLayouter, LayoutEngine, LayoutError, LayoutResult, Layouter};
pub use style::{
    Color, ColorParseError, EdgeStyle, NodeStyle, NoTheme, Palette, PaletteToken, ThemeSource,
    get_edge_style, get_kind_marker, get_node_style,
};
pub use visibility::{CollapsedSet, VisibilityEngine, VisibleGraph};
