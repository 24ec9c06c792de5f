pub mod backend;
pub mod cancellation;
pub mod error;
pub mod fetch_cache;
pub mod render_health;
pub mod settings;
pub mod slots;
pub mod status;
pub mod view_store;
pub mod viewer;

pub use backend::{BoxFuture, Explanation, FileContent, GraphBackend, HttpBackend};
pub use cancellation::CancellationToken;
pub use error::{FetchError, SettingsError};
pub use fetch_cache::{FetchedGraph, GetOptions, GraphFetchCache, normalize_function_name};
pub use render_health::{
    MonitorConfig, MountObserver, MountProbe, RenderHealth, RenderHealthMonitor,
};
pub use settings::ViewerSettings;
pub use slots::{FetchSlot, SlotGuard, SlotTicket};
pub use status::{GraphSummary, StatusMessage};
pub use view_store::GraphViewStore;
pub use viewer::GraphViewer;
