use crate::backend::{Explanation, FileContent, GraphBackend};
use crate::error::FetchError;
use crate::fetch_cache::{GetOptions, GraphFetchCache};
use crate::render_health::{MonitorConfig, MountObserver, RenderHealth, RenderHealthMonitor};
use crate::settings::ViewerSettings;
use crate::slots::{FetchSlot, SlotGuard};
use crate::status::{
    FUNCTION_NAME_REQUIRED, GraphSummary, MISSING_FILE_CONTEXT, NO_ACTIVE_SESSION, StatusMessage,
};
use crate::view_store::GraphViewStore;
use crossbeam_channel::Receiver;
use flowlens_core::InternalId;
use flowlens_events::{Event, EventBus};
use flowlens_graph::{FallbackView, LayoutEngine, Palette, StyledGraph, ThemeSource};
use parking_lot::Mutex;
use std::sync::Arc;

/// Headless controller for the graph viewer.
///
/// Owns the fetch cache, the per-slot request bookkeeping, the view store and
/// the render monitor. Hosts drive it through these methods and subscribe to
/// [`Event`]s.
#[derive(Clone)]
pub struct GraphViewer {
    cache: GraphFetchCache,
    slots: SlotGuard,
    store: Arc<Mutex<GraphViewStore>>,
    bus: EventBus,
    session: Arc<Mutex<Option<String>>>,
    status: Arc<Mutex<Option<StatusMessage>>>,
    observer: Option<Arc<dyn MountObserver>>,
    monitor: Arc<Mutex<Option<RenderHealthMonitor>>>,
    monitor_config: MonitorConfig,
}

impl GraphViewer {
    pub fn new(backend: Arc<dyn GraphBackend>, settings: &ViewerSettings) -> Self {
        let bus = EventBus::new();
        let palette = Palette::resolve(&settings.palette);
        let engine = LayoutEngine::default().with_label_budget(settings.label_budget);
        let store = GraphViewStore::new(engine, palette, bus.clone())
            .with_fallback_cap(settings.fallback_label_cap);

        Self {
            cache: GraphFetchCache::new(backend),
            slots: SlotGuard::new(),
            store: Arc::new(Mutex::new(store)),
            bus,
            session: Arc::new(Mutex::new(None)),
            status: Arc::new(Mutex::new(None)),
            observer: None,
            monitor: Arc::new(Mutex::new(None)),
            monitor_config: settings.monitor_config(),
        }
    }

    /// Enable render-health monitoring against `observer` for each committed graph.
    pub fn with_mount_observer(mut self, observer: Arc<dyn MountObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn events(&self) -> Receiver<Event> {
        self.bus.receiver()
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn cache(&self) -> &GraphFetchCache {
        &self.cache
    }

    pub fn slots(&self) -> &SlotGuard {
        &self.slots
    }

    // ------------------------------------------------------------------
    // Session
    // ------------------------------------------------------------------

    pub fn session(&self) -> Option<String> {
        self.session.lock().clone()
    }

    /// Switch to `session_id` (or none). Cached graphs and in-flight requests
    /// belong to the old session and are dropped.
    pub fn set_session(&self, session_id: Option<String>) {
        let changed = {
            let mut current = self.session.lock();
            if *current == session_id {
                false
            } else {
                *current = session_id;
                true
            }
        };
        if changed {
            self.session_changed();
        }
    }

    /// The backend reset the current session in place.
    pub fn reset_session(&self) {
        self.session_changed();
    }

    fn session_changed(&self) {
        self.slots.cancel_all();
        let entries = self.cache.on_session_changed();
        self.bus.publish(Event::CacheCleared { entries });
    }

    fn require_session(&self) -> Result<String, FetchError> {
        self.session
            .lock()
            .clone()
            .ok_or_else(|| FetchError::InvalidRequest(NO_ACTIVE_SESSION.to_string()))
    }

    fn require_value(value: &str, message: &str) -> Result<String, FetchError> {
        let value = value.trim();
        if value.is_empty() {
            Err(FetchError::InvalidRequest(message.to_string()))
        } else {
            Ok(value.to_string())
        }
    }

    // ------------------------------------------------------------------
    // Status
    // ------------------------------------------------------------------

    pub fn status(&self) -> Option<StatusMessage> {
        self.status.lock().clone()
    }

    fn set_status(&self, status: StatusMessage) {
        *self.status.lock() = Some(status.clone());
        self.bus.publish(Event::StatusUpdate {
            level: status.level,
            message: status.text,
        });
    }

    fn report<T>(&self, result: Result<T, FetchError>) -> Result<T, FetchError> {
        if let Err(err) = &result {
            if let Some(status) = StatusMessage::for_error(err) {
                self.set_status(status);
            }
        }
        result
    }

    // ------------------------------------------------------------------
    // Requests
    // ------------------------------------------------------------------

    /// Fetch and commit the call graph of `function_name`. Returns the new
    /// view generation.
    pub async fn load_graph(
        &self,
        function_name: &str,
        options: GetOptions,
    ) -> Result<u64, FetchError> {
        let prepared = self.require_session().and_then(|session_id| {
            Self::require_value(function_name, FUNCTION_NAME_REQUIRED)
                .map(|name| (session_id, name))
        });
        let (session_id, name) = match prepared {
            Ok(values) => values,
            Err(err) => return self.report(Err(err)),
        };

        self.set_status(StatusMessage::loading());
        let ticket = self.slots.begin(FetchSlot::GraphLoad);
        let result = ticket.run(self.cache.get(&session_id, &name, options)).await;

        let committed = self.slots.complete(&ticket, result, |fetched| {
            let raw = self.cache.commit(fetched);
            let status = StatusMessage::for_graph(&raw);
            let generation = self.store.lock().load_graph(raw);
            self.set_status(status);
            self.restart_monitor();
            generation
        });
        self.report(committed)
    }

    pub async fn explain_function(
        &self,
        function_name: &str,
    ) -> Result<Explanation, FetchError> {
        let prepared = self.require_session().and_then(|session_id| {
            Self::require_value(function_name, FUNCTION_NAME_REQUIRED)
                .map(|name| (session_id, name))
        });
        let (session_id, name) = match prepared {
            Ok(values) => values,
            Err(err) => return self.report(Err(err)),
        };

        let backend = self.cache.backend();
        let result = self
            .slots
            .run(
                FetchSlot::Explanation,
                backend.explain_function(&session_id, &name),
                |explanation| explanation,
            )
            .await;
        self.report(result)
    }

    pub async fn read_file(&self, path: &str) -> Result<FileContent, FetchError> {
        let prepared = self.require_session().and_then(|session_id| {
            Self::require_value(path, MISSING_FILE_CONTEXT).map(|path| (session_id, path))
        });
        let (session_id, path) = match prepared {
            Ok(values) => values,
            Err(err) => return self.report(Err(err)),
        };

        let backend = self.cache.backend();
        let result = self
            .slots
            .run(
                FetchSlot::FileContent,
                backend.read_file(&session_id, &path),
                |content| content,
            )
            .await;
        self.report(result)
    }

    /// Index the current session's repository. Cached graphs predate the new
    /// index and are dropped on success.
    pub async fn index_repository(&self) -> Result<serde_json::Value, FetchError> {
        let session_id = match self.require_session() {
            Ok(session_id) => session_id,
            Err(err) => return self.report(Err(err)),
        };

        let backend = self.cache.backend();
        let result = self
            .slots
            .run(
                FetchSlot::IndexRepository,
                backend.index_repository(&session_id),
                |report| {
                    let entries = self.cache.clear();
                    self.bus.publish(Event::CacheCleared { entries });
                    report
                },
            )
            .await;
        self.report(result)
    }

    /// Tear down: cancel every in-flight request and stop the render monitor.
    pub fn close(&self) {
        self.slots.cancel_all();
        if let Some(monitor) = self.monitor.lock().take() {
            monitor.stop();
        }
    }

    // ------------------------------------------------------------------
    // Render health
    // ------------------------------------------------------------------

    /// Tear down the monitor of the previous node set and, when the current
    /// one has nodes to mount, poll the host for it.
    fn restart_monitor(&self) {
        let Some(observer) = self.observer.clone() else {
            return;
        };
        let mut current = self.monitor.lock();
        if let Some(previous) = current.take() {
            previous.stop();
        }

        let (epoch, expects_mount) = {
            let store = self.store.lock();
            (store.epoch(), store.expects_mount())
        };
        if !expects_mount {
            return;
        }

        let monitor = RenderHealthMonitor::spawn(observer, self.monitor_config, epoch);
        let mut rx = monitor.subscribe();
        let store = self.store.clone();
        tokio::spawn(async move {
            let verdict = rx
                .wait_for(RenderHealth::is_settled)
                .await
                .map(|state| *state);
            if let Ok(health) = verdict {
                store.lock().set_render_health(epoch, health);
            }
        });
        *current = Some(monitor);
    }

    /// Verdict of the running monitor, `None` when nothing is being watched.
    pub fn monitor_status(&self) -> Option<RenderHealth> {
        self.monitor.lock().as_ref().map(RenderHealthMonitor::status)
    }

    pub fn render_health(&self) -> RenderHealth {
        self.store.lock().render_health()
    }

    pub fn fallback_view(&self) -> Option<FallbackView> {
        self.store.lock().fallback_view()
    }

    // ------------------------------------------------------------------
    // View interaction
    // ------------------------------------------------------------------

    pub fn with_store<R>(&self, f: impl FnOnce(&mut GraphViewStore) -> R) -> R {
        f(&mut self.store.lock())
    }

    pub fn snapshot(&self) -> StyledGraph {
        self.store.lock().styled().clone()
    }

    pub fn summary(&self) -> GraphSummary {
        GraphSummary::from_graph(self.store.lock().raw())
    }

    pub fn toggle_collapse(&self, id: InternalId) -> Option<bool> {
        let collapsed = self.store.lock().toggle_collapse(id)?;
        self.restart_monitor();
        Some(collapsed)
    }

    pub fn set_hover(&self, id: Option<InternalId>) {
        self.store.lock().set_hover(id);
    }

    /// Re-resolve the palette from the host theme.
    pub fn apply_theme(&self, theme: &dyn ThemeSource) {
        let changed = self.store.lock().set_palette(Palette::resolve(theme));
        if changed {
            self.restart_monitor();
        }
    }
}
