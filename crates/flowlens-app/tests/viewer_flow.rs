use flowlens_app::{
    BoxFuture, Explanation, FetchError, FetchSlot, FileContent, GetOptions, GraphBackend,
    GraphViewer, MountObserver, RenderHealth, ViewerSettings,
};
use flowlens_core::{GraphEdge, GraphNode, NodeKind, RawGraph};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::oneshot;

/// Serves canned graphs; a fetch for a gated name waits until its gate opens.
#[derive(Default)]
struct ScriptedBackend {
    graphs: HashMap<String, RawGraph>,
    gates: Mutex<HashMap<String, oneshot::Receiver<()>>>,
    calls: AtomicUsize,
}

impl ScriptedBackend {
    fn with_graph(mut self, name: &str, graph: RawGraph) -> Self {
        self.graphs.insert(name.to_string(), graph);
        self
    }

    fn gate(&self, name: &str) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.gates.lock().insert(name.to_string(), rx);
        tx
    }
}

impl GraphBackend for ScriptedBackend {
    fn fetch_graph<'a>(
        &'a self,
        _session_id: &'a str,
        function_name: &'a str,
    ) -> BoxFuture<'a, Result<RawGraph, FetchError>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let gate = self.gates.lock().remove(function_name);
        let graph = self.graphs.get(function_name).cloned().unwrap_or_default();
        Box::pin(async move {
            if let Some(gate) = gate {
                let _ = gate.await;
            }
            Ok(graph)
        })
    }

    fn explain_function<'a>(
        &'a self,
        _session_id: &'a str,
        _function_name: &'a str,
    ) -> BoxFuture<'a, Result<Explanation, FetchError>> {
        Box::pin(async { Ok(Explanation::default()) })
    }

    fn read_file<'a>(
        &'a self,
        _session_id: &'a str,
        path: &'a str,
    ) -> BoxFuture<'a, Result<FileContent, FetchError>> {
        Box::pin(async move {
            Ok(FileContent {
                file_path: path.to_string(),
                content: String::new(),
            })
        })
    }

    fn index_repository<'a>(
        &'a self,
        _session_id: &'a str,
    ) -> BoxFuture<'a, Result<serde_json::Value, FetchError>> {
        Box::pin(async { Ok(serde_json::Value::Null) })
    }
}

struct DeadHost;

impl MountObserver for DeadHost {
    fn mounted_node_count(&self) -> usize {
        0
    }
}

/// Host whose mounted count is set by the test; counts every poll.
#[derive(Default)]
struct CountingHost {
    mounted: AtomicUsize,
    polls: AtomicUsize,
}

impl MountObserver for CountingHost {
    fn mounted_node_count(&self) -> usize {
        self.polls.fetch_add(1, Ordering::SeqCst);
        self.mounted.load(Ordering::SeqCst)
    }
}

fn chain(prefix: &str, len: usize) -> RawGraph {
    let id = |i: usize| format!("{prefix}.py:{prefix}_{i}:{i}");
    RawGraph::new(
        (0..len)
            .map(|i| GraphNode {
                id: id(i),
                kind: NodeKind::FUNCTION,
                file: Some(format!("{prefix}.py")),
            })
            .collect(),
        (1..len)
            .map(|i| GraphEdge {
                source: id(i - 1),
                target: id(i),
                relation: "calls".into(),
            })
            .collect(),
    )
}

#[tokio::test]
async fn superseded_load_is_never_applied() {
    let backend = Arc::new(
        ScriptedBackend::default()
            .with_graph("foo", chain("foo", 2))
            .with_graph("bar", chain("bar", 3)),
    );
    let foo_gate = backend.gate("foo");
    let viewer = GraphViewer::new(backend.clone(), &ViewerSettings::default());
    viewer.set_session(Some("s1".into()));

    let foo = tokio::spawn({
        let viewer = viewer.clone();
        async move { viewer.load_graph("foo", GetOptions::default()).await }
    });
    while backend.calls.load(Ordering::SeqCst) == 0 {
        tokio::task::yield_now().await;
    }

    let bar = viewer.load_graph("bar", GetOptions::default()).await;
    let _ = foo_gate.send(());
    let foo = tokio::time::timeout(Duration::from_secs(1), foo)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(bar, Ok(1));
    assert_eq!(foo, Err(FetchError::Canceled));
    assert_eq!(viewer.with_store(|store| store.raw().clone()), chain("bar", 3));
    assert_eq!(
        viewer.status().unwrap().text,
        "Loaded 3 node(s) and 2 edge(s)."
    );
    assert!(viewer.cache().contains("s1", "bar"));
    assert!(!viewer.cache().contains("s1", "foo"));
    assert!(!viewer.slots().in_flight(FetchSlot::GraphLoad));
}

#[tokio::test]
async fn cached_graph_is_reused_until_forced() {
    let backend = Arc::new(ScriptedBackend::default().with_graph("foo", chain("foo", 2)));
    let viewer = GraphViewer::new(backend.clone(), &ViewerSettings::default());
    viewer.set_session(Some("s1".into()));

    viewer.load_graph("foo", GetOptions::default()).await.unwrap();
    viewer.load_graph(" FOO ", GetOptions::default()).await.unwrap();
    assert_eq!(backend.calls.load(Ordering::SeqCst), 1);

    viewer.load_graph("foo", GetOptions::refresh()).await.unwrap();
    assert_eq!(backend.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test(start_paused = true)]
async fn unmounted_graph_switches_to_fallback_listing() {
    let backend = Arc::new(ScriptedBackend::default().with_graph("big", chain("big", 40)));
    let viewer = GraphViewer::new(backend, &ViewerSettings::default())
        .with_mount_observer(Arc::new(DeadHost));
    viewer.set_session(Some("s1".into()));

    viewer.load_graph("big", GetOptions::default()).await.unwrap();
    assert_eq!(viewer.render_health(), RenderHealth::Pending);
    assert!(viewer.fallback_view().is_none());

    for _ in 0..50 {
        if viewer.render_health().is_settled() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    assert_eq!(viewer.render_health(), RenderHealth::Unhealthy);
    let fallback = viewer.fallback_view().unwrap();
    assert_eq!(fallback.labels.len(), 30);
    assert_eq!(fallback.node_count, 40);
    assert_eq!(fallback.edge_count, 39);
    assert!(fallback.render_text().contains("... and 10 more"));
}

#[tokio::test]
async fn collapse_and_hover_flow_through_the_viewer() {
    let backend = Arc::new(ScriptedBackend::default().with_graph("foo", chain("foo", 4)));
    let viewer = GraphViewer::new(backend, &ViewerSettings::default());
    viewer.set_session(Some("s1".into()));
    viewer.load_graph("foo", GetOptions::default()).await.unwrap();

    let root = viewer
        .with_store(|store| store.resolve_id("foo.py:foo_1:1"))
        .unwrap();
    assert_eq!(viewer.toggle_collapse(root), Some(true));
    assert_eq!(viewer.snapshot().nodes.len(), 2);

    viewer.set_hover(Some(root));
    let styled = viewer.snapshot();
    assert!(styled.nodes.iter().all(|n| n.active));
    assert_eq!(styled.hovered, Some(root));

    assert_eq!(viewer.summary().files, vec!["foo.py"]);
}

#[tokio::test(start_paused = true)]
async fn empty_graph_is_not_watched_for_mounting() {
    let backend = Arc::new(ScriptedBackend::default());
    let host = Arc::new(CountingHost::default());
    let viewer = GraphViewer::new(backend, &ViewerSettings::default())
        .with_mount_observer(host.clone());
    viewer.set_session(Some("s1".into()));

    viewer.load_graph("nothing", GetOptions::default()).await.unwrap();
    tokio::time::sleep(Duration::from_secs(5)).await;

    assert_eq!(host.polls.load(Ordering::SeqCst), 0);
    assert_eq!(viewer.render_health(), RenderHealth::Pending);
    assert_eq!(viewer.monitor_status(), None);
    assert!(viewer.fallback_view().is_none());
    assert!(viewer.status().unwrap().text.starts_with("No graph data found"));
}

#[tokio::test(start_paused = true)]
async fn changed_node_set_is_watched_again() {
    let backend = Arc::new(ScriptedBackend::default().with_graph("foo", chain("foo", 3)));
    let host = Arc::new(CountingHost::default());
    host.mounted.store(3, Ordering::SeqCst);
    let viewer = GraphViewer::new(backend, &ViewerSettings::default())
        .with_mount_observer(host.clone());
    viewer.set_session(Some("s1".into()));

    viewer.load_graph("foo", GetOptions::default()).await.unwrap();
    tokio::time::sleep(Duration::from_secs(3)).await;
    assert_eq!(viewer.render_health(), RenderHealth::Healthy);
    assert_eq!(viewer.monitor_status(), Some(RenderHealth::Healthy));
    assert_eq!(host.polls.load(Ordering::SeqCst), 1);

    // Collapsing the root leaves a single node that the host never mounts.
    host.mounted.store(0, Ordering::SeqCst);
    let root = viewer
        .with_store(|store| store.resolve_id("foo.py:foo_0:0"))
        .unwrap();
    assert_eq!(viewer.toggle_collapse(root), Some(true));
    assert_eq!(viewer.render_health(), RenderHealth::Pending);

    tokio::time::sleep(Duration::from_secs(3)).await;
    assert_eq!(host.polls.load(Ordering::SeqCst), 21);
    assert_eq!(viewer.render_health(), RenderHealth::Unhealthy);
    assert_eq!(viewer.fallback_view().unwrap().node_count, 3);

    // A theme change restyles every node and is watched once more.
    host.mounted.store(1, Ordering::SeqCst);
    let theme = HashMap::from([("accent".to_string(), "#FF0000".to_string())]);
    viewer.apply_theme(&theme);
    assert_eq!(viewer.render_health(), RenderHealth::Pending);

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(host.polls.load(Ordering::SeqCst), 22);
    assert_eq!(viewer.render_health(), RenderHealth::Healthy);
}
