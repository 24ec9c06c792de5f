use crate::backend::GraphBackend;
use crate::error::FetchError;
use flowlens_core::RawGraph;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GetOptions {
    pub force_refresh: bool,
}

impl GetOptions {
    pub fn refresh() -> Self {
        Self {
            force_refresh: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    session_id: String,
    function_name: String,
}

impl CacheKey {
    fn new(session_id: &str, function_name: &str) -> Self {
        Self {
            session_id: session_id.to_string(),
            function_name: normalize_function_name(function_name),
        }
    }
}

/// Case-insensitive, whitespace-trimmed lookup name.
pub fn normalize_function_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Result of [`GraphFetchCache::get`], pending [`GraphFetchCache::commit`].
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedGraph {
    key: CacheKey,
    graph: RawGraph,
    fresh: bool,
}

impl FetchedGraph {
    pub fn graph(&self) -> &RawGraph {
        &self.graph
    }

    /// Whether this came from the backend rather than the cache.
    pub fn is_fresh(&self) -> bool {
        self.fresh
    }
}

/// Session-scoped cache of fetched graphs.
///
/// Entries live until the next [`clear`](Self::clear); there is no per-entry
/// eviction. Concurrent writers for the same key are last-writer-wins.
#[derive(Clone)]
pub struct GraphFetchCache {
    backend: Arc<dyn GraphBackend>,
    entries: Arc<Mutex<HashMap<CacheKey, RawGraph>>>,
}

impl GraphFetchCache {
    pub fn new(backend: Arc<dyn GraphBackend>) -> Self {
        Self {
            backend,
            entries: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn backend(&self) -> &Arc<dyn GraphBackend> {
        &self.backend
    }

    pub fn contains(&self, session_id: &str, function_name: &str) -> bool {
        self.entries
            .lock()
            .contains_key(&CacheKey::new(session_id, function_name))
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Look up or fetch the graph for `function_name`. A fresh fetch is not
    /// stored until it is handed back to [`commit`](Self::commit).
    pub async fn get(
        &self,
        session_id: &str,
        function_name: &str,
        options: GetOptions,
    ) -> Result<FetchedGraph, FetchError> {
        let key = CacheKey::new(session_id, function_name);

        if !options.force_refresh {
            if let Some(cached) = self.entries.lock().get(&key).cloned() {
                tracing::debug!("Graph cache hit for '{}'", key.function_name);
                return Ok(FetchedGraph {
                    key,
                    graph: cached,
                    fresh: false,
                });
            }
        }

        let graph = self
            .backend
            .fetch_graph(session_id, function_name.trim())
            .await?;
        Ok(FetchedGraph {
            key,
            graph,
            fresh: true,
        })
    }

    /// Store a fresh fetch and return its graph. Call only for results that
    /// are being applied.
    pub fn commit(&self, fetched: FetchedGraph) -> RawGraph {
        if fetched.fresh {
            self.entries
                .lock()
                .insert(fetched.key, fetched.graph.clone());
        }
        fetched.graph
    }

    /// Drop every entry. Returns how many were removed.
    pub fn clear(&self) -> usize {
        let mut entries = self.entries.lock();
        let removed = entries.len();
        entries.clear();
        removed
    }

    /// Hook for session create/switch/reset/close.
    pub fn on_session_changed(&self) -> usize {
        let removed = self.clear();
        tracing::debug!("Session changed; cleared {} cached graph(s)", removed);
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{BoxFuture, Explanation, FileContent};
    use flowlens_core::{GraphNode, NodeKind};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingBackend {
        calls: AtomicUsize,
    }

    impl GraphBackend for CountingBackend {
        fn fetch_graph<'a>(
            &'a self,
            _session_id: &'a str,
            function_name: &'a str,
        ) -> BoxFuture<'a, Result<RawGraph, FetchError>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let graph = RawGraph::new(
                vec![GraphNode {
                    id: format!("mod.py:{function_name}:1"),
                    kind: NodeKind::FUNCTION,
                    file: Some("mod.py".into()),
                }],
                vec![],
            );
            Box::pin(async move { Ok(graph) })
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

    fn cache() -> (GraphFetchCache, Arc<CountingBackend>) {
        let backend = Arc::new(CountingBackend::default());
        (GraphFetchCache::new(backend.clone()), backend)
    }

    async fn load(cache: &GraphFetchCache, session_id: &str, name: &str, options: GetOptions) {
        let fetched = cache.get(session_id, name, options).await.unwrap();
        cache.commit(fetched);
    }

    #[tokio::test]
    async fn test_second_get_hits_cache() {
        let (cache, backend) = cache();
        load(&cache, "session1", "foo", GetOptions::default()).await;
        load(&cache, "session1", "foo", GetOptions::default()).await;
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_force_refresh_always_fetches() {
        let (cache, backend) = cache();
        load(&cache, "session1", "foo", GetOptions::refresh()).await;
        load(&cache, "session1", "foo", GetOptions::refresh()).await;
        assert_eq!(backend.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_key_ignores_case_and_whitespace_but_not_session() {
        let (cache, backend) = cache();
        load(&cache, "session1", "Foo", GetOptions::default()).await;
        load(&cache, "session1", "  foo ", GetOptions::default()).await;
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);

        load(&cache, "session2", "foo", GetOptions::default()).await;
        assert_eq!(backend.calls.load(Ordering::SeqCst), 2);
        assert!(cache.contains("session2", "FOO"));
    }

    #[tokio::test]
    async fn test_session_change_clears_everything() {
        let (cache, backend) = cache();
        load(&cache, "session1", "foo", GetOptions::default()).await;
        load(&cache, "session1", "bar", GetOptions::default()).await;

        assert_eq!(cache.on_session_changed(), 2);
        assert!(cache.is_empty());

        load(&cache, "session1", "foo", GetOptions::default()).await;
        assert_eq!(backend.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_uncommitted_fetch_is_not_cached() {
        let (cache, backend) = cache();
        let fetched = cache.get("session1", "foo", GetOptions::default()).await.unwrap();
        assert!(fetched.is_fresh());
        drop(fetched);
        assert!(!cache.contains("session1", "foo"));

        load(&cache, "session1", "foo", GetOptions::default()).await;
        let cached = cache.get("session1", "foo", GetOptions::default()).await.unwrap();
        assert!(!cached.is_fresh());
        assert_eq!(cached.graph().nodes.len(), 1);
        assert_eq!(backend.calls.load(Ordering::SeqCst), 2);
    }
}
