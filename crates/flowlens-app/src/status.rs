use crate::error::FetchError;
use flowlens_core::{NodeKind, RawGraph};
use flowlens_events::StatusLevel;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;

pub const LOADING_GRAPH: &str = "Loading graph...";
pub const EMPTY_GRAPH: &str =
    "No graph data found for this function. Try only the function name (for example: exception).";
pub const NO_ACTIVE_SESSION: &str = "No active repository session. Load a repository first.";
pub const FUNCTION_NAME_REQUIRED: &str = "Function name is required.";
pub const MISSING_FILE_CONTEXT: &str = "Missing file context. Open a file from the sidebar.";

/// User-facing status line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusMessage {
    pub level: StatusLevel,
    pub text: String,
}

impl StatusMessage {
    pub fn info(text: impl Into<String>) -> Self {
        Self {
            level: StatusLevel::Info,
            text: text.into(),
        }
    }

    pub fn success(text: impl Into<String>) -> Self {
        Self {
            level: StatusLevel::Success,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            level: StatusLevel::Error,
            text: text.into(),
        }
    }

    pub fn loading() -> Self {
        Self::info(LOADING_GRAPH)
    }

    /// Outcome line for a freshly loaded graph.
    pub fn for_graph(graph: &RawGraph) -> Self {
        if graph.is_empty() {
            Self::info(EMPTY_GRAPH)
        } else {
            Self::success(format!(
                "Loaded {} node(s) and {} edge(s).",
                graph.node_count(),
                graph.edge_count()
            ))
        }
    }

    /// Cancellation yields no status at all.
    pub fn for_error(err: &FetchError) -> Option<Self> {
        if err.is_canceled() {
            None
        } else {
            Some(Self::error(err.to_string()))
        }
    }

    pub fn is_error(&self) -> bool {
        self.level == StatusLevel::Error
    }
}

impl fmt::Display for StatusMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Distinct files (first-seen order) and function ids of a graph.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GraphSummary {
    pub files: Vec<String>,
    pub functions: Vec<String>,
}

impl GraphSummary {
    pub fn from_graph(graph: &RawGraph) -> Self {
        let mut seen = HashSet::new();
        let files = graph
            .nodes
            .iter()
            .filter_map(|node| node.file.as_deref())
            .filter(|file| !file.is_empty() && seen.insert(*file))
            .map(str::to_string)
            .collect();
        let functions = graph
            .nodes
            .iter()
            .filter(|node| node.kind == NodeKind::FUNCTION)
            .map(|node| node.id.clone())
            .collect();
        Self { files, functions }
    }
}
