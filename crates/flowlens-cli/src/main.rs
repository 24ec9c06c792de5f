use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use flowlens_app::{GetOptions, GraphViewStore, GraphViewer, HttpBackend, ViewerSettings};
use flowlens_core::RawGraph;
use flowlens_events::EventBus;
use flowlens_graph::{LayoutEngine, Palette};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Settings file (defaults to the platform config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Lay out a graph JSON file and print the styled projection
    Layout {
        /// Path to a `{nodes, edges}` graph document
        graph: PathBuf,

        /// Backend id of a node to collapse (repeatable)
        #[arg(long)]
        collapse: Vec<String>,

        /// Backend id of the hovered node
        #[arg(long)]
        hover: Option<String>,

        /// Print the plain-text fallback listing instead of JSON
        #[arg(long)]
        fallback: bool,
    },

    /// Fetch a function's call graph from the analysis backend
    Fetch {
        #[arg(long)]
        session: String,

        #[arg(long)]
        function: String,

        /// Backend base URL, overriding the settings file
        #[arg(long)]
        backend: Option<String>,

        /// Bypass the graph cache
        #[arg(long)]
        force: bool,
    },

    /// Write the effective settings to a file for editing
    Init {
        /// Destination (defaults to --config, then the platform config directory)
        #[arg(long)]
        path: Option<PathBuf>,
    },
}

fn layout(
    settings: &ViewerSettings,
    graph: &Path,
    collapse: &[String],
    hover: Option<&str>,
    fallback: bool,
) -> Result<()> {
    let text = std::fs::read_to_string(graph)
        .with_context(|| format!("Failed to read graph file {:?}", graph))?;
    let raw = RawGraph::from_json(&text).context("Failed to parse graph file")?;

    let engine = LayoutEngine::default().with_label_budget(settings.label_budget);
    let palette = Palette::resolve(&settings.palette);
    let mut store = GraphViewStore::new(engine, palette, EventBus::new())
        .with_fallback_cap(settings.fallback_label_cap);
    store.load_graph(raw);

    for raw_id in collapse {
        match store.resolve_id(raw_id) {
            Some(id) => {
                store.toggle_collapse(id);
            }
            None => tracing::warn!("Cannot collapse unknown node '{}'", raw_id),
        }
    }
    if let Some(raw_id) = hover {
        match store.resolve_id(raw_id) {
            Some(id) => store.set_hover(Some(id)),
            None => tracing::warn!("Cannot hover unknown node '{}'", raw_id),
        }
    }

    if fallback {
        print!("{}", store.fallback_listing().render_text());
    } else {
        println!("{}", serde_json::to_string_pretty(store.styled())?);
    }
    Ok(())
}

async fn fetch(
    settings: &ViewerSettings,
    session: String,
    function: &str,
    backend_url: Option<String>,
    force: bool,
) -> Result<()> {
    let base_url = backend_url.unwrap_or_else(|| settings.backend_url.clone());
    let backend = HttpBackend::new(base_url, settings.request_timeout())
        .context("Failed to create HTTP client")?;

    let viewer = GraphViewer::new(Arc::new(backend), settings);
    viewer.set_session(Some(session));

    let outcome = viewer
        .load_graph(
            function,
            GetOptions {
                force_refresh: force,
            },
        )
        .await;

    if let Some(status) = viewer.status() {
        println!("{}", status);
    }
    outcome.with_context(|| format!("Failed to load graph for '{}'", function))?;

    let summary = viewer.summary();
    if !summary.files.is_empty() {
        println!("Files: {}", summary.files.join(", "));
    }
    println!("{}", serde_json::to_string_pretty(&viewer.snapshot())?);
    Ok(())
}

fn init(settings: &ViewerSettings, path: Option<PathBuf>) -> Result<()> {
    let path = match path {
        Some(path) => path,
        None => ViewerSettings::default_path()?,
    };
    settings
        .save_to(&path)
        .with_context(|| format!("Failed to write settings to {:?}", path))?;
    println!("Settings written to {}", path.display());
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    let settings = ViewerSettings::load(args.config.as_deref()).unwrap_or_else(|e| {
        tracing::warn!("{}; using default settings", e);
        ViewerSettings::default()
    });

    match args.command {
        Command::Layout {
            graph,
            collapse,
            hover,
            fallback,
        } => layout(&settings, &graph, &collapse, hover.as_deref(), fallback),
        Command::Fetch {
            session,
            function,
            backend,
            force,
        } => fetch(&settings, session, &function, backend, force).await,
        Command::Init { path } => init(&settings, path.or(args.config)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_args_parse() {
        let args = Args::try_parse_from([
            "flowlens",
            "layout",
            "graph.json",
            "--collapse",
            "a",
            "--collapse",
            "b",
            "--hover",
            "c",
        ])
        .unwrap();
        match args.command {
            Command::Layout {
                collapse, hover, fallback, ..
            } => {
                assert_eq!(collapse, vec!["a", "b"]);
                assert_eq!(hover.as_deref(), Some("c"));
                assert!(!fallback);
            }
            _ => panic!("Expected layout command"),
        }
    }

    #[test]
    fn test_fetch_requires_session_and_function() {
        assert!(Args::try_parse_from(["flowlens", "fetch", "--function", "foo"]).is_err());
        let args = Args::try_parse_from([
            "flowlens",
            "fetch",
            "--session",
            "s1",
            "--function",
            "foo",
            "--force",
        ])
        .unwrap();
        assert!(matches!(args.command, Command::Fetch { force: true, .. }));
    }

    #[test]
    fn test_layout_command_prints_projection() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("graph.json");
        std::fs::write(
            &path,
            r#"{"nodes":[{"id":"a","type":"function"},{"id":"b","type":"file"}],"edges":[{"source":"a","target":"b","type":"calls"}]}"#,
        )
        .unwrap();

        let settings = ViewerSettings::default();
        layout(&settings, &path, &["a".to_string()], Some("missing"), true).unwrap();
        assert!(layout(&settings, &dir.path().join("absent.json"), &[], None, false).is_err());
    }

    #[test]
    fn test_init_writes_loadable_settings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flowlens").join("settings.json");
        let settings = ViewerSettings {
            label_budget: 24,
            ..ViewerSettings::default()
        };

        init(&settings, Some(path.clone())).unwrap();
        assert_eq!(ViewerSettings::load_from(&path).unwrap(), settings);
    }
}
