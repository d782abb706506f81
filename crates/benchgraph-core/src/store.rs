//! JSON persistence for graphs and task sets.

use crate::error::Result;
use crate::types::{Graph, Task};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;
use tracing::info;

/// Write a value as pretty JSON, creating parent directories.
pub fn save_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(path, json)?;
    Ok(())
}

/// Read a JSON file. `Ok(None)` when the file does not exist.
pub fn load_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    Ok(Some(serde_json::from_str(&content)?))
}

pub fn save_graph(path: &Path, graph: &Graph) -> Result<()> {
    save_json(path, graph)?;
    info!(
        path = %path.display(),
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        "graph saved"
    );
    Ok(())
}

/// Load a previously crawled graph, or `None` if it was never saved.
pub fn load_graph(path: &Path) -> Result<Option<Graph>> {
    let graph: Option<Graph> = load_json(path)?;
    match &graph {
        Some(g) => info!(
            path = %path.display(),
            nodes = g.node_count(),
            edges = g.edge_count(),
            "graph loaded"
        ),
        None => info!(path = %path.display(), "graph file not found"),
    }
    Ok(graph)
}

pub fn save_tasks(path: &Path, tasks: &[Task]) -> Result<()> {
    save_json(path, tasks)?;
    info!(path = %path.display(), tasks = tasks.len(), "tasks saved");
    Ok(())
}

pub fn load_tasks(path: &Path) -> Result<Vec<Task>> {
    Ok(load_json(path)?.unwrap_or_default())
}

/// Keep only tasks the paraphrasing step produced a query for.
pub fn retain_refined(tasks: Vec<Task>) -> Vec<Task> {
    tasks.into_iter().filter(Task::is_refined).collect()
}
