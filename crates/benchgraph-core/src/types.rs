//! Core types for Benchgraph

use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// An entity discovered in the remote knowledge base.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    pub label: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub type_tag: Option<String>,
}

impl Node {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
            type_tag: None,
        }
    }

    pub fn with_type(mut self, type_tag: impl Into<String>) -> Self {
        self.type_tag = Some(type_tag.into());
        self
    }
}

/// A directed, app-annotated relation between two nodes.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Edge {
    #[serde(rename = "source")]
    pub source_id: String,
    #[serde(rename = "target")]
    pub target_id: String,
    pub app: String,
    pub domain: String,
    pub action_key: String,
    #[serde(rename = "action_desc")]
    pub action_description: String,
    #[serde(rename = "source_type")]
    pub source_entity_type: String,
    #[serde(rename = "target_type")]
    pub target_entity_type: String,
}

/// Outcome of [`Graph::add_node`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeInsert {
    Added,
    Existing,
    BudgetExhausted,
}

/// Directed multigraph. Grows monotonically; edges are append-only.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(into = "GraphFile", try_from = "GraphFile")]
pub struct Graph {
    nodes: Vec<Node>,
    index: HashMap<String, usize>,
    edges: Vec<Edge>,
    outgoing: HashMap<String, Vec<usize>>,
    max_nodes: Option<usize>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    /// A graph that refuses new nodes once `max_nodes` is reached.
    pub fn with_budget(max_nodes: usize) -> Self {
        Self {
            max_nodes: Some(max_nodes),
            ..Self::default()
        }
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_full(&self) -> bool {
        self.max_nodes.is_some_and(|max| self.nodes.len() >= max)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.index.get(id).map(|&i| &self.nodes[i])
    }

    /// Display label of a node, falling back to its id.
    pub fn label_of<'a>(&'a self, id: &'a str) -> &'a str {
        self.node(id).map(|n| n.label.as_str()).unwrap_or(id)
    }

    /// Nodes in insertion order.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Edges in insertion order.
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    pub fn add_node(&mut self, node: Node) -> NodeInsert {
        if self.index.contains_key(&node.id) {
            return NodeInsert::Existing;
        }
        if self.is_full() {
            return NodeInsert::BudgetExhausted;
        }
        self.index.insert(node.id.clone(), self.nodes.len());
        self.nodes.push(node);
        NodeInsert::Added
    }

    /// Overwrite a node's label. Returns false if the node is unknown.
    pub fn relabel(&mut self, id: &str, label: impl Into<String>) -> bool {
        match self.index.get(id) {
            Some(&i) => {
                self.nodes[i].label = label.into();
                true
            }
            None => false,
        }
    }

    /// Append an edge. Both endpoints must already be nodes.
    pub fn add_edge(&mut self, edge: Edge) -> Result<(), Error> {
        if !self.contains(&edge.source_id) || !self.contains(&edge.target_id) {
            return Err(Error::dangling_edge(&edge.source_id, &edge.target_id));
        }
        self.outgoing
            .entry(edge.source_id.clone())
            .or_default()
            .push(self.edges.len());
        self.edges.push(edge);
        Ok(())
    }

    /// Out-edges of `id`, parallel edges included, in insertion order.
    pub fn successors<'a>(&'a self, id: &str) -> impl Iterator<Item = &'a Edge> + 'a {
        self.outgoing
            .get(id)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
            .iter()
            .map(move |&i| &self.edges[i])
    }

    pub fn out_degree(&self, id: &str) -> usize {
        self.outgoing.get(id).map_or(0, Vec::len)
    }

    /// Edge counts grouped by app.
    pub fn edges_per_app(&self) -> BTreeMap<&str, usize> {
        let mut counts = BTreeMap::new();
        for e in &self.edges {
            *counts.entry(e.app.as_str()).or_insert(0) += 1;
        }
        counts
    }

    /// Edge counts grouped by domain.
    pub fn edges_per_domain(&self) -> BTreeMap<&str, usize> {
        let mut counts = BTreeMap::new();
        for e in &self.edges {
            *counts.entry(e.domain.as_str()).or_insert(0) += 1;
        }
        counts
    }
}

/// On-disk node-link shape of a [`Graph`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GraphFile {
    #[serde(default = "default_true")]
    pub directed: bool,
    #[serde(default = "default_true")]
    pub multigraph: bool,
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

fn default_true() -> bool {
    true
}

impl From<Graph> for GraphFile {
    fn from(graph: Graph) -> Self {
        Self {
            directed: true,
            multigraph: true,
            nodes: graph.nodes,
            edges: graph.edges,
        }
    }
}

impl TryFrom<GraphFile> for Graph {
    type Error = Error;

    fn try_from(file: GraphFile) -> Result<Self, Error> {
        let mut graph = Graph::new();
        for node in file.nodes {
            let id = node.id.clone();
            if graph.add_node(node) == NodeInsert::Existing {
                return Err(Error::DuplicateNode(id));
            }
        }
        for edge in file.edges {
            graph.add_edge(edge)?;
        }
        Ok(graph)
    }
}

/// One hop of a task path.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub step_idx: usize,
    pub from_id: String,
    pub to_id: String,
    pub from_label: String,
    pub to_label: String,
    pub domain: String,
    pub app: String,
    pub action_key: String,
    pub target_entity_type: String,
    #[serde(default)]
    pub context: BTreeMap<String, String>,
    #[serde(default)]
    pub description: String,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskMeta {
    pub complexity_score: usize,
    pub domains_used: Vec<String>,
    pub apps_used: Vec<String>,
}

/// A multi-hop benchmark task. Candidates carry an empty `task_id`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub task_id: String,
    pub start: String,
    pub end: String,
    pub path: Vec<Step>,
    pub meta: TaskMeta,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refined_query: Option<String>,
}

impl Task {
    /// Build a candidate from sampled steps. Meta is derived from the path.
    pub fn candidate(path: Vec<Step>) -> Self {
        let domains_used: Vec<String> = path.iter().map(|s| s.domain.clone()).collect();
        let apps_used: Vec<String> = path.iter().map(|s| s.app.clone()).collect();
        let distinct_domains = domains_used.iter().collect::<BTreeSet<_>>().len();
        let start = path.first().map(|s| s.from_label.clone()).unwrap_or_default();
        let end = path.last().map(|s| s.to_label.clone()).unwrap_or_default();
        Self {
            task_id: String::new(),
            start,
            end,
            meta: TaskMeta {
                complexity_score: path.len() + distinct_domains * 2,
                domains_used,
                apps_used,
            },
            path,
            refined_query: None,
        }
    }

    /// Node ids visited, start first.
    pub fn node_ids(&self) -> Vec<&str> {
        let mut ids = Vec::with_capacity(self.path.len() + 1);
        if let Some(first) = self.path.first() {
            ids.push(first.from_id.as_str());
        }
        ids.extend(self.path.iter().map(|s| s.to_id.as_str()));
        ids
    }

    pub fn distinct_apps(&self) -> usize {
        self.path.iter().map(|s| s.app.as_str()).collect::<BTreeSet<_>>().len()
    }

    /// True once the paraphrasing step produced a query for this task.
    pub fn is_refined(&self) -> bool {
        self.refined_query.as_deref().is_some_and(|q| !q.trim().is_empty())
    }
}
