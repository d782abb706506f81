//! End-to-end build: graph (cached or crawled), sampling, validation, persistence.

use crate::config::BuilderConfig;
use benchgraph_core::{store, Graph, Result, SchemaIndex, UsageCounter};
use benchgraph_crawl::{CrawlReport, GraphCrawler, NeighborVerdict};
use benchgraph_query::{QueryExecutor, QueryService};
use benchgraph_tasks::{ConstraintValidator, PathSampler};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// What a build produced.
#[derive(Debug, Clone, Serialize)]
pub struct BuildSummary {
    pub graph_nodes: usize,
    pub graph_edges: usize,
    /// False when the graph came from the cache.
    pub crawled: bool,
    pub candidates: usize,
    pub accepted: usize,
    pub rejected: usize,
    pub tasks_path: PathBuf,
}

/// Node/edge counts of a graph, per app and per domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GraphStats {
    pub nodes: usize,
    pub edges: usize,
    pub edges_per_app: BTreeMap<String, usize>,
    pub edges_per_domain: BTreeMap<String, usize>,
}

impl GraphStats {
    pub fn of(graph: &Graph) -> Self {
        Self {
            nodes: graph.node_count(),
            edges: graph.edge_count(),
            edges_per_app: owned_counts(graph.edges_per_app()),
            edges_per_domain: owned_counts(graph.edges_per_domain()),
        }
    }
}

fn owned_counts(counts: BTreeMap<&str, usize>) -> BTreeMap<String, usize> {
    counts.into_iter().map(|(k, v)| (k.to_string(), v)).collect()
}

pub struct Pipeline {
    config: BuilderConfig,
    schema: Arc<SchemaIndex>,
    executor: QueryExecutor,
}

impl Pipeline {
    pub fn new(config: BuilderConfig, schema: SchemaIndex, service: Arc<dyn QueryService>) -> Self {
        let executor = QueryExecutor::new(service).with_policy(config.retry_policy());
        Self {
            config,
            schema: Arc::new(schema),
            executor,
        }
    }

    pub fn config(&self) -> &BuilderConfig {
        &self.config
    }

    fn crawler(&self) -> GraphCrawler {
        GraphCrawler::new(
            self.schema.clone(),
            self.executor.clone(),
            self.config.crawl_config(),
        )
    }

    /// Crawl from the configured seed and save the graph, replacing any cache.
    pub async fn crawl(&self) -> Result<(Graph, CrawlReport)> {
        let run = &self.config.run;
        let (graph, report) = self.crawler().crawl(&run.seed_entity, &run.seed_label).await;
        store::save_graph(&self.config.graph_path(), &graph)?;
        Ok((graph, report))
    }

    /// The cached graph for this seed, or a fresh crawl. The seed node is
    /// relabelled either way. The flag is true when a crawl ran.
    pub async fn load_or_crawl(&self) -> Result<(Graph, bool)> {
        let run = &self.config.run;
        let (mut graph, crawled) = match store::load_graph(&self.config.graph_path())? {
            Some(graph) => (graph, false),
            None => (self.crawl().await?.0, true),
        };
        graph.relabel(&run.seed_entity, run.seed_label.as_str());
        Ok((graph, crawled))
    }

    /// Full pipeline. Writes the task file and the updated usage counts.
    pub async fn build(&self) -> Result<BuildSummary> {
        let (graph, crawled) = self.load_or_crawl().await?;

        let usage_path = self.config.usage_path();
        let mut usage = UsageCounter::load(&usage_path)?;

        let run = PathSampler::new(self.config.sample_config()).sample(&graph, &usage);
        let candidates = run.tasks.len();

        let validator = ConstraintValidator::new(
            self.schema.clone(),
            self.executor.clone(),
            self.config.validator_config(),
        );
        let validation = validator.validate(run.tasks, &mut usage).await;

        let tasks_path = self.config.tasks_path();
        store::save_tasks(&tasks_path, &validation.tasks)?;
        usage.save(&usage_path)?;

        let summary = BuildSummary {
            graph_nodes: graph.node_count(),
            graph_edges: graph.edge_count(),
            crawled,
            candidates,
            accepted: validation.tasks.len(),
            rejected: validation.rejected,
            tasks_path,
        };
        info!(
            nodes = summary.graph_nodes,
            candidates = summary.candidates,
            accepted = summary.accepted,
            "build complete"
        );
        Ok(summary)
    }

    /// Explain how the schema treats every neighbour of one entity.
    pub async fn inspect(&self, entity: &str) -> Vec<NeighborVerdict> {
        self.crawler().inspect(entity).await
    }
}
