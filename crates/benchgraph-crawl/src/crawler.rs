//! Graph crawler - bounded-fanout breadth-first expansion.
//!
//! The frontier is a FIFO queue processed in batches of `2 × workers`.
//! Each entity in a batch is fetched concurrently (forward and reverse
//! neighbour queries); the fetches return plain data and the coordinating
//! task merges them into the graph in dispatch order. Only the coordinator
//! touches the graph, the frontier and the crawl RNG, so the result is
//! reproducible for a fixed seed and a deterministic service.

use crate::branch::{accepted_branches, explain_rows, Branch, NeighborVerdict};
use crate::report::CrawlReport;
use benchgraph_core::{Direction, Graph, Node, NodeInsert, SchemaIndex, SeededRng};
use benchgraph_query::{Fetched, Query, QueryExecutor};
use futures::stream::{self, StreamExt};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Graphs smaller than this usually mean a bad seed or a schema that matches nothing.
const MIN_USEFUL_NODES: usize = 5;

#[derive(Clone, Debug)]
pub struct CrawlConfig {
    /// Concurrent entity fetches.
    pub workers: usize,
    /// Node budget.
    pub max_nodes: usize,
    /// Neighbours kept per expanded entity.
    pub max_branch: usize,
    /// Seed for the crawl-phase RNG.
    pub seed: u64,
    /// Pause between batches, to stay polite with public endpoints.
    pub batch_delay: Duration,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            workers: 5,
            max_nodes: 300,
            max_branch: 4,
            seed: 2025,
            batch_delay: Duration::from_millis(500),
        }
    }
}

/// Raw result of expanding one entity.
#[derive(Clone, Debug)]
pub struct EntityFetch {
    pub entity: String,
    pub forward: Fetched,
    pub reverse: Fetched,
}

impl EntityFetch {
    pub fn is_reachable(&self) -> bool {
        self.forward.is_reachable() && self.reverse.is_reachable()
    }

    pub fn is_rejected(&self) -> bool {
        self.forward.is_rejected() || self.reverse.is_rejected()
    }
}

pub struct GraphCrawler {
    schema: Arc<SchemaIndex>,
    executor: QueryExecutor,
    config: CrawlConfig,
    relations: Vec<String>,
    root_types: Vec<String>,
}

impl GraphCrawler {
    pub fn new(schema: Arc<SchemaIndex>, executor: QueryExecutor, config: CrawlConfig) -> Self {
        let relations = schema.relation_ids();
        let root_types = schema.all_root_types().iter().cloned().collect();
        Self {
            schema,
            executor,
            config,
            relations,
            root_types,
        }
    }

    pub fn config(&self) -> &CrawlConfig {
        &self.config
    }

    fn neighbor_query(&self, entity: &str, direction: Direction) -> Query {
        Query::neighbors(
            entity,
            direction,
            self.relations.clone(),
            self.root_types.clone(),
        )
    }

    /// Forward then reverse neighbours of one entity.
    pub async fn fetch_entity(&self, entity: String) -> EntityFetch {
        let forward = self
            .executor
            .execute(&self.neighbor_query(&entity, Direction::Forward))
            .await;
        let reverse = self
            .executor
            .execute(&self.neighbor_query(&entity, Direction::Reverse))
            .await;
        EntityFetch {
            entity,
            forward,
            reverse,
        }
    }

    /// Schema-accepted branches of a fetch, forward ones first.
    pub fn branches(&self, fetch: &EntityFetch) -> Vec<Branch> {
        let mut branches = Vec::new();
        for (direction, fetched) in [
            (Direction::Forward, &fetch.forward),
            (Direction::Reverse, &fetch.reverse),
        ] {
            if let Fetched::Rows(rows) = fetched {
                branches.extend(accepted_branches(&self.schema, &fetch.entity, direction, rows));
            }
        }
        branches
    }

    /// Crawl outward from `seed_id` until the frontier empties or the node
    /// budget is reached. Always returns a graph, however small.
    pub async fn crawl(&self, seed_id: &str, seed_label: &str) -> (Graph, CrawlReport) {
        info!(seed = seed_id, max_nodes = self.config.max_nodes, "crawl starting");
        let mut rng = SeededRng::for_phase(self.config.seed, "crawl");
        let mut graph = Graph::with_budget(self.config.max_nodes);
        let mut report = CrawlReport::default();

        // A node is enqueued exactly when it is added, so graph membership
        // doubles as the visited set.
        let mut frontier: VecDeque<String> = VecDeque::new();
        if graph.add_node(Node::new(seed_id, seed_label)) == NodeInsert::Added {
            frontier.push_back(seed_id.to_string());
        }

        let workers = self.config.workers.max(1);
        let batch_size = workers * 2;

        'crawl: while !frontier.is_empty() && !graph.is_full() {
            let batch: Vec<String> = (0..batch_size)
                .map_while(|_| frontier.pop_front())
                .collect();
            debug!(batch = batch.len(), queued = frontier.len(), "dispatching batch");

            let fetches: Vec<EntityFetch> = stream::iter(batch)
                .map(|entity| self.fetch_entity(entity))
                .buffered(workers)
                .collect()
                .await;

            for fetch in fetches {
                report.expanded += 1;
                let mut branches = self.branches(&fetch);
                if fetch.is_rejected() {
                    report.rejected.push(fetch.entity.clone());
                } else if !fetch.is_reachable() {
                    report.unreachable.push(fetch.entity.clone());
                } else if branches.is_empty() {
                    report.exhausted.push(fetch.entity.clone());
                }

                rng.shuffle(&mut branches);
                branches.truncate(self.config.max_branch);

                for branch in branches {
                    if graph.is_full() {
                        report.budget_reached = true;
                        break 'crawl;
                    }
                    report.branches_kept += 1;
                    let mut node = Node::new(&branch.neighbor_id, &branch.neighbor_label);
                    node.type_tag = branch.root_type.clone();
                    match graph.add_node(node) {
                        NodeInsert::Added => frontier.push_back(branch.neighbor_id.clone()),
                        NodeInsert::Existing => {}
                        NodeInsert::BudgetExhausted => {
                            report.budget_skipped += 1;
                            continue;
                        }
                    }
                    if let Err(e) = graph.add_edge(branch.to_edge(&fetch.entity)) {
                        warn!(entity = %fetch.entity, "edge dropped: {e}");
                    }
                }
            }

            info!(
                nodes = graph.node_count(),
                edges = graph.edge_count(),
                queued = frontier.len(),
                "batch merged"
            );
            if !self.config.batch_delay.is_zero() && !frontier.is_empty() {
                tokio::time::sleep(self.config.batch_delay).await;
            }
        }

        if graph.is_full() {
            report.budget_reached = true;
        }
        report.nodes = graph.node_count();
        report.edges = graph.edge_count();

        if report.is_degenerate(MIN_USEFUL_NODES) {
            error!(
                nodes = report.nodes,
                seed = seed_id,
                "graph too small; check the seed entity and schema relations"
            );
        }
        if !report.rejected.is_empty() {
            warn!(count = report.rejected.len(), "queries rejected by the service");
        }
        if !report.unreachable.is_empty() {
            warn!(count = report.unreachable.len(), "entities unreachable after retries");
        }
        info!(
            nodes = report.nodes,
            edges = report.edges,
            expanded = report.expanded,
            budget_reached = report.budget_reached,
            "crawl complete"
        );
        (graph, report)
    }

    /// Fetch one entity and explain every returned neighbour.
    pub async fn inspect(&self, entity: &str) -> Vec<NeighborVerdict> {
        let fetch = self.fetch_entity(entity.to_string()).await;
        let mut verdicts = Vec::new();
        for (direction, fetched) in [
            (Direction::Forward, fetch.forward),
            (Direction::Reverse, fetch.reverse),
        ] {
            match fetched {
                Fetched::Rows(rows) => {
                    verdicts.extend(explain_rows(&self.schema, entity, direction, &rows))
                }
                other => warn!(entity, %direction, "no data: {:?}", other),
            }
        }
        verdicts
    }
}
