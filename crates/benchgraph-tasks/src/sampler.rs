//! Path sampler - seeded weighted random walks over the crawled graph.
//!
//! Walks prefer switching app and domain at every hop, never revisit a node,
//! and are accepted only when they span at least two apps. Sampling is
//! CPU-bound and does no I/O.

use benchgraph_core::{Edge, Graph, Node, SeededRng, Step, Task, UsageCounter};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, info, warn};

const ATTEMPTS_PER_TASK: usize = 500;
const MIN_DISTINCT_APPS: usize = 2;

const BASE_SCORE: f64 = 1.0;
const APP_SWITCH_BONUS: f64 = 2.0;
const DOMAIN_SWITCH_BONUS: f64 = 4.0;

/// How walk start nodes are picked.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StartBias {
    Uniform,
    /// Weight `1 / (1 + usage)`, so nodes used by earlier runs are picked less.
    #[default]
    LeastUsed,
}

#[derive(Clone, Debug)]
pub struct SampleConfig {
    pub tasks: usize,
    pub min_len: usize,
    pub max_len: usize,
    pub seed: u64,
    pub start_bias: StartBias,
}

impl Default for SampleConfig {
    fn default() -> Self {
        Self {
            tasks: 20,
            min_len: 3,
            max_len: 6,
            seed: 2025,
            start_bias: StartBias::default(),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct SampleRun {
    pub tasks: Vec<Task>,
    pub attempts: usize,
    /// True when the attempt budget ran out before the target was met.
    pub budget_exhausted: bool,
}

/// Score of following `edge` after `previous`. The first hop has no bonus.
pub fn edge_score(edge: &Edge, previous: Option<&Edge>) -> f64 {
    let mut score = BASE_SCORE;
    if let Some(prev) = previous {
        if edge.app != prev.app {
            score += APP_SWITCH_BONUS;
        }
        if edge.domain != prev.domain {
            score += DOMAIN_SWITCH_BONUS;
        }
    }
    score
}

/// Start weights, aligned with `nodes`.
pub fn start_weights(nodes: &[Node], usage: &UsageCounter, bias: StartBias) -> Vec<f64> {
    nodes
        .iter()
        .map(|node| match bias {
            StartBias::Uniform => 1.0,
            StartBias::LeastUsed => 1.0 / (1.0 + usage.get(&node.id) as f64),
        })
        .collect()
}

/// Roulette-wheel draw: the first index whose cumulative weight reaches a
/// uniform `r` in `[0, total)`. Falls back to the last index.
fn weighted_index(weights: &[f64], rng: &mut SeededRng) -> usize {
    let total: f64 = weights.iter().sum();
    let r = rng.uniform(total);
    let mut upto = 0.0;
    for (i, w) in weights.iter().enumerate() {
        if upto + w >= r {
            return i;
        }
        upto += w;
    }
    weights.len().saturating_sub(1)
}

pub struct PathSampler {
    config: SampleConfig,
}

impl PathSampler {
    pub fn new(config: SampleConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SampleConfig {
        &self.config
    }

    pub fn attempt_budget(&self) -> usize {
        self.config.tasks.saturating_mul(ATTEMPTS_PER_TASK)
    }

    /// Sample candidate tasks. Returns whatever was accepted when the attempt
    /// budget runs out.
    pub fn sample(&self, graph: &Graph, usage: &UsageCounter) -> SampleRun {
        let mut run = SampleRun::default();
        let nodes = graph.nodes();
        if nodes.len() < 2 || self.config.tasks == 0 {
            warn!(nodes = nodes.len(), "graph too small to sample from");
            return run;
        }

        let mut rng = SeededRng::for_phase(self.config.seed, "sample");
        let weights = start_weights(nodes, usage, self.config.start_bias);
        let budget = self.attempt_budget();

        while run.tasks.len() < self.config.tasks {
            if run.attempts >= budget {
                warn!(
                    attempts = run.attempts,
                    accepted = run.tasks.len(),
                    target = self.config.tasks,
                    "attempt budget exhausted"
                );
                run.budget_exhausted = true;
                break;
            }
            run.attempts += 1;
            let start = &nodes[weighted_index(&weights, &mut rng)];
            let target_len = self.draw_length(&mut rng);
            if let Some(task) = self.walk(graph, start, target_len, &mut rng) {
                debug!(start = %start.id, steps = task.path.len(), "walk accepted");
                run.tasks.push(task);
            }
        }

        info!(
            accepted = run.tasks.len(),
            attempts = run.attempts,
            "sampling complete"
        );
        run
    }

    fn draw_length(&self, rng: &mut SeededRng) -> usize {
        let min_len = self.config.min_len.max(1);
        rng.gen_range_inclusive(min_len, self.config.max_len.max(min_len))
    }

    /// Walk exactly `target_len` hops from `start`. `None` when the walk runs
    /// out of unvisited successors first, or when it fails the length or
    /// diversity gate.
    pub fn walk(
        &self,
        graph: &Graph,
        start: &Node,
        target_len: usize,
        rng: &mut SeededRng,
    ) -> Option<Task> {
        let mut visited: HashSet<&str> = HashSet::new();
        visited.insert(start.id.as_str());
        let mut current = start.id.as_str();
        let mut previous: Option<&Edge> = None;
        let mut steps: Vec<Step> = Vec::with_capacity(target_len);

        while steps.len() < target_len {
            let candidates: Vec<&Edge> = graph
                .successors(current)
                .filter(|e| !visited.contains(e.target_id.as_str()))
                .collect();
            if candidates.is_empty() {
                return None;
            }
            let scores: Vec<f64> = candidates.iter().map(|e| edge_score(e, previous)).collect();
            let edge = candidates[weighted_index(&scores, rng)];

            let from_label = graph.label_of(&edge.source_id).to_string();
            let to_label = graph.label_of(&edge.target_id).to_string();
            steps.push(Step {
                step_idx: steps.len() + 1,
                from_id: edge.source_id.clone(),
                to_id: edge.target_id.clone(),
                description: String::new(),
                from_label,
                to_label,
                domain: edge.domain.clone(),
                app: edge.app.clone(),
                action_key: edge.action_key.clone(),
                target_entity_type: edge.target_entity_type.clone(),
                context: Default::default(),
            });

            visited.insert(edge.target_id.as_str());
            current = edge.target_id.as_str();
            previous = Some(edge);
        }

        if steps.len() < self.config.min_len {
            return None;
        }
        let task = Task::candidate(steps);
        (task.distinct_apps() >= MIN_DISTINCT_APPS).then_some(task)
    }
}
