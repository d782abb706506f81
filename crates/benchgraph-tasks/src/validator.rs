//! Constraint validator - fetches step context and decides which candidate
//! tasks are usable.

use crate::context::{build_context, context_attributes, description_values, is_strong, StepKind};
use benchgraph_core::{SchemaIndex, Step, Task, UsageCounter};
use benchgraph_query::{Query, QueryExecutor};
use futures::stream::{self, StreamExt};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{debug, info};

const DESCRIPTION_VALUES: usize = 4;

/// (node id, qualified entity type)
type ContextKey = (String, String);
type Context = BTreeMap<String, String>;

#[derive(Clone, Debug)]
pub struct ValidatorConfig {
    /// Concurrent context fetches.
    pub workers: usize,
    /// Run seed, used in task ids.
    pub seed: u64,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            workers: 5,
            seed: 2025,
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct Validation {
    pub tasks: Vec<Task>,
    pub rejected: usize,
    pub contexts_fetched: usize,
}

pub struct ConstraintValidator {
    schema: Arc<SchemaIndex>,
    executor: QueryExecutor,
    config: ValidatorConfig,
}

impl ConstraintValidator {
    pub fn new(schema: Arc<SchemaIndex>, executor: QueryExecutor, config: ValidatorConfig) -> Self {
        Self {
            schema,
            executor,
            config,
        }
    }

    fn context_key(step: &Step) -> ContextKey {
        (
            step.to_id.clone(),
            format!("{}.{}.{}", step.domain, step.app, step.target_entity_type),
        )
    }

    /// Attributes worth fetching for the node a step lands on.
    pub fn attributes_for(&self, step: &Step) -> Vec<String> {
        self.schema
            .entity_type(&step.domain, &step.app, &step.target_entity_type)
            .map(context_attributes)
            .unwrap_or_default()
    }

    /// Context for every distinct (node, entity type) across `candidates`.
    async fn fetch_contexts(&self, candidates: &[Task]) -> BTreeMap<ContextKey, Context> {
        let mut requests: BTreeMap<ContextKey, Vec<String>> = BTreeMap::new();
        for step in candidates.iter().flat_map(|t| t.path.iter()) {
            let key = Self::context_key(step);
            if !requests.contains_key(&key) {
                let attributes = self.attributes_for(step);
                requests.insert(key, attributes);
            }
        }

        let workers = self.config.workers.max(1);
        stream::iter(requests)
            .map(|(key, attributes)| async move {
                if attributes.is_empty() {
                    return (key, Context::new());
                }
                let query = Query::attributes(key.0.clone(), attributes);
                let rows = self.executor.execute(&query).await.into_rows();
                let context = build_context(&rows);
                debug!(node = %key.0, entity_type = %key.1, attributes = context.len(), "context fetched");
                (key, context)
            })
            .buffered(workers)
            .collect()
            .await
    }

    /// Fill context into every step, or `None` when a search step has no
    /// strong attribute.
    fn enrich(&self, mut task: Task, contexts: &BTreeMap<ContextKey, Context>) -> Option<Task> {
        for step in &mut task.path {
            let context = contexts
                .get(&Self::context_key(step))
                .cloned()
                .unwrap_or_default();
            if StepKind::classify(&step.action_key) == StepKind::Search
                && !context.keys().any(|k| is_strong(k))
            {
                debug!(step = step.step_idx, action = %step.action_key, to = %step.to_id, "search step lacks a strong attribute");
                return None;
            }
            step.context = context;
            step.description = describe(step);
        }
        Some(task)
    }

    /// Validate candidates in order. Accepted tasks get sequential ids and
    /// bump the usage counter for every step target.
    pub async fn validate(&self, candidates: Vec<Task>, usage: &mut UsageCounter) -> Validation {
        let contexts = self.fetch_contexts(&candidates).await;
        let mut validation = Validation {
            contexts_fetched: contexts.len(),
            ..Default::default()
        };

        for candidate in candidates {
            match self.enrich(candidate, &contexts) {
                Some(mut task) => {
                    task.task_id = format!("task_{}_{}", self.config.seed, validation.tasks.len());
                    for step in &task.path {
                        usage.increment(&step.to_id);
                    }
                    validation.tasks.push(task);
                }
                None => validation.rejected += 1,
            }
        }

        let apps: BTreeSet<&str> = validation
            .tasks
            .iter()
            .flat_map(|t| t.path.iter().map(|s| s.app.as_str()))
            .collect();
        info!(
            accepted = validation.tasks.len(),
            rejected = validation.rejected,
            apps = apps.len(),
            "validation complete"
        );
        validation
    }
}

fn describe(step: &Step) -> String {
    let values = description_values(&step.context, DESCRIPTION_VALUES);
    if values.is_empty() {
        format!(
            "In {}, go from {} to {} {}",
            step.app, step.from_label, step.target_entity_type, step.to_label
        )
    } else {
        format!(
            "In {}, go from {} to the {} matching {}",
            step.app,
            step.from_label,
            step.target_entity_type,
            values.join(", ")
        )
    }
}
