//! MockQueryService - deterministic in-memory knowledge base for testing
//!
//! Answers neighbour and attribute queries from scripted triples and can be
//! told to fail a number of calls first, to exercise the retry path.

use crate::service::{QueryError, QueryResult, QueryService};
use crate::sparql::{Query, Row};
use benchgraph_core::Direction;
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

#[derive(Clone, Debug)]
struct ScriptedNeighbor {
    relation: String,
    neighbor: String,
    label: String,
    root_type: Option<String>,
}

#[derive(Clone, Debug)]
struct ScriptedAttribute {
    attribute: String,
    value: String,
    label: Option<String>,
}

#[derive(Default)]
pub struct MockQueryService {
    neighbors: BTreeMap<(String, Direction), Vec<ScriptedNeighbor>>,
    attributes: BTreeMap<String, Vec<ScriptedAttribute>>,
    unreachable: HashSet<String>,
    rejected: HashSet<String>,
    fail_next: AtomicUsize,
    calls: AtomicUsize,
    log: Mutex<Vec<Query>>,
}

impl MockQueryService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Script a neighbour of `entity`. `root_type` is what the service would
    /// infer through the instance-of/subclass-of closure.
    pub fn with_neighbor(
        mut self,
        entity: &str,
        direction: Direction,
        relation: &str,
        neighbor: &str,
        label: &str,
        root_type: Option<&str>,
    ) -> Self {
        self.neighbors
            .entry((entity.to_string(), direction))
            .or_default()
            .push(ScriptedNeighbor {
                relation: relation.to_string(),
                neighbor: neighbor.to_string(),
                label: label.to_string(),
                root_type: root_type.map(str::to_string),
            });
        self
    }

    /// Script a statement both ways: `subject --relation--> object`.
    pub fn with_statement(
        self,
        subject: (&str, &str),
        relation: &str,
        object: (&str, &str),
        subject_type: Option<&str>,
        object_type: Option<&str>,
    ) -> Self {
        self.with_neighbor(subject.0, Direction::Forward, relation, object.0, object.1, object_type)
            .with_neighbor(object.0, Direction::Reverse, relation, subject.0, subject.1, subject_type)
    }

    pub fn with_attribute(
        mut self,
        entity: &str,
        attribute: &str,
        value: &str,
        label: Option<&str>,
    ) -> Self {
        self.attributes
            .entry(entity.to_string())
            .or_default()
            .push(ScriptedAttribute {
                attribute: attribute.to_string(),
                value: value.to_string(),
                label: label.map(str::to_string),
            });
        self
    }

    /// Every query about `entity` fails with a transient error.
    pub fn with_unreachable(mut self, entity: &str) -> Self {
        self.unreachable.insert(entity.to_string());
        self
    }

    /// Every query about `entity` is refused as malformed (HTTP 400).
    pub fn with_rejected(mut self, entity: &str) -> Self {
        self.rejected.insert(entity.to_string());
        self
    }

    /// The next `n` calls fail with a transient error, whatever they ask.
    pub fn failing_first(self, n: usize) -> Self {
        self.fail_next.store(n, Ordering::SeqCst);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Queries received so far, in arrival order.
    pub fn queries(&self) -> Vec<Query> {
        self.log.lock().map(|l| l.clone()).unwrap_or_default()
    }

    fn answer(&self, query: &Query) -> Vec<Row> {
        match query {
            Query::Neighbors(q) => {
                let allowed_types: HashSet<&str> = q.root_types.iter().map(String::as_str).collect();
                let key = (q.entity.clone(), q.direction);
                self.neighbors
                    .get(&key)
                    .into_iter()
                    .flatten()
                    .filter(|n| q.relations.iter().any(|r| *r == n.relation))
                    .map(|n| {
                        let row = Row::new()
                            .with("p", &n.relation)
                            .with("neighbor", &n.neighbor)
                            .with("neighborLabel", &n.label);
                        match &n.root_type {
                            Some(t) if allowed_types.contains(t.as_str()) => row.with("rootType", t),
                            _ => row,
                        }
                    })
                    .collect()
            }
            Query::Attributes(q) => self
                .attributes
                .get(&q.entity)
                .into_iter()
                .flatten()
                .filter(|a| q.attributes.iter().any(|id| *id == a.attribute))
                .map(|a| {
                    let row = Row::new()
                        .with("prop", &a.attribute)
                        .with("value", &a.value);
                    match &a.label {
                        Some(l) => row.with("valueLabel", l),
                        None => row,
                    }
                })
                .collect(),
        }
    }
}

#[async_trait::async_trait]
impl QueryService for MockQueryService {
    fn name(&self) -> &str {
        "mock"
    }

    async fn select(&self, query: &Query) -> QueryResult<Vec<Row>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut log) = self.log.lock() {
            log.push(query.clone());
        }

        let pending = self.fail_next.load(Ordering::SeqCst);
        if pending > 0 {
            self.fail_next.store(pending - 1, Ordering::SeqCst);
            return Err(QueryError::RequestFailed("mock: injected failure".into()));
        }
        if self.unreachable.contains(query.entity()) {
            return Err(QueryError::Timeout(std::time::Duration::from_secs(30)));
        }
        if self.rejected.contains(query.entity()) {
            return Err(QueryError::Status {
                status: 400,
                body: "mock: malformed query".into(),
            });
        }
        Ok(self.answer(query))
    }
}
