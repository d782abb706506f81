//! Branch selection - which returned neighbours a schema action may reach.

use benchgraph_core::{Direction, Edge, SchemaAction, SchemaIndex};
use benchgraph_query::Row;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// A neighbour reachable from the crawled entity through one schema action.
#[derive(Clone, Debug, PartialEq)]
pub struct Branch {
    pub neighbor_id: String,
    pub neighbor_label: String,
    /// Matched root type, used as the node's type tag.
    pub root_type: Option<String>,
    pub direction: Direction,
    pub action: SchemaAction,
}

impl Branch {
    /// The edge this branch contributes. Reverse actions point from the
    /// neighbour to the crawled entity, like the statement they came from.
    pub fn to_edge(&self, entity: &str) -> Edge {
        let a = &self.action;
        let (source_id, target_id, source_type, target_type) = match self.direction {
            Direction::Forward => (
                entity,
                self.neighbor_id.as_str(),
                &a.source_entity_type,
                &a.target_entity_type,
            ),
            Direction::Reverse => (
                self.neighbor_id.as_str(),
                entity,
                &a.target_entity_type,
                &a.source_entity_type,
            ),
        };
        Edge {
            source_id: source_id.to_string(),
            target_id: target_id.to_string(),
            app: a.app.clone(),
            domain: a.domain.clone(),
            action_key: a.action_key.clone(),
            action_description: a.description.clone(),
            source_entity_type: source_type.clone(),
            target_entity_type: target_type.clone(),
        }
    }
}

/// Rows describing the same (relation, neighbour) pair, merged.
struct Observation {
    label: String,
    root_types: BTreeSet<String>,
}

/// Rows come back once per inferred root type; fold them per neighbour.
/// Keyed by (relation, neighbour) so the result does not depend on the
/// service's row order.
fn group_rows(entity: &str, rows: &[Row]) -> BTreeMap<(String, String), Observation> {
    let mut grouped: BTreeMap<(String, String), Observation> = BTreeMap::new();
    for row in rows {
        let (Some(relation), Some(neighbor)) = (row.get("p"), row.get("neighbor")) else {
            continue;
        };
        if neighbor == entity {
            continue;
        }
        let obs = grouped
            .entry((relation.to_string(), neighbor.to_string()))
            .or_insert_with(|| Observation {
                label: row.get("neighborLabel").unwrap_or(neighbor).to_string(),
                root_types: BTreeSet::new(),
            });
        if let Some(t) = row.get("rootType") {
            obs.root_types.insert(t.to_string());
        }
    }
    grouped
}

/// Every (neighbour, action) pair the schema accepts for rows fetched in
/// `direction`.
pub fn accepted_branches(
    schema: &SchemaIndex,
    entity: &str,
    direction: Direction,
    rows: &[Row],
) -> Vec<Branch> {
    let mut branches = Vec::new();
    for ((relation, neighbor), obs) in group_rows(entity, rows) {
        for action in schema.actions_for(&relation) {
            if action.direction != direction {
                continue;
            }
            if !action.accepts_types(obs.root_types.iter().map(String::as_str)) {
                continue;
            }
            let root_type = obs
                .root_types
                .iter()
                .find(|t| action.allowed_target_root_types.contains(*t))
                .or_else(|| obs.root_types.iter().next())
                .cloned();
            branches.push(Branch {
                neighbor_id: neighbor.clone(),
                neighbor_label: obs.label.clone(),
                root_type,
                direction,
                action: action.clone(),
            });
        }
    }
    branches
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verdict {
    /// At least one action accepts the neighbour.
    Pass,
    /// Actions exist for the relation but reject the neighbour's type.
    Drop,
    /// No action uses this relation in this direction.
    Ignore,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pass => write!(f, "PASS"),
            Self::Drop => write!(f, "DROP"),
            Self::Ignore => write!(f, "IGNORE"),
        }
    }
}

/// Diagnostic view of one neighbour, for debugging schema coverage.
#[derive(Clone, Debug, Serialize)]
pub struct NeighborVerdict {
    pub direction: Direction,
    pub relation: String,
    pub neighbor_id: String,
    pub neighbor_label: String,
    pub root_types: Vec<String>,
    pub verdict: Verdict,
    pub reasons: Vec<String>,
}

/// Explain, row by row, what the branch filter would do with `rows`.
pub fn explain_rows(
    schema: &SchemaIndex,
    entity: &str,
    direction: Direction,
    rows: &[Row],
) -> Vec<NeighborVerdict> {
    group_rows(entity, rows)
        .into_iter()
        .map(|((relation, neighbor), obs)| {
            let mut verdict = Verdict::Ignore;
            let mut reasons = Vec::new();
            for action in schema.actions_for(&relation) {
                if action.direction != direction {
                    continue;
                }
                if action.accepts_types(obs.root_types.iter().map(String::as_str)) {
                    verdict = Verdict::Pass;
                    if action.allowed_target_root_types.is_empty() {
                        reasons.push(format!("{}: no type filter", action.app));
                    } else {
                        reasons.push(format!("{}[{}]", action.app, action.action_key));
                    }
                } else {
                    if verdict != Verdict::Pass {
                        verdict = Verdict::Drop;
                    }
                    let wanted: Vec<&str> = action
                        .allowed_target_root_types
                        .iter()
                        .take(3)
                        .map(String::as_str)
                        .collect();
                    reasons.push(format!("{}: wanted {}", action.app, wanted.join("|")));
                }
            }
            if reasons.is_empty() {
                reasons.push("wrong direction".to_string());
            }
            NeighborVerdict {
                direction,
                relation,
                neighbor_id: neighbor,
                neighbor_label: obs.label,
                root_types: obs.root_types.into_iter().collect(),
                verdict,
                reasons,
            }
        })
        .collect()
}
