//! Schema index - flattens the declarative app schema into lookup tables.
//!
//! The schema document nests `domains → apps → entities → actions`. Crawling
//! needs the inverse view: given a relation id returned by the knowledge base,
//! which app actions may have produced it, in which direction, and which
//! neighbour root types they accept.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use tracing::{debug, warn};

const REVERSE_PREFIX: &str = "reverse_";

/// Direction of the underlying statement relative to the crawled entity.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// `entity --relation--> neighbour`
    Forward,
    /// `neighbour --relation--> entity`
    Reverse,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Forward => write!(f, "forward"),
            Self::Reverse => write!(f, "reverse"),
        }
    }
}

/// One app action bound to a knowledge-base relation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SchemaAction {
    pub domain: String,
    pub app: String,
    pub source_entity_type: String,
    pub target_entity_type: String,
    pub relation_id: String,
    pub direction: Direction,
    /// Empty means unconstrained.
    pub allowed_target_root_types: BTreeSet<String>,
    pub action_key: String,
    pub description: String,
}

impl SchemaAction {
    /// True when a neighbour with the given observed root types may be reached.
    pub fn accepts_types<'a>(&self, observed: impl IntoIterator<Item = &'a str>) -> bool {
        if self.allowed_target_root_types.is_empty() {
            return true;
        }
        observed
            .into_iter()
            .any(|t| self.allowed_target_root_types.contains(t))
    }
}

/// An entity type declared under `domain.app`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EntityType {
    pub domain: String,
    pub app: String,
    pub name: String,
    pub root_types: BTreeSet<String>,
    /// Attribute ids worth fetching as step context.
    pub constraints: Vec<String>,
}

impl EntityType {
    pub fn qualified_name(&self) -> String {
        qualify(&self.domain, &self.app, &self.name)
    }
}

fn qualify(domain: &str, app: &str, entity: &str) -> String {
    format!("{}.{}.{}", domain, app, entity)
}

/// Split a schema relation string into its bare relation id and direction.
///
/// `reverse_P175_performer` → (`P175`, Reverse); `P26` → (`P26`, Forward).
pub fn parse_relation(relation: &str) -> (String, Direction) {
    match relation.strip_prefix(REVERSE_PREFIX) {
        Some(rest) => {
            let id = rest.split('_').next().unwrap_or(rest);
            (id.to_string(), Direction::Reverse)
        }
        None => (relation.to_string(), Direction::Forward),
    }
}

/// Parsed, validated view of the schema document.
#[derive(Clone, Debug, Default)]
pub struct SchemaIndex {
    relation_to_actions: BTreeMap<String, Vec<SchemaAction>>,
    all_root_types: BTreeSet<String>,
    entity_types: BTreeMap<String, EntityType>,
    skipped_actions: usize,
}

impl SchemaIndex {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_value(&value)
    }

    /// Parse a schema document. Fails only when the document itself is not a
    /// mapping of domains; malformed entries below that level are skipped.
    pub fn from_value(doc: &Value) -> Result<Self> {
        let root = doc
            .as_object()
            .ok_or_else(|| Error::schema("schema document is not a mapping"))?;
        let domains = root
            .get("domains")
            .ok_or_else(|| Error::schema("schema document has no `domains` key"))?
            .as_object()
            .ok_or_else(|| Error::schema("`domains` is not a mapping of domains"))?;

        let mut index = SchemaIndex::default();

        // Pass 1: entity-type table, so actions may reference types declared later.
        for_each_entity(domains, |domain, app, name, def| {
            let root_types: BTreeSet<String> = string_list(def.get("type_filter"))
                .filter(|v| !v.is_empty())
                .or_else(|| string_list(def.get("target_filters")))
                .unwrap_or_default()
                .into_iter()
                .collect();
            let constraints = string_list(def.get("constraints")).unwrap_or_default();
            index.all_root_types.extend(root_types.iter().cloned());
            let entity = EntityType {
                domain: domain.to_string(),
                app: app.to_string(),
                name: name.to_string(),
                root_types,
                constraints,
            };
            index.entity_types.insert(entity.qualified_name(), entity);
        });

        // Pass 2: actions.
        let mut actions = Vec::new();
        let mut skipped = 0usize;
        for_each_entity(domains, |domain, app, name, def| {
            let Some(action_map) = def.get("actions").and_then(Value::as_object) else {
                return;
            };
            for (action_key, action) in action_map {
                let relation = action.get("relation").and_then(Value::as_str);
                let target = action.get("target").and_then(Value::as_str);
                let (Some(relation), Some(target)) = (relation, target) else {
                    warn!(domain, app, entity = name, action = %action_key, "skipping action without relation/target");
                    skipped += 1;
                    continue;
                };
                let (relation_id, direction) = parse_relation(relation);
                if relation_id.is_empty() {
                    warn!(domain, app, action = %action_key, relation, "skipping action with empty relation id");
                    skipped += 1;
                    continue;
                }
                let allowed = index
                    .entity_types
                    .get(&qualify(domain, app, target))
                    .map(|t| t.root_types.clone())
                    .unwrap_or_default();
                let description = action
                    .get("desc")
                    .and_then(Value::as_str)
                    .unwrap_or(action_key)
                    .to_string();
                actions.push(SchemaAction {
                    domain: domain.to_string(),
                    app: app.to_string(),
                    source_entity_type: name.to_string(),
                    target_entity_type: target.to_string(),
                    relation_id,
                    direction,
                    allowed_target_root_types: allowed,
                    action_key: action_key.clone(),
                    description,
                });
            }
        });

        for action in actions {
            index
                .relation_to_actions
                .entry(action.relation_id.clone())
                .or_default()
                .push(action);
        }
        index.skipped_actions = skipped;

        debug!(
            relations = index.relation_to_actions.len(),
            root_types = index.all_root_types.len(),
            entity_types = index.entity_types.len(),
            skipped,
            "schema indexed"
        );
        Ok(index)
    }

    /// Candidate actions for a relation id (empty if the schema ignores it).
    pub fn actions_for(&self, relation_id: &str) -> &[SchemaAction] {
        self.relation_to_actions
            .get(relation_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Sorted relation ids the crawler may follow.
    pub fn relation_ids(&self) -> Vec<String> {
        self.relation_to_actions.keys().cloned().collect()
    }

    pub fn all_root_types(&self) -> &BTreeSet<String> {
        &self.all_root_types
    }

    pub fn entity_type(&self, domain: &str, app: &str, name: &str) -> Option<&EntityType> {
        self.entity_types.get(&qualify(domain, app, name))
    }

    pub fn action_count(&self) -> usize {
        self.relation_to_actions.values().map(Vec::len).sum()
    }

    /// Number of action entries dropped while parsing.
    pub fn skipped_actions(&self) -> usize {
        self.skipped_actions
    }

    pub fn is_empty(&self) -> bool {
        self.relation_to_actions.is_empty()
    }
}

fn for_each_entity<F>(domains: &Map<String, Value>, mut f: F)
where
    F: FnMut(&str, &str, &str, &Map<String, Value>),
{
    for (domain, content) in domains {
        let Some(apps) = content.get("apps").and_then(Value::as_object) else {
            warn!(domain = %domain, "domain has no `apps` mapping, skipping");
            continue;
        };
        for (app, app_def) in apps {
            let Some(entities) = app_def.get("entities").and_then(Value::as_object) else {
                continue;
            };
            for (name, def) in entities {
                if let Some(def) = def.as_object() {
                    f(domain, app, name, def);
                }
            }
        }
    }
}

fn string_list(value: Option<&Value>) -> Option<Vec<String>> {
    let arr = value?.as_array()?;
    Some(
        arr.iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect(),
    )
}
