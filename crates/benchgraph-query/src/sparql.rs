//! Structured queries and their SPARQL rendering.

use benchgraph_core::Direction;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fmt::Write;

const ENTITY_PREFIX: &str = "http://www.wikidata.org/entity/Q";
const NEIGHBOR_LIMIT: usize = 200;
const ATTRIBUTE_LIMIT: usize = 60;

/// Neighbours of one entity along a set of relations, with root-type inference.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NeighborQuery {
    pub entity: String,
    pub direction: Direction,
    pub relations: Vec<String>,
    /// Neighbours are matched against these via the transitive
    /// instance-of/subclass-of closure on the service side.
    pub root_types: Vec<String>,
}

/// Attribute values of one entity, restricted to the given attribute ids.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AttributeQuery {
    pub entity: String,
    pub attributes: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Query {
    Neighbors(NeighborQuery),
    Attributes(AttributeQuery),
}

impl Query {
    pub fn neighbors(
        entity: impl Into<String>,
        direction: Direction,
        relations: Vec<String>,
        root_types: Vec<String>,
    ) -> Self {
        Self::Neighbors(NeighborQuery {
            entity: entity.into(),
            direction,
            relations,
            root_types,
        })
    }

    pub fn attributes(entity: impl Into<String>, attributes: Vec<String>) -> Self {
        Self::Attributes(AttributeQuery {
            entity: entity.into(),
            attributes,
        })
    }

    /// Subject entity of the query.
    pub fn entity(&self) -> &str {
        match self {
            Self::Neighbors(q) => &q.entity,
            Self::Attributes(q) => &q.entity,
        }
    }

    pub fn to_sparql(&self) -> String {
        match self {
            Self::Neighbors(q) => render_neighbors(q),
            Self::Attributes(q) => render_attributes(q),
        }
    }
}

fn values_clause(var: &str, prefix: &str, ids: &[String]) -> String {
    let ids: Vec<String> = ids.iter().map(|id| format!("{}:{}", prefix, id)).collect();
    format!("VALUES ?{} {{ {} }}", var, ids.join(" "))
}

fn render_neighbors(q: &NeighborQuery) -> String {
    let triple = match q.direction {
        Direction::Forward => format!("wd:{} ?p ?neighbor .", q.entity),
        Direction::Reverse => format!("?neighbor ?p wd:{} .", q.entity),
    };
    let mut sparql = String::new();
    let _ = writeln!(sparql, "SELECT ?p ?neighbor ?neighborLabel ?rootType WHERE {{");
    let _ = writeln!(sparql, "  {}", values_clause("p", "wdt", &q.relations));
    let _ = writeln!(sparql, "  {}", triple);
    let _ = writeln!(
        sparql,
        "  FILTER(isIRI(?neighbor) && STRSTARTS(STR(?neighbor), \"{}\"))",
        ENTITY_PREFIX
    );
    if !q.root_types.is_empty() {
        let _ = writeln!(sparql, "  OPTIONAL {{");
        let _ = writeln!(sparql, "    {}", values_clause("rootType", "wd", &q.root_types));
        let _ = writeln!(sparql, "    ?neighbor wdt:P31/wdt:P279* ?rootType .");
        let _ = writeln!(sparql, "  }}");
    }
    let _ = writeln!(
        sparql,
        "  SERVICE wikibase:label {{ bd:serviceParam wikibase:language \"en\". }}"
    );
    let _ = write!(sparql, "}} LIMIT {}", NEIGHBOR_LIMIT);
    sparql
}

fn render_attributes(q: &AttributeQuery) -> String {
    let mut sparql = String::new();
    let _ = writeln!(sparql, "SELECT ?prop ?value ?valueLabel WHERE {{");
    let _ = writeln!(sparql, "  {}", values_clause("prop", "wdt", &q.attributes));
    let _ = writeln!(sparql, "  wd:{} ?prop ?value .", q.entity);
    let _ = writeln!(
        sparql,
        "  SERVICE wikibase:label {{ bd:serviceParam wikibase:language \"en\". }}"
    );
    let _ = write!(sparql, "}} LIMIT {}", ATTRIBUTE_LIMIT);
    sparql
}

/// One result row: variable name → value. IRIs are reduced to their last
/// path segment (`http://www.wikidata.org/entity/Q5` → `Q5`).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Row(BTreeMap<String, String>);

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, var: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(var.into(), value.into());
        self
    }

    pub fn get(&self, var: &str) -> Option<&str> {
        self.0.get(var).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[derive(Deserialize)]
struct SparqlResponse {
    results: SparqlResults,
}

#[derive(Deserialize)]
struct SparqlResults {
    bindings: Vec<BTreeMap<String, Binding>>,
}

#[derive(Deserialize)]
struct Binding {
    #[serde(rename = "type")]
    kind: String,
    value: String,
}

/// Parse a SPARQL 1.1 JSON results document into rows.
pub fn parse_results(body: &str) -> Result<Vec<Row>, serde_json::Error> {
    let response: SparqlResponse = serde_json::from_str(body)?;
    Ok(response
        .results
        .bindings
        .into_iter()
        .map(|binding| {
            Row(binding
                .into_iter()
                .map(|(var, b)| {
                    let value = if b.kind == "uri" {
                        last_segment(&b.value).to_string()
                    } else {
                        b.value
                    };
                    (var, value)
                })
                .collect())
        })
        .collect())
}

fn last_segment(iri: &str) -> &str {
    iri.rsplit('/').next().unwrap_or(iri)
}
