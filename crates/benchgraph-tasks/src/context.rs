//! Step context: attribute selection, value normalisation, step classification.

use benchgraph_core::EntityType;
use benchgraph_query::Row;
use chrono::{DateTime, Datelike};
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::OnceLock;

/// Duration, in seconds.
pub const DURATION_ATTRIBUTE: &str = "P2047";
/// Coordinate location.
pub const COORDINATE_ATTRIBUTE: &str = "P625";
pub const MAX_VALUE_LEN: usize = 60;

/// Date of birth, place of birth, citizenship, occupation.
pub const PERSON_ATTRIBUTES: [&str; 4] = ["P569", "P19", "P27", "P106"];

/// Attributes distinctive enough to pin down a search result.
pub const STRONG_ATTRIBUTES: [&str; 18] = [
    "P569", "P570", "P571", "P577", "P580", "P19", "P20", "P50", "P57", "P86", "P131", "P159",
    "P175", "P264", "P276", "P495", "P1082", "P2047",
];

const HUMAN: &str = "Q5";
const PERSON_TYPE_NAMES: [&str; 7] = [
    "Person", "Artist", "Human", "Author", "Actor", "Athlete", "Musician",
];
const NAVIGATION_PREFIXES: [&str; 6] = ["click", "pick", "link", "zoom", "check", "browse"];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StepKind {
    /// Following a direct reference on screen.
    Navigation,
    /// Looking something up; needs distinguishing context.
    Search,
}

impl StepKind {
    pub fn classify(action_key: &str) -> Self {
        let key = action_key.to_ascii_lowercase();
        let is_navigation = NAVIGATION_PREFIXES.iter().any(|prefix| {
            key.strip_prefix(*prefix)
                .is_some_and(|rest| rest.is_empty() || rest.starts_with('_'))
        });
        if is_navigation {
            Self::Navigation
        } else {
            Self::Search
        }
    }
}

pub fn is_strong(attribute: &str) -> bool {
    STRONG_ATTRIBUTES.contains(&attribute)
}

pub fn is_person_like(entity_type: &EntityType) -> bool {
    entity_type.root_types.contains(HUMAN) || PERSON_TYPE_NAMES.contains(&entity_type.name.as_str())
}

/// Attributes to fetch for a node reached as `entity_type`: its declared
/// constraints, then the person extras. No duplicates, declaration order kept.
pub fn context_attributes(entity_type: &EntityType) -> Vec<String> {
    let mut attributes: Vec<String> = Vec::new();
    let extras: &[&str] = if is_person_like(entity_type) {
        &PERSON_ATTRIBUTES
    } else {
        &[]
    };
    let declared = entity_type.constraints.iter().map(String::as_str);
    for attribute in declared.chain(extras.iter().copied()) {
        if !attributes.iter().any(|a| a == attribute) {
            attributes.push(attribute.to_string());
        }
    }
    attributes
}

fn entity_id_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^Q\d+$").ok()).as_ref()
}

fn format_duration(raw: &str) -> Option<String> {
    let seconds = raw.trim().parse::<f64>().ok()?;
    if !seconds.is_finite() || seconds < 0.0 {
        return None;
    }
    let total = seconds.round() as u64;
    Some(format!("{}:{:02}", total / 60, total % 60))
}

/// Normalise one raw attribute value for use in a task description.
/// `None` means the value carries nothing a reader could use.
pub fn normalize_value(attribute: &str, raw: &str) -> Option<String> {
    let value = raw.trim();
    if value.is_empty() || attribute == COORDINATE_ATTRIBUTE || value.starts_with("Point(") {
        return None;
    }
    if attribute == DURATION_ATTRIBUTE {
        return format_duration(value);
    }
    if let Ok(date) = DateTime::parse_from_rfc3339(value) {
        return Some(date.year().to_string());
    }
    if entity_id_pattern().is_some_and(|re| re.is_match(value)) {
        return None;
    }
    if value.chars().count() > MAX_VALUE_LEN {
        return None;
    }
    Some(value.to_string())
}

/// Fold attribute rows (`prop`, `value`, `valueLabel`) into a context map.
/// The first usable value per attribute wins.
pub fn build_context(rows: &[Row]) -> BTreeMap<String, String> {
    let mut context = BTreeMap::new();
    for row in rows {
        let Some(attribute) = row.get("prop") else {
            continue;
        };
        if context.contains_key(attribute) {
            continue;
        }
        // Entity-valued attributes carry the readable name in the label; for
        // literals the label service echoes the value.
        let raw = match (row.get("value"), row.get("valueLabel")) {
            (Some(value), Some(label)) if attribute != DURATION_ATTRIBUTE => {
                if DateTime::parse_from_rfc3339(value).is_ok() {
                    value
                } else {
                    label
                }
            }
            (Some(value), _) => value,
            (None, Some(label)) => label,
            (None, None) => continue,
        };
        if let Some(value) = normalize_value(attribute, raw) {
            context.insert(attribute.to_string(), value);
        }
    }
    context
}

/// Up to `limit` context values, strong attributes first, each group in
/// attribute-id order.
pub fn description_values(context: &BTreeMap<String, String>, limit: usize) -> Vec<&str> {
    let strong = context.iter().filter(|(k, _)| is_strong(k));
    let weak = context.iter().filter(|(k, _)| !is_strong(k));
    strong.chain(weak).take(limit).map(|(_, v)| v.as_str()).collect()
}
