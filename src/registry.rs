//! Schema registry - assembles the app schema from per-domain files.
//!
//! A registry looks like
//! `{"app_sources": {"Multimedia": "domains/multimedia.json"}, "active_domains": ["Multimedia"]}`.
//! Each source file holds one domain (`{"apps": ...}`) and is mounted under
//! `domains.<name>`. Relative paths resolve against the registry's directory.
//! A file that already has a top-level `domains` key is used as-is.

use benchgraph_core::{Error, Result, SchemaIndex};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

#[derive(Debug, Default, Deserialize)]
struct Registry {
    #[serde(default)]
    app_sources: BTreeMap<String, PathBuf>,
    /// Empty means every listed source is active.
    #[serde(default)]
    active_domains: Vec<String>,
}

/// Read a registry (or plain schema) and return the merged schema document.
pub fn load_schema_document(path: &Path) -> Result<Value> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::schema(format!("cannot read {}: {}", path.display(), e)))?;
    let doc: Value = serde_json::from_str(&content)
        .map_err(|e| Error::schema(format!("invalid JSON in {}: {}", path.display(), e)))?;

    if doc.get("domains").is_some() {
        info!(path = %path.display(), "loaded schema document");
        return Ok(doc);
    }
    if doc.get("app_sources").is_none() {
        return Err(Error::schema(format!(
            "{} has neither `domains` nor `app_sources`",
            path.display()
        )));
    }

    let registry: Registry = serde_json::from_value(doc)?;
    let base = path.parent().unwrap_or_else(|| Path::new(""));
    info!(path = %path.display(), sources = registry.app_sources.len(), "loading app registry");

    let mut domains = Map::new();
    for (domain, source) in &registry.app_sources {
        if !registry.active_domains.is_empty() && !registry.active_domains.contains(domain) {
            info!(domain = %domain, "skipping disabled domain");
            continue;
        }
        let source_path = if source.is_absolute() {
            source.clone()
        } else {
            base.join(source)
        };
        let content = match std::fs::read_to_string(&source_path) {
            Ok(c) => c,
            Err(e) => {
                warn!(domain = %domain, path = %source_path.display(), "missing domain file: {e}");
                continue;
            }
        };
        match serde_json::from_str::<Value>(&content) {
            Ok(data) => {
                info!(domain = %domain, path = %source_path.display(), "loaded domain");
                domains.insert(domain.clone(), data);
            }
            Err(e) => error!(domain = %domain, path = %source_path.display(), "invalid JSON: {e}"),
        }
    }

    let mut merged = Map::new();
    merged.insert("domains".into(), Value::Object(domains));
    Ok(Value::Object(merged))
}

/// Load and index the schema. Fails when nothing usable remains.
pub fn load_schema(path: &Path) -> Result<SchemaIndex> {
    let doc = load_schema_document(path)?;
    let index = SchemaIndex::from_value(&doc)?;
    if index.is_empty() {
        return Err(Error::schema(format!(
            "schema from {} defines no usable actions",
            path.display()
        )));
    }
    info!(
        relations = index.relation_ids().len(),
        actions = index.action_count(),
        root_types = index.all_root_types().len(),
        "schema ready"
    );
    Ok(index)
}
