//! Per-node usage counter, persisted across runs.
//!
//! Every accepted step bumps its target node. The sampler reads the counts to
//! bias start nodes away from entities that earlier runs already covered.

use crate::error::Result;
use crate::store;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UsageCounter {
    counts: BTreeMap<String, u64>,
}

impl UsageCounter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &str) -> u64 {
        self.counts.get(id).copied().unwrap_or(0)
    }

    pub fn increment(&mut self, id: &str) {
        *self.counts.entry(id.to_string()).or_insert(0) += 1;
    }

    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    /// Load counts from disk; a missing file yields an empty counter.
    pub fn load(path: &Path) -> Result<Self> {
        Ok(store::load_json(path)?.unwrap_or_default())
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        store::save_json(path, self)
    }
}
