//! Builder configuration
//!
//! All run parameters in one place. Loaded from TOML at startup, falls back
//! to defaults if no config file exists. Command-line flags are applied on
//! top by the binary.

use benchgraph_core::{Error, Result};
use benchgraph_crawl::CrawlConfig;
use benchgraph_query::RetryPolicy;
use benchgraph_tasks::{SampleConfig, StartBias, ValidatorConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Top-level builder configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BuilderConfig {
    pub run: RunConfig,
    pub crawl: CrawlSection,
    pub sample: SampleSection,
    pub service: ServiceConfig,
    pub schema: SchemaConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    /// Seeds both the crawl and the sampling phase.
    pub seed: u64,
    /// Knowledge-base id the crawl starts from.
    pub seed_entity: String,
    /// Label given to the seed node.
    pub seed_label: String,
    /// Root for graphs/, tasks/ and usage.json.
    pub data_dir: PathBuf,
    pub log_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CrawlSection {
    pub workers: usize,
    pub max_nodes: usize,
    pub max_branch: usize,
    /// Pause between frontier batches.
    pub batch_delay_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SampleSection {
    pub tasks: usize,
    pub min_len: usize,
    pub max_len: usize,
    pub start_bias: StartBias,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    /// SPARQL endpoint URL.
    pub endpoint: String,
    pub user_agent: String,
    pub timeout_secs: u64,
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SchemaConfig {
    /// Registry file, or a single schema document with a `domains` key.
    pub registry: PathBuf,
}

// ============================================================
// Defaults
// ============================================================

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            seed: 2025,
            seed_entity: "Q26876".into(),
            seed_label: "Taylor Swift".into(),
            data_dir: PathBuf::from("data"),
            log_dir: PathBuf::from("logs"),
        }
    }
}

impl Default for CrawlSection {
    fn default() -> Self {
        Self {
            workers: 5,
            max_nodes: 300,
            max_branch: 4,
            batch_delay_ms: 500,
        }
    }
}

impl Default for SampleSection {
    fn default() -> Self {
        Self {
            tasks: 20,
            min_len: 3,
            max_len: 6,
            start_bias: StartBias::default(),
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            endpoint: benchgraph_query::endpoint::WIKIDATA_SPARQL_URL.into(),
            user_agent: format!("benchgraph/{}", env!("CARGO_PKG_VERSION")),
            timeout_secs: 30,
            max_attempts: 3,
            base_delay_ms: 1000,
            max_delay_ms: 10_000,
        }
    }
}

impl Default for SchemaConfig {
    fn default() -> Self {
        Self {
            registry: PathBuf::from("config/registry.json"),
        }
    }
}

// ============================================================
// Loading and derived settings
// ============================================================

impl BuilderConfig {
    /// Load from a TOML file. Falls back to defaults if the file doesn't
    /// exist or fails to parse.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => match toml::from_str(&content) {
                Ok(config) => {
                    tracing::info!("Loaded config from {}", path.display());
                    config
                }
                Err(e) => {
                    tracing::warn!("Failed to parse {}: {}; using defaults", path.display(), e);
                    Self::default()
                }
            },
            Err(_) => {
                tracing::info!("No config at {}; using defaults", path.display());
                Self::default()
            }
        }
    }

    /// Write the current config as TOML (for generating a default config file).
    pub fn to_toml(&self) -> String {
        toml::to_string_pretty(self).unwrap_or_default()
    }

    /// Reject settings no run can succeed with.
    pub fn validate(&self) -> Result<()> {
        if self.crawl.workers == 0 {
            return Err(Error::config("crawl.workers must be at least 1"));
        }
        if self.crawl.max_nodes == 0 {
            return Err(Error::config("crawl.max_nodes must be at least 1"));
        }
        if self.sample.min_len == 0 || self.sample.min_len > self.sample.max_len {
            return Err(Error::config(format!(
                "sample lengths must satisfy 1 <= min_len <= max_len (got {}..{})",
                self.sample.min_len, self.sample.max_len
            )));
        }
        if self.run.seed_entity.trim().is_empty() {
            return Err(Error::config("run.seed_entity is empty"));
        }
        Ok(())
    }

    pub fn crawl_config(&self) -> CrawlConfig {
        CrawlConfig {
            workers: self.crawl.workers,
            max_nodes: self.crawl.max_nodes,
            max_branch: self.crawl.max_branch,
            seed: self.run.seed,
            batch_delay: Duration::from_millis(self.crawl.batch_delay_ms),
        }
    }

    pub fn sample_config(&self) -> SampleConfig {
        SampleConfig {
            tasks: self.sample.tasks,
            min_len: self.sample.min_len,
            max_len: self.sample.max_len,
            seed: self.run.seed,
            start_bias: self.sample.start_bias,
        }
    }

    pub fn validator_config(&self) -> ValidatorConfig {
        ValidatorConfig {
            workers: self.crawl.workers,
            seed: self.run.seed,
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.service.max_attempts,
            base_delay: Duration::from_millis(self.service.base_delay_ms),
            max_delay: Duration::from_millis(self.service.max_delay_ms),
        }
    }

    pub fn graph_path(&self) -> PathBuf {
        self.run
            .data_dir
            .join("graphs")
            .join(format!("app_graph_{}.json", self.run.seed))
    }

    pub fn tasks_path(&self) -> PathBuf {
        self.run
            .data_dir
            .join("tasks")
            .join(format!("tasks_{}.json", self.run.seed))
    }

    /// `User-Agent` sent with every remote query, tagged with the run seed.
    pub fn client_tag(&self) -> String {
        format!("{} (seed: {})", self.service.user_agent, self.run.seed)
    }

    pub fn usage_path(&self) -> PathBuf {
        self.run.data_dir.join("usage.json")
    }
}
