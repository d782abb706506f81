//! End-to-end tests: registry loading, config, and the full build against a mock service

use benchgraph::registry::load_schema_document;
use benchgraph::*;
use benchgraph_core::{store, Direction, Task, UsageCounter};
use benchgraph_crawl::Verdict;
use benchgraph_query::mock::MockQueryService;
use serde_json::json;
use std::path::Path;
use std::sync::Arc;

fn write_json(path: &Path, value: &serde_json::Value) {
    std::fs::write(path, serde_json::to_string_pretty(value).unwrap()).unwrap();
}

fn music_domain() -> serde_json::Value {
    json!({
        "apps": {
            "Spotify": {
                "entities": {
                    "Artist": {
                        "type_filter": ["Q5"],
                        "constraints": ["P264"],
                        "actions": {
                            "search_songs": {"relation": "reverse_P175_performer", "target": "Song", "desc": "Songs by this artist"}
                        }
                    },
                    "Song": {
                        "target_filters": ["Q7366"],
                        "constraints": ["P2047", "P577"],
                        "actions": {
                            "click_artist": {"relation": "P175", "target": "Artist", "desc": "Open the performer"}
                        }
                    }
                }
            }
        }
    })
}

fn travel_domain() -> serde_json::Value {
    json!({
        "apps": {
            "Maps": {
                "entities": {
                    "Person": {
                        "type_filter": ["Q5"],
                        "actions": {
                            "zoom_birthplace": {"relation": "P19", "target": "City", "desc": "Show birthplace"}
                        }
                    },
                    "City": {
                        "type_filter": ["Q515"],
                        "constraints": ["P1082"],
                        "actions": {
                            "browse_natives": {"relation": "reverse_P19_birthplace", "target": "Person", "desc": "People born here"},
                            "click_country": {"relation": "P17", "target": "Country", "desc": "Open the country"}
                        }
                    },
                    "Country": {
                        "type_filter": ["Q6256"],
                        "actions": {}
                    }
                }
            }
        }
    })
}

/// Registry with two domain files next to it.
fn write_registry(dir: &Path, active: &[&str]) -> std::path::PathBuf {
    write_json(&dir.join("music.json"), &music_domain());
    write_json(&dir.join("travel.json"), &travel_domain());
    let registry = dir.join("registry.json");
    write_json(
        &registry,
        &json!({
            "app_sources": {
                "Music": "music.json",
                "Travel": "travel.json",
                "Sports": "sports.json"
            },
            "active_domains": active
        }),
    );
    registry
}

/// Three songs by one artist, born in a city of one country.
fn music_world() -> MockQueryService {
    let mut service = MockQueryService::new()
        .with_statement(("A", "Artist"), "P19", ("C", "Town"), Some("Q5"), Some("Q515"))
        .with_statement(("C", "Town"), "P17", ("K", "Land"), Some("Q515"), Some("Q6256"))
        .with_attribute("A", "P569", "1989-12-13T00:00:00Z", None);
    for song in ["S1", "S2", "S3"] {
        service = service.with_statement((song, song), "P175", ("A", "Artist"), Some("Q7366"), Some("Q5"));
    }
    service
}

fn test_config(data_dir: &Path, registry: &Path) -> BuilderConfig {
    let mut config = BuilderConfig::default();
    config.run.seed = 7;
    config.run.seed_entity = "A".into();
    config.run.seed_label = "Seed Artist".into();
    config.run.data_dir = data_dir.to_path_buf();
    config.crawl.workers = 2;
    config.crawl.max_nodes = 20;
    config.crawl.batch_delay_ms = 0;
    config.sample.tasks = 3;
    config.service.max_attempts = 1;
    config.service.base_delay_ms = 0;
    config.service.max_delay_ms = 0;
    config.schema.registry = registry.to_path_buf();
    config
}

// ===========================================================================
// Registry
// ===========================================================================

#[test]
fn registry_merges_active_domains_and_skips_missing_files() {
    let dir = tempfile::tempdir().unwrap();
    let registry = write_registry(dir.path(), &["Music", "Travel", "Sports"]);
    let doc = load_schema_document(&registry).unwrap();
    let domains = doc["domains"].as_object().unwrap();
    assert_eq!(domains.len(), 2);
    assert!(domains.contains_key("Music"));
    assert!(domains.contains_key("Travel"));

    let schema = load_schema(&registry).unwrap();
    assert_eq!(schema.relation_ids(), vec!["P17", "P175", "P19"]);
}

#[test]
fn registry_skips_inactive_domains() {
    let dir = tempfile::tempdir().unwrap();
    let registry = write_registry(dir.path(), &["Music"]);
    let doc = load_schema_document(&registry).unwrap();
    let domains = doc["domains"].as_object().unwrap();
    assert_eq!(domains.len(), 1);
    assert!(domains.contains_key("Music"));
}

#[test]
fn registry_with_empty_active_list_loads_everything() {
    let dir = tempfile::tempdir().unwrap();
    let registry = write_registry(dir.path(), &[]);
    let doc = load_schema_document(&registry).unwrap();
    assert_eq!(doc["domains"].as_object().unwrap().len(), 2);
}

#[test]
fn plain_schema_document_is_accepted() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("schema.json");
    write_json(&path, &json!({"domains": {"Music": music_domain()}}));
    let schema = load_schema(&path).unwrap();
    assert_eq!(schema.relation_ids(), vec!["P175"]);
}

#[test]
fn unusable_schema_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("schema.json");
    write_json(&path, &json!({"something": "else"}));
    assert!(load_schema(&path).is_err());

    write_json(&path, &json!({"domains": {}}));
    assert!(load_schema(&path).is_err());

    assert!(load_schema(&dir.path().join("absent.json")).is_err());
}

#[test]
fn bundled_registry_loads() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("config/registry.json");
    let schema = load_schema(&path).unwrap();
    assert!(schema.actions_for("P175").len() >= 2);
    assert!(schema.all_root_types().contains("Q5"));
}

// ===========================================================================
// Config
// ===========================================================================

#[test]
fn config_defaults() {
    let config = BuilderConfig::default();
    assert_eq!(config.run.seed, 2025);
    assert_eq!(config.run.seed_entity, "Q26876");
    assert_eq!(config.run.seed_label, "Taylor Swift");
    assert_eq!(config.crawl.workers, 5);
    assert_eq!(config.crawl.max_nodes, 300);
    assert_eq!(config.crawl.max_branch, 4);
    assert_eq!(config.sample.tasks, 20);
    assert_eq!(config.sample.min_len, 3);
    assert_eq!(config.sample.max_len, 6);
    assert_eq!(config.service.max_attempts, 3);
    assert!(config.client_tag().starts_with("benchgraph/"));
    assert!(config.client_tag().ends_with("(seed: 2025)"));
    assert!(config.validate().is_ok());
    assert_eq!(
        config.graph_path(),
        Path::new("data").join("graphs").join("app_graph_2025.json")
    );
    assert_eq!(
        config.tasks_path(),
        Path::new("data").join("tasks").join("tasks_2025.json")
    );
}

#[test]
fn config_partial_toml_keeps_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("benchgraph.toml");
    std::fs::write(&path, "[crawl]\nworkers = 8\n\n[sample]\nstart_bias = \"uniform\"\n").unwrap();
    let config = BuilderConfig::load(&path);
    assert_eq!(config.crawl.workers, 8);
    assert_eq!(config.crawl.max_nodes, 300);
    assert_eq!(config.sample.start_bias, benchgraph_tasks::StartBias::Uniform);
    assert_eq!(config.run.seed, 2025);
}

#[test]
fn config_missing_or_invalid_falls_back() {
    let dir = tempfile::tempdir().unwrap();
    let missing = BuilderConfig::load(&dir.path().join("nope.toml"));
    assert_eq!(missing.run.seed, 2025);

    let path = dir.path().join("broken.toml");
    std::fs::write(&path, "[crawl\nworkers = ").unwrap();
    assert_eq!(BuilderConfig::load(&path).crawl.workers, 5);
}

#[test]
fn config_toml_round_trips() {
    let mut config = BuilderConfig::default();
    config.run.seed = 99;
    config.sample.max_len = 8;
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.toml");
    std::fs::write(&path, config.to_toml()).unwrap();
    let loaded = BuilderConfig::load(&path);
    assert_eq!(loaded.run.seed, 99);
    assert_eq!(loaded.sample.max_len, 8);
}

#[test]
fn config_validation_rejects_bad_lengths() {
    let mut config = BuilderConfig::default();
    config.sample.min_len = 5;
    config.sample.max_len = 4;
    assert!(config.validate().is_err());

    let mut config = BuilderConfig::default();
    config.crawl.workers = 0;
    assert!(config.validate().is_err());
}

// ===========================================================================
// Pipeline
// ===========================================================================

#[tokio::test]
async fn build_crawls_samples_validates_and_persists() {
    let dir = tempfile::tempdir().unwrap();
    let registry = write_registry(dir.path(), &[]);
    let config = test_config(&dir.path().join("data"), &registry);
    let schema = load_schema(&registry).unwrap();
    let pipeline = Pipeline::new(config.clone(), schema, Arc::new(music_world()));

    let summary = pipeline.build().await.unwrap();
    assert!(summary.crawled);
    assert_eq!(summary.graph_nodes, 6);
    assert_eq!(summary.accepted, 3);
    assert_eq!(summary.rejected, 0);

    let graph = store::load_graph(&config.graph_path()).unwrap().unwrap();
    assert_eq!(graph.node_count(), 6);
    assert_eq!(graph.label_of("A"), "Seed Artist");

    let tasks: Vec<Task> = store::load_tasks(&summary.tasks_path).unwrap();
    assert_eq!(tasks.len(), 3);
    for (n, task) in tasks.iter().enumerate() {
        assert_eq!(task.task_id, format!("task_7_{n}"));
        assert_eq!(task.path.len(), 3);
        assert!(task.distinct_apps() >= 2);
        assert_eq!(task.end, "Land");
        assert!(!task.is_refined());
    }

    let usage = UsageCounter::load(&config.usage_path()).unwrap();
    assert_eq!(usage.get("A"), 3);
    assert_eq!(usage.get("K"), 3);
}

#[tokio::test]
async fn second_build_reuses_cached_graph() {
    let dir = tempfile::tempdir().unwrap();
    let registry = write_registry(dir.path(), &[]);
    let config = test_config(&dir.path().join("data"), &registry);

    let first = Pipeline::new(config.clone(), load_schema(&registry).unwrap(), Arc::new(music_world()));
    assert!(first.build().await.unwrap().crawled);

    let service = Arc::new(music_world());
    let second = Pipeline::new(config.clone(), load_schema(&registry).unwrap(), service.clone());
    let summary = second.build().await.unwrap();
    assert!(!summary.crawled);
    assert_eq!(summary.graph_nodes, 6);

    // Only attribute lookups reach the service on a cached run.
    assert!(service
        .queries()
        .iter()
        .all(|q| matches!(q, benchgraph_query::Query::Attributes(_))));

    let usage = UsageCounter::load(&config.usage_path()).unwrap();
    assert_eq!(usage.get("K"), 6);
}

#[tokio::test]
async fn inspect_explains_neighbours() {
    let dir = tempfile::tempdir().unwrap();
    let registry = write_registry(dir.path(), &[]);
    let config = test_config(&dir.path().join("data"), &registry);
    let pipeline = Pipeline::new(config, load_schema(&registry).unwrap(), Arc::new(music_world()));

    let verdicts = pipeline.inspect("A").await;
    let forward: Vec<_> = verdicts.iter().filter(|v| v.direction == Direction::Forward).collect();
    let reverse: Vec<_> = verdicts.iter().filter(|v| v.direction == Direction::Reverse).collect();
    assert_eq!(forward.len(), 1);
    assert_eq!(forward[0].neighbor_id, "C");
    assert_eq!(reverse.len(), 3);
    assert!(verdicts.iter().all(|v| v.verdict == Verdict::Pass));
}

#[test]
fn graph_stats_count_per_app_and_domain() {
    let mut graph = benchgraph_core::Graph::new();
    for id in ["A", "B", "C"] {
        graph.add_node(benchgraph_core::Node::new(id, id));
    }
    let edge = |s: &str, t: &str, domain: &str, app: &str| benchgraph_core::Edge {
        source_id: s.into(),
        target_id: t.into(),
        app: app.into(),
        domain: domain.into(),
        action_key: "click_x".into(),
        action_description: String::new(),
        source_entity_type: "Thing".into(),
        target_entity_type: "Thing".into(),
    };
    graph.add_edge(edge("A", "B", "Music", "Spotify")).unwrap();
    graph.add_edge(edge("B", "C", "Music", "Genius")).unwrap();
    graph.add_edge(edge("A", "C", "Travel", "Maps")).unwrap();

    let stats = GraphStats::of(&graph);
    assert_eq!(stats.nodes, 3);
    assert_eq!(stats.edges, 3);
    assert_eq!(stats.edges_per_domain.get("Music"), Some(&2));
    assert_eq!(stats.edges_per_app.get("Maps"), Some(&1));
}
