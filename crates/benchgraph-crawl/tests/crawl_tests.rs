//! Tests for benchgraph-crawl: branch filtering, budgeted BFS, reporting, determinism

use benchgraph_core::{Direction, SchemaIndex};
use benchgraph_crawl::*;
use benchgraph_query::mock::MockQueryService;
use benchgraph_query::{QueryExecutor, RetryPolicy, Row};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

fn social_schema() -> Arc<SchemaIndex> {
    let doc = json!({
        "domains": {
            "Social": {
                "apps": {
                    "Contacts": {
                        "entities": {
                            "Person": {
                                "type_filter": ["Q5"],
                                "constraints": ["P569"],
                                "actions": {
                                    "click_spouse": {"relation": "P26", "target": "Person", "desc": "Open spouse"},
                                    "search_spouse_of": {"relation": "reverse_P26_spouse", "target": "Person", "desc": "Find who married them"}
                                }
                            }
                        }
                    }
                }
            }
        }
    });
    Arc::new(SchemaIndex::from_value(&doc).unwrap())
}

fn config(max_nodes: usize, max_branch: usize) -> CrawlConfig {
    CrawlConfig {
        workers: 2,
        max_nodes,
        max_branch,
        seed: 2025,
        batch_delay: Duration::ZERO,
    }
}

fn crawler(service: MockQueryService, config: CrawlConfig) -> GraphCrawler {
    crawler_with(Arc::new(service), config)
}

fn crawler_with(service: Arc<MockQueryService>, config: CrawlConfig) -> GraphCrawler {
    let executor = QueryExecutor::new(service).with_policy(RetryPolicy::immediate(3));
    GraphCrawler::new(social_schema(), executor, config)
}

/// A small web of spouses, several hops deep.
fn spouse_web() -> MockQueryService {
    let people = ["A", "B", "C", "D", "E", "F", "G", "H"];
    let mut service = MockQueryService::new();
    for (i, &subject) in people.iter().enumerate() {
        for offset in [1, 3] {
            let object = people[(i + offset) % people.len()];
            service = service.with_statement(
                (subject, subject),
                "P26",
                (object, object),
                Some("Q5"),
                Some("Q5"),
            );
        }
    }
    service
}

// ===========================================================================
// Branch selection
// ===========================================================================

#[test]
fn accepted_branches_respects_direction_and_type() {
    let schema = social_schema();
    let rows = vec![
        Row::new().with("p", "P26").with("neighbor", "B").with("neighborLabel", "Bee").with("rootType", "Q5"),
        Row::new().with("p", "P26").with("neighbor", "X").with("neighborLabel", "Band"),
        Row::new().with("p", "P26").with("neighbor", "A").with("rootType", "Q5"),
    ];
    let branches = accepted_branches(&schema, "A", Direction::Forward, &rows);
    assert_eq!(branches.len(), 1);
    assert_eq!(branches[0].neighbor_id, "B");
    assert_eq!(branches[0].neighbor_label, "Bee");
    assert_eq!(branches[0].root_type.as_deref(), Some("Q5"));
    assert_eq!(branches[0].action.action_key, "click_spouse");
}

#[test]
fn reverse_branch_edge_points_at_entity() {
    let schema = social_schema();
    let rows = vec![Row::new().with("p", "P26").with("neighbor", "C").with("rootType", "Q5")];
    let branches = accepted_branches(&schema, "A", Direction::Reverse, &rows);
    assert_eq!(branches.len(), 1);
    let edge = branches[0].to_edge("A");
    assert_eq!(edge.source_id, "C");
    assert_eq!(edge.target_id, "A");
    assert_eq!(edge.action_key, "search_spouse_of");
    assert_eq!(edge.app, "Contacts");
    assert_eq!(edge.domain, "Social");
}

#[test]
fn rows_for_one_neighbour_are_merged() {
    let schema = social_schema();
    let rows = vec![
        Row::new().with("p", "P26").with("neighbor", "B").with("neighborLabel", "Bee"),
        Row::new().with("p", "P26").with("neighbor", "B").with("neighborLabel", "Bee").with("rootType", "Q5"),
    ];
    let branches = accepted_branches(&schema, "A", Direction::Forward, &rows);
    assert_eq!(branches.len(), 1);
}

#[test]
fn explain_rows_gives_verdicts() {
    let schema = social_schema();
    let rows = vec![
        Row::new().with("p", "P26").with("neighbor", "B").with("rootType", "Q5"),
        Row::new().with("p", "P26").with("neighbor", "X"),
        Row::new().with("p", "P999").with("neighbor", "Y"),
    ];
    let verdicts = explain_rows(&schema, "A", Direction::Forward, &rows);
    assert_eq!(verdicts.len(), 3);
    assert_eq!(verdicts[0].neighbor_id, "B");
    assert_eq!(verdicts[0].verdict, Verdict::Pass);
    assert_eq!(verdicts[1].neighbor_id, "X");
    assert_eq!(verdicts[1].verdict, Verdict::Drop);
    assert!(verdicts[1].reasons[0].contains("Q5"));
    assert_eq!(verdicts[2].verdict, Verdict::Ignore);
}

// ===========================================================================
// Crawl
// ===========================================================================

#[tokio::test]
async fn crawl_follows_both_directions_of_a_relation() {
    let service = MockQueryService::new()
        .with_neighbor("A", Direction::Forward, "P26", "B", "Bee", Some("Q5"))
        .with_neighbor("A", Direction::Reverse, "P26", "C", "Sea", Some("Q5"));
    let (graph, report) = crawler(service, config(3, 2)).crawl("A", "Alpha").await;

    let mut ids: Vec<&str> = graph.nodes().iter().map(|n| n.id.as_str()).collect();
    ids.sort();
    assert_eq!(ids, vec!["A", "B", "C"]);

    let mut edges: Vec<(&str, &str)> = graph
        .edges()
        .iter()
        .map(|e| (e.source_id.as_str(), e.target_id.as_str()))
        .collect();
    edges.sort();
    assert_eq!(edges, vec![("A", "B"), ("C", "A")]);

    assert_eq!(graph.label_of("A"), "Alpha");
    assert_eq!(graph.node("B").unwrap().type_tag.as_deref(), Some("Q5"));
    assert!(report.budget_reached);
    assert_eq!(report.nodes, 3);
}

#[tokio::test]
async fn crawl_never_exceeds_node_budget() {
    for budget in [1, 2, 4, 5, 7] {
        let (graph, report) = crawler(spouse_web(), config(budget, 4)).crawl("A", "A").await;
        assert!(graph.node_count() <= budget, "budget {budget}");
        assert_eq!(report.nodes, graph.node_count());
        for edge in graph.edges() {
            assert!(graph.contains(&edge.source_id));
            assert!(graph.contains(&edge.target_id));
        }
    }
}

#[tokio::test]
async fn crawl_is_deterministic_for_a_seed() {
    let (first, _) = crawler(spouse_web(), config(6, 2)).crawl("A", "A").await;
    let (second, _) = crawler(spouse_web(), config(6, 2)).crawl("A", "A").await;
    assert_eq!(
        serde_json::to_string(&first).unwrap(),
        serde_json::to_string(&second).unwrap()
    );
}

#[tokio::test]
async fn crawl_stops_when_frontier_empties() {
    let (graph, report) = crawler(spouse_web(), config(100, 4)).crawl("A", "A").await;
    assert_eq!(graph.node_count(), 8);
    assert!(!report.budget_reached);
    assert_eq!(report.expanded, 8);
}

#[tokio::test]
async fn crawl_caps_branches_per_entity() {
    let mut service = MockQueryService::new();
    for n in ["B", "C", "D", "E", "F"] {
        service = service.with_neighbor("A", Direction::Forward, "P26", n, n, Some("Q5"));
    }
    let (graph, report) = crawler(service, config(100, 2)).crawl("A", "A").await;
    assert_eq!(graph.node_count(), 3);
    assert_eq!(graph.out_degree("A"), 2);
    assert_eq!(report.branches_kept, 2);
}

#[tokio::test]
async fn crawl_applies_type_filter() {
    let service = MockQueryService::new()
        .with_neighbor("A", Direction::Forward, "P26", "B", "Bee", Some("Q5"))
        .with_neighbor("A", Direction::Forward, "P26", "R", "Rock Band", Some("Q215380"));
    let (graph, _) = crawler(service, config(100, 4)).crawl("A", "A").await;
    assert!(graph.contains("B"));
    assert!(!graph.contains("R"));
}

#[tokio::test]
async fn crawl_separates_unreachable_from_exhausted() {
    let service = MockQueryService::new()
        .with_neighbor("A", Direction::Forward, "P26", "B", "Bee", Some("Q5"))
        .with_neighbor("A", Direction::Forward, "P26", "U", "You", Some("Q5"))
        .with_unreachable("U");
    let (graph, report) = crawler(service, config(100, 4)).crawl("A", "A").await;
    assert_eq!(graph.node_count(), 3);
    assert_eq!(report.unreachable, vec!["U".to_string()]);
    assert_eq!(report.exhausted, vec!["B".to_string()]);
    assert!(report.is_degenerate(5));
}

#[tokio::test]
async fn crawl_keeps_rejected_queries_out_of_unreachable() {
    let service = Arc::new(
        MockQueryService::new()
            .with_neighbor("A", Direction::Forward, "P26", "B", "Bee", Some("Q5"))
            .with_neighbor("A", Direction::Forward, "P26", "X", "Ex", Some("Q5"))
            .with_rejected("X"),
    );
    let (graph, report) = crawler_with(service.clone(), config(100, 4)).crawl("A", "A").await;
    assert_eq!(graph.node_count(), 3);
    assert_eq!(report.rejected, vec!["X".to_string()]);
    assert!(report.unreachable.is_empty());
    assert_eq!(report.exhausted, vec!["B".to_string()]);
    // A permanent error is not retried: one forward and one reverse query for X.
    let x_queries = service.queries().iter().filter(|q| q.entity() == "X").count();
    assert_eq!(x_queries, 2);
}

#[tokio::test]
async fn crawl_of_isolated_seed_returns_single_node() {
    let (graph, report) = crawler(MockQueryService::new(), config(10, 4)).crawl("Z", "Zed").await;
    assert_eq!(graph.node_count(), 1);
    assert_eq!(graph.edge_count(), 0);
    assert_eq!(report.exhausted, vec!["Z".to_string()]);
}

#[tokio::test]
async fn inspect_reports_both_directions() {
    let service = MockQueryService::new()
        .with_neighbor("A", Direction::Forward, "P26", "B", "Bee", Some("Q5"))
        .with_neighbor("A", Direction::Reverse, "P26", "R", "Rock Band", Some("Q215380"));
    let verdicts = crawler(service, config(10, 4)).inspect("A").await;
    assert_eq!(verdicts.len(), 2);
    assert_eq!(verdicts[0].direction, Direction::Forward);
    assert_eq!(verdicts[0].verdict, Verdict::Pass);
    assert_eq!(verdicts[1].direction, Direction::Reverse);
    assert_eq!(verdicts[1].verdict, Verdict::Drop);
}
