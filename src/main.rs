//! benchgraph - build multi-hop benchmark tasks from a knowledge graph
//!
//! Usage:
//!   benchgraph                      → build (cached graph or crawl, then sample + validate)
//!   benchgraph crawl                → crawl and save the graph only
//!   benchgraph inspect Q26876       → show how the schema treats an entity's neighbours
//!   benchgraph stats <graph.json>   → node/edge counts per app and domain
//!   benchgraph --dump-config        → print the default config as TOML

use anyhow::Context;
use benchgraph::{load_schema, BuilderConfig, GraphStats, Pipeline};
use benchgraph_core::store;
use benchgraph_query::SparqlEndpoint;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(
    name = "benchgraph",
    about = "Schema-driven knowledge-graph crawler and multi-hop task builder",
    version = env!("CARGO_PKG_VERSION")
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Path to the builder config file (TOML)
    #[arg(short, long, global = true, default_value = "benchgraph.toml")]
    config: PathBuf,

    /// Random seed for crawling and sampling
    #[arg(long, global = true)]
    seed: Option<u64>,

    /// Concurrent remote queries
    #[arg(short, long, global = true)]
    workers: Option<usize>,

    /// Max nodes in the graph
    #[arg(long, global = true)]
    nodes: Option<usize>,

    /// Number of tasks to generate
    #[arg(long, global = true)]
    tasks: Option<usize>,

    /// Knowledge-base id of the seed entity
    #[arg(long, global = true)]
    seed_entity: Option<String>,

    /// Label for the seed entity
    #[arg(long, global = true)]
    seed_label: Option<String>,

    /// Data directory (graphs/, tasks/, usage.json)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Schema registry or schema document
    #[arg(long, global = true)]
    registry: Option<PathBuf>,

    /// SPARQL endpoint URL
    #[arg(long, global = true)]
    endpoint: Option<String>,

    /// Print the default config as TOML and exit
    #[arg(long, default_value_t = false)]
    dump_config: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Build tasks: load or crawl the graph, sample, validate, save
    Build,
    /// Crawl from the seed entity and save the graph
    Crawl,
    /// Fetch one entity and print a PASS/DROP verdict per neighbour
    Inspect {
        /// Knowledge-base id, e.g. Q26876
        entity: String,
    },
    /// Print graph statistics
    Stats {
        /// Path to a saved graph file
        graph: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    if cli.dump_config {
        print!("{}", BuilderConfig::default().to_toml());
        return Ok(());
    }

    let mut config = BuilderConfig::load(&cli.config);
    apply_overrides(&cli, &mut config);
    let _guard = init_tracing(&config.run.log_dir);
    config.validate()?;

    match cli.command {
        Some(Commands::Stats { ref graph }) => print_stats(graph),
        Some(Commands::Crawl) => {
            let pipeline = pipeline(config)?;
            let (graph, report) = pipeline.crawl().await?;
            println!(
                "Crawled {} nodes, {} edges -> {}",
                graph.node_count(),
                graph.edge_count(),
                pipeline.config().graph_path().display()
            );
            if !report.unreachable.is_empty() {
                println!("Unreachable: {}", report.unreachable.join(", "));
            }
            if !report.rejected.is_empty() {
                println!("Rejected: {}", report.rejected.join(", "));
            }
            Ok(())
        }
        Some(Commands::Inspect { ref entity }) => {
            let pipeline = pipeline(config)?;
            let verdicts = pipeline.inspect(entity).await;
            if verdicts.is_empty() {
                println!("No neighbours returned for {}", entity);
            }
            for v in &verdicts {
                println!(
                    "{:<6} {:<7} {:<8} {} ({}) types=[{}] {}",
                    v.verdict.to_string(),
                    v.direction.to_string(),
                    v.relation,
                    v.neighbor_id,
                    v.neighbor_label,
                    v.root_types.join(","),
                    v.reasons.join("; ")
                );
            }
            Ok(())
        }
        Some(Commands::Build) | None => {
            let pipeline = pipeline(config)?;
            let summary = pipeline.build().await?;
            println!(
                "Graph: {} nodes, {} edges ({})",
                summary.graph_nodes,
                summary.graph_edges,
                if summary.crawled { "crawled" } else { "cached" }
            );
            println!(
                "Tasks: {} accepted of {} candidates -> {}",
                summary.accepted,
                summary.candidates,
                summary.tasks_path.display()
            );
            Ok(())
        }
    }
}

fn apply_overrides(cli: &Cli, config: &mut BuilderConfig) {
    if let Some(seed) = cli.seed {
        config.run.seed = seed;
    }
    if let Some(workers) = cli.workers {
        config.crawl.workers = workers;
    }
    if let Some(nodes) = cli.nodes {
        config.crawl.max_nodes = nodes;
    }
    if let Some(tasks) = cli.tasks {
        config.sample.tasks = tasks;
    }
    if let Some(ref entity) = cli.seed_entity {
        config.run.seed_entity = entity.clone();
    }
    if let Some(ref label) = cli.seed_label {
        config.run.seed_label = label.clone();
    }
    if let Some(ref dir) = cli.data_dir {
        config.run.data_dir = dir.clone();
    }
    if let Some(ref registry) = cli.registry {
        config.schema.registry = registry.clone();
    }
    if let Some(ref endpoint) = cli.endpoint {
        config.service.endpoint = endpoint.clone();
    }
}

/// Stderr plus a daily log file. The guard must outlive the run so buffered
/// file output is flushed.
fn init_tracing(log_dir: &Path) -> Option<WorkerGuard> {
    let filter = || {
        tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "benchgraph=info".into())
    };

    if std::fs::create_dir_all(log_dir).is_err() {
        tracing_subscriber::registry()
            .with(filter())
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
        tracing::warn!("Cannot create log dir {}; logging to stderr only", log_dir.display());
        return None;
    }

    let appender = tracing_appender::rolling::daily(log_dir, "benchgraph.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);
    tracing_subscriber::registry()
        .with(filter())
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false),
        )
        .init();
    Some(guard)
}

fn pipeline(config: BuilderConfig) -> anyhow::Result<Pipeline> {
    let schema = load_schema(&config.schema.registry)
        .with_context(|| format!("loading schema from {}", config.schema.registry.display()))?;
    let endpoint = SparqlEndpoint::new(
        config.service.endpoint.clone(),
        &config.client_tag(),
        Duration::from_secs(config.service.timeout_secs),
    )
    .context("building HTTP client")?;
    Ok(Pipeline::new(config, schema, Arc::new(endpoint)))
}

fn print_stats(path: &Path) -> anyhow::Result<()> {
    let graph = store::load_graph(path)?
        .with_context(|| format!("no graph at {}", path.display()))?;
    let stats = GraphStats::of(&graph);
    println!("Nodes: {}", stats.nodes);
    println!("Edges: {}", stats.edges);
    println!("Edges per domain:");
    for (domain, count) in &stats.edges_per_domain {
        println!("  {:<24} {}", domain, count);
    }
    println!("Edges per app:");
    for (app, count) in &stats.edges_per_app {
        println!("  {:<24} {}", app, count);
    }
    Ok(())
}
