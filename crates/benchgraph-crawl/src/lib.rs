//! benchgraph-crawl - schema-driven breadth-first graph crawler
//!
//! Expands a seed entity through the relations the app schema knows about,
//! keeping at most `max_branch` neighbours per entity and stopping at a node
//! budget. Fetches run concurrently; merging into the graph does not.

pub mod branch;
pub mod crawler;
pub mod report;

pub use branch::{accepted_branches, explain_rows, Branch, NeighborVerdict, Verdict};
pub use crawler::{CrawlConfig, EntityFetch, GraphCrawler};
pub use report::CrawlReport;
