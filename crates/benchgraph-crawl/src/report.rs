//! Crawl report - what happened to each expanded entity.

use serde::Serialize;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CrawlReport {
    /// Entities whose neighbours were fetched.
    pub expanded: usize,
    /// Entities the service answered for, but with nothing the schema accepts.
    pub exhausted: Vec<String>,
    /// Entities whose queries failed after all retries. Worth retrying on a
    /// later run; `exhausted` and `rejected` ones are not.
    pub unreachable: Vec<String>,
    /// Entities whose queries the service refused outright (4xx).
    pub rejected: Vec<String>,
    /// Branches kept after shuffling and the branch cap.
    pub branches_kept: usize,
    /// Kept branches dropped because the node budget blocked a new neighbour.
    pub budget_skipped: usize,
    pub budget_reached: bool,
    pub nodes: usize,
    pub edges: usize,
}

impl CrawlReport {
    pub fn is_degenerate(&self, minimum_nodes: usize) -> bool {
        self.nodes < minimum_nodes
    }
}
