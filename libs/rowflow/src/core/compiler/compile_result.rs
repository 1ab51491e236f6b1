// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use std::fmt;

use serde::Serialize;

/// Statistics of one compilation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CompileResult {
    /// Nodes taking part in the run.
    pub nodes: usize,
    /// Sum of resolved copies over all nodes.
    pub containers: usize,
    /// Edges that received queues.
    pub edges_wired: usize,
    /// Edges skipped because one end is a sub-graph boundary.
    pub edges_skipped: usize,
    pub queues_allocated: usize,
    /// Edges whose partitioning changes across the hop.
    pub repartitioned_edges: usize,
}

impl fmt::Display for CompileResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CompileResult {{ {} nodes, {} containers, {} edges ({} skipped), {} queues, {} repartitioned }}",
            self.nodes,
            self.containers,
            self.edges_wired,
            self.edges_skipped,
            self.queues_allocated,
            self.repartitioned_edges
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let result = CompileResult {
            nodes: 3,
            containers: 3,
            edges_wired: 2,
            queues_allocated: 2,
            ..Default::default()
        };
        assert_eq!(
            result.to_string(),
            "CompileResult { 3 nodes, 3 containers, 2 edges (0 skipped), 2 queues, 0 repartitioned }"
        );
    }
}
