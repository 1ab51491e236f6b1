// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Bidirectional bubble (cocktail) sort of containers into run order.
//!
//! The order is advisory: it stabilizes initialization and diagnostics.
//! Data delivery never depends on it.

use std::collections::HashMap;

use crate::core::graph::PipelineGraph;

/// Something that can be placed in run order.
pub trait RunOrderItem {
    fn node_name(&self) -> &str;
    fn copy_index(&self) -> usize;
}

/// How a sort ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortOutcome {
    pub passes: usize,
    /// Both window ends met before the pass budget ran out.
    pub converged: bool,
    /// No predecessor appears after one of its successors.
    pub ordered: bool,
}

/// Per-node facts the comparisons need, computed once.
struct OrderKeys {
    /// `ancestor[a][b]`: node a reaches node b.
    ancestor: Vec<Vec<bool>>,
    /// Longest hop distance from an input node, capped on cycles.
    rank: Vec<usize>,
}

impl OrderKeys {
    fn new(graph: &PipelineGraph, names: &[String]) -> Self {
        let ancestor = names
            .iter()
            .map(|a| names.iter().map(|b| graph.is_ancestor(a, b)).collect())
            .collect();

        let position: HashMap<&str, usize> = names
            .iter()
            .enumerate()
            .map(|(i, n)| (n.as_str(), i))
            .collect();
        let mut rank = vec![0usize; names.len()];
        for _ in 0..names.len() {
            let mut changed = false;
            for (from, to) in graph.edges() {
                let (Some(&f), Some(&t)) =
                    (position.get(from.name.as_str()), position.get(to.name.as_str()))
                else {
                    continue;
                };
                if rank[t] < rank[f] + 1 && rank[f] < names.len() {
                    rank[t] = rank[f] + 1;
                    changed = true;
                }
            }
            if !changed {
                break;
            }
        }

        Self { ancestor, rank }
    }

    /// The item at `later` has to move in front of the item at `earlier`.
    fn must_swap(&self, earlier: (usize, usize), later: (usize, usize)) -> bool {
        let ((e_node, e_copy), (l_node, l_copy)) = (earlier, later);
        if e_node == l_node {
            return l_copy < e_copy;
        }
        let later_first = self.ancestor[l_node][e_node];
        let earlier_first = self.ancestor[e_node][l_node];
        match (later_first, earlier_first) {
            (true, false) => true,
            (false, true) => false,
            // Unrelated, or on a common cycle.
            _ => (self.rank[l_node], l_node) < (self.rank[e_node], e_node),
        }
    }

    fn violates(&self, earlier: usize, later: usize) -> bool {
        earlier != later && self.ancestor[later][earlier] && !self.ancestor[earlier][later]
    }
}

/// Sort `items` so predecessors come before their successors, and copies of
/// one node by ascending copy index.
///
/// At most `2 * items.len()` passes are made. If that budget runs out the
/// order is left as far as it got and `converged` is false; `ordered`
/// reports whether the result still satisfies every dependency.
pub fn sort_run_order<T: RunOrderItem>(items: &mut [T], graph: &PipelineGraph) -> SortOutcome {
    let mut names: Vec<String> = graph.nodes().map(|n| n.name.clone()).collect();
    for item in items.iter() {
        if !names.iter().any(|n| n == item.node_name()) {
            names.push(item.node_name().to_string());
        }
    }
    let position: HashMap<&str, usize> = names
        .iter()
        .enumerate()
        .map(|(i, n)| (n.as_str(), i))
        .collect();
    let keys = OrderKeys::new(graph, &names);

    let mut slots: Vec<(usize, usize)> = items
        .iter()
        .map(|item| (position[item.node_name()], item.copy_index()))
        .collect();

    let budget = items.len() * 2;
    let mut lo = 0usize;
    let mut hi = items.len().saturating_sub(1);
    let mut passes = 0usize;
    let mut converged = items.len() < 2;

    while !converged && passes < budget {
        // Forward: carries the largest element to the top of the window.
        let mut last_swap = lo;
        for y in lo..hi {
            if keys.must_swap(slots[y], slots[y + 1]) {
                slots.swap(y, y + 1);
                items.swap(y, y + 1);
                last_swap = y;
            }
        }
        hi = last_swap;
        passes += 1;
        if lo >= hi {
            converged = true;
            break;
        }

        // Backward: carries the smallest element to the bottom.
        let mut last_swap = hi;
        for z in (lo + 1..=hi).rev() {
            if keys.must_swap(slots[z - 1], slots[z]) {
                slots.swap(z - 1, z);
                items.swap(z - 1, z);
                last_swap = z;
            }
        }
        lo = last_swap;
        passes += 1;
        if lo >= hi {
            converged = true;
        }
    }

    let ordered = (0..slots.len()).all(|i| {
        (i + 1..slots.len()).all(|j| !keys.violates(slots[i].0, slots[j].0))
    });

    if !converged {
        tracing::warn!(
            "Run order did not converge within {} passes; keeping best-effort order",
            budget
        );
    } else if !ordered {
        tracing::warn!("Run order is not dependency-consistent (graph has a cycle)");
    }

    SortOutcome {
        passes,
        converged,
        ordered,
    }
}
