// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use std::collections::HashMap;
use std::sync::Arc;

use petgraph::algo::{has_path_connecting, is_cyclic_directed};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;

use super::NodeDefinition;
use crate::core::{EngineError, Result};

/// Pipeline topology (directed graph of steps).
///
/// Node and hop order is the declaration order, which the compiler relies
/// on for a deterministic queue topology.
#[derive(Debug, Clone, Default)]
pub struct PipelineGraph {
    name: String,
    graph: DiGraph<Arc<NodeDefinition>, ()>,
    name_to_node: HashMap<String, NodeIndex>,
}

impl PipelineGraph {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn add_node(&mut self, node: NodeDefinition) -> Result<()> {
        if self.name_to_node.contains_key(&node.name) {
            return Err(EngineError::Configuration(format!(
                "Duplicate node name: '{}'",
                node.name
            )));
        }
        let name = node.name.clone();
        let idx = self.graph.add_node(Arc::new(node));
        self.name_to_node.insert(name, idx);
        Ok(())
    }

    /// Declare a hop `from -> to`.
    pub fn add_edge(&mut self, from: &str, to: &str) -> Result<()> {
        let from_idx = self.index_of(from)?;
        let to_idx = self.index_of(to)?;
        if from_idx == to_idx {
            return Err(EngineError::Configuration(format!(
                "Node '{}' cannot feed itself",
                from
            )));
        }
        if self.graph.find_edge(from_idx, to_idx).is_some() {
            return Err(EngineError::Configuration(format!(
                "Duplicate hop: '{}' -> '{}'",
                from, to
            )));
        }
        self.graph.add_edge(from_idx, to_idx, ());
        Ok(())
    }

    pub fn node(&self, name: &str) -> Option<&Arc<NodeDefinition>> {
        self.name_to_node.get(name).map(|idx| &self.graph[*idx])
    }

    /// All nodes in declaration order.
    pub fn nodes(&self) -> impl Iterator<Item = &Arc<NodeDefinition>> {
        self.graph.node_indices().map(move |idx| &self.graph[idx])
    }

    /// All hops in declaration order.
    pub fn edges(&self) -> impl Iterator<Item = (&Arc<NodeDefinition>, &Arc<NodeDefinition>)> {
        self.graph.edge_indices().filter_map(move |e| {
            self.graph
                .edge_endpoints(e)
                .map(|(a, b)| (&self.graph[a], &self.graph[b]))
        })
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Direct successors of `name`, in hop declaration order.
    pub fn find_next(&self, name: &str) -> Vec<&Arc<NodeDefinition>> {
        self.neighbors(name, Direction::Outgoing)
    }

    /// Direct predecessors of `name`, in hop declaration order.
    pub fn find_previous(&self, name: &str) -> Vec<&Arc<NodeDefinition>> {
        self.neighbors(name, Direction::Incoming)
    }

    /// Input nodes have no upstream predecessor.
    pub fn is_input(&self, name: &str) -> bool {
        self.find_previous(name).is_empty()
    }

    /// Whether `ancestor` can reach `descendant` through one or more hops.
    pub fn is_ancestor(&self, ancestor: &str, descendant: &str) -> bool {
        match (
            self.name_to_node.get(ancestor),
            self.name_to_node.get(descendant),
        ) {
            (Some(a), Some(d)) if a != d => has_path_connecting(&self.graph, *a, *d, None),
            _ => false,
        }
    }

    pub fn has_cycles(&self) -> bool {
        is_cyclic_directed(&self.graph)
    }

    /// Structural checks that do not need variables resolved.
    pub fn validate(&self) -> Result<()> {
        for node in self.nodes() {
            if node.name.trim().is_empty() {
                return Err(EngineError::Configuration(
                    "Node names must not be empty".into(),
                ));
            }
            if node.step_type.trim().is_empty() {
                return Err(EngineError::Configuration(format!(
                    "Node '{}' has no step type",
                    node.name
                )));
            }
        }
        if self.has_cycles() {
            tracing::warn!(
                "Pipeline '{}' contains a cycle; run order is best-effort",
                self.name
            );
        }
        Ok(())
    }

    fn index_of(&self, name: &str) -> Result<NodeIndex> {
        self.name_to_node
            .get(name)
            .copied()
            .ok_or_else(|| EngineError::Configuration(format!("Unknown node: '{}'", name)))
    }

    fn neighbors(&self, name: &str, direction: Direction) -> Vec<&Arc<NodeDefinition>> {
        let Some(idx) = self.name_to_node.get(name) else {
            return Vec::new();
        };
        let mut edges: Vec<_> = self.graph.edges_directed(*idx, direction).collect();
        edges.sort_by_key(|e| e.id());
        edges
            .into_iter()
            .map(|e| match direction {
                Direction::Outgoing => &self.graph[e.target()],
                Direction::Incoming => &self.graph[e.source()],
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn linear() -> PipelineGraph {
        let mut g = PipelineGraph::new("linear");
        g.add_node(NodeDefinition::new("a", "dummy")).unwrap();
        g.add_node(NodeDefinition::new("b", "dummy")).unwrap();
        g.add_node(NodeDefinition::new("c", "dummy")).unwrap();
        g.add_edge("a", "b").unwrap();
        g.add_edge("b", "c").unwrap();
        g
    }

    #[test]
    fn test_find_next_and_previous() {
        let g = linear();
        let next: Vec<_> = g.find_next("a").iter().map(|n| n.name.clone()).collect();
        assert_eq!(next, vec!["b"]);
        let prev: Vec<_> = g.find_previous("c").iter().map(|n| n.name.clone()).collect();
        assert_eq!(prev, vec!["b"]);
        assert!(g.is_input("a"));
        assert!(!g.is_input("b"));
    }

    #[test]
    fn test_next_in_declaration_order() {
        let mut g = PipelineGraph::new("fan");
        for name in ["src", "x", "y", "z"] {
            g.add_node(NodeDefinition::new(name, "dummy")).unwrap();
        }
        g.add_edge("src", "y").unwrap();
        g.add_edge("src", "x").unwrap();
        g.add_edge("src", "z").unwrap();
        let next: Vec<_> = g.find_next("src").iter().map(|n| n.name.clone()).collect();
        assert_eq!(next, vec!["y", "x", "z"]);
    }

    #[test]
    fn test_transitive_ancestry() {
        let g = linear();
        assert!(g.is_ancestor("a", "c"));
        assert!(!g.is_ancestor("c", "a"));
        assert!(!g.is_ancestor("a", "a"));
    }

    #[test]
    fn test_rejects_bad_edges() {
        let mut g = linear();
        assert!(g.add_edge("a", "missing").is_err());
        assert!(g.add_edge("a", "a").is_err());
        assert!(g.add_edge("a", "b").is_err());
        assert!(g.add_node(NodeDefinition::new("a", "dummy")).is_err());
    }
}
