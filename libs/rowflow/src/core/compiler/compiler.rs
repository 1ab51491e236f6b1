// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Graph-to-queue-topology compilation.
//!
//! Compilation is pure: it reads the graph and variables, allocates fresh
//! queues and never starts a thread. Compiling the same inputs twice gives
//! the same tag multiset.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;

use super::partition_resolver::{resolve_edge, EdgePartitioning};
use super::{CompilePhase, CompileResult, DispatchType};
use crate::core::config::Variables;
use crate::core::graph::{NodeDefinition, PartitionMethod, PipelineGraph};
use crate::core::queue::{QueueTag, RowQueue};
use crate::core::{EngineError, Result};

/// A node with its copy count resolved.
#[derive(Debug, Clone)]
pub struct ResolvedNode {
    pub definition: Arc<NodeDefinition>,
    pub copies: usize,
    /// No upstream predecessor.
    pub is_input: bool,
    /// Redistribution applied to rows arriving at this node, taken from the
    /// first incoming edge that repartitions.
    pub repartitioning: PartitionMethod,
}

impl ResolvedNode {
    pub fn name(&self) -> &str {
        &self.definition.name
    }
}

/// Queues allocated for one edge.
#[derive(Debug)]
pub struct EdgeAllocation {
    pub from: String,
    pub to: String,
    pub from_copies: usize,
    pub to_copies: usize,
    pub dispatch: DispatchType,
    pub partitioning: EdgePartitioning,
    /// In allocation order, see [`DispatchType::pairs`].
    pub queues: Vec<Arc<RowQueue>>,
}

impl EdgeAllocation {
    /// Queues fed by `from_copy`, ordered by destination copy.
    pub fn queues_from(&self, from_copy: usize) -> Vec<Arc<RowQueue>> {
        self.queues
            .iter()
            .filter(|q| q.tag().origin_copy == from_copy)
            .cloned()
            .collect()
    }

    /// Queues consumed by `to_copy`, ordered by source copy.
    pub fn queues_to(&self, to_copy: usize) -> Vec<Arc<RowQueue>> {
        self.queues
            .iter()
            .filter(|q| q.tag().dest_copy == to_copy)
            .cloned()
            .collect()
    }
}

/// Every queue of one run, grouped per edge in declaration order.
#[derive(Debug, Default)]
pub struct QueueTopology {
    edges: Vec<EdgeAllocation>,
}

impl QueueTopology {
    pub fn edges(&self) -> &[EdgeAllocation] {
        &self.edges
    }

    pub fn edge(&self, from: &str, to: &str) -> Option<&EdgeAllocation> {
        self.edges.iter().find(|e| e.from == from && e.to == to)
    }

    pub fn queue_count(&self) -> usize {
        self.edges.iter().map(|e| e.queues.len()).sum()
    }

    pub fn queues(&self) -> impl Iterator<Item = &Arc<RowQueue>> {
        self.edges.iter().flat_map(|e| e.queues.iter())
    }

    /// Sorted tags of every queue.
    pub fn tags(&self) -> Vec<QueueTag> {
        let mut tags: Vec<QueueTag> = self.queues().map(|q| q.tag().clone()).collect();
        tags.sort();
        tags
    }

    pub fn find_queue(
        &self,
        from: &str,
        from_copy: usize,
        to: &str,
        to_copy: usize,
    ) -> Option<&Arc<RowQueue>> {
        self.queues()
            .find(|q| q.tag().matches(from, from_copy, to, to_copy))
    }

    /// Every queue read by `node.copy`, grouped by incoming edge.
    pub fn inputs_of(&self, node: &str, copy: usize) -> Vec<Arc<RowQueue>> {
        self.edges
            .iter()
            .filter(|e| e.to == node)
            .flat_map(|e| e.queues_to(copy))
            .collect()
    }

    /// Outgoing edges of `node` with the queues `copy` writes to.
    pub fn outputs_of(&self, node: &str, copy: usize) -> Vec<(&EdgeAllocation, Vec<Arc<RowQueue>>)> {
        self.edges
            .iter()
            .filter(|e| e.from == node)
            .map(|e| (e, e.queues_from(copy)))
            .collect()
    }

    pub fn plan(&self) -> Vec<EdgePlan> {
        self.edges
            .iter()
            .map(|e| EdgePlan {
                from: e.from.clone(),
                to: e.to.clone(),
                from_copies: e.from_copies,
                to_copies: e.to_copies,
                dispatch: e.dispatch,
                repartition: e.partitioning.repartition,
                method: e.partitioning.method.clone(),
                queues: e.queues.iter().map(|q| q.tag().clone()).collect(),
            })
            .collect()
    }
}

/// Serializable description of one edge's allocation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EdgePlan {
    pub from: String,
    pub to: String,
    pub from_copies: usize,
    pub to_copies: usize,
    pub dispatch: DispatchType,
    pub repartition: bool,
    pub method: PartitionMethod,
    pub queues: Vec<QueueTag>,
}

/// Output of [`GraphCompiler::compile`].
#[derive(Debug)]
pub struct CompiledPipeline {
    pub nodes: Vec<ResolvedNode>,
    pub topology: QueueTopology,
    pub result: CompileResult,
}

impl CompiledPipeline {
    pub fn node(&self, name: &str) -> Option<&ResolvedNode> {
        self.nodes.iter().find(|n| n.name() == name)
    }
}

pub struct GraphCompiler<'a> {
    graph: &'a PipelineGraph,
    variables: &'a Variables,
    queue_capacity: usize,
}

impl<'a> GraphCompiler<'a> {
    pub fn new(graph: &'a PipelineGraph, variables: &'a Variables, queue_capacity: usize) -> Self {
        Self {
            graph,
            variables,
            queue_capacity,
        }
    }

    pub fn compile(&self) -> Result<CompiledPipeline> {
        self.graph.validate()?;

        tracing::debug!("[{}] {}", self.graph.name(), CompilePhase::Resolve);
        let copies = self.resolve_copies()?;

        tracing::debug!("[{}] {}", self.graph.name(), CompilePhase::Allocate);
        let mut result = CompileResult {
            nodes: self.graph.node_count(),
            containers: copies.values().sum(),
            ..Default::default()
        };
        let mut repartitioning: HashMap<&str, PartitionMethod> = HashMap::new();
        let mut edges = Vec::new();

        for (from, to) in self.graph.edges() {
            if from.subgraph || to.subgraph {
                tracing::debug!(
                    "Skipping hop {} -> {}: sub-graph boundary allocates its own queues",
                    from.name,
                    to.name
                );
                result.edges_skipped += 1;
                continue;
            }

            let from_copies = copies[from.name.as_str()];
            let to_copies = copies[to.name.as_str()];
            let partitioning = resolve_edge(from, to);
            let dispatch = DispatchType::select(from_copies, to_copies, partitioning.repartition);

            let queues = dispatch
                .pairs(from_copies, to_copies)
                .into_iter()
                .map(|(s, t)| {
                    let tag = QueueTag::new(from.name.as_str(), s, to.name.as_str(), t);
                    RowQueue::new(tag, self.queue_capacity).map(Arc::new)
                })
                .collect::<Result<Vec<_>>>()?;

            tracing::debug!(
                "Hop {} -> {}: {} copies -> {} copies, {} (repartition={}), {} queue(s)",
                from.name,
                to.name,
                from_copies,
                to_copies,
                dispatch,
                partitioning.repartition,
                queues.len()
            );

            if partitioning.repartition {
                result.repartitioned_edges += 1;
                repartitioning
                    .entry(to.name.as_str())
                    .or_insert_with(|| partitioning.method.clone());
            }
            result.edges_wired += 1;
            result.queues_allocated += queues.len();

            edges.push(EdgeAllocation {
                from: from.name.clone(),
                to: to.name.clone(),
                from_copies,
                to_copies,
                dispatch,
                partitioning,
                queues,
            });
        }

        let nodes = self
            .graph
            .nodes()
            .map(|node| ResolvedNode {
                definition: Arc::clone(node),
                copies: copies[node.name.as_str()],
                is_input: self.graph.is_input(&node.name),
                repartitioning: repartitioning
                    .get(node.name.as_str())
                    .cloned()
                    .unwrap_or_default(),
            })
            .collect();

        tracing::debug!("[{}] {}", self.graph.name(), result);
        Ok(CompiledPipeline {
            nodes,
            topology: QueueTopology { edges },
            result,
        })
    }

    /// Every copy count must resolve to a non-negative integer before any
    /// queue is allocated.
    fn resolve_copies(&self) -> Result<HashMap<&'a str, usize>> {
        let mut copies = HashMap::new();
        for node in self.graph.nodes() {
            let resolved = node.copies.resolve(self.variables);
            let count = usize::try_from(resolved).map_err(|_| {
                EngineError::Configuration(format!(
                    "Node '{}' has an invalid number of copies ({:?} resolved to {})",
                    node.name, node.copies, resolved
                ))
            })?;
            copies.insert(node.name.as_str(), count);
        }
        Ok(copies)
    }
}

/// Compile `graph` with the given variables and queue capacity.
pub fn compile(
    graph: &PipelineGraph,
    variables: &Variables,
    queue_capacity: usize,
) -> Result<CompiledPipeline> {
    GraphCompiler::new(graph, variables, queue_capacity).compile()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::graph::PartitionDescriptor;

    fn graph(nodes: Vec<NodeDefinition>, hops: &[(&str, &str)]) -> PipelineGraph {
        let mut g = PipelineGraph::new("test");
        for node in nodes {
            g.add_node(node).unwrap();
        }
        for (from, to) in hops {
            g.add_edge(from, to).unwrap();
        }
        g
    }

    #[test]
    fn test_linear_one_to_one() {
        let g = graph(
            vec![
                NodeDefinition::new("a", "dummy"),
                NodeDefinition::new("b", "dummy"),
                NodeDefinition::new("c", "dummy"),
            ],
            &[("a", "b"), ("b", "c")],
        );
        let compiled = compile(&g, &Variables::new(), 10).unwrap();
        assert_eq!(compiled.topology.queue_count(), 2);
        assert!(compiled.topology.find_queue("a", 0, "b", 0).is_some());
        assert!(compiled.topology.find_queue("b", 0, "c", 0).is_some());
        assert!(compiled.node("a").unwrap().is_input);
        assert!(!compiled.node("c").unwrap().is_input);
    }

    #[test]
    fn test_negative_copies_is_configuration_error() {
        let g = graph(
            vec![
                NodeDefinition::new("a", "dummy"),
                NodeDefinition::new("b", "dummy").with_copies_expr("${UNSET}"),
            ],
            &[("a", "b")],
        );
        let err = compile(&g, &Variables::new(), 10).unwrap_err();
        assert!(matches!(err, EngineError::Configuration(_)));
    }

    #[test]
    fn test_subgraph_edges_are_skipped() {
        let g = graph(
            vec![
                NodeDefinition::new("a", "dummy"),
                NodeDefinition::new("mapping", "dummy").as_subgraph(),
                NodeDefinition::new("c", "dummy"),
            ],
            &[("a", "mapping"), ("mapping", "c"), ("a", "c")],
        );
        let compiled = compile(&g, &Variables::new(), 10).unwrap();
        assert_eq!(compiled.result.edges_skipped, 2);
        assert_eq!(compiled.topology.queue_count(), 1);
    }

    #[test]
    fn test_repartitioning_recorded_on_destination() {
        let g = graph(
            vec![
                NodeDefinition::new("a", "dummy").with_copies(2),
                NodeDefinition::new("b", "dummy")
                    .with_copies(2)
                    .with_partitioning(PartitionDescriptor::mod_remainder(0, "s")),
            ],
            &[("a", "b")],
        );
        let compiled = compile(&g, &Variables::new(), 10).unwrap();
        assert_eq!(
            compiled.node("b").unwrap().repartitioning,
            PartitionMethod::ModRemainder { field: 0 }
        );
        assert_eq!(compiled.node("a").unwrap().repartitioning, PartitionMethod::None);
        assert_eq!(compiled.topology.queue_count(), 4);
    }

    #[test]
    fn test_io_lookup_by_copy() {
        let g = graph(
            vec![
                NodeDefinition::new("a", "dummy").with_copies(2),
                NodeDefinition::new("b", "dummy").with_copies(3),
            ],
            &[("a", "b")],
        );
        let compiled = compile(&g, &Variables::new(), 10).unwrap();
        let outputs = compiled.topology.outputs_of("a", 1);
        assert_eq!(outputs.len(), 1);
        let dest: Vec<usize> = outputs[0].1.iter().map(|q| q.tag().dest_copy).collect();
        assert_eq!(dest, vec![0, 1, 2]);
        assert_eq!(compiled.topology.inputs_of("b", 2).len(), 2);
    }
}
