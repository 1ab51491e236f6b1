// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Queue allocation and run order, checked through the public API.

mod common;

use common::{collected, fast_config, graph, registry};
use rowflow::core::DispatchType;
use rowflow::{
    compile, EngineError, NodeDefinition, PartitionDescriptor, PipelineEngine, PipelineGraph,
    Variables,
};

fn partitioned(name: &str, copies: i64, schema: &str) -> NodeDefinition {
    NodeDefinition::new(name, "dummy")
        .with_copies(copies)
        .with_partitioning(PartitionDescriptor::mod_remainder(0, schema))
}

fn compile_default(g: &PipelineGraph) -> rowflow::Result<rowflow::core::CompiledPipeline> {
    compile(g, &Variables::default(), 16)
}

#[test]
fn test_same_partitioning_keeps_copies_parallel() {
    let g = graph(
        "same",
        vec![partitioned("a", 2, "by-id"), partitioned("b", 2, "by-id")],
        &[("a", "b")],
    );
    let compiled = compile_default(&g).unwrap();
    let edge = compiled.topology.edge("a", "b").unwrap();
    assert_eq!(edge.dispatch, DispatchType::Parallel);
    assert_eq!(edge.queues.len(), 2);
    assert!(!edge.partitioning.repartition);
    assert!(compiled.topology.find_queue("a", 0, "b", 0).is_some());
    assert!(compiled.topology.find_queue("a", 0, "b", 1).is_none());
}

#[test]
fn test_different_schema_repartitions_full_fan() {
    let g = graph(
        "different",
        vec![partitioned("a", 2, "by-id"), partitioned("b", 2, "by-region")],
        &[("a", "b")],
    );
    let compiled = compile_default(&g).unwrap();
    let edge = compiled.topology.edge("a", "b").unwrap();
    assert_eq!(edge.dispatch, DispatchType::FullFan);
    assert_eq!(edge.queues.len(), 4);
    assert!(edge.partitioning.repartition);
    assert_eq!(compiled.result.repartitioned_edges, 1);
}

#[test]
fn test_target_partitioning_override() {
    let g = graph(
        "override",
        vec![
            partitioned("a", 2, "by-id")
                .with_target_partitioning(PartitionDescriptor::mod_remainder(0, "by-id")),
            partitioned("b", 2, "by-region"),
        ],
        &[("a", "b")],
    );
    let compiled = compile_default(&g).unwrap();
    assert_eq!(compiled.topology.edge("a", "b").unwrap().queues.len(), 2);
    assert_eq!(compiled.result.repartitioned_edges, 0);
}

#[test]
fn test_compile_twice_gives_same_tags() {
    let g = graph(
        "idempotent",
        vec![
            NodeDefinition::new("gen", "generate_rows"),
            NodeDefinition::new("work", "dummy").with_copies(3),
            partitioned("sink", 2, "by-id"),
        ],
        &[("gen", "work"), ("work", "sink")],
    );
    let first = compile_default(&g).unwrap();
    let second = compile_default(&g).unwrap();
    assert_eq!(first.topology.tags(), second.topology.tags());
    assert_eq!(first.result, second.result);
    // 1 -> 3 plus a repartitioned 3 -> 2
    assert_eq!(first.topology.queue_count(), 3 + 6);
}

#[test]
fn test_negative_copies_rejected_before_any_thread() {
    let g = graph(
        "negative",
        vec![
            NodeDefinition::new("gen", "generate_rows"),
            NodeDefinition::new("sink", "dummy").with_copies(-2),
        ],
        &[("gen", "sink")],
    );
    assert!(matches!(
        compile_default(&g),
        Err(EngineError::Configuration(_))
    ));

    let rows = collected();
    let mut engine = PipelineEngine::with_config(g, registry(&rows), fast_config());
    assert!(matches!(
        engine.prepare_execution(),
        Err(EngineError::Configuration(_))
    ));
    assert_eq!(engine.nr_containers(), 0);
    assert_eq!(engine.status(), "Waiting");
}

#[test]
fn test_unresolved_copies_variable_rejected() {
    let g = graph(
        "unresolved",
        vec![NodeDefinition::new("work", "dummy").with_copies_expr("${UNSET}")],
        &[],
    );
    assert!(matches!(
        compile_default(&g),
        Err(EngineError::Configuration(_))
    ));

    let vars = Variables::new().with("UNSET", "2");
    let compiled = compile(&g, &vars, 16).unwrap();
    assert_eq!(compiled.node("work").unwrap().copies, 2);
}

#[test]
fn test_subgraph_edges_skipped() {
    let g = graph(
        "mapping",
        vec![
            NodeDefinition::new("gen", "generate_rows"),
            NodeDefinition::new("mapping", "dummy").as_subgraph(),
            NodeDefinition::new("sink", "dummy"),
        ],
        &[("gen", "mapping"), ("mapping", "sink"), ("gen", "sink")],
    );
    let compiled = compile_default(&g).unwrap();
    assert_eq!(compiled.result.edges_skipped, 2);
    assert_eq!(compiled.result.edges_wired, 1);
    assert!(compiled.topology.edge("gen", "mapping").is_none());
    assert!(compiled.topology.edge("gen", "sink").is_some());
}

#[test]
fn test_containers_ordered_upstream_first() {
    let rows = collected();
    let g = graph(
        "order",
        vec![
            NodeDefinition::new("sink", "collect"),
            NodeDefinition::new("work", "dummy").with_copies(2),
            NodeDefinition::new("gen", "generate_rows"),
        ],
        &[("gen", "work"), ("work", "sink")],
    );

    let mut engine = PipelineEngine::with_config(g, registry(&rows), fast_config());
    engine.prepare_execution().unwrap();
    let labels: Vec<String> = engine
        .container_statuses()
        .into_iter()
        .map(|(label, _)| label)
        .collect();
    assert_eq!(labels, vec!["gen.0", "work.0", "work.1", "sink.0"]);

    engine.start_threads().unwrap();
    engine.wait_until_finished().unwrap();
    assert_eq!(rows.lock().len(), 10);
}
