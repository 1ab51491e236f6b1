// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Test steps and helpers shared by the integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use parking_lot::Mutex;
use rowflow::core::BoxedStep;
use rowflow::{
    EngineConfig, EngineError, NodeDefinition, PipelineGraph, Result, Row, StepContext, StepIo,
    StepRegistry, StepRuntime,
};

/// Rows seen by `collect` steps, tagged with the receiving copy.
pub type Collected = Arc<Mutex<Vec<(usize, Row)>>>;

/// Sink that records every row it reads.
pub struct CollectStep {
    copy: usize,
    sink: Collected,
}

impl CollectStep {
    pub fn new(copy: usize, sink: Collected) -> Self {
        Self { copy, sink }
    }
}

impl StepRuntime for CollectStep {
    fn init(&mut self, _ctx: &StepContext, _io: &mut StepIo) -> Result<()> {
        Ok(())
    }

    fn process_one_iteration(&mut self, _ctx: &StepContext, io: &mut StepIo) -> Result<bool> {
        match io.get_batch() {
            Some(batch) => {
                io.counters().add_output(batch.len() as u64);
                let mut sink = self.sink.lock();
                sink.extend(batch.into_iter().map(|row| (self.copy, row)));
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

/// Fails in `init`.
pub struct FailInitStep;

impl StepRuntime for FailInitStep {
    fn init(&mut self, ctx: &StepContext, _io: &mut StepIo) -> Result<()> {
        Err(EngineError::Configuration(format!(
            "{} cannot initialize",
            ctx.label()
        )))
    }

    fn process_one_iteration(&mut self, _ctx: &StepContext, _io: &mut StepIo) -> Result<bool> {
        Ok(false)
    }
}

/// Passes `batches` batches through, then fails.
pub struct FailAfterStep {
    remaining: u64,
}

impl StepRuntime for FailAfterStep {
    fn init(&mut self, _ctx: &StepContext, _io: &mut StepIo) -> Result<()> {
        Ok(())
    }

    fn process_one_iteration(&mut self, ctx: &StepContext, io: &mut StepIo) -> Result<bool> {
        let Some(batch) = io.get_batch() else {
            return Ok(false);
        };
        if self.remaining == 0 {
            return Err(EngineError::Other(anyhow::anyhow!(
                "{} rejected a batch",
                ctx.label()
            )));
        }
        self.remaining -= 1;
        Ok(io.put_batch(batch))
    }
}

/// Builtins plus `collect`, `fail_init` and `fail_after`.
pub fn registry(collected: &Collected) -> Arc<StepRegistry> {
    let registry = StepRegistry::with_builtins();
    let sink = Arc::clone(collected);
    registry.register_fn("collect", move |_node, copy| {
        Ok(Box::new(CollectStep::new(copy, Arc::clone(&sink))) as BoxedStep)
    });
    registry.register_fn("fail_init", |_node, _copy| {
        Ok(Box::new(FailInitStep) as BoxedStep)
    });
    registry.register_fn("fail_after", |node, _copy| {
        let remaining = node
            .config
            .get("batches")
            .and_then(|v| v.as_u64())
            .unwrap_or(0);
        Ok(Box::new(FailAfterStep { remaining }) as BoxedStep)
    });
    Arc::new(registry)
}

pub fn collected() -> Collected {
    Arc::new(Mutex::new(Vec::new()))
}

/// Fast polling so tests finish quickly.
pub fn fast_config() -> EngineConfig {
    EngineConfig {
        poll_interval_ms: 1,
        kill_grace_ms: 1,
        ..EngineConfig::default()
    }
}

pub fn graph(name: &str, nodes: Vec<NodeDefinition>, hops: &[(&str, &str)]) -> PipelineGraph {
    let mut graph = PipelineGraph::new(name);
    for node in nodes {
        graph.add_node(node).unwrap();
    }
    for (from, to) in hops {
        graph.add_edge(from, to).unwrap();
    }
    graph
}

/// First field of every row, as an integer.
pub fn first_ints(rows: &[(usize, Row)]) -> Vec<i64> {
    rows.iter()
        .map(|(_, row)| row.get(0).and_then(|v| v.as_i64()).unwrap())
        .collect()
}
