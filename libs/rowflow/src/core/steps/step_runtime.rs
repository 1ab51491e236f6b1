// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! The contract every node runtime implements.

use std::sync::Arc;

use super::StepIo;
use crate::core::config::Variables;
use crate::core::graph::{NodeDefinition, PartitionMethod};
use crate::core::Result;

/// Identity and static facts of one (node, copy), shared with its runtime.
#[derive(Debug, Clone)]
pub struct StepContext {
    pub node: Arc<NodeDefinition>,
    pub copy: usize,
    /// Partition id assigned to this copy, if the node's schema lists one.
    pub partition_id: Option<String>,
    /// Redistribution applied to rows arriving at this node.
    pub repartitioning: PartitionMethod,
    pub partitioned: bool,
    /// No upstream predecessor.
    pub is_input: bool,
    pub variables: Arc<Variables>,
    pub safe_mode: bool,
}

impl StepContext {
    /// Context derived from the node alone: not an input, no repartitioning.
    pub fn new(node: Arc<NodeDefinition>, copy: usize) -> Self {
        let partition_id = node
            .partitioning()
            .and_then(|p| p.partition_id(copy))
            .map(str::to_string);
        let partitioned = node.is_partitioned();
        Self {
            node,
            copy,
            partition_id,
            repartitioning: PartitionMethod::None,
            partitioned,
            is_input: false,
            variables: Arc::new(Variables::default()),
            safe_mode: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.node.name
    }

    /// `name.copy`, used as log prefix and container label.
    pub fn label(&self) -> String {
        format!("{}.{}", self.node.name, self.copy)
    }

    pub fn config(&self) -> &serde_json::Value {
        &self.node.config
    }
}

/// Runtime of one node copy.
///
/// Every method runs on the container's own thread (init runs on a
/// dedicated init thread), so implementations need no internal locking.
pub trait StepRuntime: Send {
    /// Acquire resources. An error aborts the whole run.
    fn init(&mut self, ctx: &StepContext, io: &mut StepIo) -> Result<()>;

    /// Do one unit of work. `Ok(false)` means this copy is done.
    fn process_one_iteration(&mut self, ctx: &StepContext, io: &mut StepIo) -> Result<bool>;

    /// Release what `init` acquired. Called once, also after a failed init.
    fn dispose(&mut self, _ctx: &StepContext, _io: &mut StepIo) -> Result<()> {
        Ok(())
    }

    /// Called right before the first iteration.
    fn mark_start(&mut self) {}

    fn set_stopped(&mut self, _stopped: bool) {}

    /// Called once when the container observes a stop request.
    fn stop_processing(&mut self, _ctx: &StepContext, _io: &mut StepIo) -> Result<()> {
        Ok(())
    }

    /// Post-run hook, invoked by the engine's cleanup.
    fn cleanup(&mut self) {}
}

pub type BoxedStep = Box<dyn StepRuntime>;
