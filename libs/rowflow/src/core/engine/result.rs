// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use serde::{Deserialize, Serialize};

use super::EngineRunId;
use crate::core::container::{ContainerStatus, LineCounts};
use crate::core::EngineError;

/// Outcome of a run (or its state so far).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub run_id: EngineRunId,
    /// Engine-level errors plus every container's error count.
    pub nr_errors: u64,
    /// A hard stop was requested.
    pub stopped: bool,
    /// At least one input container was safe-stopped.
    pub safe_stopped: bool,
    pub lines_read: u64,
    pub lines_written: u64,
    pub lines_input: u64,
    pub lines_output: u64,
    pub lines_updated: u64,
    pub lines_rejected: u64,
    pub status: String,
    pub containers: Vec<ContainerResult>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerResult {
    pub node: String,
    pub copy: usize,
    pub status: ContainerStatus,
    pub lines: LineCounts,
}

impl ExecutionResult {
    /// A run failed whenever the aggregate error count is nonzero,
    /// regardless of container statuses.
    pub fn is_success(&self) -> bool {
        self.nr_errors == 0
    }

    pub fn error(&self) -> Option<EngineError> {
        (self.nr_errors > 0).then_some(EngineError::Processing {
            errors: self.nr_errors,
        })
    }

    pub fn container(&self, node: &str, copy: usize) -> Option<&ContainerResult> {
        self.containers
            .iter()
            .find(|c| c.node == node && c.copy == copy)
    }
}
