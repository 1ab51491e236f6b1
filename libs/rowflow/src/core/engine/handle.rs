// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use std::collections::HashMap;
use std::sync::Arc;

use super::result::ExecutionResult;
use super::shared::EngineShared;
use super::status::StatusFlags;
use super::EngineRunId;
use crate::core::container::{ContainerStatus, StepContainer};
use crate::core::observability::PerformanceSnapshot;
use crate::core::Result;

/// Cloneable view of a running engine, handed to listeners and usable from
/// any thread to query, pause or stop the run.
#[derive(Clone)]
pub struct EngineHandle {
    shared: Arc<EngineShared>,
}

impl EngineHandle {
    pub(crate) fn new(shared: Arc<EngineShared>) -> Self {
        Self { shared }
    }

    pub(crate) fn shared(&self) -> &Arc<EngineShared> {
        &self.shared
    }

    pub fn run_id(&self) -> &EngineRunId {
        &self.shared.run_id
    }

    pub fn name(&self) -> &str {
        &self.shared.name
    }

    // =========================================================================
    // Status
    // =========================================================================

    pub fn status_flags(&self) -> StatusFlags {
        self.shared.status.flags()
    }

    /// Human-readable status, e.g. `Running` or `Finished (with errors)`.
    pub fn status(&self) -> &'static str {
        self.shared.status.describe(self.shared.nr_errors())
    }

    pub fn is_preparing(&self) -> bool {
        self.shared.status.contains(StatusFlags::PREPARING)
    }

    pub fn is_initializing(&self) -> bool {
        self.shared.status.contains(StatusFlags::INITIALIZING)
    }

    pub fn is_running(&self) -> bool {
        self.shared.status.contains(StatusFlags::RUNNING)
    }

    pub fn is_finished(&self) -> bool {
        self.shared.status.contains(StatusFlags::FINISHED)
    }

    pub fn is_stopped(&self) -> bool {
        self.shared.status.contains(StatusFlags::STOPPED)
    }

    pub fn is_paused(&self) -> bool {
        self.shared.status.contains(StatusFlags::PAUSED)
    }

    pub fn errors(&self) -> u64 {
        self.shared.nr_errors()
    }

    pub fn result(&self) -> ExecutionResult {
        self.shared.result()
    }

    // =========================================================================
    // Control
    // =========================================================================

    pub fn stop_all(&self) {
        self.shared.stop_all();
    }

    pub fn safe_stop(&self) {
        self.shared.safe_stop();
    }

    pub fn pause_running(&self) {
        self.shared.pause_running();
    }

    pub fn resume_running(&self) {
        self.shared.resume_running();
    }

    /// Block until the run has finished. Must not be called from a step or
    /// a `finished` listener.
    pub fn wait_until_finished(&self) -> Result<()> {
        self.shared.wait_for_completion(self.shared.config.poll_interval())
    }

    // =========================================================================
    // Containers
    // =========================================================================

    pub fn container(&self, name: &str, copy: usize) -> Option<Arc<StepContainer>> {
        self.shared.find_container(name, copy)
    }

    pub fn containers(&self) -> Vec<Arc<StepContainer>> {
        self.shared.containers()
    }

    pub fn nr_containers(&self) -> usize {
        self.shared.containers.read().len()
    }

    pub fn nr_active_containers(&self) -> usize {
        self.shared
            .containers
            .read()
            .iter()
            .filter(|c| c.status().is_active())
            .count()
    }

    pub fn has_halted_containers(&self) -> bool {
        self.shared
            .containers
            .read()
            .iter()
            .any(|c| c.status() == ContainerStatus::Halted)
    }

    /// `(label, status)` in run order.
    pub fn container_statuses(&self) -> Vec<(String, ContainerStatus)> {
        self.shared
            .containers
            .read()
            .iter()
            .map(|c| (c.label().to_string(), c.status()))
            .collect()
    }

    pub fn snapshots(&self, label: &str) -> Vec<PerformanceSnapshot> {
        self.shared.snapshots.history(label)
    }

    pub fn all_snapshots(&self) -> HashMap<String, Vec<PerformanceSnapshot>> {
        self.shared.snapshots.all()
    }
}

impl std::fmt::Debug for EngineHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineHandle")
            .field("run_id", &self.shared.run_id)
            .field("name", &self.shared.name)
            .field("status", &self.status())
            .finish()
    }
}
