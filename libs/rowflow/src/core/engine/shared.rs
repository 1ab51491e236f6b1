// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! State shared between the engine, its handles and container threads, plus
//! the failure and shutdown coordination that acts on it.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender};
use parking_lot::{Mutex, RwLock};

use super::listeners::ListenerRegistry;
use super::result::{ContainerResult, ExecutionResult};
use super::status::{EngineStatus, StatusFlags};
use super::{EngineHandle, EngineRunId};
use crate::core::config::EngineConfig;
use crate::core::container::{LineCounts, StepContainer};
use crate::core::observability::{SnapshotRecorder, SnapshotStore};
use crate::core::{EngineError, Result};

#[derive(Debug, Default)]
struct CompletionState {
    total: usize,
    terminated: usize,
    fired: bool,
}

pub(crate) struct EngineShared {
    pub run_id: EngineRunId,
    pub name: String,
    pub config: EngineConfig,
    pub status: EngineStatus,
    pub containers: RwLock<Vec<Arc<StepContainer>>>,
    pub listeners: ListenerRegistry,
    pub snapshots: SnapshotStore,
    completion: Mutex<CompletionState>,
    done: AtomicBool,
    done_tx: Sender<()>,
    done_rx: Receiver<()>,
    engine_errors: AtomicU64,
    listener_error: Mutex<Option<String>>,
    recorder: Mutex<Option<SnapshotRecorder>>,
}

impl EngineShared {
    pub fn new(name: String, config: EngineConfig) -> Self {
        let (done_tx, done_rx) = crossbeam_channel::bounded(1);
        let snapshots = SnapshotStore::new(config.snapshot_size_limit);
        Self {
            run_id: EngineRunId::new(),
            name,
            config,
            status: EngineStatus::default(),
            containers: RwLock::new(Vec::new()),
            listeners: ListenerRegistry::default(),
            snapshots,
            completion: Mutex::new(CompletionState::default()),
            done: AtomicBool::new(false),
            done_tx,
            done_rx,
            engine_errors: AtomicU64::new(0),
            listener_error: Mutex::new(None),
            recorder: Mutex::new(None),
        }
    }

    pub fn handle(self: &Arc<Self>) -> EngineHandle {
        EngineHandle::new(Arc::clone(self))
    }

    pub fn containers(&self) -> Vec<Arc<StepContainer>> {
        self.containers.read().clone()
    }

    pub fn find_container(&self, name: &str, copy: usize) -> Option<Arc<StepContainer>> {
        self.containers
            .read()
            .iter()
            .find(|c| c.name() == name && c.copy() == copy)
            .cloned()
    }

    // =========================================================================
    // Completion
    // =========================================================================

    pub fn reset_completion(&self, total: usize) {
        *self.completion.lock() = CompletionState {
            total,
            terminated: 0,
            fired: false,
        };
    }

    /// Called on a container's own thread once it reached a terminal state.
    pub fn container_terminated(self: &Arc<Self>, container: &Arc<StepContainer>) {
        let errors = container.errors();
        if errors > 0 {
            tracing::error!(
                "[{}] {} reported {} error(s), stopping all containers",
                self.run_id,
                container.label(),
                errors
            );
            self.stop_all();
        }

        let all_terminated = {
            let mut state = self.completion.lock();
            state.terminated += 1;
            tracing::debug!(
                "[{}] {} terminated as {} ({}/{})",
                self.run_id,
                container.label(),
                container.status(),
                state.terminated,
                state.total
            );
            Self::claim_finish(&mut state)
        };

        if all_terminated {
            self.finish();
        }
    }

    /// Fire `finished` if every container already terminated (also covers a
    /// run without containers).
    pub fn finish_if_all_terminated(self: &Arc<Self>) {
        let all_terminated = Self::claim_finish(&mut self.completion.lock());
        if all_terminated {
            self.finish();
        }
    }

    /// The caller that flips `fired` is the only one allowed to finish.
    fn claim_finish(state: &mut CompletionState) -> bool {
        if state.terminated >= state.total && !state.fired {
            state.fired = true;
            true
        } else {
            false
        }
    }

    fn finish(self: &Arc<Self>) {
        if self.config.capture_snapshots {
            self.capture_snapshots(true);
        }

        if let Err(e) = self.listeners.fire_finished(&self.handle()) {
            self.engine_errors.fetch_add(1, Ordering::AcqRel);
            let mut listener_error = self.listener_error.lock();
            if listener_error.is_none() {
                *listener_error = Some(match e {
                    EngineError::Listener(message) => message,
                    other => other.to_string(),
                });
            }
        }

        self.status.set(StatusFlags::FINISHED, true);
        self.status.set(StatusFlags::RUNNING, false);
        self.stop_recorder();
        self.mark_done();

        let errors = self.nr_errors();
        tracing::info!(
            "[{}] Pipeline '{}' {} ({} error(s))",
            self.run_id,
            self.name,
            self.status.describe(errors).to_lowercase(),
            errors
        );
    }

    /// Terminal notifications after a run that never started (failed init
    /// or failed `started` listener). Listener errors are only logged.
    pub fn finish_aborted(self: &Arc<Self>) {
        if let Err(e) = self.listeners.fire_finished(&self.handle()) {
            tracing::warn!("[{}] Ignoring listener error after abort: {}", self.run_id, e);
        }
        self.status.set(StatusFlags::FINISHED, true);
        self.status.set(StatusFlags::RUNNING, false);
        self.completion.lock().fired = true;
        self.mark_done();
    }

    fn mark_done(&self) {
        self.done.store(true, Ordering::Release);
        let _ = self.done_tx.try_send(());
    }

    pub fn is_done(&self) -> bool {
        self.done.load(Ordering::Acquire)
    }

    /// Block until `finished` has been fired. Returns the first `finished`
    /// listener error, if any.
    pub fn wait_for_completion(&self, poll: Duration) -> Result<()> {
        while !self.is_done() {
            let _ = self.done_rx.recv_timeout(poll);
        }
        match self.listener_error.lock().clone() {
            Some(message) => Err(EngineError::Listener(message)),
            None => Ok(()),
        }
    }

    // =========================================================================
    // Stop / pause
    // =========================================================================

    /// Hard stop: every container exits at its next checkpoint, in-flight
    /// rows are discarded. Only the first call has an effect.
    pub fn stop_all(self: &Arc<Self>) {
        if self.status.set(StatusFlags::STOPPED, true) {
            tracing::trace!("[{}] Already stopping", self.run_id);
            return;
        }
        tracing::info!("[{}] Stopping all containers", self.run_id);

        let containers = self.containers();
        for container in &containers {
            container.request_stop(false);
        }

        let grace = self.config.kill_grace();
        for (i, container) in containers.iter().enumerate() {
            let discarded = container.clear_queues();
            if discarded > 0 {
                tracing::debug!(
                    "[{}] Discarded {} in-flight batch(es)",
                    container.label(),
                    discarded
                );
            }
            if i + 1 < containers.len() && !grace.is_zero() {
                std::thread::sleep(grace);
            }
        }
        self.status.set(StatusFlags::PAUSED, false);
        self.listeners.fire_stopped(&self.handle());
    }

    /// Safe stop: only input containers stop; everything downstream drains
    /// to natural end-of-stream.
    pub fn safe_stop(self: &Arc<Self>) {
        let inputs: Vec<_> = self
            .containers()
            .into_iter()
            .filter(|c| c.is_input())
            .collect();
        tracing::info!(
            "[{}] Safe stop: stopping {} input container(s)",
            self.run_id,
            inputs.len()
        );
        for container in &inputs {
            container.request_stop(true);
        }
        self.listeners.fire_stopped(&self.handle());
    }

    pub fn pause_running(&self) {
        self.status.set(StatusFlags::PAUSED, true);
        for container in self.containers() {
            container.pause();
        }
        tracing::info!("[{}] Paused", self.run_id);
    }

    pub fn resume_running(&self) {
        self.status.set(StatusFlags::PAUSED, false);
        for container in self.containers() {
            container.resume();
        }
        tracing::info!("[{}] Resumed", self.run_id);
    }

    // =========================================================================
    // Results
    // =========================================================================

    pub fn nr_errors(&self) -> u64 {
        let container_errors: u64 = self.containers.read().iter().map(|c| c.errors()).sum();
        self.engine_errors.load(Ordering::Acquire) + container_errors
    }

    pub fn result(&self) -> ExecutionResult {
        let containers = self.containers();
        let lines: LineCounts = containers.iter().map(|c| c.line_counts()).sum();
        let nr_errors = self.nr_errors();

        ExecutionResult {
            run_id: self.run_id.clone(),
            nr_errors,
            stopped: self.status.contains(StatusFlags::STOPPED),
            safe_stopped: containers.iter().any(|c| c.is_safe_stopped()),
            lines_read: lines.read,
            lines_written: lines.written,
            lines_input: lines.input,
            lines_output: lines.output,
            lines_updated: lines.updated,
            lines_rejected: lines.rejected,
            status: self.status.describe(nr_errors).to_string(),
            containers: containers
                .iter()
                .map(|c| ContainerResult {
                    node: c.name().to_string(),
                    copy: c.copy(),
                    status: c.status(),
                    lines: c.line_counts(),
                })
                .collect(),
        }
    }

    // =========================================================================
    // Snapshots
    // =========================================================================

    pub fn capture_snapshots(&self, force: bool) {
        let idle = self
            .status
            .flags()
            .intersects(StatusFlags::PAUSED | StatusFlags::STOPPED);
        self.snapshots.capture(&self.containers(), idle, force);
    }

    pub fn start_recorder(self: &Arc<Self>) -> Result<()> {
        if !self.config.capture_snapshots {
            return Ok(());
        }
        self.capture_snapshots(false);

        let weak = Arc::downgrade(self);
        let recorder = SnapshotRecorder::spawn(
            &self.name,
            self.config.snapshot_interval(),
            move || match weak.upgrade() {
                Some(shared) => {
                    shared.capture_snapshots(false);
                    true
                }
                None => false,
            },
        )?;
        *self.recorder.lock() = Some(recorder);
        Ok(())
    }

    pub fn stop_recorder(&self) {
        if let Some(recorder) = self.recorder.lock().as_ref() {
            recorder.stop();
        }
    }

    pub fn take_recorder(&self) -> Option<SnapshotRecorder> {
        self.recorder.lock().take()
    }
}
