// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, MutexGuard, RwLock};

use super::{ContainerSignals, ContainerStatus, LineCounts, StepCounters};
use crate::core::compiler::RunOrderItem;
use crate::core::queue::RowQueue;
use crate::core::steps::{BoxedStep, OutputRoute, StepContext, StepIo};
use crate::core::{EngineError, Result};

#[derive(Debug, Default)]
struct AttachedQueues {
    inputs: Vec<Arc<RowQueue>>,
    outputs: Vec<Arc<RowQueue>>,
}

/// A node copy's runtime, its execution data and its identity.
///
/// The runtime and [`StepIo`] are only locked by the thread currently
/// driving the container (init thread, then run thread). Everything else is
/// readable from any thread.
pub struct StepContainer {
    context: StepContext,
    label: String,
    runtime: Mutex<BoxedStep>,
    io: Mutex<StepIo>,
    queues: RwLock<AttachedQueues>,
    counters: Arc<StepCounters>,
    signals: Arc<ContainerSignals>,
    status: Mutex<ContainerStatus>,
}

impl StepContainer {
    pub fn new(context: StepContext, runtime: BoxedStep, poll_interval: Duration) -> Self {
        let label = context.label();
        let counters = Arc::new(StepCounters::default());
        let signals = Arc::new(ContainerSignals::default());
        let io = StepIo::new(
            label.clone(),
            Arc::clone(&counters),
            Arc::clone(&signals),
            poll_interval,
        );
        Self {
            context,
            label,
            runtime: Mutex::new(runtime),
            io: Mutex::new(io),
            queues: RwLock::new(AttachedQueues::default()),
            counters,
            signals,
            status: Mutex::new(ContainerStatus::Created),
        }
    }

    pub fn name(&self) -> &str {
        self.context.name()
    }

    pub fn copy(&self) -> usize {
        self.context.copy
    }

    /// `name.copy`
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn context(&self) -> &StepContext {
        &self.context
    }

    pub fn is_input(&self) -> bool {
        self.context.is_input
    }

    pub fn status(&self) -> ContainerStatus {
        *self.status.lock()
    }

    pub(crate) fn set_status(&self, status: ContainerStatus) {
        let mut current = self.status.lock();
        if *current != status {
            tracing::trace!("[{}] {} -> {}", self.label, *current, status);
            *current = status;
        }
    }

    pub fn counters(&self) -> &Arc<StepCounters> {
        &self.counters
    }

    pub fn line_counts(&self) -> LineCounts {
        self.counters.snapshot()
    }

    pub fn errors(&self) -> u64 {
        self.counters.errors()
    }

    pub(crate) fn add_error(&self) -> u64 {
        self.counters.add_error()
    }

    pub fn signals(&self) -> &Arc<ContainerSignals> {
        &self.signals
    }

    pub fn is_stopped(&self) -> bool {
        self.signals.is_stopped()
    }

    pub fn is_safe_stopped(&self) -> bool {
        self.signals.is_safe_stopped()
    }

    pub fn is_paused(&self) -> bool {
        self.signals.is_paused()
    }

    // =========================================================================
    // Wiring
    // =========================================================================

    pub fn attach_input(&self, queue: Arc<RowQueue>) {
        self.queues.write().inputs.push(Arc::clone(&queue));
        self.io.lock().add_input(queue);
    }

    pub fn attach_route(&self, route: OutputRoute) {
        self.queues
            .write()
            .outputs
            .extend(route.queues.iter().cloned());
        self.io.lock().add_route(route);
    }

    pub fn input_queues(&self) -> Vec<Arc<RowQueue>> {
        self.queues.read().inputs.clone()
    }

    pub fn output_queues(&self) -> Vec<Arc<RowQueue>> {
        self.queues.read().outputs.clone()
    }

    /// Batches waiting in this container's input queues.
    pub fn input_occupancy(&self) -> usize {
        self.queues.read().inputs.iter().map(|q| q.size()).sum()
    }

    /// Batches this container put that are not consumed yet.
    pub fn output_occupancy(&self) -> usize {
        self.queues.read().outputs.iter().map(|q| q.size()).sum()
    }

    /// Discard buffered batches in every attached queue. Returns how many.
    pub fn clear_queues(&self) -> usize {
        let queues = self.queues.read();
        queues
            .inputs
            .iter()
            .chain(queues.outputs.iter())
            .map(|queue| queue.clear())
            .sum()
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Run the runtime's `init`. A panic counts as a failed init.
    pub fn run_init(&self) -> Result<()> {
        self.set_status(ContainerStatus::Initializing);
        let mut runtime = self.runtime.lock();
        let mut io = self.io.lock();

        let outcome = catch_unwind(AssertUnwindSafe(|| runtime.init(&self.context, &mut io)));
        match outcome {
            Ok(Ok(())) => {
                drop(io);
                drop(runtime);
                self.set_status(ContainerStatus::Idle);
                tracing::debug!("[{}] Initialized", self.label);
                Ok(())
            }
            Ok(Err(e)) => {
                tracing::error!("[{}] Init failed: {}", self.label, e);
                Err(e)
            }
            Err(panic) => {
                let message = panic_message(panic.as_ref());
                tracing::error!("[{}] Init panicked: {}", self.label, message);
                Err(EngineError::Other(anyhow::anyhow!(
                    "init of {} panicked: {}",
                    self.label,
                    message
                )))
            }
        }
    }

    /// Call the runtime's `dispose`; errors are logged, not returned.
    pub fn dispose(&self) {
        let mut runtime = self.runtime.lock();
        let mut io = self.io.lock();
        let outcome = catch_unwind(AssertUnwindSafe(|| runtime.dispose(&self.context, &mut io)));
        match outcome {
            Ok(Ok(())) => tracing::trace!("[{}] Disposed", self.label),
            Ok(Err(e)) => tracing::warn!("[{}] Dispose error: {}", self.label, e),
            Err(panic) => tracing::warn!(
                "[{}] Dispose panicked: {}",
                self.label,
                panic_message(panic.as_ref())
            ),
        }
    }

    /// Ask the container to stop at its next checkpoint. Returns false if it
    /// was already stopped.
    pub fn request_stop(&self, safe: bool) -> bool {
        let first = self.signals.stop(safe);
        if first {
            tracing::debug!(
                "[{}] Stop requested{}",
                self.label,
                if safe { " (safe)" } else { "" }
            );
        }
        first
    }

    pub fn pause(&self) {
        self.signals.pause();
    }

    pub fn resume(&self) {
        self.signals.resume();
    }

    /// Invoke the runtime's post-run `cleanup` hook.
    pub fn cleanup(&self) {
        self.runtime.lock().cleanup();
    }

    pub(crate) fn lock_runtime(&self) -> MutexGuard<'_, BoxedStep> {
        self.runtime.lock()
    }

    pub(crate) fn lock_io(&self) -> MutexGuard<'_, StepIo> {
        self.io.lock()
    }
}

impl std::fmt::Debug for StepContainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StepContainer")
            .field("label", &self.label)
            .field("status", &self.status())
            .field("errors", &self.errors())
            .finish()
    }
}

impl RunOrderItem for Arc<StepContainer> {
    fn node_name(&self) -> &str {
        self.name()
    }

    fn copy_index(&self) -> usize {
        self.copy()
    }
}

pub(crate) fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::graph::NodeDefinition;
    use crate::core::steps::StepRuntime;

    struct FailingInit;

    impl StepRuntime for FailingInit {
        fn init(&mut self, _ctx: &StepContext, _io: &mut StepIo) -> Result<()> {
            Err(EngineError::Configuration("no connection".into()))
        }

        fn process_one_iteration(&mut self, _ctx: &StepContext, _io: &mut StepIo) -> Result<bool> {
            Ok(false)
        }
    }

    struct PanickingInit;

    impl StepRuntime for PanickingInit {
        fn init(&mut self, _ctx: &StepContext, _io: &mut StepIo) -> Result<()> {
            panic!("boom");
        }

        fn process_one_iteration(&mut self, _ctx: &StepContext, _io: &mut StepIo) -> Result<bool> {
            Ok(false)
        }
    }

    fn container(step: BoxedStep) -> StepContainer {
        let ctx = StepContext::new(Arc::new(NodeDefinition::new("lookup", "test")), 2);
        StepContainer::new(ctx, step, Duration::from_millis(1))
    }

    #[test]
    fn test_label_and_initial_status() {
        let c = container(Box::new(FailingInit));
        assert_eq!(c.label(), "lookup.2");
        assert_eq!(c.status(), ContainerStatus::Created);
    }

    #[test]
    fn test_failed_init_keeps_initializing_status() {
        let c = container(Box::new(FailingInit));
        assert!(c.run_init().is_err());
        assert_eq!(c.status(), ContainerStatus::Initializing);
    }

    #[test]
    fn test_panicking_init_is_an_error() {
        let c = container(Box::new(PanickingInit));
        let err = c.run_init().unwrap_err();
        assert!(err.to_string().contains("boom"));
    }

    #[test]
    fn test_request_stop_once() {
        let c = container(Box::new(FailingInit));
        assert!(c.request_stop(false));
        assert!(!c.request_stop(true));
        assert!(c.is_stopped());
        assert!(!c.is_safe_stopped());
    }
}
