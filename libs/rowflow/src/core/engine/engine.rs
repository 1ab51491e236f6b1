// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Pipeline engine: prepare (compile, create, wire, order, init), start one
//! thread per container, then coordinate stop, pause and completion.

use std::sync::Arc;
use std::thread::JoinHandle;

use super::listeners::{ExecutionListener, OnFinished, OnStarted, StoppedListener};
use super::result::ExecutionResult;
use super::row_producer::{RowProducer, ROW_PRODUCER_ORIGIN};
use super::shared::EngineShared;
use super::status::StatusFlags;
use super::{EngineHandle, EngineRunId};
use crate::core::compiler::{
    compile, sort_run_order, CompilePhase, CompileResult, CompiledPipeline, QueueTopology,
};
use crate::core::config::{EngineConfig, Variables};
use crate::core::container::{ContainerStatus, StepContainer};
use crate::core::execution::{abort_all, initialize_all, run_container_loop};
use crate::core::graph::PipelineGraph;
use crate::core::observability::SnapshotSink;
use crate::core::queue::{QueueTag, RowQueue};
use crate::core::steps::{OutputRoute, StepContext, StepFactory};
use crate::core::{EngineError, Result};

/// Marks the engine finished before any user `finished` listener runs.
struct EngineCleanupListener;

impl ExecutionListener for EngineCleanupListener {
    fn finished(&self, engine: &EngineHandle) -> Result<()> {
        let shared = engine.shared();
        shared.status.set(StatusFlags::FINISHED, true);
        shared.status.set(StatusFlags::RUNNING, false);
        shared.stop_recorder();
        Ok(())
    }
}

/// Executes one [`PipelineGraph`].
///
/// ```ignore
/// let mut engine = PipelineEngine::new(graph, Arc::new(StepRegistry::with_builtins()));
/// engine.execute()?;
/// engine.wait_until_finished()?;
/// assert!(engine.result().is_success());
/// ```
pub struct PipelineEngine {
    graph: Arc<PipelineGraph>,
    variables: Arc<Variables>,
    factory: Arc<dyn StepFactory>,
    handle: EngineHandle,
    topology: Option<QueueTopology>,
    compile_result: Option<CompileResult>,
    threads: Vec<JoinHandle<()>>,
    prepared: bool,
    producers: usize,
}

impl PipelineEngine {
    pub fn new(graph: PipelineGraph, factory: Arc<dyn StepFactory>) -> Self {
        Self::with_config(graph, factory, EngineConfig::default())
    }

    pub fn with_config(
        graph: PipelineGraph,
        factory: Arc<dyn StepFactory>,
        config: EngineConfig,
    ) -> Self {
        let shared = Arc::new(EngineShared::new(graph.name().to_string(), config));
        tracing::debug!("[{}] Created engine for '{}'", shared.run_id, shared.name);
        Self {
            graph: Arc::new(graph),
            variables: Arc::new(Variables::default()),
            factory,
            handle: shared.handle(),
            topology: None,
            compile_result: None,
            threads: Vec::new(),
            prepared: false,
            producers: 0,
        }
    }

    pub fn with_variables(mut self, variables: Variables) -> Self {
        self.variables = Arc::new(variables);
        self
    }

    pub fn handle(&self) -> EngineHandle {
        self.handle.clone()
    }

    fn shared(&self) -> &Arc<EngineShared> {
        self.handle.shared()
    }

    pub fn run_id(&self) -> &EngineRunId {
        self.handle.run_id()
    }

    pub fn graph(&self) -> &PipelineGraph {
        &self.graph
    }

    pub fn config(&self) -> &EngineConfig {
        &self.shared().config
    }

    pub fn variables(&self) -> &Variables {
        &self.variables
    }

    // =========================================================================
    // Listeners
    // =========================================================================

    pub fn add_execution_listener(&self, listener: Arc<dyn ExecutionListener>) {
        self.shared().listeners.add_execution(listener);
    }

    pub fn on_started<F>(&self, f: F)
    where
        F: Fn(&EngineHandle) -> Result<()> + Send + Sync + 'static,
    {
        self.add_execution_listener(Arc::new(OnStarted(f)));
    }

    pub fn on_finished<F>(&self, f: F)
    where
        F: Fn(&EngineHandle) -> Result<()> + Send + Sync + 'static,
    {
        self.add_execution_listener(Arc::new(OnFinished(f)));
    }

    pub fn add_stopped_listener(&self, listener: Arc<dyn StoppedListener>) {
        self.shared().listeners.add_stopped(listener);
    }

    pub fn on_stopped<F>(&self, f: F)
    where
        F: Fn(&EngineHandle) + Send + Sync + 'static,
    {
        self.add_stopped_listener(Arc::new(f));
    }

    pub fn set_snapshot_sink(&self, sink: Arc<dyn SnapshotSink>) {
        self.shared().snapshots.set_sink(sink);
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Compile the graph, create and wire every container, order them and
    /// initialize them all. Init is all-or-nothing: on any failure every
    /// container is disposed and the run is over.
    pub fn prepare_execution(&mut self) -> Result<()> {
        let shared = Arc::clone(self.shared());
        let flags = shared.status.flags();
        if self.prepared
            || flags.intersects(
                StatusFlags::PREPARING
                    | StatusFlags::INITIALIZING
                    | StatusFlags::RUNNING
                    | StatusFlags::FINISHED,
            )
        {
            return Err(EngineError::InvalidState(format!(
                "Cannot prepare pipeline '{}' while {} (must be Waiting)",
                shared.name,
                shared.status.describe(0)
            )));
        }

        tracing::info!("[{}] Preparing pipeline '{}'", shared.run_id, shared.name);
        shared.status.set(StatusFlags::PREPARING, true);

        let compiled = compile(&self.graph, &self.variables, shared.config.queue_capacity)
            .and_then(|compiled| {
                tracing::debug!("[{}] {}", shared.run_id, CompilePhase::Create);
                let containers = self.create_containers(&compiled)?;
                Ok((compiled, containers))
            });
        let (compiled, mut containers) = match compiled {
            Ok(ok) => ok,
            Err(e) => {
                shared.status.set(StatusFlags::PREPARING, false);
                tracing::error!("[{}] Preparation failed: {}", shared.run_id, e);
                return Err(e);
            }
        };

        tracing::debug!("[{}] {}", shared.run_id, CompilePhase::Wire);
        wire(&compiled.topology, &containers);

        shared.status.set(StatusFlags::PREPARING, false);
        shared.status.set(StatusFlags::INITIALIZING, true);

        tracing::debug!("[{}] {}", shared.run_id, CompilePhase::Order);
        let threshold = shared.config.topology_sort_threshold;
        if shared.config.sort_topologically && containers.len() < threshold {
            let outcome = sort_run_order(&mut containers, &self.graph);
            tracing::debug!(
                "[{}] Sorted {} container(s) in {} pass(es)",
                shared.run_id,
                containers.len(),
                outcome.passes
            );
        } else if shared.config.sort_topologically {
            tracing::debug!(
                "[{}] Skipping topological sort: {} containers (threshold {})",
                shared.run_id,
                containers.len(),
                threshold
            );
        }

        *shared.containers.write() = containers.clone();
        self.topology = Some(compiled.topology);
        self.compile_result = Some(compiled.result);

        tracing::debug!("[{}] {}", shared.run_id, CompilePhase::Initialize);
        let failed = initialize_all(&containers);
        shared.status.set(StatusFlags::INITIALIZING, false);

        if !failed.is_empty() {
            tracing::error!(
                "[{}] Initialization failed for: {}",
                shared.run_id,
                failed.join(", ")
            );
            abort_all(&containers, &failed);
            shared.finish_aborted();
            return Err(EngineError::Initialization { failed });
        }

        self.prepared = true;
        if let Some(result) = &self.compile_result {
            tracing::info!("[{}] Prepared: {}", shared.run_id, result);
        }
        Ok(())
    }

    fn create_containers(&self, compiled: &CompiledPipeline) -> Result<Vec<Arc<StepContainer>>> {
        let config = &self.shared().config;
        let mut containers = Vec::new();
        for node in &compiled.nodes {
            for copy in 0..node.copies {
                let mut context = StepContext::new(Arc::clone(&node.definition), copy);
                context.is_input = node.is_input;
                context.repartitioning = node.repartitioning.clone();
                context.variables = Arc::clone(&self.variables);
                context.safe_mode = config.safe_mode;

                let runtime = self.factory.create(&node.definition, copy)?;
                containers.push(Arc::new(StepContainer::new(
                    context,
                    runtime,
                    config.poll_interval(),
                )));
            }
        }
        Ok(containers)
    }

    /// Fire `started` listeners and launch one thread per container.
    pub fn start_threads(&mut self) -> Result<()> {
        let shared = Arc::clone(self.shared());
        if !self.prepared
            || !self.threads.is_empty()
            || shared
                .status
                .flags()
                .intersects(StatusFlags::RUNNING | StatusFlags::FINISHED)
        {
            return Err(EngineError::InvalidState(format!(
                "Cannot start pipeline '{}' while {} (must be prepared)",
                shared.name,
                shared.status.describe(0)
            )));
        }

        let containers = shared.containers();
        shared.reset_completion(containers.len());

        if let Err(e) = shared.listeners.fire_started(&shared.handle()) {
            tracing::error!("[{}] Aborting run: {}", shared.run_id, e);
            abort_all(&containers, &[]);
            shared.finish_aborted();
            return Err(e);
        }

        shared
            .listeners
            .insert_execution_first(Arc::new(EngineCleanupListener));
        shared.status.set(StatusFlags::RUNNING, true);

        let poll = shared.config.poll_interval();
        for container in &containers {
            let thread_shared = Arc::clone(&shared);
            let runner = Arc::clone(container);
            let spawned = std::thread::Builder::new()
                .name(format!("{} - {}", shared.name, container.label()))
                .spawn(move || {
                    let halted = Arc::clone(&thread_shared);
                    run_container_loop(
                        runner,
                        poll,
                        move || halted.status.contains(StatusFlags::STOPPED),
                        move |done| thread_shared.container_terminated(done),
                    )
                });

            match spawned {
                Ok(handle) => self.threads.push(handle),
                Err(e) => {
                    tracing::error!(
                        "[{}] Failed to spawn thread for {}: {}",
                        shared.run_id,
                        container.label(),
                        e
                    );
                    container.add_error();
                    container.set_status(ContainerStatus::Stopped);
                    container.lock_io().set_output_done();
                    shared.container_terminated(container);
                }
            }
        }

        if let Err(e) = shared.start_recorder() {
            tracing::warn!("[{}] Snapshot recorder not started: {}", shared.run_id, e);
        }

        tracing::info!(
            "[{}] Started {} container thread(s)",
            shared.run_id,
            self.threads.len()
        );

        shared.finish_if_all_terminated();
        Ok(())
    }

    /// [`Self::prepare_execution`] followed by [`Self::start_threads`].
    pub fn execute(&mut self) -> Result<()> {
        self.prepare_execution()?;
        self.start_threads()
    }

    /// Block until every container terminated and `finished` listeners ran,
    /// then join all threads. Fails only if a `finished` listener failed;
    /// processing errors are reported through [`Self::result`].
    pub fn wait_until_finished(&mut self) -> Result<()> {
        let shared = Arc::clone(self.shared());
        if self.threads.is_empty() && !shared.is_done() {
            return Err(EngineError::InvalidState(format!(
                "Pipeline '{}' was never started (status {})",
                shared.name,
                shared.status.describe(0)
            )));
        }

        let outcome = shared.wait_for_completion(shared.config.poll_interval());
        self.join_threads();
        outcome
    }

    fn join_threads(&mut self) {
        for handle in self.threads.drain(..) {
            if handle.join().is_err() {
                tracing::warn!("[{}] A container thread panicked", self.handle.run_id());
            }
        }
        if let Some(recorder) = self.shared().take_recorder() {
            recorder.join();
        }
    }

    /// Clear every queue and run each runtime's `cleanup` hook.
    pub fn cleanup(&mut self) -> Result<()> {
        let shared = self.shared();
        if shared.status.contains(StatusFlags::RUNNING) {
            return Err(EngineError::InvalidState(format!(
                "Cannot clean up pipeline '{}' while Running",
                shared.name
            )));
        }
        for container in shared.containers() {
            container.clear_queues();
            container.cleanup();
        }
        tracing::debug!("[{}] Cleaned up", shared.run_id);
        Ok(())
    }

    /// Inject rows into `name.copy` from outside the graph. Allowed only
    /// between [`Self::prepare_execution`] and [`Self::start_threads`].
    pub fn add_row_producer(&mut self, name: &str, copy: usize) -> Result<RowProducer> {
        let shared = Arc::clone(self.shared());
        if !self.prepared
            || !self.threads.is_empty()
            || shared
                .status
                .flags()
                .intersects(StatusFlags::RUNNING | StatusFlags::FINISHED)
        {
            return Err(EngineError::InvalidState(format!(
                "Row producers can only be added to a prepared pipeline before start (status {})",
                shared.status.describe(0)
            )));
        }

        let container = shared
            .find_container(name, copy)
            .ok_or_else(|| EngineError::NotFound(format!("No container {}.{}", name, copy)))?;

        let tag = QueueTag::new(ROW_PRODUCER_ORIGIN, self.producers, name, copy);
        let queue = Arc::new(RowQueue::new(tag, shared.config.queue_capacity)?);
        self.producers += 1;
        container.attach_input(Arc::clone(&queue));
        tracing::debug!("[{}] Added row producer {}", shared.run_id, queue.tag());
        Ok(RowProducer::new(queue))
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub fn topology(&self) -> Option<&QueueTopology> {
        self.topology.as_ref()
    }

    pub fn compile_result(&self) -> Option<&CompileResult> {
        self.compile_result.as_ref()
    }

    pub fn find_queue(
        &self,
        from: &str,
        from_copy: usize,
        to: &str,
        to_copy: usize,
    ) -> Option<&Arc<RowQueue>> {
        self.topology.as_ref()?.find_queue(from, from_copy, to, to_copy)
    }

    pub fn status(&self) -> &'static str {
        self.handle.status()
    }

    pub fn result(&self) -> ExecutionResult {
        self.handle.result()
    }

    pub fn is_running(&self) -> bool {
        self.handle.is_running()
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    pub fn is_stopped(&self) -> bool {
        self.handle.is_stopped()
    }

    pub fn is_paused(&self) -> bool {
        self.handle.is_paused()
    }

    pub fn errors(&self) -> u64 {
        self.handle.errors()
    }

    pub fn container(&self, name: &str, copy: usize) -> Option<Arc<StepContainer>> {
        self.handle.container(name, copy)
    }

    pub fn container_statuses(&self) -> Vec<(String, ContainerStatus)> {
        self.handle.container_statuses()
    }

    pub fn nr_containers(&self) -> usize {
        self.handle.nr_containers()
    }

    pub fn nr_active_containers(&self) -> usize {
        self.handle.nr_active_containers()
    }

    pub fn has_halted_containers(&self) -> bool {
        self.handle.has_halted_containers()
    }

    // =========================================================================
    // Control
    // =========================================================================

    pub fn stop_all(&self) {
        self.handle.stop_all();
    }

    pub fn safe_stop(&self) {
        self.handle.safe_stop();
    }

    pub fn pause_running(&self) {
        self.handle.pause_running();
    }

    pub fn resume_running(&self) {
        self.handle.resume_running();
    }
}

impl Drop for PipelineEngine {
    fn drop(&mut self) {
        if self.threads.is_empty() {
            if self.prepared {
                self.dispose_idle();
            }
            return;
        }
        if !self.shared().is_done() {
            tracing::warn!(
                "[{}] Engine dropped while running, stopping all containers",
                self.handle.run_id()
            );
            self.handle.stop_all();
        }
        self.join_threads();
    }
}

impl PipelineEngine {
    /// Release what `init` acquired for containers that were never started.
    fn dispose_idle(&self) {
        let idle: Vec<_> = self
            .shared()
            .containers()
            .into_iter()
            .filter(|c| c.status() == ContainerStatus::Idle)
            .collect();
        if idle.is_empty() {
            return;
        }
        tracing::debug!(
            "[{}] Disposing {} prepared container(s) that never started",
            self.handle.run_id(),
            idle.len()
        );
        for container in idle {
            container.dispose();
            container.set_status(ContainerStatus::Halted);
        }
    }
}

/// Attach every allocated queue to the containers at both of its ends.
fn wire(topology: &QueueTopology, containers: &[Arc<StepContainer>]) {
    for container in containers {
        for queue in topology.inputs_of(container.name(), container.copy()) {
            container.attach_input(queue);
        }
        for (edge, queues) in topology.outputs_of(container.name(), container.copy()) {
            if queues.is_empty() {
                continue;
            }
            container.attach_route(OutputRoute::new(
                edge.to.clone(),
                queues,
                edge.partitioning.method.clone(),
                edge.partitioning.repartition,
            ));
        }
    }
}
