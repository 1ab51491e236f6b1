// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Ordered listener lists for engine start, finish and stop.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use parking_lot::RwLock;

use super::EngineHandle;
use crate::core::container::panic_message;
use crate::core::{EngineError, Result};

/// Observes the start and end of a run.
pub trait ExecutionListener: Send + Sync {
    /// Called before any container thread starts.
    fn started(&self, _engine: &EngineHandle) -> Result<()> {
        Ok(())
    }

    /// Called once, after every container reached a terminal state.
    fn finished(&self, _engine: &EngineHandle) -> Result<()> {
        Ok(())
    }
}

/// Observes stop requests (hard or safe).
pub trait StoppedListener: Send + Sync {
    fn stopped(&self, engine: &EngineHandle);
}

impl<F> StoppedListener for F
where
    F: Fn(&EngineHandle) + Send + Sync,
{
    fn stopped(&self, engine: &EngineHandle) {
        self(engine)
    }
}

/// [`ExecutionListener`] that only reacts to `started`.
pub struct OnStarted<F>(pub F);

impl<F> ExecutionListener for OnStarted<F>
where
    F: Fn(&EngineHandle) -> Result<()> + Send + Sync,
{
    fn started(&self, engine: &EngineHandle) -> Result<()> {
        (self.0)(engine)
    }
}

/// [`ExecutionListener`] that only reacts to `finished`.
pub struct OnFinished<F>(pub F);

impl<F> ExecutionListener for OnFinished<F>
where
    F: Fn(&EngineHandle) -> Result<()> + Send + Sync,
{
    fn finished(&self, engine: &EngineHandle) -> Result<()> {
        (self.0)(engine)
    }
}

#[derive(Default)]
pub(crate) struct ListenerRegistry {
    execution: RwLock<Vec<Arc<dyn ExecutionListener>>>,
    stopped: RwLock<Vec<Arc<dyn StoppedListener>>>,
}

impl ListenerRegistry {
    pub fn add_execution(&self, listener: Arc<dyn ExecutionListener>) {
        self.execution.write().push(listener);
    }

    /// Register ahead of every existing listener.
    pub fn insert_execution_first(&self, listener: Arc<dyn ExecutionListener>) {
        self.execution.write().insert(0, listener);
    }

    pub fn add_stopped(&self, listener: Arc<dyn StoppedListener>) {
        self.stopped.write().push(listener);
    }

    pub fn fire_started(&self, engine: &EngineHandle) -> Result<()> {
        self.fire("started", engine, |l, e| l.started(e))
    }

    pub fn fire_finished(&self, engine: &EngineHandle) -> Result<()> {
        self.fire("finished", engine, |l, e| l.finished(e))
    }

    pub fn fire_stopped(&self, engine: &EngineHandle) {
        let listeners = self.stopped.read().clone();
        for listener in listeners {
            if let Err(panic) = catch_unwind(AssertUnwindSafe(|| listener.stopped(engine))) {
                tracing::warn!(
                    "[{}] Stopped listener panicked: {}",
                    engine.run_id(),
                    panic_message(panic.as_ref())
                );
            }
        }
    }

    /// Invoke every listener even if some fail; the first failure is
    /// returned afterwards.
    fn fire<F>(&self, event: &str, engine: &EngineHandle, call: F) -> Result<()>
    where
        F: Fn(&dyn ExecutionListener, &EngineHandle) -> Result<()>,
    {
        let listeners = self.execution.read().clone();
        let mut first_error: Option<EngineError> = None;

        for listener in listeners {
            let outcome = catch_unwind(AssertUnwindSafe(|| call(listener.as_ref(), engine)));
            let error = match outcome {
                Ok(Ok(())) => continue,
                Ok(Err(e)) => e,
                Err(panic) => EngineError::Listener(panic_message(panic.as_ref())),
            };
            tracing::warn!("[{}] {} listener failed: {}", engine.run_id(), event, error);
            if first_error.is_none() {
                first_error = Some(error);
            }
        }

        match first_error {
            None => Ok(()),
            Some(e @ EngineError::Listener(_)) => Err(e),
            Some(e) => Err(EngineError::Listener(e.to_string())),
        }
    }
}
