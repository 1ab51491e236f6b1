// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Container thread main loop.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use crate::core::container::{ContainerStatus, StepContainer};
use crate::core::Result;

/// Drive one container until its runtime reports completion, it is
/// stopped, or it fails. `on_terminated` runs last, after the final status
/// is set and every output queue is marked done.
///
/// `halted` reports an engine-wide hard stop. A container that exits while
/// it is set ends `Stopped` even if its inputs reached end-of-stream.
pub fn run_container_loop<H, F>(
    container: Arc<StepContainer>,
    pause_check: Duration,
    halted: H,
    on_terminated: F,
) where
    H: Fn() -> bool,
    F: FnOnce(&Arc<StepContainer>),
{
    let label = container.label().to_string();
    tracing::debug!("[{}] Thread started", label);

    container.set_status(ContainerStatus::Running);

    let outcome = catch_unwind(AssertUnwindSafe(|| process_loop(&container, pause_check)));
    match outcome {
        Ok(Ok(())) => {}
        Ok(Err(e)) => {
            let errors = container.add_error();
            tracing::error!("[{}] Processing error ({} total): {}", label, errors, e);
        }
        Err(panic) => {
            let errors = container.add_error();
            tracing::error!(
                "[{}] Step panicked ({} errors total): {}",
                label,
                errors,
                crate::core::container::panic_message(panic.as_ref())
            );
        }
    }

    tracing::trace!("[{}] Exited processing loop, disposing", label);
    container.dispose();
    container.lock_io().set_output_done();

    let status = if container.errors() > 0 || container.is_stopped() || halted() {
        ContainerStatus::Stopped
    } else {
        ContainerStatus::Finished
    };
    container.set_status(status);
    tracing::debug!("[{}] Thread finished ({})", label, status);

    on_terminated(&container);
}

fn process_loop(container: &StepContainer, pause_check: Duration) -> Result<()> {
    let ctx = container.context();
    let mut runtime = container.lock_runtime();
    let mut io = container.lock_io();
    runtime.mark_start();

    loop {
        if container.is_stopped() {
            tracing::trace!("[{}] Observed stop request", container.label());
            runtime.set_stopped(true);
            if let Err(e) = runtime.stop_processing(ctx, &mut io) {
                tracing::warn!("[{}] stop_processing error: {}", container.label(), e);
            }
            return Ok(());
        }

        if container.is_paused() {
            container.set_status(ContainerStatus::Paused);
            container.signals().wait_while_paused(pause_check);
            if !container.is_stopped() {
                container.set_status(ContainerStatus::Running);
            }
            continue;
        }

        if !runtime.process_one_iteration(ctx, &mut io)? {
            tracing::trace!("[{}] Step reported completion", container.label());
            return Ok(());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::graph::NodeDefinition;
    use crate::core::steps::{StepContext, StepIo, StepRuntime};
    use crate::core::EngineError;

    struct Countdown(u32);

    impl StepRuntime for Countdown {
        fn init(&mut self, _ctx: &StepContext, _io: &mut StepIo) -> Result<()> {
            Ok(())
        }

        fn process_one_iteration(&mut self, _ctx: &StepContext, _io: &mut StepIo) -> Result<bool> {
            match self.0 {
                0 => Err(EngineError::Configuration("ran out".into())),
                1 => Ok(false),
                _ => {
                    self.0 -= 1;
                    Ok(true)
                }
            }
        }
    }

    struct Forever;

    impl StepRuntime for Forever {
        fn init(&mut self, _ctx: &StepContext, _io: &mut StepIo) -> Result<()> {
            Ok(())
        }

        fn process_one_iteration(&mut self, _ctx: &StepContext, _io: &mut StepIo) -> Result<bool> {
            std::thread::sleep(Duration::from_millis(1));
            Ok(true)
        }
    }

    fn container(step: Box<dyn StepRuntime>) -> Arc<StepContainer> {
        let ctx = StepContext::new(Arc::new(NodeDefinition::new("t", "test")), 0);
        Arc::new(StepContainer::new(ctx, step, Duration::from_millis(1)))
    }

    #[test]
    fn test_natural_completion_is_finished() {
        let c = container(Box::new(Countdown(3)));
        let mut called = false;
        run_container_loop(Arc::clone(&c), Duration::from_millis(1), || false, |_| called = true);
        assert!(called);
        assert_eq!(c.status(), ContainerStatus::Finished);
        assert_eq!(c.errors(), 0);
    }

    #[test]
    fn test_error_counts_and_stops() {
        let c = container(Box::new(Countdown(0)));
        run_container_loop(Arc::clone(&c), Duration::from_millis(1), || false, |_| {});
        assert_eq!(c.errors(), 1);
        assert_eq!(c.status(), ContainerStatus::Stopped);
    }

    #[test]
    fn test_stop_request_ends_loop() {
        let c = container(Box::new(Forever));
        let runner = {
            let c = Arc::clone(&c);
            std::thread::spawn(move || run_container_loop(c, Duration::from_millis(1), || false, |_| {}))
        };
        std::thread::sleep(Duration::from_millis(20));
        c.request_stop(false);
        runner.join().unwrap();
        assert_eq!(c.status(), ContainerStatus::Stopped);
        assert_eq!(c.errors(), 0);
    }

    struct PanicsOnStart;

    impl StepRuntime for PanicsOnStart {
        fn init(&mut self, _ctx: &StepContext, _io: &mut StepIo) -> Result<()> {
            Ok(())
        }

        fn process_one_iteration(&mut self, _ctx: &StepContext, _io: &mut StepIo) -> Result<bool> {
            Ok(true)
        }

        fn mark_start(&mut self) {
            panic!("start hook blew up");
        }
    }

    #[test]
    fn test_panic_in_mark_start_terminates() {
        let c = container(Box::new(PanicsOnStart));
        let mut called = false;
        run_container_loop(Arc::clone(&c), Duration::from_millis(1), || false, |_| called = true);
        assert!(called);
        assert_eq!(c.errors(), 1);
        assert_eq!(c.status(), ContainerStatus::Stopped);
    }

    #[test]
    fn test_natural_end_during_hard_stop_is_stopped() {
        let c = container(Box::new(Countdown(3)));
        run_container_loop(Arc::clone(&c), Duration::from_millis(1), || true, |_| {});
        assert_eq!(c.errors(), 0);
        assert_eq!(c.status(), ContainerStatus::Stopped);
    }
}
