// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Parallel container initialization.
//!
//! One thread per container runs `init`; the caller does not continue until
//! every one of them has finished. Init is all-or-nothing.

use std::sync::Arc;

use crate::core::container::{ContainerStatus, StepContainer};

/// Initialize every container concurrently and wait for all of them.
///
/// Returns the labels of the containers whose init failed, in container
/// order. An empty list means every init succeeded.
pub fn initialize_all(containers: &[Arc<StepContainer>]) -> Vec<String> {
    let outcomes: Vec<bool> = std::thread::scope(|scope| {
        let handles: Vec<_> = containers
            .iter()
            .map(|container| {
                std::thread::Builder::new()
                    .name(format!("init of {}", container.label()))
                    .spawn_scoped(scope, move || container.run_init().is_ok())
            })
            .collect();

        // Barrier: join every init thread before looking at any result.
        handles
            .into_iter()
            .zip(containers)
            .map(|(handle, container)| match handle {
                Ok(handle) => handle.join().unwrap_or(false),
                Err(e) => {
                    tracing::error!("[{}] Failed to spawn init thread: {}", container.label(), e);
                    false
                }
            })
            .collect()
    });

    containers
        .iter()
        .zip(outcomes)
        .filter(|(_, ok)| !ok)
        .map(|(container, _)| container.label().to_string())
        .collect()
}

/// Undo a failed initialization: dispose every container, then mark the
/// failed ones `Stopped` and the others `Halted`.
pub fn abort_all(containers: &[Arc<StepContainer>], failed: &[String]) {
    for container in containers {
        container.dispose();
        let status = if failed.iter().any(|label| label == container.label()) {
            ContainerStatus::Stopped
        } else {
            ContainerStatus::Halted
        };
        container.set_status(status);
    }
    tracing::info!(
        "Aborted {} container(s) after {} init failure(s)",
        containers.len(),
        failed.len()
    );
}
