// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Node execution containers: one per (node, copy).

#[allow(clippy::module_inception)]
mod container;
mod counters;
mod signals;
mod status;

pub(crate) use container::panic_message;
pub use container::StepContainer;
pub use counters::{LineCounts, StepCounters};
pub use signals::ContainerSignals;
pub use status::ContainerStatus;
