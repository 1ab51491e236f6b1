// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Step runtimes and the data they exchange with the engine.

pub mod builtin;
mod factory;
mod step_io;
mod step_runtime;

pub use factory::{ConfiguredStep, StepFactory, StepRegistry};
pub use step_io::{OutputRoute, StepIo};
pub use step_runtime::{BoxedStep, StepContext, StepRuntime};
