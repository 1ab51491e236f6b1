// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Engine lifecycle: prepare, start, stop, pause and completion.

#[allow(clippy::module_inception)]
mod engine;
mod handle;
mod listeners;
mod result;
mod row_producer;
mod run_id;
mod shared;
mod status;

pub use engine::PipelineEngine;
pub use handle::EngineHandle;
pub use listeners::{ExecutionListener, OnFinished, OnStarted, StoppedListener};
pub use result::{ContainerResult, ExecutionResult};
pub use row_producer::{RowProducer, ROW_PRODUCER_ORIGIN};
pub use run_id::EngineRunId;
pub use status::{describe, EngineStatus, StatusFlags};
