// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Commonly used types for `use rowflow::prelude::*`.

pub use crate::core::{
    // Errors
    error::{EngineError, Result},

    // Graph
    graph::{GraphFileDefinition, NodeDefinition, PartitionDescriptor, PipelineGraph},

    // Rows
    rows::{Row, RowBatch, Value},

    // Steps
    steps::{ConfiguredStep, StepContext, StepIo, StepRegistry, StepRuntime},

    // Engine
    config::{EngineConfig, Variables},
    engine::{EngineHandle, ExecutionResult, PipelineEngine},
};
