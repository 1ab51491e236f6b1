// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

#![allow(clippy::type_complexity)] // Complex types are clear in context

pub mod core;

pub use core::prelude;

pub use core::{
    compile, CompilePhase, CompileResult, ConfiguredStep, ContainerStatus, CopiesExpr,
    EngineConfig, EngineError, EngineHandle, EngineRunId, ExecutionListener, ExecutionResult,
    GraphFileDefinition, LineCounts, NodeDefinition, PartitionDescriptor, PartitionMethod,
    PartitionSchema, PipelineEngine, PipelineGraph, QueueTag, Result, Row, RowBatch,
    RowProducer, RowQueue, StepContext, StepFactory, StepIo, StepRegistry, StepRuntime, Value,
    Variables,
};
