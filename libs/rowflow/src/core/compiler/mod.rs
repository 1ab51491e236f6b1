// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Graph compilation: dispatch selection, queue allocation and run order.

mod compile_phase;
mod compile_result;
#[allow(clippy::module_inception)]
mod compiler;
mod dispatch;
mod partition_resolver;
mod topology_sort;

pub use compile_phase::CompilePhase;
pub use compile_result::CompileResult;
pub use compiler::{
    compile, CompiledPipeline, EdgeAllocation, EdgePlan, GraphCompiler, QueueTopology,
    ResolvedNode,
};
pub use dispatch::DispatchType;
pub use partition_resolver::{requires_repartition, resolve_edge, EdgePartitioning};
pub use topology_sort::{sort_run_order, RunOrderItem, SortOutcome};
