// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Static pipeline definition: nodes, hops and partitioning metadata.

#[allow(clippy::module_inception)]
mod graph;
mod graph_file;
mod node;
mod partition;

pub use graph::PipelineGraph;
pub use graph_file::{GraphFileDefinition, HopDefinition};
pub use node::{CopiesExpr, NodeDefinition};
pub use partition::{PartitionDescriptor, PartitionMethod, PartitionSchema};
