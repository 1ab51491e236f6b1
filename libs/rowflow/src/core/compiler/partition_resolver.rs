// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Decides, per edge, whether rows have to be redistributed across copies.

use crate::core::graph::{NodeDefinition, PartitionDescriptor, PartitionMethod};

/// Outcome for one edge `from -> to`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgePartitioning {
    /// Rows must be redistributed across the destination copies.
    pub repartition: bool,
    /// Row-to-copy assignment used by the sender. `None` means round-robin.
    pub method: PartitionMethod,
}

/// Redistribution rule between two effective descriptors.
pub fn requires_repartition(
    from: Option<&PartitionDescriptor>,
    to: Option<&PartitionDescriptor>,
) -> bool {
    match (from, to) {
        (_, None) => false,
        (None, Some(_)) => true,
        (Some(a), Some(b)) => a != b,
    }
}

/// Resolve the edge `from -> to`. A target-partitioning override declared
/// on `from` replaces the destination's own descriptor.
pub fn resolve_edge(from: &NodeDefinition, to: &NodeDefinition) -> EdgePartitioning {
    let target = from.target_partitioning().or_else(|| to.partitioning());
    let repartition = requires_repartition(from.partitioning(), target);
    let method = match target {
        Some(descriptor) if repartition => descriptor.method.clone(),
        _ => PartitionMethod::None,
    };
    EdgePartitioning { repartition, method }
}
