// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifies the exact (source copy, destination copy) pair a queue serves.
///
/// Assigned when the queue is allocated and never changed afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct QueueTag {
    pub origin_node: String,
    pub origin_copy: usize,
    pub dest_node: String,
    pub dest_copy: usize,
}

impl QueueTag {
    pub fn new(
        origin_node: impl Into<String>,
        origin_copy: usize,
        dest_node: impl Into<String>,
        dest_copy: usize,
    ) -> Self {
        Self {
            origin_node: origin_node.into(),
            origin_copy,
            dest_node: dest_node.into(),
            dest_copy,
        }
    }

    pub fn matches(&self, from: &str, from_copy: usize, to: &str, to_copy: usize) -> bool {
        self.origin_node == from
            && self.origin_copy == from_copy
            && self.dest_node == to
            && self.dest_copy == to_copy
    }
}

impl fmt::Display for QueueTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{} -> {}.{}",
            self.origin_node, self.origin_copy, self.dest_node, self.dest_copy
        )
    }
}
