// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use serde::{Deserialize, Serialize};

/// How rows are assigned to the copies of a partitioned node.
///
/// Serialized as a map tagged by `type`, e.g. `{type: mod_remainder, field: 0}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PartitionMethod {
    #[default]
    None,
    /// Every copy receives every row.
    Mirror,
    /// Copy index is the hash of `field` modulo the copy count.
    ModRemainder { field: usize },
}

impl PartitionMethod {
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PartitionSchema {
    pub name: String,
    /// Partition id per copy, by copy index. May be empty.
    #[serde(default)]
    pub partition_ids: Vec<String>,
}

impl PartitionSchema {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            partition_ids: Vec::new(),
        }
    }

    pub fn with_partition_ids<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.partition_ids = ids.into_iter().map(Into::into).collect();
        self
    }
}

/// Partitioning declared on a node. Two descriptors are equal iff both
/// method and schema match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PartitionDescriptor {
    #[serde(default)]
    pub method: PartitionMethod,
    pub schema: PartitionSchema,
}

impl PartitionDescriptor {
    pub fn new(method: PartitionMethod, schema: PartitionSchema) -> Self {
        Self { method, schema }
    }

    pub fn mod_remainder(field: usize, schema: impl Into<String>) -> Self {
        Self::new(PartitionMethod::ModRemainder { field }, PartitionSchema::new(schema))
    }

    pub fn mirror(schema: impl Into<String>) -> Self {
        Self::new(PartitionMethod::Mirror, PartitionSchema::new(schema))
    }

    /// A descriptor with method `None` is the same as no descriptor.
    pub fn is_partitioned(&self) -> bool {
        !self.method.is_none()
    }

    pub fn partition_id(&self, copy: usize) -> Option<&str> {
        self.schema.partition_ids.get(copy).map(String::as_str)
    }
}
