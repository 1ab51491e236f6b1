// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use serde::{Deserialize, Serialize};

use super::PartitionDescriptor;
use crate::core::config::Variables;

/// Declared parallelism: a literal count or a `${VAR}` expression.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CopiesExpr {
    Fixed(i64),
    Expression(String),
}

impl Default for CopiesExpr {
    fn default() -> Self {
        Self::Fixed(1)
    }
}

impl CopiesExpr {
    /// Resolve to a copy count. Anything that does not resolve to an
    /// integer yields -1, which compilation rejects.
    pub fn resolve(&self, variables: &Variables) -> i64 {
        match self {
            Self::Fixed(n) => *n,
            Self::Expression(expr) => variables
                .substitute(expr)
                .trim()
                .parse::<i64>()
                .unwrap_or(-1),
        }
    }
}

/// One step of the pipeline. Immutable once the graph is compiled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeDefinition {
    /// Unique within the graph.
    pub name: String,

    /// Step type, looked up in the step registry.
    #[serde(rename = "type")]
    pub step_type: String,

    #[serde(default)]
    pub copies: CopiesExpr,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partitioning: Option<PartitionDescriptor>,

    /// Overrides the partitioning used for rows this node sends downstream.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_partitioning: Option<PartitionDescriptor>,

    /// Sub-graph boundary: owns its own queues, skipped by queue allocation.
    #[serde(default)]
    pub subgraph: bool,

    /// Step-specific configuration payload.
    #[serde(default)]
    pub config: serde_json::Value,
}

impl NodeDefinition {
    pub fn new(name: impl Into<String>, step_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            step_type: step_type.into(),
            copies: CopiesExpr::default(),
            partitioning: None,
            target_partitioning: None,
            subgraph: false,
            config: serde_json::Value::Null,
        }
    }

    pub fn with_copies(mut self, copies: i64) -> Self {
        self.copies = CopiesExpr::Fixed(copies);
        self
    }

    pub fn with_copies_expr(mut self, expr: impl Into<String>) -> Self {
        self.copies = CopiesExpr::Expression(expr.into());
        self
    }

    pub fn with_partitioning(mut self, partitioning: PartitionDescriptor) -> Self {
        self.partitioning = Some(partitioning);
        self
    }

    pub fn with_target_partitioning(mut self, partitioning: PartitionDescriptor) -> Self {
        self.target_partitioning = Some(partitioning);
        self
    }

    pub fn with_config(mut self, config: serde_json::Value) -> Self {
        self.config = config;
        self
    }

    pub fn as_subgraph(mut self) -> Self {
        self.subgraph = true;
        self
    }

    /// Effective partitioning; a descriptor with method `None` counts as
    /// unpartitioned.
    pub fn partitioning(&self) -> Option<&PartitionDescriptor> {
        self.partitioning.as_ref().filter(|p| p.is_partitioned())
    }

    pub fn is_partitioned(&self) -> bool {
        self.partitioning().is_some()
    }

    pub fn target_partitioning(&self) -> Option<&PartitionDescriptor> {
        self.target_partitioning.as_ref().filter(|p| p.is_partitioned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::graph::PartitionMethod;

    #[test]
    fn test_copies_resolution() {
        let vars = Variables::new().with("N", "3").with("BAD", "three");
        assert_eq!(CopiesExpr::Fixed(2).resolve(&vars), 2);
        assert_eq!(CopiesExpr::Expression("${N}".into()).resolve(&vars), 3);
        assert_eq!(CopiesExpr::Expression("${BAD}".into()).resolve(&vars), -1);
        assert_eq!(CopiesExpr::Expression("${MISSING}".into()).resolve(&vars), -1);
    }

    #[test]
    fn test_copies_deserialize_int_or_string() {
        let node: NodeDefinition =
            serde_json::from_str(r#"{"name": "a", "type": "dummy", "copies": 4}"#).unwrap();
        assert_eq!(node.copies, CopiesExpr::Fixed(4));

        let node: NodeDefinition =
            serde_json::from_str(r#"{"name": "a", "type": "dummy", "copies": "${C}"}"#).unwrap();
        assert_eq!(node.copies, CopiesExpr::Expression("${C}".into()));

        let node: NodeDefinition = serde_json::from_str(r#"{"name": "a", "type": "dummy"}"#).unwrap();
        assert_eq!(node.copies, CopiesExpr::Fixed(1));
    }

    #[test]
    fn test_none_method_is_unpartitioned() {
        let node = NodeDefinition::new("a", "dummy").with_partitioning(PartitionDescriptor::new(
            PartitionMethod::None,
            Default::default(),
        ));
        assert!(!node.is_partitioned());
    }
}
