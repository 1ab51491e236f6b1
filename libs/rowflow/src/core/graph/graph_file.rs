// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Declarative graph file format for loading pipelines from JSON/YAML.
//!
//! # Example Graph File
//!
//! ```json
//! {
//!   "name": "fan-out",
//!   "nodes": [
//!     { "name": "rows", "type": "generate_rows", "config": { "limit": 100 } },
//!     { "name": "work", "type": "dummy", "copies": "${WORKERS}" },
//!     { "name": "count", "type": "row_counter" }
//!   ],
//!   "hops": [
//!     { "from": "rows", "to": "work" },
//!     { "from": "work", "to": "count" }
//!   ]
//! }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{NodeDefinition, PipelineGraph};
use crate::core::{EngineError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphFileDefinition {
    #[serde(default)]
    pub name: Option<String>,

    pub nodes: Vec<NodeDefinition>,

    #[serde(default)]
    pub hops: Vec<HopDefinition>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HopDefinition {
    pub from: String,
    pub to: String,
}

impl GraphFileDefinition {
    /// Load from a `.json`, `.yaml` or `.yml` file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            EngineError::Configuration(format!(
                "Failed to open graph file '{}': {}",
                path.display(),
                e
            ))
        })?;

        let is_yaml = matches!(
            path.extension().and_then(|ext| ext.to_str()),
            Some("yaml") | Some("yml")
        );
        let parsed = if is_yaml {
            Self::from_yaml_str(&content)
        } else {
            Self::from_json_str(&content)
        };
        parsed.map_err(|e| {
            EngineError::Configuration(format!(
                "Failed to parse graph file '{}': {}",
                path.display(),
                e
            ))
        })
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| EngineError::Serialization(format!("Failed to parse graph JSON: {}", e)))
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml)
            .map_err(|e| EngineError::Serialization(format!("Failed to parse graph YAML: {}", e)))
    }

    /// Build the graph; fails on duplicate names or hops to unknown nodes.
    pub fn to_graph(&self) -> Result<PipelineGraph> {
        let mut graph = PipelineGraph::new(self.name.clone().unwrap_or_else(|| "pipeline".into()));
        for node in &self.nodes {
            graph.add_node(node.clone())?;
        }
        for hop in &self.hops {
            graph.add_edge(&hop.from, &hop.to)?;
        }
        graph.validate()?;
        Ok(graph)
    }
}
