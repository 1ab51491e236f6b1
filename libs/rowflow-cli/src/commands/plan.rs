// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use std::path::Path;

use anyhow::{Context, Result};
use rowflow::{compile, EngineConfig, GraphFileDefinition, Variables};

/// Compile the graph and print its queue topology as JSON.
pub fn plan(graph_file: &Path, variables: Variables) -> Result<()> {
    let graph = GraphFileDefinition::from_file(graph_file)
        .with_context(|| format!("Failed to load {}", graph_file.display()))?
        .to_graph()?;

    let compiled = compile(&graph, &variables, EngineConfig::default().queue_capacity)?;
    tracing::info!("{}", compiled.result);

    let plan = serde_json::json!({
        "pipeline": graph.name(),
        "summary": compiled.result,
        "edges": compiled.topology.plan(),
    });
    println!("{}", serde_json::to_string_pretty(&plan)?);
    Ok(())
}
