// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use rowflow::{EngineConfig, GraphFileDefinition, PipelineEngine, StepRegistry, Variables};

pub struct RunOptions {
    pub graph_file: PathBuf,
    pub config: Option<PathBuf>,
    pub queue_capacity: Option<usize>,
    pub variables: Variables,
    pub safe_stop_after_ms: Option<u64>,
}

/// Run the graph to completion. Returns whether it finished without errors.
pub fn run(options: RunOptions) -> Result<bool> {
    let graph = GraphFileDefinition::from_file(&options.graph_file)
        .with_context(|| format!("Failed to load {}", options.graph_file.display()))?
        .to_graph()?;

    let mut config = match &options.config {
        Some(path) => EngineConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => EngineConfig::default(),
    }
    .with_env_overrides();
    if let Some(capacity) = options.queue_capacity {
        config = config.with_queue_capacity(capacity);
    }
    config.validate()?;

    let mut engine = PipelineEngine::with_config(
        graph,
        Arc::new(StepRegistry::with_builtins()),
        config,
    )
    .with_variables(options.variables);

    engine.execute()?;

    if let Some(ms) = options.safe_stop_after_ms {
        let handle = engine.handle();
        std::thread::Builder::new()
            .name("safe-stop timer".to_string())
            .spawn(move || {
                std::thread::sleep(Duration::from_millis(ms));
                if !handle.is_finished() {
                    tracing::info!("Safe-stopping after {} ms", ms);
                    handle.safe_stop();
                }
            })
            .context("Failed to spawn safe-stop timer")?;
    }

    engine.wait_until_finished()?;
    let result = engine.result();
    engine.cleanup()?;

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(result.is_success())
}
