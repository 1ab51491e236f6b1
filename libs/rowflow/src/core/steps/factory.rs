// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Creation of step runtimes, one per (node, copy).

use std::collections::HashMap;

use parking_lot::RwLock;
use serde::de::DeserializeOwned;

use super::builtin::{DetectEmptyStreamStep, DummyStep, GenerateRowsStep, RowCounterStep};
use super::{BoxedStep, StepRuntime};
use crate::core::graph::NodeDefinition;
use crate::core::{EngineError, Result};

/// Creates the runtime for one copy of a node.
pub trait StepFactory: Send + Sync {
    fn create(&self, node: &NodeDefinition, copy: usize) -> Result<BoxedStep>;

    /// Check if this factory can create a step type.
    fn can_create(&self, _step_type: &str) -> bool {
        true
    }
}

impl<F> StepFactory for F
where
    F: Fn(&NodeDefinition, usize) -> Result<BoxedStep> + Send + Sync,
{
    fn create(&self, node: &NodeDefinition, copy: usize) -> Result<BoxedStep> {
        self(node, copy)
    }
}

/// A step type constructed from its node's JSON `config`.
pub trait ConfiguredStep: StepRuntime + Sized + 'static {
    const TYPE_NAME: &'static str;

    type Config: DeserializeOwned + Default;

    fn from_config(config: Self::Config) -> Result<Self>;
}

mod private {
    use super::{BoxedStep, NodeDefinition, Result};

    /// Factory function signature for creating steps.
    pub type ConstructorFn = Box<dyn Fn(&NodeDefinition, usize) -> Result<BoxedStep> + Send + Sync>;
}

/// Maps node `type` strings to constructors.
pub struct StepRegistry {
    constructors: RwLock<HashMap<String, private::ConstructorFn>>,
}

impl Default for StepRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl StepRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self {
            constructors: RwLock::new(HashMap::new()),
        }
    }

    /// Registry with `generate_rows`, `dummy`, `detect_empty_stream` and
    /// `row_counter`.
    pub fn with_builtins() -> Self {
        let registry = Self::new();
        registry.register::<GenerateRowsStep>();
        registry.register::<DummyStep>();
        registry.register::<DetectEmptyStreamStep>();
        registry.register::<RowCounterStep>();
        registry
    }

    pub fn register<S: ConfiguredStep>(&self) {
        self.register_fn(S::TYPE_NAME, |node, _copy| {
            let config: S::Config = if node.config.is_null() {
                S::Config::default()
            } else {
                serde_json::from_value(node.config.clone()).map_err(|e| {
                    EngineError::Configuration(format!(
                        "Failed to deserialize config for '{}': {}",
                        node.name, e
                    ))
                })?
            };
            Ok(Box::new(S::from_config(config)?) as BoxedStep)
        });
    }

    /// Register a constructor closure. Replaces an existing registration.
    pub fn register_fn<F>(&self, step_type: &str, constructor: F)
    where
        F: Fn(&NodeDefinition, usize) -> Result<BoxedStep> + Send + Sync + 'static,
    {
        let previous = self
            .constructors
            .write()
            .insert(step_type.to_string(), Box::new(constructor));
        if previous.is_some() {
            tracing::warn!("Step type '{}' registered twice, replacing", step_type);
        } else {
            tracing::debug!("Registered step type '{}'", step_type);
        }
    }

    pub fn step_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.constructors.read().keys().cloned().collect();
        types.sort();
        types
    }
}

impl StepFactory for StepRegistry {
    fn create(&self, node: &NodeDefinition, copy: usize) -> Result<BoxedStep> {
        let constructors = self.constructors.read();
        let constructor = constructors.get(&node.step_type).ok_or_else(|| {
            EngineError::NotFound(format!(
                "Unknown step type '{}' for node '{}'",
                node.step_type, node.name
            ))
        })?;
        constructor(node, copy)
    }

    fn can_create(&self, step_type: &str) -> bool {
        self.constructors.read().contains_key(step_type)
    }
}
