// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use serde::{Deserialize, Serialize};

use crate::core::steps::{ConfiguredStep, StepContext, StepIo, StepRuntime};
use crate::core::Result;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DummyConfig {}

/// Passes every batch through unchanged.
#[derive(Debug, Default)]
pub struct DummyStep;

impl ConfiguredStep for DummyStep {
    const TYPE_NAME: &'static str = "dummy";

    type Config = DummyConfig;

    fn from_config(_config: Self::Config) -> Result<Self> {
        Ok(Self)
    }
}

impl StepRuntime for DummyStep {
    fn init(&mut self, _ctx: &StepContext, _io: &mut StepIo) -> Result<()> {
        Ok(())
    }

    fn process_one_iteration(&mut self, _ctx: &StepContext, io: &mut StepIo) -> Result<bool> {
        match io.get_batch() {
            Some(batch) => Ok(io.put_batch(batch)),
            None => Ok(false),
        }
    }
}
