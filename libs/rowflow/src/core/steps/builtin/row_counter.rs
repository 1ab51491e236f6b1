// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use serde::{Deserialize, Serialize};

use crate::core::steps::{ConfiguredStep, StepContext, StepIo, StepRuntime};
use crate::core::Result;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RowCounterConfig {}

/// Sink that counts the rows it receives as output lines. Forwards them if
/// it has downstream hops.
#[derive(Debug, Default)]
pub struct RowCounterStep {
    rows: u64,
}

impl RowCounterStep {
    pub fn rows(&self) -> u64 {
        self.rows
    }
}

impl ConfiguredStep for RowCounterStep {
    const TYPE_NAME: &'static str = "row_counter";

    type Config = RowCounterConfig;

    fn from_config(_config: Self::Config) -> Result<Self> {
        Ok(Self::default())
    }
}

impl StepRuntime for RowCounterStep {
    fn init(&mut self, _ctx: &StepContext, _io: &mut StepIo) -> Result<()> {
        self.rows = 0;
        Ok(())
    }

    fn process_one_iteration(&mut self, _ctx: &StepContext, io: &mut StepIo) -> Result<bool> {
        let Some(batch) = io.get_batch() else {
            return Ok(false);
        };
        let n = batch.len() as u64;
        self.rows += n;
        io.counters().add_output(n);
        if io.has_outputs() {
            return Ok(io.put_batch(batch));
        }
        Ok(true)
    }

    fn dispose(&mut self, ctx: &StepContext, _io: &mut StepIo) -> Result<()> {
        tracing::debug!("[{}] Counted {} rows", ctx.label(), self.rows);
        Ok(())
    }
}
