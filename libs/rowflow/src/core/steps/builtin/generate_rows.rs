// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use serde::{Deserialize, Serialize};

use crate::core::rows::{Row, RowBatch, Value};
use crate::core::steps::{ConfiguredStep, StepContext, StepIo, StepRuntime};
use crate::core::Result;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerateRowsConfig {
    /// Rows emitted by each copy.
    pub limit: u64,
    /// Rows per emitted batch.
    pub batch_size: usize,
    /// Prepend a 0-based sequence number to every row.
    pub sequence: bool,
    /// Constant fields appended to every row.
    pub fields: Vec<Value>,
}

impl Default for GenerateRowsConfig {
    fn default() -> Self {
        Self {
            limit: 10,
            batch_size: 1,
            sequence: true,
            fields: Vec::new(),
        }
    }
}

/// Emits `limit` rows, then ends its stream.
#[derive(Debug)]
pub struct GenerateRowsStep {
    config: GenerateRowsConfig,
    emitted: u64,
    stopped: bool,
}

impl GenerateRowsStep {
    pub fn new(config: GenerateRowsConfig) -> Self {
        Self {
            config,
            emitted: 0,
            stopped: false,
        }
    }

    fn next_row(&self, seq: u64) -> Row {
        let mut values = Vec::with_capacity(self.config.fields.len() + 1);
        if self.config.sequence {
            values.push(Value::from(seq));
        }
        values.extend(self.config.fields.iter().cloned());
        Row::new(values)
    }
}

impl ConfiguredStep for GenerateRowsStep {
    const TYPE_NAME: &'static str = "generate_rows";

    type Config = GenerateRowsConfig;

    fn from_config(config: Self::Config) -> Result<Self> {
        Ok(Self::new(config))
    }
}

impl StepRuntime for GenerateRowsStep {
    fn init(&mut self, ctx: &StepContext, _io: &mut StepIo) -> Result<()> {
        self.emitted = 0;
        tracing::debug!("[{}] Generating {} rows", ctx.label(), self.config.limit);
        Ok(())
    }

    fn process_one_iteration(&mut self, _ctx: &StepContext, io: &mut StepIo) -> Result<bool> {
        if self.stopped || self.emitted >= self.config.limit {
            return Ok(false);
        }

        let remaining = self.config.limit - self.emitted;
        let size = (self.config.batch_size.max(1) as u64).min(remaining);
        let batch: RowBatch = (self.emitted..self.emitted + size)
            .map(|seq| self.next_row(seq))
            .collect();

        io.counters().add_input(size);
        if !io.put_batch(batch) {
            return Ok(false);
        }
        self.emitted += size;
        Ok(self.emitted < self.config.limit)
    }

    fn set_stopped(&mut self, stopped: bool) {
        self.stopped = stopped;
    }
}
