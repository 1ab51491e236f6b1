// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use serde::{Deserialize, Serialize};

use crate::core::rows::Row;
use crate::core::steps::{ConfiguredStep, StepContext, StepIo, StepRuntime};
use crate::core::Result;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectEmptyStreamConfig {
    /// Number of null fields in the emitted row.
    pub width: usize,
}

impl Default for DetectEmptyStreamConfig {
    fn default() -> Self {
        Self { width: 1 }
    }
}

/// Emits one all-null row if its input stream turned out to be empty.
/// Input rows are consumed and never forwarded.
#[derive(Debug)]
pub struct DetectEmptyStreamStep {
    config: DetectEmptyStreamConfig,
    rows_seen: u64,
}

impl ConfiguredStep for DetectEmptyStreamStep {
    const TYPE_NAME: &'static str = "detect_empty_stream";

    type Config = DetectEmptyStreamConfig;

    fn from_config(config: Self::Config) -> Result<Self> {
        Ok(Self {
            config,
            rows_seen: 0,
        })
    }
}

impl StepRuntime for DetectEmptyStreamStep {
    fn init(&mut self, _ctx: &StepContext, _io: &mut StepIo) -> Result<()> {
        self.rows_seen = 0;
        Ok(())
    }

    fn process_one_iteration(&mut self, ctx: &StepContext, io: &mut StepIo) -> Result<bool> {
        if let Some(batch) = io.get_batch() {
            self.rows_seen += batch.len() as u64;
            return Ok(true);
        }

        if self.rows_seen == 0 && !io.is_stopped() {
            tracing::debug!("[{}] Input stream is empty, emitting one row", ctx.label());
            io.put_row(Row::empty(self.config.width));
        }
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::rows::RowBatch;
    use crate::core::steps::builtin::test_support::{drain, harness};
    use serde_json::json;

    fn step() -> DetectEmptyStreamStep {
        DetectEmptyStreamStep::from_config(DetectEmptyStreamConfig { width: 2 }).unwrap()
    }

    #[test]
    fn test_empty_input_emits_one_row() {
        let mut h = harness("detect");
        let mut step = step();
        h.input.set_done();
        while step.process_one_iteration(&h.ctx, &mut h.io).unwrap() {}
        assert_eq!(drain(&h.output), vec![Row::empty(2)]);
    }

    #[test]
    fn test_non_empty_input_emits_nothing() {
        let mut h = harness("detect");
        let mut step = step();
        h.input.put(RowBatch::single(Row::new(vec![json!(1)]))).unwrap();
        h.input.set_done();
        while step.process_one_iteration(&h.ctx, &mut h.io).unwrap() {}
        assert!(drain(&h.output).is_empty());
    }
}
