// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use std::sync::Arc;

use crate::core::queue::RowQueue;
use crate::core::rows::{Row, RowBatch};
use crate::core::{EngineError, Result};

/// Origin name used in the tags of row-producer queues.
pub const ROW_PRODUCER_ORIGIN: &str = "row-producer";

/// Feeds rows straight into one container's input, in place of an upstream
/// node. Dropping the producer ends its stream.
#[derive(Debug)]
pub struct RowProducer {
    queue: Arc<RowQueue>,
}

impl RowProducer {
    pub(crate) fn new(queue: Arc<RowQueue>) -> Self {
        Self { queue }
    }

    /// Blocks while the queue is full.
    pub fn put_batch(&self, batch: RowBatch) -> Result<()> {
        self.queue.put(batch).map_err(|_| {
            EngineError::InvalidState(format!(
                "Row producer {} already finished",
                self.queue.tag()
            ))
        })
    }

    pub fn put_row(&self, row: Row) -> Result<()> {
        self.put_batch(RowBatch::single(row))
    }

    /// Non-blocking put. Returns the batch back when full or finished.
    pub fn try_put_batch(&self, batch: RowBatch) -> std::result::Result<(), RowBatch> {
        self.queue.try_put(batch)
    }

    /// Signal end-of-stream to the consuming container.
    pub fn finished(&self) {
        self.queue.set_done();
    }

    pub fn queue(&self) -> &Arc<RowQueue> {
        &self.queue
    }
}

impl Drop for RowProducer {
    fn drop(&mut self) {
        self.queue.set_done();
    }
}
