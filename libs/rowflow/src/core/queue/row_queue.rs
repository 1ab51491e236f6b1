// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Fixed-capacity FIFO of row batches backed by a bounded crossbeam channel.
//!
//! A queue has exactly one producer and one consumer. The producer marks the
//! queue done once; after that the consumer drains what is left and then
//! observes end-of-stream forever.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TrySendError};

use super::QueueTag;
use crate::core::rows::RowBatch;
use crate::core::{EngineError, Result};

/// Wait slice used by blocking `get` while checking for the done signal.
const GET_POLL_SLICE: Duration = Duration::from_millis(10);

pub struct RowQueue {
    tag: QueueTag,
    capacity: usize,
    sender: Sender<RowBatch>,
    receiver: Receiver<RowBatch>,
    done: AtomicBool,
}

impl RowQueue {
    pub fn new(tag: QueueTag, capacity: usize) -> Result<Self> {
        if capacity == 0 {
            return Err(EngineError::Configuration(format!(
                "Queue {} must have a capacity greater than zero",
                tag
            )));
        }
        let (sender, receiver) = crossbeam_channel::bounded(capacity);
        Ok(Self {
            tag,
            capacity,
            sender,
            receiver,
            done: AtomicBool::new(false),
        })
    }

    pub fn tag(&self) -> &QueueTag {
        &self.tag
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of batches currently buffered.
    pub fn size(&self) -> usize {
        self.receiver.len()
    }

    /// Blocking put. Returns the batch back if the producer already
    /// signaled done.
    pub fn put(&self, batch: RowBatch) -> std::result::Result<(), RowBatch> {
        if self.is_done() {
            return Err(batch);
        }
        // Both ends live in `self`, so the channel never disconnects.
        self.sender.send(batch).map_err(|e| e.into_inner())
    }

    /// Non-blocking put. Returns the batch back when full or done.
    pub fn try_put(&self, batch: RowBatch) -> std::result::Result<(), RowBatch> {
        if self.is_done() {
            return Err(batch);
        }
        self.sender.try_send(batch).map_err(|e| match e {
            TrySendError::Full(b) | TrySendError::Disconnected(b) => b,
        })
    }

    pub fn put_timeout(
        &self,
        batch: RowBatch,
        timeout: Duration,
    ) -> std::result::Result<(), RowBatch> {
        if self.is_done() {
            return Err(batch);
        }
        self.sender
            .send_timeout(batch, timeout)
            .map_err(|e| e.into_inner())
    }

    /// Blocking get. `None` means end-of-stream: the producer signaled done
    /// and everything buffered has been consumed.
    pub fn get(&self) -> Option<RowBatch> {
        loop {
            match self.receiver.recv_timeout(GET_POLL_SLICE) {
                Ok(batch) => return Some(batch),
                Err(RecvTimeoutError::Timeout) => {
                    if self.is_drained() {
                        return None;
                    }
                }
                Err(RecvTimeoutError::Disconnected) => return None,
            }
        }
    }

    /// Non-blocking get. `None` when currently empty (check `is_drained`
    /// to tell empty apart from end-of-stream).
    pub fn try_get(&self) -> Option<RowBatch> {
        self.receiver.try_recv().ok()
    }

    pub fn get_timeout(&self, timeout: Duration) -> Option<RowBatch> {
        self.receiver.recv_timeout(timeout).ok()
    }

    /// Signal that the producer will put no more batches. Only the first
    /// call has an effect; returns whether this call performed it.
    pub fn set_done(&self) -> bool {
        !self.done.swap(true, Ordering::AcqRel)
    }

    pub fn is_done(&self) -> bool {
        self.done.load(Ordering::Acquire)
    }

    /// Done and empty: the consumer will never see another batch.
    pub fn is_drained(&self) -> bool {
        self.is_done() && self.receiver.is_empty()
    }

    /// Discard everything buffered without touching the done flag.
    pub fn clear(&self) -> usize {
        let mut discarded = 0;
        while self.receiver.try_recv().is_ok() {
            discarded += 1;
        }
        discarded
    }
}

impl std::fmt::Debug for RowQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RowQueue")
            .field("tag", &self.tag)
            .field("capacity", &self.capacity)
            .field("size", &self.size())
            .field("done", &self.is_done())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::rows::Row;
    use serde_json::json;
    use std::sync::Arc;

    fn queue(capacity: usize) -> RowQueue {
        RowQueue::new(QueueTag::new("a", 0, "b", 0), capacity).unwrap()
    }

    fn batch(n: i64) -> RowBatch {
        RowBatch::single(Row::new(vec![json!(n)]))
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let err = RowQueue::new(QueueTag::new("a", 0, "b", 0), 0).unwrap_err();
        assert!(matches!(err, EngineError::Configuration(_)));
    }

    #[test]
    fn test_try_put_respects_capacity() {
        let q = queue(2);
        assert!(q.try_put(batch(1)).is_ok());
        assert!(q.try_put(batch(2)).is_ok());
        assert!(q.try_put(batch(3)).is_err());
        assert_eq!(q.size(), 2);
    }

    #[test]
    fn test_fifo_then_end_of_stream() {
        let q = queue(4);
        q.put(batch(1)).unwrap();
        q.put(batch(2)).unwrap();
        assert!(q.set_done());
        assert!(!q.set_done());

        assert_eq!(q.get(), Some(batch(1)));
        assert_eq!(q.get(), Some(batch(2)));
        assert_eq!(q.get(), None);
        assert_eq!(q.get(), None);
        assert!(q.put(batch(3)).is_err());
    }

    #[test]
    fn test_blocking_put_unblocks_when_consumer_reads() {
        let q = Arc::new(queue(1));
        q.put(batch(0)).unwrap();

        let producer = {
            let q = Arc::clone(&q);
            std::thread::spawn(move || {
                q.put(batch(1)).unwrap();
                q.set_done();
            })
        };

        assert_eq!(q.get(), Some(batch(0)));
        assert_eq!(q.get(), Some(batch(1)));
        assert_eq!(q.get(), None);
        producer.join().unwrap();
    }

    #[test]
    fn test_clear_keeps_done_flag() {
        let q = queue(4);
        q.put(batch(1)).unwrap();
        q.put(batch(2)).unwrap();
        assert_eq!(q.clear(), 2);
        assert_eq!(q.size(), 0);
        assert!(!q.is_done());
        assert!(q.try_get().is_none());
    }
}
