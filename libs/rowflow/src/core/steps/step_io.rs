// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Per-container execution data: attached queues, routing and counters.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::Duration;

use crate::core::container::{ContainerSignals, StepCounters};
use crate::core::graph::PartitionMethod;
use crate::core::queue::RowQueue;
use crate::core::rows::{Row, RowBatch, Value};

/// Queues toward one destination node, ordered by destination copy.
#[derive(Debug)]
pub struct OutputRoute {
    pub destination: String,
    pub queues: Vec<Arc<RowQueue>>,
    pub method: PartitionMethod,
    pub repartition: bool,
    next: usize,
}

impl OutputRoute {
    pub fn new(
        destination: impl Into<String>,
        queues: Vec<Arc<RowQueue>>,
        method: PartitionMethod,
        repartition: bool,
    ) -> Self {
        Self {
            destination: destination.into(),
            queues,
            method,
            repartition,
            next: 0,
        }
    }

    /// Split `batch` into per-queue batches (index into `queues`).
    fn distribute(&mut self, batch: RowBatch) -> Vec<(usize, RowBatch)> {
        let n = self.queues.len();
        if n == 0 {
            return Vec::new();
        }
        if n == 1 {
            return vec![(0, batch)];
        }

        match (&self.method, self.repartition) {
            (PartitionMethod::Mirror, true) => {
                (0..n).map(|i| (i, batch.clone())).collect()
            }
            (PartitionMethod::ModRemainder { field }, true) => {
                let mut buckets: Vec<RowBatch> = (0..n).map(|_| RowBatch::default()).collect();
                for row in batch {
                    let slot = partition_slot(row.get(*field), n);
                    buckets[slot].push(row);
                }
                buckets
                    .into_iter()
                    .enumerate()
                    .filter(|(_, b)| !b.is_empty())
                    .collect()
            }
            _ => {
                let slot = self.next % n;
                self.next = (slot + 1) % n;
                vec![(slot, batch)]
            }
        }
    }
}

/// Copy index for a partition key value.
fn partition_slot(value: Option<&Value>, copies: usize) -> usize {
    let copies_i64 = copies as i64;
    match value {
        Some(Value::Number(n)) if n.as_i64().is_some() => {
            n.as_i64().map(|v| v.rem_euclid(copies_i64) as usize).unwrap_or(0)
        }
        Some(Value::Null) | None => 0,
        Some(other) => {
            let mut hasher = DefaultHasher::new();
            match other {
                Value::String(s) => s.hash(&mut hasher),
                v => v.to_string().hash(&mut hasher),
            }
            (hasher.finish() % copies as u64) as usize
        }
    }
}

/// What a step reads from and writes to.
pub struct StepIo {
    label: String,
    inputs: Vec<Arc<RowQueue>>,
    next_input: usize,
    routes: Vec<OutputRoute>,
    counters: Arc<StepCounters>,
    signals: Arc<ContainerSignals>,
    poll_interval: Duration,
    output_done: bool,
}

impl StepIo {
    pub fn new(
        label: impl Into<String>,
        counters: Arc<StepCounters>,
        signals: Arc<ContainerSignals>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            label: label.into(),
            inputs: Vec::new(),
            next_input: 0,
            routes: Vec::new(),
            counters,
            signals,
            poll_interval,
            output_done: false,
        }
    }

    pub fn add_input(&mut self, queue: Arc<RowQueue>) {
        self.inputs.push(queue);
    }

    pub fn add_route(&mut self, route: OutputRoute) {
        self.routes.push(route);
    }

    /// Input queues not yet at end-of-stream.
    pub fn inputs(&self) -> &[Arc<RowQueue>] {
        &self.inputs
    }

    pub fn routes(&self) -> &[OutputRoute] {
        &self.routes
    }

    pub fn has_inputs(&self) -> bool {
        !self.inputs.is_empty()
    }

    pub fn has_outputs(&self) -> bool {
        self.routes.iter().any(|r| !r.queues.is_empty())
    }

    pub fn counters(&self) -> &StepCounters {
        &self.counters
    }

    pub fn is_stopped(&self) -> bool {
        self.signals.is_stopped()
    }

    /// Next batch from any input (unordered merge across queues).
    ///
    /// `None` when every input reached end-of-stream, when there are no
    /// inputs, or when the container was stopped.
    pub fn get_batch(&mut self) -> Option<RowBatch> {
        loop {
            if self.signals.is_stopped() {
                return None;
            }
            self.inputs.retain(|q| !q.is_drained());
            if self.inputs.is_empty() {
                return None;
            }

            let n = self.inputs.len();
            let start = self.next_input % n;
            for offset in 0..n {
                let idx = (start + offset) % n;
                if let Some(batch) = self.inputs[idx].try_get() {
                    self.next_input = (idx + 1) % n;
                    self.counters.add_read(batch.len() as u64);
                    return Some(batch);
                }
            }

            if let Some(batch) = self.inputs[start].get_timeout(self.poll_interval) {
                self.next_input = (start + 1) % n;
                self.counters.add_read(batch.len() as u64);
                return Some(batch);
            }
            self.next_input = (start + 1) % n;
            tracing::trace!("[{}] Waiting for input", self.label);
        }
    }

    /// Send `batch` to every destination node; within one destination it
    /// goes to one copy (or all copies when mirrored).
    ///
    /// Returns false if the container was stopped before every part was
    /// delivered.
    pub fn put_batch(&mut self, batch: RowBatch) -> bool {
        if batch.is_empty() {
            return true;
        }
        let rows = batch.len() as u64;
        let route_count = self.routes.len();
        let mut delivered = true;
        let mut pending = Some(batch);

        for i in 0..route_count {
            let part = if i + 1 == route_count {
                pending.take()
            } else {
                pending.clone()
            };
            let Some(part) = part else { break };

            let targets = self.routes[i].distribute(part);
            for (slot, chunk) in targets {
                let queue = Arc::clone(&self.routes[i].queues[slot]);
                if !self.put_blocking(&queue, chunk) {
                    delivered = false;
                }
            }
        }

        if delivered {
            self.counters.add_written(rows);
        }
        delivered
    }

    pub fn put_row(&mut self, row: Row) -> bool {
        self.put_batch(RowBatch::single(row))
    }

    /// Mark every output queue done. Only the first call has an effect.
    pub fn set_output_done(&mut self) {
        if self.output_done {
            return;
        }
        self.output_done = true;
        for route in &self.routes {
            for queue in &route.queues {
                queue.set_done();
            }
        }
    }

    pub fn is_output_done(&self) -> bool {
        self.output_done
    }

    /// Blocking put that gives up when this container is stopped or the
    /// queue was closed.
    fn put_blocking(&self, queue: &RowQueue, batch: RowBatch) -> bool {
        let mut batch = batch;
        loop {
            match queue.put_timeout(batch, self.poll_interval) {
                Ok(()) => return true,
                Err(returned) => {
                    if self.signals.is_stopped() || queue.is_done() {
                        tracing::trace!("[{}] Dropping batch for {}", self.label, queue.tag());
                        return false;
                    }
                    batch = returned;
                }
            }
        }
    }
}

impl std::fmt::Debug for StepIo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StepIo")
            .field("label", &self.label)
            .field("inputs", &self.inputs.len())
            .field("routes", &self.routes)
            .field("output_done", &self.output_done)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::queue::QueueTag;
    use serde_json::json;

    fn io() -> StepIo {
        StepIo::new(
            "t.0",
            Arc::new(StepCounters::default()),
            Arc::new(ContainerSignals::default()),
            Duration::from_millis(1),
        )
    }

    fn queues(from: &str, to: &str, n: usize) -> Vec<Arc<RowQueue>> {
        (0..n)
            .map(|c| Arc::new(RowQueue::new(QueueTag::new(from, 0, to, c), 100).unwrap()))
            .collect()
    }

    fn row(v: i64) -> Row {
        Row::new(vec![json!(v)])
    }

    fn drain(queue: &RowQueue) -> Vec<Row> {
        let mut rows = Vec::new();
        while let Some(batch) = queue.try_get() {
            rows.extend(batch);
        }
        rows
    }

    #[test]
    fn test_round_robin_delivers_each_row_once() {
        let mut io = io();
        let out = queues("a", "b", 3);
        io.add_route(OutputRoute::new("b", out.clone(), PartitionMethod::None, false));
        for v in 0..9 {
            assert!(io.put_row(row(v)));
        }
        for q in &out {
            assert_eq!(q.size(), 3);
        }
        assert_eq!(io.counters().snapshot().written, 9);
    }

    #[test]
    fn test_every_destination_node_gets_every_row() {
        let mut io = io();
        let to_b = queues("a", "b", 1);
        let to_c = queues("a", "c", 1);
        io.add_route(OutputRoute::new("b", to_b.clone(), PartitionMethod::None, false));
        io.add_route(OutputRoute::new("c", to_c.clone(), PartitionMethod::None, false));
        io.put_row(row(1));
        assert_eq!(drain(&to_b[0]), vec![row(1)]);
        assert_eq!(drain(&to_c[0]), vec![row(1)]);
    }

    #[test]
    fn test_mod_remainder_routes_by_key() {
        let mut io = io();
        let out = queues("a", "b", 2);
        io.add_route(OutputRoute::new(
            "b",
            out.clone(),
            PartitionMethod::ModRemainder { field: 0 },
            true,
        ));
        io.put_batch((0..6).map(row).collect());
        assert_eq!(drain(&out[0]), vec![row(0), row(2), row(4)]);
        assert_eq!(drain(&out[1]), vec![row(1), row(3), row(5)]);
    }

    #[test]
    fn test_mirror_copies_to_all() {
        let mut io = io();
        let out = queues("a", "b", 2);
        io.add_route(OutputRoute::new("b", out.clone(), PartitionMethod::Mirror, true));
        io.put_row(row(7));
        assert_eq!(drain(&out[0]), vec![row(7)]);
        assert_eq!(drain(&out[1]), vec![row(7)]);
    }

    #[test]
    fn test_get_batch_merges_until_all_inputs_done() {
        let mut io = io();
        let ins = queues("x", "t", 2);
        for q in &ins {
            io.add_input(Arc::clone(q));
        }
        ins[0].put(RowBatch::single(row(1))).unwrap();
        ins[1].put(RowBatch::single(row(2))).unwrap();
        ins[0].set_done();
        ins[1].set_done();

        let mut seen = Vec::new();
        while let Some(batch) = io.get_batch() {
            seen.extend(batch);
        }
        seen.sort_by_key(|r| r.get(0).and_then(|v| v.as_i64()));
        assert_eq!(seen, vec![row(1), row(2)]);
        assert_eq!(io.counters().snapshot().read, 2);
        assert!(!io.has_inputs());
    }

    #[test]
    fn test_set_output_done_marks_every_queue() {
        let mut io = io();
        let out = queues("a", "b", 2);
        io.add_route(OutputRoute::new("b", out.clone(), PartitionMethod::None, false));
        io.set_output_done();
        io.set_output_done();
        assert!(out.iter().all(|q| q.is_done()));
    }

    #[test]
    fn test_partition_slot_for_strings_is_stable() {
        let value = json!("customer-42");
        let first = partition_slot(Some(&value), 4);
        assert_eq!(partition_slot(Some(&value), 4), first);
        assert!(first < 4);
        assert_eq!(partition_slot(Some(&json!(-3)), 4), 1);
    }
}
