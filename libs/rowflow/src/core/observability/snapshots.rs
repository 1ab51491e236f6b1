// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Point-in-time snapshot types for container observation.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};

use crate::core::container::{ContainerStatus, LineCounts, StepContainer};

/// Point-in-time snapshot of one container.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceSnapshot {
    /// Capture round, shared by every container captured in that round.
    pub seq: u64,
    /// Milliseconds since the Unix epoch.
    pub timestamp_ms: u64,
    pub node: String,
    pub copy: usize,
    pub status: ContainerStatus,
    /// Cumulative counters.
    pub totals: LineCounts,
    /// Growth since the previous snapshot of this container.
    pub delta: LineCounts,
    /// Batches waiting in input queues.
    pub input_occupancy: usize,
    /// Batches waiting in output queues.
    pub output_occupancy: usize,
}

/// Receives every captured snapshot. Persistence is up to the sink.
pub trait SnapshotSink: Send + Sync {
    fn record(&self, snapshot: &PerformanceSnapshot);
}

impl<F> SnapshotSink for F
where
    F: Fn(&PerformanceSnapshot) + Send + Sync,
{
    fn record(&self, snapshot: &PerformanceSnapshot) {
        self(snapshot)
    }
}

/// Snapshot history per container label.
pub struct SnapshotStore {
    history: Mutex<HashMap<String, Vec<PerformanceSnapshot>>>,
    seq: AtomicU64,
    /// Snapshots kept per container; 0 keeps all.
    size_limit: usize,
    sink: RwLock<Option<Arc<dyn SnapshotSink>>>,
}

impl SnapshotStore {
    pub fn new(size_limit: usize) -> Self {
        Self {
            history: Mutex::new(HashMap::new()),
            seq: AtomicU64::new(0),
            size_limit,
            sink: RwLock::new(None),
        }
    }

    pub fn set_sink(&self, sink: Arc<dyn SnapshotSink>) {
        *self.sink.write() = Some(sink);
    }

    /// Capture one round. While the engine is paused or stopped, containers
    /// that already have a snapshot are skipped unless `force` is set.
    pub fn capture(&self, containers: &[Arc<StepContainer>], idle: bool, force: bool) -> usize {
        let seq = self.seq.fetch_add(1, Ordering::Relaxed) + 1;
        let timestamp_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        let sink = self.sink.read().clone();

        let mut captured = Vec::new();
        {
            let mut history = self.history.lock();
            for container in containers {
                let entries = history.entry(container.label().to_string()).or_default();
                if idle && !force && !entries.is_empty() {
                    continue;
                }

                let totals = container.line_counts();
                let delta = match entries.last() {
                    Some(previous) => totals.since(&previous.totals),
                    None => totals,
                };
                let snapshot = PerformanceSnapshot {
                    seq,
                    timestamp_ms,
                    node: container.name().to_string(),
                    copy: container.copy(),
                    status: container.status(),
                    totals,
                    delta,
                    input_occupancy: container.input_occupancy(),
                    output_occupancy: container.output_occupancy(),
                };

                entries.push(snapshot.clone());
                if self.size_limit > 0 && entries.len() > self.size_limit {
                    let excess = entries.len() - self.size_limit;
                    entries.drain(..excess);
                }
                captured.push(snapshot);
            }
        }

        // Sinks run after the history lock is released.
        if let Some(sink) = &sink {
            for snapshot in &captured {
                sink.record(snapshot);
            }
        }
        let captured = captured.len();
        tracing::trace!("Captured {} snapshot(s) in round {}", captured, seq);
        captured
    }

    /// History of one container (`name.copy`), oldest first.
    pub fn history(&self, label: &str) -> Vec<PerformanceSnapshot> {
        self.history.lock().get(label).cloned().unwrap_or_default()
    }

    pub fn all(&self) -> HashMap<String, Vec<PerformanceSnapshot>> {
        self.history.lock().clone()
    }
}

impl std::fmt::Debug for SnapshotStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SnapshotStore")
            .field("size_limit", &self.size_limit)
            .field("rounds", &self.seq.load(Ordering::Relaxed))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::graph::NodeDefinition;
    use crate::core::steps::{StepContext, StepIo, StepRuntime};
    use crate::core::Result;
    use std::time::Duration;

    struct Idle;

    impl StepRuntime for Idle {
        fn init(&mut self, _ctx: &StepContext, _io: &mut StepIo) -> Result<()> {
            Ok(())
        }

        fn process_one_iteration(&mut self, _ctx: &StepContext, _io: &mut StepIo) -> Result<bool> {
            Ok(false)
        }
    }

    fn container() -> Arc<StepContainer> {
        let ctx = StepContext::new(Arc::new(NodeDefinition::new("n", "idle")), 0);
        Arc::new(StepContainer::new(ctx, Box::new(Idle), Duration::from_millis(1)))
    }

    #[test]
    fn test_delta_against_previous() {
        let store = SnapshotStore::new(0);
        let c = container();
        c.counters().add_read(4);
        store.capture(std::slice::from_ref(&c), false, false);
        c.counters().add_read(6);
        store.capture(std::slice::from_ref(&c), false, false);

        let history = store.history("n.0");
        assert_eq!(history.len(), 2);
        assert_eq!(history[1].totals.read, 10);
        assert_eq!(history[1].delta.read, 6);
        assert_eq!(history[1].seq, 2);
    }

    #[test]
    fn test_idle_rounds_skip_existing() {
        let store = SnapshotStore::new(0);
        let c = container();
        assert_eq!(store.capture(std::slice::from_ref(&c), true, false), 1);
        assert_eq!(store.capture(std::slice::from_ref(&c), true, false), 0);
        assert_eq!(store.capture(std::slice::from_ref(&c), true, true), 1);
    }

    #[test]
    fn test_size_limit_and_sink() {
        let store = SnapshotStore::new(2);
        let seen = Arc::new(AtomicU64::new(0));
        let counter = Arc::clone(&seen);
        store.set_sink(Arc::new(move |_: &PerformanceSnapshot| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        let c = container();
        for _ in 0..5 {
            store.capture(std::slice::from_ref(&c), false, false);
        }
        assert_eq!(store.history("n.0").len(), 2);
        assert_eq!(store.history("n.0")[1].seq, 5);
        assert_eq!(seen.load(Ordering::SeqCst), 5);
    }

    #[test]
    fn test_sink_can_read_history() {
        let store = Arc::new(SnapshotStore::new(0));
        let lengths = Arc::new(Mutex::new(Vec::new()));
        {
            let store_ref = Arc::downgrade(&store);
            let lengths = Arc::clone(&lengths);
            store.set_sink(Arc::new(move |snapshot: &PerformanceSnapshot| {
                if let Some(store) = store_ref.upgrade() {
                    let label = format!("{}.{}", snapshot.node, snapshot.copy);
                    lengths.lock().push(store.history(&label).len());
                }
            }));
        }

        let c = container();
        store.capture(std::slice::from_ref(&c), false, false);
        store.capture(std::slice::from_ref(&c), false, false);
        assert_eq!(*lengths.lock(), vec![1, 2]);
    }
}
