// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Periodic per-container performance snapshots.

mod snapshot_recorder;
mod snapshots;

pub use snapshot_recorder::SnapshotRecorder;
pub use snapshots::{PerformanceSnapshot, SnapshotSink, SnapshotStore};
