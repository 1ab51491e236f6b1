// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use std::ops::Add;
use std::sync::atomic::{AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Live line counters of one container, written by its own thread and read
/// by anyone.
#[derive(Debug, Default)]
pub struct StepCounters {
    lines_read: AtomicU64,
    lines_written: AtomicU64,
    lines_input: AtomicU64,
    lines_output: AtomicU64,
    lines_updated: AtomicU64,
    lines_rejected: AtomicU64,
    errors: AtomicU64,
}

impl StepCounters {
    /// Rows taken from upstream queues.
    pub fn add_read(&self, n: u64) {
        self.lines_read.fetch_add(n, Ordering::Relaxed);
    }

    /// Rows handed to downstream queues.
    pub fn add_written(&self, n: u64) {
        self.lines_written.fetch_add(n, Ordering::Relaxed);
    }

    /// Rows read from an external source (file, database, generator).
    pub fn add_input(&self, n: u64) {
        self.lines_input.fetch_add(n, Ordering::Relaxed);
    }

    /// Rows written to an external target.
    pub fn add_output(&self, n: u64) {
        self.lines_output.fetch_add(n, Ordering::Relaxed);
    }

    pub fn add_updated(&self, n: u64) {
        self.lines_updated.fetch_add(n, Ordering::Relaxed);
    }

    pub fn add_rejected(&self, n: u64) {
        self.lines_rejected.fetch_add(n, Ordering::Relaxed);
    }

    /// Returns the new error count.
    pub fn add_error(&self) -> u64 {
        self.errors.fetch_add(1, Ordering::AcqRel) + 1
    }

    pub fn errors(&self) -> u64 {
        self.errors.load(Ordering::Acquire)
    }

    pub fn snapshot(&self) -> LineCounts {
        LineCounts {
            read: self.lines_read.load(Ordering::Relaxed),
            written: self.lines_written.load(Ordering::Relaxed),
            input: self.lines_input.load(Ordering::Relaxed),
            output: self.lines_output.load(Ordering::Relaxed),
            updated: self.lines_updated.load(Ordering::Relaxed),
            rejected: self.lines_rejected.load(Ordering::Relaxed),
            errors: self.errors(),
        }
    }
}

/// Point-in-time copy of [`StepCounters`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineCounts {
    pub read: u64,
    pub written: u64,
    pub input: u64,
    pub output: u64,
    pub updated: u64,
    pub rejected: u64,
    pub errors: u64,
}

impl LineCounts {
    /// Growth since `previous`.
    pub fn since(&self, previous: &LineCounts) -> LineCounts {
        LineCounts {
            read: self.read.saturating_sub(previous.read),
            written: self.written.saturating_sub(previous.written),
            input: self.input.saturating_sub(previous.input),
            output: self.output.saturating_sub(previous.output),
            updated: self.updated.saturating_sub(previous.updated),
            rejected: self.rejected.saturating_sub(previous.rejected),
            errors: self.errors.saturating_sub(previous.errors),
        }
    }
}

impl Add for LineCounts {
    type Output = LineCounts;

    fn add(self, rhs: LineCounts) -> LineCounts {
        LineCounts {
            read: self.read + rhs.read,
            written: self.written + rhs.written,
            input: self.input + rhs.input,
            output: self.output + rhs.output,
            updated: self.updated + rhs.updated,
            rejected: self.rejected + rhs.rejected,
            errors: self.errors + rhs.errors,
        }
    }
}

impl std::iter::Sum for LineCounts {
    fn sum<I: Iterator<Item = LineCounts>>(iter: I) -> Self {
        iter.fold(LineCounts::default(), Add::add)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_and_delta() {
        let counters = StepCounters::default();
        counters.add_read(10);
        counters.add_written(7);
        let first = counters.snapshot();

        counters.add_read(5);
        assert_eq!(counters.add_error(), 1);
        let second = counters.snapshot();

        let delta = second.since(&first);
        assert_eq!(delta.read, 5);
        assert_eq!(delta.written, 0);
        assert_eq!(delta.errors, 1);
    }

    #[test]
    fn test_sum() {
        let a = LineCounts { read: 1, errors: 1, ..Default::default() };
        let b = LineCounts { read: 2, written: 3, ..Default::default() };
        let total: LineCounts = [a, b].into_iter().sum();
        assert_eq!(total.read, 3);
        assert_eq!(total.written, 3);
        assert_eq!(total.errors, 1);
    }
}
