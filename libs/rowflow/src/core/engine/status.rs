// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Engine-wide status as an atomic bitmask of independent flags.

use std::sync::atomic::{AtomicU32, Ordering};

use bitflags::bitflags;

bitflags! {
    /// Several flags may be set at once during transitions
    /// (e.g. `RUNNING | STOPPED` while halting).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct StatusFlags: u32 {
        const RUNNING = 1;
        const INITIALIZING = 1 << 1;
        const PREPARING = 1 << 2;
        const STOPPED = 1 << 3;
        const FINISHED = 1 << 4;
        const PAUSED = 1 << 5;
    }
}

pub const STRING_HALTING: &str = "Halting";
pub const STRING_PAUSED: &str = "Paused";
pub const STRING_RUNNING: &str = "Running";
pub const STRING_FINISHED: &str = "Finished";
pub const STRING_FINISHED_WITH_ERRORS: &str = "Finished (with errors)";
pub const STRING_STOPPED: &str = "Stopped";
pub const STRING_PREPARING: &str = "Preparing";
pub const STRING_INITIALIZING: &str = "Initializing";
pub const STRING_WAITING: &str = "Waiting";

#[derive(Debug, Default)]
pub struct EngineStatus(AtomicU32);

impl EngineStatus {
    pub fn flags(&self) -> StatusFlags {
        StatusFlags::from_bits_truncate(self.0.load(Ordering::Acquire))
    }

    pub fn contains(&self, flag: StatusFlags) -> bool {
        self.flags().contains(flag)
    }

    /// Set or clear `flag`. Returns whether it was set before.
    pub fn set(&self, flag: StatusFlags, on: bool) -> bool {
        let previous = if on {
            self.0.fetch_or(flag.bits(), Ordering::AcqRel)
        } else {
            self.0.fetch_and(!flag.bits(), Ordering::AcqRel)
        };
        StatusFlags::from_bits_truncate(previous).contains(flag)
    }

    /// Human-readable status; `errors` decides the "with errors" suffix.
    pub fn describe(&self, errors: u64) -> &'static str {
        describe(self.flags(), errors)
    }
}

/// Status string by fixed precedence: halting, paused, running, finished,
/// stopped, preparing, initializing, waiting.
pub fn describe(flags: StatusFlags, errors: u64) -> &'static str {
    if flags.contains(StatusFlags::RUNNING) {
        if flags.contains(StatusFlags::STOPPED) {
            STRING_HALTING
        } else if flags.contains(StatusFlags::PAUSED) {
            STRING_PAUSED
        } else {
            STRING_RUNNING
        }
    } else if flags.contains(StatusFlags::FINISHED) {
        if errors > 0 {
            STRING_FINISHED_WITH_ERRORS
        } else {
            STRING_FINISHED
        }
    } else if flags.contains(StatusFlags::STOPPED) {
        STRING_STOPPED
    } else if flags.contains(StatusFlags::PREPARING) {
        STRING_PREPARING
    } else if flags.contains(StatusFlags::INITIALIZING) {
        STRING_INITIALIZING
    } else {
        STRING_WAITING
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_returns_previous_bit() {
        let status = EngineStatus::default();
        assert!(!status.set(StatusFlags::RUNNING, true));
        assert!(status.set(StatusFlags::RUNNING, true));
        assert!(status.set(StatusFlags::RUNNING, false));
        assert!(!status.contains(StatusFlags::RUNNING));
    }

    #[test]
    fn test_flags_are_independent() {
        let status = EngineStatus::default();
        status.set(StatusFlags::RUNNING, true);
        status.set(StatusFlags::STOPPED, true);
        status.set(StatusFlags::FINISHED, true);
        status.set(StatusFlags::STOPPED, false);
        assert_eq!(status.flags(), StatusFlags::RUNNING | StatusFlags::FINISHED);
    }

    #[test]
    fn test_describe_precedence() {
        use StatusFlags as F;
        assert_eq!(describe(F::RUNNING | F::STOPPED | F::PAUSED, 0), STRING_HALTING);
        assert_eq!(describe(F::RUNNING | F::PAUSED, 0), STRING_PAUSED);
        assert_eq!(describe(F::RUNNING | F::FINISHED, 0), STRING_RUNNING);
        assert_eq!(describe(F::FINISHED | F::STOPPED, 0), STRING_FINISHED);
        assert_eq!(describe(F::FINISHED, 2), STRING_FINISHED_WITH_ERRORS);
        assert_eq!(describe(F::STOPPED | F::PREPARING, 0), STRING_STOPPED);
        assert_eq!(describe(F::PREPARING | F::INITIALIZING, 0), STRING_PREPARING);
        assert_eq!(describe(F::INITIALIZING, 0), STRING_INITIALIZING);
        assert_eq!(describe(F::empty(), 5), STRING_WAITING);
    }
}
