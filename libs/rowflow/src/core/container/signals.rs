// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Cross-thread stop and pause flags of one container.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

#[derive(Debug, Default)]
pub struct ContainerSignals {
    stopped: AtomicBool,
    safe_stopped: AtomicBool,
    pause_gate: AtomicBool,
}

impl ContainerSignals {
    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    pub fn is_safe_stopped(&self) -> bool {
        self.safe_stopped.load(Ordering::Acquire)
    }

    /// Returns false if the container was already stopped.
    pub fn stop(&self, safe: bool) -> bool {
        let first = !self.stopped.swap(true, Ordering::AcqRel);
        if first && safe {
            self.safe_stopped.store(true, Ordering::Release);
        }
        // A stopped container must not stay parked.
        self.pause_gate.store(false, Ordering::Release);
        first
    }

    pub fn is_paused(&self) -> bool {
        self.pause_gate.load(Ordering::Acquire)
    }

    pub fn pause(&self) {
        if !self.is_stopped() {
            self.pause_gate.store(true, Ordering::Release);
        }
    }

    pub fn resume(&self) {
        self.pause_gate.store(false, Ordering::Release);
    }

    /// Park the calling thread while paused. Returns once resumed or stopped.
    pub fn wait_while_paused(&self, interval: Duration) {
        while self.is_paused() && !self.is_stopped() {
            std::thread::sleep(interval);
        }
    }
}
