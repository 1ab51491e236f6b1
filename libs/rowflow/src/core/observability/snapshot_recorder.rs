// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Background thread that captures snapshots on a fixed interval.

use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{select, Sender};

use crate::core::Result;

pub struct SnapshotRecorder {
    shutdown_tx: Sender<()>,
    handle: Option<JoinHandle<()>>,
}

impl SnapshotRecorder {
    /// Call `capture` every `interval` until stopped or until it returns
    /// false.
    pub fn spawn<F>(name: &str, interval: Duration, mut capture: F) -> Result<Self>
    where
        F: FnMut() -> bool + Send + 'static,
    {
        let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded::<()>(1);
        let ticker = crossbeam_channel::tick(interval);

        let handle = std::thread::Builder::new()
            .name(format!("{} - snapshots", name))
            .spawn(move || {
                tracing::trace!("Snapshot recorder started ({:?})", interval);
                loop {
                    select! {
                        recv(shutdown_rx) -> _ => break,
                        recv(ticker) -> _ => {
                            if !capture() {
                                break;
                            }
                        }
                    }
                }
                tracing::trace!("Snapshot recorder stopped");
            })?;

        Ok(Self {
            shutdown_tx,
            handle: Some(handle),
        })
    }

    /// Signal the thread to exit. Does not wait.
    pub fn stop(&self) {
        let _ = self.shutdown_tx.try_send(());
    }

    /// Signal and wait for the thread to exit.
    pub fn join(mut self) {
        self.stop();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::warn!("Snapshot recorder thread panicked");
            }
        }
    }
}

impl Drop for SnapshotRecorder {
    fn drop(&mut self) {
        self.stop();
    }
}
