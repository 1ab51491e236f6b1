// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Per-container threads: parallel init behind a barrier, then the run loop.

mod init_runner;
mod thread_runner;

pub use init_runner::{abort_all, initialize_all};
pub use thread_runner::run_container_loop;
