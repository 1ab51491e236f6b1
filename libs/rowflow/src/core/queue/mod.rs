// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Bounded single-producer / single-consumer row queues.

mod queue_tag;
mod row_queue;

pub use queue_tag::QueueTag;
pub use row_queue::RowQueue;
