// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

pub mod compiler;
pub mod config;
pub mod container;
pub mod engine;
pub mod error;
pub mod execution;
pub mod graph;
pub mod observability;
pub mod prelude;
pub mod queue;
pub mod rows;
pub mod steps;

pub use compiler::*;
pub use config::{EngineConfig, Variables};
pub use container::*;
pub use engine::*;
pub use error::*;
pub use graph::*;
pub use observability::*;
pub use queue::*;
pub use rows::*;
pub use steps::*;
