// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

mod engine_config;
mod variables;

pub use engine_config::EngineConfig;
pub use variables::Variables;
