// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    /// Bad or unresolved graph metadata. Detected before any thread starts.
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// At least one container failed to initialize; every container was aborted.
    #[error("Failed to initialize at least one step: {}", failed.join(", "))]
    Initialization { failed: Vec<String> },

    #[error("Pipeline finished with {errors} processing error(s)")]
    Processing { errors: u64 },

    #[error("Execution listener failed: {0}")]
    Listener(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Invalid engine state: {0}")]
    InvalidState(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, EngineError>;
