// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use std::fmt;

/// Phases of preparing an engine run, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CompilePhase {
    /// Phase 1: Resolving copy counts and partitioning.
    Resolve,
    /// Phase 2: Allocating queues per edge.
    Allocate,
    /// Phase 3: Creating one step runtime per (node, copy).
    Create,
    /// Phase 4: Attaching queues to containers.
    Wire,
    /// Phase 5: Ordering containers for initialization.
    Order,
    /// Phase 6: Initializing every container behind a barrier.
    Initialize,
}

impl CompilePhase {
    pub fn number(self) -> u8 {
        match self {
            Self::Resolve => 1,
            Self::Allocate => 2,
            Self::Create => 3,
            Self::Wire => 4,
            Self::Order => 5,
            Self::Initialize => 6,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Resolve => "RESOLVE",
            Self::Allocate => "ALLOCATE",
            Self::Create => "CREATE",
            Self::Wire => "WIRE",
            Self::Order => "ORDER",
            Self::Initialize => "INITIALIZE",
        }
    }
}

impl fmt::Display for CompilePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Phase {}: {}", self.number(), self.name())
    }
}
