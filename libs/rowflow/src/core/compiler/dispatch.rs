// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

use std::fmt;

use serde::{Deserialize, Serialize};

/// Queue layout between two adjacent nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchType {
    /// 1 → 1: a single queue.
    OneToOne,
    /// 1 → b: copy 0 feeds every destination copy.
    OneToMany,
    /// a → 1: every source copy feeds copy 0.
    ManyToOne,
    /// a → a without repartitioning: copy i feeds copy i only.
    Parallel,
    /// Every source copy feeds every destination copy.
    FullFan,
}

impl DispatchType {
    pub fn select(from_copies: usize, to_copies: usize, repartition: bool) -> Self {
        match (from_copies, to_copies) {
            (1, 1) => Self::OneToOne,
            (1, b) if b > 1 => Self::OneToMany,
            (a, 1) if a > 1 => Self::ManyToOne,
            (a, b) if a == b && !repartition => Self::Parallel,
            _ => Self::FullFan,
        }
    }

    /// (source copy, destination copy) of every queue, in allocation order.
    pub fn pairs(self, from_copies: usize, to_copies: usize) -> Vec<(usize, usize)> {
        if from_copies == 0 || to_copies == 0 {
            return Vec::new();
        }
        match self {
            Self::OneToOne => vec![(0, 0)],
            Self::OneToMany => (0..to_copies).map(|t| (0, t)).collect(),
            Self::ManyToOne => (0..from_copies).map(|s| (s, 0)).collect(),
            Self::Parallel => (0..from_copies).map(|c| (c, c)).collect(),
            Self::FullFan => (0..from_copies)
                .flat_map(|s| (0..to_copies).map(move |t| (s, t)))
                .collect(),
        }
    }

    pub fn queue_count(self, from_copies: usize, to_copies: usize) -> usize {
        if from_copies == 0 || to_copies == 0 {
            return 0;
        }
        match self {
            Self::OneToOne => 1,
            Self::OneToMany => to_copies,
            Self::ManyToOne | Self::Parallel => from_copies,
            Self::FullFan => from_copies * to_copies,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::OneToOne => "one-to-one",
            Self::OneToMany => "one-to-many",
            Self::ManyToOne => "many-to-one",
            Self::Parallel => "parallel",
            Self::FullFan => "full-fan",
        }
    }
}

impl fmt::Display for DispatchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_selection_table() {
        assert_eq!(DispatchType::select(1, 1, false), DispatchType::OneToOne);
        assert_eq!(DispatchType::select(1, 1, true), DispatchType::OneToOne);
        assert_eq!(DispatchType::select(1, 4, true), DispatchType::OneToMany);
        assert_eq!(DispatchType::select(3, 1, false), DispatchType::ManyToOne);
        assert_eq!(DispatchType::select(2, 2, false), DispatchType::Parallel);
        assert_eq!(DispatchType::select(2, 2, true), DispatchType::FullFan);
        assert_eq!(DispatchType::select(2, 3, false), DispatchType::FullFan);
    }

    #[test]
    fn test_queue_counts_match_pairs_and_are_unique() {
        for a in 0..5usize {
            for b in 0..5usize {
                for repartition in [false, true] {
                    let dispatch = DispatchType::select(a, b, repartition);
                    let pairs = dispatch.pairs(a, b);
                    assert_eq!(pairs.len(), dispatch.queue_count(a, b));
                    let unique: HashSet<_> = pairs.iter().collect();
                    assert_eq!(unique.len(), pairs.len());

                    let expected = match dispatch {
                        _ if a == 0 || b == 0 => 0,
                        DispatchType::OneToOne => 1,
                        DispatchType::OneToMany => b,
                        DispatchType::ManyToOne | DispatchType::Parallel => a,
                        DispatchType::FullFan => a * b,
                    };
                    assert_eq!(pairs.len(), expected);
                }
            }
        }
    }

    #[test]
    fn test_parallel_pairs_copy_i_to_i() {
        assert_eq!(DispatchType::Parallel.pairs(3, 3), vec![(0, 0), (1, 1), (2, 2)]);
    }
}
