//! Structural validation of a `DenseMap`.
//!
//! `validate` walks both arrays and reports the first broken invariant.
//! It is O(capacity) and meant for tests and debugging; the
//! `debug_invariants` feature runs it after every mutation in debug builds.

use crate::alloc::ArrayAllocator;
use crate::dense_map::{forward_distance, DenseMap};
use thiserror::Error;

/// A broken structural invariant.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    #[error("capacity {capacity} is not a power of two")]
    CapacityNotPowerOfTwo { capacity: usize },

    #[error("capacity {capacity} is below the initial capacity {floor}")]
    BelowFloor { capacity: usize, floor: usize },

    #[error("index has {index} positions but dense store has {dense}")]
    LengthMismatch { index: usize, dense: usize },

    #[error("occupied count {occupied} outside 1..={capacity}")]
    OccupiedOutOfRange { occupied: usize, capacity: usize },

    #[error("sentinel dense position 0 holds an entry")]
    SentinelInUse,

    #[error("dense position {0} inside the live range is empty")]
    Hole(usize),

    #[error("dense position {0} past the live range holds an entry")]
    StaleEntry(usize),

    #[error("index position {position} refers to dense position {target} outside the live range")]
    DanglingIndex { position: usize, target: usize },

    #[error("dense position {target} is referenced from index positions {first} and {second}")]
    DuplicateReference {
        target: usize,
        first: usize,
        second: usize,
    },

    #[error("dense position {0} is not referenced from the index")]
    Unreferenced(usize),

    #[error("index position {position} is not reachable from natural slot {natural}")]
    Unreachable { position: usize, natural: usize },
}

impl<'k, V, A: ArrayAllocator> DenseMap<'k, V, A> {
    /// Check every structural invariant of the table.
    pub fn validate(&self) -> Result<(), Violation> {
        let capacity = self.index.len();
        if !capacity.is_power_of_two() {
            return Err(Violation::CapacityNotPowerOfTwo { capacity });
        }
        if capacity < self.initial_capacity {
            return Err(Violation::BelowFloor {
                capacity,
                floor: self.initial_capacity,
            });
        }
        if self.dense.len() != capacity {
            return Err(Violation::LengthMismatch {
                index: capacity,
                dense: self.dense.len(),
            });
        }
        if self.occupied == 0 || self.occupied > capacity {
            return Err(Violation::OccupiedOutOfRange {
                occupied: self.occupied,
                capacity,
            });
        }
        if self.dense[0].is_some() {
            return Err(Violation::SentinelInUse);
        }
        for (s, slot) in self.dense.iter().enumerate().skip(1) {
            match (s < self.occupied, slot.is_some()) {
                (true, false) => return Err(Violation::Hole(s)),
                (false, true) => return Err(Violation::StaleEntry(s)),
                _ => {}
            }
        }

        let mask = capacity - 1;
        let mut referenced_from = vec![None; self.occupied];
        for (position, &target) in self.index.iter().enumerate() {
            if target == 0 {
                continue;
            }
            let target = target as usize;
            if target >= self.occupied {
                return Err(Violation::DanglingIndex { position, target });
            }
            if let Some(first) = referenced_from[target] {
                return Err(Violation::DuplicateReference {
                    target,
                    first,
                    second: position,
                });
            }
            referenced_from[target] = Some(position);

            let natural = self.slot(target).key.hash() as usize & mask;
            let steps = forward_distance(natural, position, mask);
            let broken = (0..steps)
                .map(|i| (natural + i) & mask)
                .any(|p| self.index[p] == 0);
            if broken {
                return Err(Violation::Unreachable { position, natural });
            }
        }
        if let Some(s) = (1..self.occupied).find(|&s| referenced_from[s].is_none()) {
            return Err(Violation::Unreferenced(s));
        }
        Ok(())
    }
}
