//! dense-map: an open-addressing hash map that keeps its entries packed in
//! one contiguous array behind a sparse probe index.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: O(1) average lookups with entries stored hole-free, so walking
//!   the map is a slice walk and no per-entry allocation ever happens.
//! - Layers:
//!   - `Key`: tagged fingerprint (borrowed or copied bytes, hashed
//!     integer, raw integer) with its 32-bit hash computed once.
//!   - `KeyHasher`: seeded Murmur3-style hashing that builds keys.
//!   - `ArrayAllocator`: the only memory dependency; supplies and reclaims
//!     the two backing arrays.
//!   - `DenseMap`: the table itself: probe index + dense store, grow and
//!     shrink, backward-shift deletion.
//!
//! Constraints
//! - Not internally synchronized. Mutation takes `&mut self`, so the
//!   single-writer/multi-reader contract is enforced by the borrow checker.
//! - `index[p] == 0` means empty; dense position 0 is a sentinel that is
//!   never live.
//! - Load stays within 3/4 after every insertion; the table halves once
//!   under 1/4 but never below its initial capacity.
//!
//! Deletion
//! - The index entry is cleared and the cluster after it is repaired by
//!   shifting entries back (no tombstones). The last dense entry then moves
//!   into the freed dense position and its index entry is repointed.
//!
//! Failure boundaries
//! - Allocation failures and invalid capacities are returned as `Error`
//!   and leave the table exactly as it was. Absent keys are reported with
//!   `Option`/`bool`.
//! - Positions are never cached across a resize: an insertion that grows
//!   the table locates its key again in the new arrays.
//!
//! Notes and non-goals
//! - Keys must be built with the same seed as the table (`DenseMap::hasher`);
//!   a key hashed under another seed never matches.
//! - No persistence format. The arrays plus `capacity`/`occupied`/initial
//!   capacity fully describe a table, but nothing here serializes them.
//! - `DenseMap::validate` checks every structural invariant; the
//!   `debug_invariants` feature runs it after each mutation in debug builds.

pub mod alloc;
pub mod dense_map;
mod dense_map_proptest;
pub mod error;
pub mod hash;
pub mod invariants;
pub mod key;

// Public surface
pub use alloc::{ArrayAllocator, Bounded, Global};
pub use dense_map::{DenseMap, Options, DEFAULT_INITIAL_CAPACITY, MAX_CAPACITY};
pub use error::{Error, Result};
pub use hash::{murmur3_32, KeyHasher, DEFAULT_SEED};
pub use invariants::Violation;
pub use key::{Key, KeyKind};
