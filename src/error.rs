//! Error types for table construction and resizing.

use thiserror::Error;

/// Result type alias for fallible `DenseMap` operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors reported by `DenseMap`.
///
/// Absent keys are not errors: lookups return `Option` and `erase` returns
/// `bool`. Whenever one of these errors is returned the table is left in
/// the state it had before the call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Capacity is not a power of two, is below the table's floor, cannot
    /// hold the current entries, or exceeds `MAX_CAPACITY`.
    #[error("invalid capacity {requested} (floor {floor})")]
    InvalidCapacity { requested: usize, floor: usize },

    /// The memory provider could not supply an array.
    #[error("allocation of {count} elements of {elem_size} bytes failed")]
    AllocationFailure { count: usize, elem_size: usize },
}

impl Error {
    pub(crate) fn allocation<T>(count: usize) -> Self {
        Error::AllocationFailure {
            count,
            elem_size: core::mem::size_of::<T>(),
        }
    }
}
