//! Memory provider used by `DenseMap` for its two backing arrays.

use crate::error::{Error, Result};
use core::cell::Cell;
use core::mem::size_of;

/// Supplies and reclaims the arrays backing a table.
///
/// A table calls `allocate_array` once per array when it is built and
/// twice per resize, and hands every array back through `release` once it
/// is no longer used. Arrays come back default-initialized.
pub trait ArrayAllocator {
    fn allocate_array<T: Default>(&self, count: usize) -> Result<Box<[T]>>;

    fn release<T>(&self, array: Box<[T]>);
}

impl<A: ArrayAllocator + ?Sized> ArrayAllocator for &A {
    #[inline]
    fn allocate_array<T: Default>(&self, count: usize) -> Result<Box<[T]>> {
        (**self).allocate_array(count)
    }

    #[inline]
    fn release<T>(&self, array: Box<[T]>) {
        (**self).release(array)
    }
}

/// Default-initialized heap array; reports exhaustion instead of aborting.
pub(crate) fn try_default_array<T: Default>(count: usize) -> Result<Box<[T]>> {
    let mut v: Vec<T> = Vec::new();
    v.try_reserve_exact(count)
        .map_err(|_| Error::allocation::<T>(count))?;
    v.resize_with(count, T::default);
    Ok(v.into_boxed_slice())
}

/// The process heap.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct Global;

impl ArrayAllocator for Global {
    fn allocate_array<T: Default>(&self, count: usize) -> Result<Box<[T]>> {
        try_default_array(count)
    }

    fn release<T>(&self, array: Box<[T]>) {
        drop(array);
    }
}

/// Heap allocator with a byte budget.
///
/// Allocation fails once the bytes currently handed out would exceed the
/// budget; released arrays return their bytes. Single-threaded, like the
/// table it serves. Share one budget between tables by passing `&Bounded`.
#[derive(Debug)]
pub struct Bounded {
    limit: Cell<usize>,
    in_use: Cell<usize>,
}

impl Bounded {
    pub const fn new(limit: usize) -> Self {
        Self {
            limit: Cell::new(limit),
            in_use: Cell::new(0),
        }
    }

    pub fn limit(&self) -> usize {
        self.limit.get()
    }

    /// Bytes currently held by live arrays.
    pub fn allocated_bytes(&self) -> usize {
        self.in_use.get()
    }

    /// Change the budget. Arrays already handed out are not affected.
    pub fn set_limit(&self, limit: usize) {
        self.limit.set(limit);
    }
}

impl ArrayAllocator for Bounded {
    fn allocate_array<T: Default>(&self, count: usize) -> Result<Box<[T]>> {
        let bytes = count
            .checked_mul(size_of::<T>())
            .ok_or_else(|| Error::allocation::<T>(count))?;
        let in_use = self.in_use.get();
        match in_use.checked_add(bytes) {
            Some(total) if total <= self.limit.get() => {}
            _ => return Err(Error::allocation::<T>(count)),
        }
        let array = try_default_array(count)?;
        self.in_use.set(in_use + bytes);
        Ok(array)
    }

    fn release<T>(&self, array: Box<[T]>) {
        let bytes = array.len() * size_of::<T>();
        debug_assert!(bytes <= self.in_use.get(), "release of foreign array");
        self.in_use.set(self.in_use.get().saturating_sub(bytes));
        drop(array);
    }
}
