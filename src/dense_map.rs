//! DenseMap: sparse probe index over a hole-free entry store.
//!
//! `index` is a power-of-two array addressed by linear probing from a key's
//! natural slot (`hash & (capacity - 1)`). Each non-zero entry is a position
//! in `dense`, which holds the live entries contiguously in
//! `dense[1..occupied)`. Position 0 of `dense` is an empty sentinel, which
//! lets `0` in `index` mean "empty".
//!
//! Deletion uses backward-shift repair on `index` (no tombstones) and moves
//! the last dense entry into the freed position, so iteration is a plain
//! slice walk.

use crate::alloc::{ArrayAllocator, Global};
use crate::error::{Error, Result};
use crate::hash::{KeyHasher, DEFAULT_SEED};
use crate::key::Key;
use core::fmt;
use core::mem;

/// Capacity used by `DenseMap::new` and `Options::default`.
pub const DEFAULT_INITIAL_CAPACITY: usize = 16;

/// Largest supported capacity; dense positions are stored as `u32`.
pub const MAX_CAPACITY: usize = 1 << 31;

const EMPTY: u32 = 0;

#[derive(Debug)]
pub(crate) struct Slot<'k, V> {
    pub(crate) key: Key<'k>,
    pub(crate) value: V,
}

/// `(to - from) mod capacity`: probe steps from `from` forward to `to`.
#[inline]
pub(crate) fn forward_distance(from: usize, to: usize, mask: usize) -> usize {
    to.wrapping_sub(from) & mask
}

fn check_capacity(requested: usize, floor: usize) -> Result<()> {
    if !requested.is_power_of_two() || requested < floor || requested > MAX_CAPACITY {
        return Err(Error::InvalidCapacity { requested, floor });
    }
    Ok(())
}

/// Construction parameters for `DenseMap`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Options {
    initial_capacity: usize,
    seed: u32,
}

impl Options {
    pub fn new() -> Self {
        Self {
            initial_capacity: DEFAULT_INITIAL_CAPACITY,
            seed: DEFAULT_SEED,
        }
    }

    /// Starting capacity and the floor the table never shrinks below.
    /// Must be a power of two.
    pub fn initial_capacity(mut self, capacity: usize) -> Self {
        self.initial_capacity = capacity;
        self
    }

    /// Seed for keys built through `DenseMap::hasher`.
    pub fn seed(mut self, seed: u32) -> Self {
        self.seed = seed;
        self
    }

    pub fn build<'k, V>(self) -> Result<DenseMap<'k, V>> {
        self.build_in(Global)
    }

    pub fn build_in<'k, V, A: ArrayAllocator>(self, alloc: A) -> Result<DenseMap<'k, V, A>> {
        check_capacity(self.initial_capacity, 1)?;
        let index: Box<[u32]> = alloc.allocate_array(self.initial_capacity)?;
        let dense: Box<[Option<Slot<'k, V>>]> = match alloc.allocate_array(self.initial_capacity)
        {
            Ok(dense) => dense,
            Err(err) => {
                alloc.release(index);
                return Err(err);
            }
        };
        Ok(DenseMap {
            index,
            dense,
            occupied: 1,
            initial_capacity: self.initial_capacity,
            hasher: KeyHasher::new(self.seed),
            alloc,
        })
    }
}

impl Default for Options {
    fn default() -> Self {
        Self::new()
    }
}

/// Dense open-addressing hash map from `Key<'k>` to `V`.
///
/// Buffer keys may borrow caller memory for `'k`; use `Key<'static>` keys
/// (copied buffers, integers) for a map that owns all of its keys.
///
/// Load is kept within `live * 4 <= capacity * 3` by doubling before an
/// insertion would cross it, and the table halves once
/// `occupied * 4 < capacity`, never going below its initial capacity.
pub struct DenseMap<'k, V, A: ArrayAllocator = Global> {
    pub(crate) index: Box<[u32]>,
    pub(crate) dense: Box<[Option<Slot<'k, V>>]>,
    /// Used dense positions including the sentinel.
    pub(crate) occupied: usize,
    pub(crate) initial_capacity: usize,
    hasher: KeyHasher,
    alloc: A,
}

impl<'k, V> DenseMap<'k, V> {
    /// Empty map with `DEFAULT_INITIAL_CAPACITY` on the global heap.
    ///
    /// Like the std collections, this aborts if the heap is exhausted; use
    /// `with_capacity` or `Options` to observe allocation failure.
    pub fn new() -> Self {
        let index = vec![EMPTY; DEFAULT_INITIAL_CAPACITY].into_boxed_slice();
        let dense = (0..DEFAULT_INITIAL_CAPACITY).map(|_| None).collect();
        DenseMap {
            index,
            dense,
            occupied: 1,
            initial_capacity: DEFAULT_INITIAL_CAPACITY,
            hasher: KeyHasher::default(),
            alloc: Global,
        }
    }

    pub fn with_capacity(initial_capacity: usize) -> Result<Self> {
        Options::new().initial_capacity(initial_capacity).build()
    }
}

impl<'k, V> Default for DenseMap<'k, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'k, V, A: ArrayAllocator> DenseMap<'k, V, A> {
    pub fn with_capacity_in(initial_capacity: usize, alloc: A) -> Result<Self> {
        Options::new()
            .initial_capacity(initial_capacity)
            .build_in(alloc)
    }

    /// Number of live entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.occupied - 1
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.occupied == 1
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.index.len()
    }

    pub fn initial_capacity(&self) -> usize {
        self.initial_capacity
    }

    /// Used dense positions, counting the sentinel: `len() + 1`.
    pub fn occupied(&self) -> usize {
        self.occupied
    }

    /// Key factory using this table's seed.
    pub fn hasher(&self) -> KeyHasher {
        self.hasher
    }

    pub fn allocator(&self) -> &A {
        &self.alloc
    }

    #[inline]
    fn mask(&self) -> usize {
        self.index.len() - 1
    }

    pub(crate) fn slot(&self, s: usize) -> &Slot<'k, V> {
        match &self.dense[s] {
            Some(slot) => slot,
            None => unreachable!("index refers to empty dense position {s}"),
        }
    }

    fn slot_mut(&mut self, s: usize) -> &mut Slot<'k, V> {
        match &mut self.dense[s] {
            Some(slot) => slot,
            None => unreachable!("index refers to empty dense position {s}"),
        }
    }

    /// Index position holding `key`, or the empty position where it would
    /// be inserted. The flag tells which.
    fn locate(&self, key: &Key<'_>) -> (usize, bool) {
        let mask = self.mask();
        let mut p = key.hash() as usize & mask;
        loop {
            let s = self.index[p];
            if s == EMPTY {
                return (p, false);
            }
            if let Some(slot) = &self.dense[s as usize] {
                if slot.key == *key {
                    return (p, true);
                }
            }
            p = (p + 1) & mask;
        }
    }

    /// Index position that refers to dense position `s`, whose key hashes
    /// to `hash`.
    fn index_position_of(&self, hash: u32, s: usize) -> usize {
        let mask = self.mask();
        let target = s as u32;
        let mut p = hash as usize & mask;
        for _ in 0..self.index.len() {
            if self.index[p] == target {
                return p;
            }
            p = (p + 1) & mask;
        }
        unreachable!("dense position {s} has no index entry")
    }

    pub fn get(&self, key: &Key<'_>) -> Option<&V> {
        self.get_key_value(key).map(|(_, v)| v)
    }

    pub fn get_key_value(&self, key: &Key<'_>) -> Option<(&Key<'k>, &V)> {
        let (p, found) = self.locate(key);
        if !found {
            return None;
        }
        let slot = self.slot(self.index[p] as usize);
        Some((&slot.key, &slot.value))
    }

    pub fn get_mut(&mut self, key: &Key<'_>) -> Option<&mut V> {
        let (p, found) = self.locate(key);
        if !found {
            return None;
        }
        let s = self.index[p] as usize;
        Some(&mut self.slot_mut(s).value)
    }

    pub fn contains_key(&self, key: &Key<'_>) -> bool {
        self.locate(key).1
    }

    /// Grow if one more entry would cross the load limit. Returns the index
    /// position to insert `key` at, located in the arrays that are current
    /// after any growth.
    fn reserve_one(&mut self, p: usize, key: &Key<'_>) -> Result<usize> {
        let capacity = self.capacity();
        if (self.len() + 1) * 4 <= capacity * 3 {
            return Ok(p);
        }
        self.resize(capacity.saturating_mul(2))?;
        Ok(self.locate(key).0)
    }

    fn commit(&mut self, p: usize, key: Key<'k>, value: V) -> usize {
        let s = self.occupied;
        self.index[p] = s as u32;
        self.dense[s] = Some(Slot { key, value });
        self.occupied += 1;
        self.debug_validate();
        s
    }

    /// Slot for `key`, created with `default()` when absent. The flag is
    /// `true` when the key was already present, in which case `default` is
    /// not called.
    ///
    /// On error nothing is inserted and the table is unchanged.
    pub fn make<F>(&mut self, key: Key<'k>, default: F) -> Result<(&mut V, bool)>
    where
        F: FnOnce() -> V,
    {
        let (p, found) = self.locate(&key);
        if found {
            let s = self.index[p] as usize;
            return Ok((&mut self.slot_mut(s).value, true));
        }
        let p = self.reserve_one(p, &key)?;
        let s = self.commit(p, key, default());
        Ok((&mut self.slot_mut(s).value, false))
    }

    pub fn make_default(&mut self, key: Key<'k>) -> Result<(&mut V, bool)>
    where
        V: Default,
    {
        self.make(key, V::default)
    }

    /// Insert or overwrite. Returns the previous value for an existing key.
    ///
    /// On error `value` is dropped and the table is unchanged.
    pub fn set(&mut self, key: Key<'k>, value: V) -> Result<Option<V>> {
        let (p, found) = self.locate(&key);
        if found {
            let s = self.index[p] as usize;
            return Ok(Some(mem::replace(&mut self.slot_mut(s).value, value)));
        }
        let p = self.reserve_one(p, &key)?;
        self.commit(p, key, value);
        Ok(None)
    }

    /// Remove `key`; `false` when it was absent, in which case nothing
    /// changes.
    pub fn erase(&mut self, key: &Key<'_>) -> bool {
        self.remove_entry(key).is_some()
    }

    pub fn remove(&mut self, key: &Key<'_>) -> Option<V> {
        self.remove_entry(key).map(|(_, v)| v)
    }

    pub fn remove_entry(&mut self, key: &Key<'_>) -> Option<(Key<'k>, V)> {
        let (p, found) = self.locate(key);
        if !found {
            return None;
        }
        let slot = self.remove_at(p);
        Some((slot.key, slot.value))
    }

    /// Remove the entry referenced from index position `p`.
    fn remove_at(&mut self, p: usize) -> Slot<'k, V> {
        let removed = self.index[p] as usize;
        self.index[p] = EMPTY;
        let slot = match self.dense[removed].take() {
            Some(slot) => slot,
            None => unreachable!("index refers to empty dense position {removed}"),
        };

        self.repair_probe_chain(p);
        self.compact(removed);
        self.occupied -= 1;
        self.shrink_if_sparse();
        self.debug_validate();
        slot
    }

    /// Backward-shift deletion: close the gap at `hole` by walking the
    /// cluster after it and pulling back every entry whose natural slot does
    /// not lie in `(hole, q]`.
    fn repair_probe_chain(&mut self, mut hole: usize) {
        let mask = self.mask();
        let mut q = (hole + 1) & mask;
        let mut shifted = 0usize;
        while self.index[q] != EMPTY {
            let s = self.index[q] as usize;
            let ideal = self.slot(s).key.hash() as usize & mask;
            if forward_distance(ideal, q, mask) >= forward_distance(hole, q, mask) {
                self.index[hole] = self.index[q];
                self.index[q] = EMPTY;
                hole = q;
                shifted += 1;
            }
            q = (q + 1) & mask;
        }
        if shifted > 0 {
            tracing::trace!(shifted, "repaired probe chain");
        }
    }

    /// Move the last live entry into the freed dense position `removed`.
    fn compact(&mut self, removed: usize) {
        let last = self.occupied - 1;
        if removed == last {
            return;
        }
        if let Some(moved) = self.dense[last].take() {
            let p = self.index_position_of(moved.key.hash(), last);
            self.index[p] = removed as u32;
            self.dense[removed] = Some(moved);
        }
    }

    fn shrink_if_sparse(&mut self) {
        let capacity = self.capacity();
        if self.occupied * 4 >= capacity || capacity / 2 < self.initial_capacity {
            return;
        }
        if let Err(err) = self.resize(capacity / 2) {
            tracing::warn!(%err, capacity, live = self.len(), "dense map shrink skipped");
        }
    }

    /// Rebuild the index and dense store at `new_capacity`.
    ///
    /// Fails with `InvalidCapacity` when `new_capacity` is not a power of
    /// two, is below the initial capacity, cannot hold `occupied()` dense
    /// positions, or exceeds `MAX_CAPACITY`. Any failure leaves the table
    /// unchanged. Dense positions, and therefore iteration order, are kept.
    pub fn resize(&mut self, new_capacity: usize) -> Result<()> {
        check_capacity(new_capacity, self.initial_capacity)?;
        if new_capacity < self.occupied {
            return Err(Error::InvalidCapacity {
                requested: new_capacity,
                floor: self.occupied.max(self.initial_capacity),
            });
        }

        let mut index: Box<[u32]> = self.alloc.allocate_array(new_capacity)?;
        let mut dense: Box<[Option<Slot<'k, V>>]> = match self.alloc.allocate_array(new_capacity)
        {
            Ok(dense) => dense,
            Err(err) => {
                self.alloc.release(index);
                return Err(err);
            }
        };

        let mask = new_capacity - 1;
        for s in 1..self.occupied {
            if let Some(slot) = self.dense[s].take() {
                let mut p = slot.key.hash() as usize & mask;
                while index[p] != EMPTY {
                    p = (p + 1) & mask;
                }
                index[p] = s as u32;
                dense[s] = Some(slot);
            }
        }

        let old_capacity = self.capacity();
        let old_index = mem::replace(&mut self.index, index);
        let old_dense = mem::replace(&mut self.dense, dense);
        self.alloc.release(old_index);
        self.alloc.release(old_dense);

        tracing::debug!(
            from = old_capacity,
            to = new_capacity,
            live = self.len(),
            "resized dense map"
        );
        self.debug_validate();
        Ok(())
    }

    /// Drop every entry. Capacity is kept.
    pub fn clear(&mut self) {
        for slot in &mut self.dense[1..self.occupied] {
            *slot = None;
        }
        self.index.fill(EMPTY);
        self.occupied = 1;
    }

    /// Keep only the entries for which `f` returns `true`. Removal goes
    /// through the ordinary erase path, so the table may shrink.
    pub fn retain<F>(&mut self, mut f: F)
    where
        F: FnMut(&Key<'k>, &mut V) -> bool,
    {
        let mut s = 1;
        while s < self.occupied {
            let slot = self.slot_mut(s);
            if f(&slot.key, &mut slot.value) {
                s += 1;
                continue;
            }
            let p = self.index_position_of(self.slot(s).key.hash(), s);
            // The last entry now sits at `s`; look at it next.
            drop(self.remove_at(p));
        }
    }

    #[inline]
    fn debug_validate(&self) {
        #[cfg(all(debug_assertions, feature = "debug_invariants"))]
        {
            if let Err(violation) = self.validate() {
                panic!("dense map invariant violated: {violation}");
            }
        }
    }

    pub fn iter(&self) -> Iter<'_, 'k, V> {
        Iter {
            it: self.dense[1..self.occupied].iter(),
        }
    }

    pub fn iter_mut(&mut self) -> IterMut<'_, 'k, V> {
        let occupied = self.occupied;
        IterMut {
            it: self.dense[1..occupied].iter_mut(),
        }
    }

    pub fn keys(&self) -> Keys<'_, 'k, V> {
        Keys { inner: self.iter() }
    }

    pub fn values(&self) -> Values<'_, 'k, V> {
        Values { inner: self.iter() }
    }

    pub fn values_mut(&mut self) -> ValuesMut<'_, 'k, V> {
        ValuesMut {
            inner: self.iter_mut(),
        }
    }
}

impl<'k, V, A: ArrayAllocator> Drop for DenseMap<'k, V, A> {
    fn drop(&mut self) {
        let index = mem::take(&mut self.index);
        let dense = mem::take(&mut self.dense);
        self.alloc.release(index);
        self.alloc.release(dense);
    }
}

impl<'k, V: fmt::Debug, A: ArrayAllocator> fmt::Debug for DenseMap<'k, V, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

/// Entries in dense order.
pub struct Iter<'a, 'k, V> {
    it: core::slice::Iter<'a, Option<Slot<'k, V>>>,
}

impl<'a, 'k, V> Iterator for Iter<'a, 'k, V> {
    type Item = (&'a Key<'k>, &'a V);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(slot) = self.it.next()? {
                return Some((&slot.key, &slot.value));
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.it.size_hint()
    }
}

impl<V> ExactSizeIterator for Iter<'_, '_, V> {}

/// Entries in dense order with mutable values.
pub struct IterMut<'a, 'k, V> {
    it: core::slice::IterMut<'a, Option<Slot<'k, V>>>,
}

impl<'a, 'k, V> Iterator for IterMut<'a, 'k, V> {
    type Item = (&'a Key<'k>, &'a mut V);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(slot) = self.it.next()? {
                return Some((&slot.key, &mut slot.value));
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.it.size_hint()
    }
}

impl<V> ExactSizeIterator for IterMut<'_, '_, V> {}

pub struct Keys<'a, 'k, V> {
    inner: Iter<'a, 'k, V>,
}

impl<'a, 'k, V> Iterator for Keys<'a, 'k, V> {
    type Item = &'a Key<'k>;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(k, _)| k)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<V> ExactSizeIterator for Keys<'_, '_, V> {}

pub struct Values<'a, 'k, V> {
    inner: Iter<'a, 'k, V>,
}

impl<'a, 'k, V> Iterator for Values<'a, 'k, V> {
    type Item = &'a V;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(_, v)| v)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<V> ExactSizeIterator for Values<'_, '_, V> {}

pub struct ValuesMut<'a, 'k, V> {
    inner: IterMut<'a, 'k, V>,
}

impl<'a, 'k, V> Iterator for ValuesMut<'a, 'k, V> {
    type Item = &'a mut V;

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(_, v)| v)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<V> ExactSizeIterator for ValuesMut<'_, '_, V> {}

impl<'a, 'k, V, A: ArrayAllocator> IntoIterator for &'a DenseMap<'k, V, A> {
    type Item = (&'a Key<'k>, &'a V);
    type IntoIter = Iter<'a, 'k, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'a, 'k, V, A: ArrayAllocator> IntoIterator for &'a mut DenseMap<'k, V, A> {
    type Item = (&'a Key<'k>, &'a mut V);
    type IntoIter = IterMut<'a, 'k, V>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter_mut()
    }
}
