//! Murmur3-style 32-bit hashing and the seeded key factory.
//!
//! The mixing constants are not a storage format: nothing persisted depends
//! on bit-exact hash values, only on a table hashing consistently.

use crate::key::Key;

/// Seed used when a table or key is built without an explicit one.
pub const DEFAULT_SEED: u32 = 0x9747_b28c;

const C1: u32 = 0xcc9e_2d51;
const C2: u32 = 0x1b87_3593;

#[inline]
fn mix_block(k: u32) -> u32 {
    k.wrapping_mul(C1).rotate_left(15).wrapping_mul(C2)
}

#[inline]
fn fmix32(mut h: u32) -> u32 {
    h ^= h >> 16;
    h = h.wrapping_mul(0x85eb_ca6b);
    h ^= h >> 13;
    h = h.wrapping_mul(0xc2b2_ae35);
    h ^= h >> 16;
    h
}

/// MurmurHash3 (x86, 32-bit) of `bytes` under `seed`.
pub fn murmur3_32(bytes: &[u8], seed: u32) -> u32 {
    let mut h = seed;
    let mut blocks = bytes.chunks_exact(4);
    for block in &mut blocks {
        let k = u32::from_le_bytes([block[0], block[1], block[2], block[3]]);
        h ^= mix_block(k);
        h = h.rotate_left(13).wrapping_mul(5).wrapping_add(0xe654_6b64);
    }

    let tail = blocks.remainder();
    if !tail.is_empty() {
        let mut k = 0u32;
        for (i, &b) in tail.iter().enumerate() {
            k |= (b as u32) << (8 * i);
        }
        h ^= mix_block(k);
    }

    // Only the low 32 bits of the length take part, as in the reference.
    h ^= bytes.len() as u32;
    fmix32(h)
}

/// Builds keys whose cached hash uses one table's seed.
///
/// Keys must be built with the same seed as the table they are used with;
/// a key hashed under a different seed compares unequal to every stored
/// key and simply misses.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct KeyHasher {
    seed: u32,
}

impl KeyHasher {
    pub const fn new(seed: u32) -> Self {
        Self { seed }
    }

    pub fn seed(&self) -> u32 {
        self.seed
    }

    pub fn hash_bytes(&self, bytes: &[u8]) -> u32 {
        murmur3_32(bytes, self.seed)
    }

    pub fn hash_integer(&self, value: u64) -> u32 {
        murmur3_32(&value.to_le_bytes(), self.seed)
    }

    /// Key over borrowed bytes; the bytes must outlive every use of the key.
    pub fn buffer<'a>(&self, bytes: &'a [u8]) -> Key<'a> {
        Key::from_buffer(bytes.into(), self.hash_bytes(bytes))
    }

    /// Key over a private copy of `bytes`, independent of the caller's buffer.
    pub fn buffer_copied(&self, bytes: &[u8]) -> Key<'static> {
        Key::from_buffer(bytes.to_vec().into(), self.hash_bytes(bytes))
    }

    pub fn integer(&self, value: u64) -> Key<'static> {
        Key::from_integer(value, self.hash_integer(value))
    }

    /// Key whose hash is the low 32 bits of `value`, unmixed. Dense
    /// sequential integers then map to consecutive probe slots.
    pub fn integer_raw(&self, value: u64) -> Key<'static> {
        Key::from_integer_raw(value)
    }
}

impl Default for KeyHasher {
    fn default() -> Self {
        Self::new(DEFAULT_SEED)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Reference vectors for MurmurHash3_x86_32.
    #[test]
    fn matches_reference_vectors() {
        assert_eq!(murmur3_32(b"", 0), 0);
        assert_eq!(murmur3_32(b"", 1), 0x514e_28b7);
        assert_eq!(murmur3_32(b"", 0xffff_ffff), 0x81f1_6f39);
        assert_eq!(murmur3_32(&[0, 0, 0, 0], 0), 0x2362_f9de);
        assert_eq!(murmur3_32(b"aaaa", 0x9747_b28c), 0x5a97_808a);
        assert_eq!(murmur3_32(b"a", 0x9747_b28c), 0x7fa0_9ea6);
        assert_eq!(murmur3_32(b"abc", 0x9747_b28c), 0xc84a_62dd);
        assert_eq!(murmur3_32(b"Hello, world!", 0x9747_b28c), 0x2488_4cba);
    }

    #[test]
    fn seed_changes_hash() {
        let a = KeyHasher::new(1);
        let b = KeyHasher::new(2);
        assert_ne!(a.hash_bytes(b"key"), b.hash_bytes(b"key"));
        assert_eq!(a.hash_bytes(b"key"), KeyHasher::new(1).hash_bytes(b"key"));
    }

    #[test]
    fn integer_hashes_its_le_bytes() {
        let h = KeyHasher::default();
        let v = 0x0102_0304_0506_0708u64;
        assert_eq!(h.hash_integer(v), murmur3_32(&v.to_le_bytes(), DEFAULT_SEED));
        assert_eq!(h.integer(v).hash(), h.hash_integer(v));
    }

    #[test]
    fn raw_integer_is_unmixed() {
        let h = KeyHasher::new(12345);
        assert_eq!(h.integer_raw(7).hash(), 7);
        assert_eq!(h.integer_raw(0x1_0000_0009).hash(), 9);
    }
}
