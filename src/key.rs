//! Key: a tagged lookup fingerprint with its 32-bit hash computed once.

use crate::hash::KeyHasher;
use std::borrow::Cow;
use std::hash::{Hash, Hasher};

/// Which kind of payload a key carries.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum KeyKind {
    /// Opaque bytes, hashed.
    Buffer,
    /// A 64-bit integer, hashed over its little-endian bytes.
    Integer,
    /// A 64-bit integer whose low 32 bits are the hash.
    IntegerRaw,
}

#[derive(Clone, Debug)]
enum Payload<'a> {
    Buffer(Cow<'a, [u8]>),
    Integer(u64),
    IntegerRaw(u64),
}

/// A lookup key for `DenseMap`.
///
/// Buffer keys either borrow the caller's bytes for `'a` or own a private
/// copy (`Key<'static>`). Two keys are equal when their kind, cached hash
/// and payload all match; borrowed and owned buffers with the same bytes
/// compare equal.
#[derive(Clone, Debug)]
pub struct Key<'a> {
    payload: Payload<'a>,
    hash: u32,
}

impl<'a> Key<'a> {
    pub(crate) fn from_buffer(bytes: Cow<'a, [u8]>, hash: u32) -> Self {
        Key {
            payload: Payload::Buffer(bytes),
            hash,
        }
    }

    pub(crate) fn from_integer(value: u64, hash: u32) -> Self {
        Key {
            payload: Payload::Integer(value),
            hash,
        }
    }

    pub(crate) fn from_integer_raw(value: u64) -> Self {
        Key {
            payload: Payload::IntegerRaw(value),
            hash: value as u32,
        }
    }

    /// Borrowed buffer key hashed with `DEFAULT_SEED`.
    pub fn buffer(bytes: &'a [u8]) -> Self {
        KeyHasher::default().buffer(bytes)
    }

    /// The cached 32-bit hash.
    #[inline]
    pub fn hash(&self) -> u32 {
        self.hash
    }

    pub fn kind(&self) -> KeyKind {
        match self.payload {
            Payload::Buffer(_) => KeyKind::Buffer,
            Payload::Integer(_) => KeyKind::Integer,
            Payload::IntegerRaw(_) => KeyKind::IntegerRaw,
        }
    }

    pub fn as_bytes(&self) -> Option<&[u8]> {
        match &self.payload {
            Payload::Buffer(b) => Some(&b[..]),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<u64> {
        match self.payload {
            Payload::Integer(v) | Payload::IntegerRaw(v) => Some(v),
            Payload::Buffer(_) => None,
        }
    }

    /// Detach from any borrowed buffer, copying it if needed.
    pub fn into_owned(self) -> Key<'static> {
        let payload = match self.payload {
            Payload::Buffer(b) => Payload::Buffer(Cow::Owned(b.into_owned())),
            Payload::Integer(v) => Payload::Integer(v),
            Payload::IntegerRaw(v) => Payload::IntegerRaw(v),
        };
        Key {
            payload,
            hash: self.hash,
        }
    }
}

impl Key<'static> {
    /// Owned buffer key hashed with `DEFAULT_SEED`.
    pub fn buffer_copied(bytes: &[u8]) -> Self {
        KeyHasher::default().buffer_copied(bytes)
    }

    /// Integer key hashed with `DEFAULT_SEED`.
    pub fn integer(value: u64) -> Self {
        KeyHasher::default().integer(value)
    }

    pub fn integer_raw(value: u64) -> Self {
        Key::from_integer_raw(value)
    }
}

impl<'a, 'b> PartialEq<Key<'b>> for Key<'a> {
    fn eq(&self, other: &Key<'b>) -> bool {
        if self.hash != other.hash {
            return false;
        }
        match (&self.payload, &other.payload) {
            (Payload::Buffer(a), Payload::Buffer(b)) => a[..] == b[..],
            (Payload::Integer(a), Payload::Integer(b)) => a == b,
            (Payload::IntegerRaw(a), Payload::IntegerRaw(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Key<'_> {}

impl Hash for Key<'_> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.kind().hash(state);
        state.write_u32(self.hash);
        match &self.payload {
            Payload::Buffer(b) => b[..].hash(state),
            Payload::Integer(v) | Payload::IntegerRaw(v) => v.hash(state),
        }
    }
}

impl<'a> From<&'a [u8]> for Key<'a> {
    fn from(bytes: &'a [u8]) -> Self {
        Key::buffer(bytes)
    }
}

impl<'a> From<&'a str> for Key<'a> {
    fn from(s: &'a str) -> Self {
        Key::buffer(s.as_bytes())
    }
}

impl From<u64> for Key<'static> {
    fn from(value: u64) -> Self {
        Key::integer(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Invariant: borrowed and copied buffers with equal bytes are equal keys.
    #[test]
    fn borrowed_and_copied_buffers_are_equal() {
        let bytes = b"fingerprint".to_vec();
        let borrowed = Key::buffer(&bytes);
        let copied = Key::buffer_copied(&bytes);
        assert_eq!(borrowed, copied);
        assert_eq!(borrowed.hash(), copied.hash());
        assert_eq!(copied.as_bytes(), Some(&b"fingerprint"[..]));
    }

    /// Invariant: the copied key does not depend on the source buffer.
    #[test]
    fn copied_buffer_outlives_source() {
        let key = {
            let scratch = String::from("temporary");
            Key::buffer_copied(scratch.as_bytes())
        };
        assert_eq!(key.as_bytes(), Some(&b"temporary"[..]));
    }

    /// Invariant: tags participate in equality even when values coincide.
    #[test]
    fn kinds_never_compare_equal() {
        let hashed = Key::integer(5);
        let raw = Key::integer_raw(5);
        assert_eq!(hashed.kind(), KeyKind::Integer);
        assert_eq!(raw.kind(), KeyKind::IntegerRaw);
        assert_ne!(hashed, raw);

        // Same payload and same hash but different tag.
        let forged = Key::from_integer(5, 5);
        assert_ne!(forged, raw);
        assert_eq!(forged.as_integer(), raw.as_integer());
    }

    /// Invariant: keys hashed with different seeds are distinct.
    #[test]
    fn seed_participates_through_hash() {
        let a = KeyHasher::new(1).buffer(b"x");
        let b = KeyHasher::new(2).buffer(b"x");
        assert_ne!(a, b);
    }

    #[test]
    fn into_owned_keeps_identity() {
        let s = String::from("abc");
        let k: Key<'_> = s.as_str().into();
        let owned = k.clone().into_owned();
        drop(s);
        assert_eq!(owned.kind(), KeyKind::Buffer);
        assert_eq!(owned, Key::buffer_copied(b"abc"));
        assert_eq!(Key::from(9u64), Key::integer(9));
    }
}
