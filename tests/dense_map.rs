// DenseMap public API test suite.
//
// Each test states the behavior being verified. The invariants exercised:
// - Round-trip: set(k, v) then get(k) yields v, for every key kind.
// - Uniqueness: repeated insertion of a key never adds a dense entry.
// - Idempotent erase: erasing an absent key changes nothing.
// - Density: iteration visits exactly the live entries.
// - Load bounds: capacity follows the 3/4 growth and 1/4 shrink rules.
use anyhow::Result;
use dense_map::{DenseMap, Key, KeyHasher, KeyKind, Options, DEFAULT_INITIAL_CAPACITY};
use std::collections::BTreeSet;

// Test: round-trip across all key kinds.
// Verifies: each kind is found only by an equal key of the same kind.
#[test]
fn round_trip_all_key_kinds() -> Result<()> {
    let mut m: DenseMap<'static, &str> = DenseMap::new();
    m.set(Key::buffer_copied(b"bytes"), "buffer")?;
    m.set(Key::integer(42), "integer")?;
    m.set(Key::integer_raw(42), "raw")?;

    assert_eq!(m.get(&Key::buffer(b"bytes")), Some(&"buffer"));
    assert_eq!(m.get(&Key::integer(42)), Some(&"integer"));
    assert_eq!(m.get(&Key::integer_raw(42)), Some(&"raw"));
    assert_eq!(m.get(&Key::integer(43)), None);
    assert_eq!(m.len(), 3);

    let kinds: BTreeSet<String> = m.keys().map(|k| format!("{:?}", k.kind())).collect();
    assert_eq!(kinds.len(), 3);
    assert!(m.keys().any(|k| k.kind() == KeyKind::IntegerRaw));
    Ok(())
}

// Test: uniqueness under repeated set/make.
// Verifies: occupied stays at live + 1; the last written value wins.
#[test]
fn repeated_insertion_keeps_one_entry() -> Result<()> {
    let mut m: DenseMap<'_, u32> = DenseMap::new();
    for v in 0..10 {
        m.set(Key::integer(7), v)?;
        let (slot, found) = m.make(Key::integer(7), || 99)?;
        assert!(found);
        assert_eq!(*slot, v);
    }
    assert_eq!(m.len(), 1);
    assert_eq!(m.occupied(), 2);
    assert_eq!(m.iter().count(), 1);
    Ok(())
}

// Test: bulk insert then erase half.
// Verifies: survivors are found, erased keys are gone, and iteration
// yields exactly the survivors.
#[test]
fn bulk_insert_and_erase_half() -> Result<()> {
    let mut m: DenseMap<'_, u64> = DenseMap::new();
    for i in 0..10_000u64 {
        assert_eq!(m.set(Key::integer(i), i * 2)?, None);
    }
    assert_eq!(m.len(), 10_000);
    assert!(m.len() * 4 <= m.capacity() * 3);

    for i in (0..10_000u64).filter(|i| i % 2 == 1) {
        assert!(m.erase(&Key::integer(i)));
    }
    assert_eq!(m.len(), 5_000);
    for i in 0..10_000u64 {
        let expected = if i % 2 == 0 { Some(i * 2) } else { None };
        assert_eq!(m.get(&Key::integer(i)).copied(), expected);
    }

    let seen: BTreeSet<u64> = m.keys().filter_map(Key::as_integer).collect();
    let expected: BTreeSet<u64> = (0..10_000).filter(|i| i % 2 == 0).collect();
    assert_eq!(seen, expected);
    m.validate()?;
    Ok(())
}

// Test: erase-then-reinsert.
// Verifies: a key can come back with a new value after removal.
#[test]
fn erase_then_reinsert() -> Result<()> {
    let mut m: DenseMap<'_, String> = DenseMap::new();
    m.set(Key::from("k"), "one".to_string())?;
    assert_eq!(m.remove(&Key::from("k")).as_deref(), Some("one"));
    assert!(!m.erase(&Key::from("k")));
    assert_eq!(m.set(Key::from("k"), "two".to_string())?, None);
    assert_eq!(m.get(&Key::from("k")).map(String::as_str), Some("two"));
    Ok(())
}

// Test: raw integer keys act as direct offsets.
// Verifies: sequential raw keys land on consecutive probe slots, so a
// full walk back down leaves every remaining key in place.
#[test]
fn sequential_raw_keys() -> Result<()> {
    let mut m: DenseMap<'_, u64> = Options::new().initial_capacity(256).build()?;
    for i in 0..150u64 {
        m.set(Key::integer_raw(i), i)?;
    }
    assert_eq!(m.capacity(), 256);
    for i in (0..150u64).rev() {
        assert_eq!(m.remove(&Key::integer_raw(i)), Some(i));
        assert_eq!(m.capacity(), 256);
    }
    assert!(m.is_empty());
    Ok(())
}

// Test: the table seed is carried by its hasher.
// Verifies: keys made with the table's hasher round-trip; the seed is
// visible through `hasher()`.
#[test]
fn per_table_seed() -> Result<()> {
    let mut m: DenseMap<'_, u8> = Options::new().seed(0xfeed).build()?;
    let hasher: KeyHasher = m.hasher();
    assert_eq!(hasher.seed(), 0xfeed);
    for i in 0..50u8 {
        m.set(hasher.integer(i as u64), i)?;
    }
    for i in 0..50u8 {
        assert_eq!(m.get(&hasher.integer(i as u64)), Some(&i));
    }
    assert_eq!(m.initial_capacity(), DEFAULT_INITIAL_CAPACITY);
    Ok(())
}

// Test: borrowed keys from a caller-owned arena.
// Assumes: the byte arena outlives the map.
// Verifies: lookups by borrowed or copied keys agree.
#[test]
fn borrowed_keys_from_arena() -> Result<()> {
    let arena: Vec<u8> = (0..=255u8).collect();
    let mut m: DenseMap<'_, usize> = DenseMap::new();
    for start in 0..200usize {
        m.set(Key::buffer(&arena[start..start + 8]), start)?;
    }
    for start in 0..200usize {
        let copied = Key::buffer_copied(&arena[start..start + 8]);
        assert_eq!(m.get(&copied), Some(&start));
    }
    m.retain(|k, _| k.as_bytes().map_or(false, |b| b[0] % 3 == 0));
    assert_eq!(m.len(), (0..200).filter(|s| s % 3 == 0).count());
    m.validate()?;
    Ok(())
}
