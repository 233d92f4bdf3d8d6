#![cfg(test)]

// Property tests for DenseMap kept inside the crate so they can inspect the
// index and dense store directly.

use crate::dense_map::DenseMap;
use crate::key::Key;
use hashbrown::HashMap;
use proptest::prelude::*;
use std::collections::BTreeSet;

// Model-side key; every variant maps onto one `Key` kind.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
enum ModelKey {
    Bytes(Vec<u8>),
    Int(u64),
    Raw(u64),
}

impl ModelKey {
    fn key(&self) -> Key<'static> {
        match self {
            ModelKey::Bytes(b) => Key::buffer_copied(b),
            ModelKey::Int(v) => Key::integer(*v),
            ModelKey::Raw(v) => Key::integer_raw(*v),
        }
    }

    fn from_key(key: &Key<'_>) -> Self {
        match (key.as_bytes(), key.as_integer()) {
            (Some(b), _) => ModelKey::Bytes(b.to_vec()),
            (None, Some(v)) if key.kind() == crate::key::KeyKind::Integer => ModelKey::Int(v),
            (None, Some(v)) => ModelKey::Raw(v),
            (None, None) => unreachable!(),
        }
    }
}

// Pool-indexed operations so that shrinking moves toward earlier keys and
// shorter op lists.
#[derive(Clone, Debug)]
enum Op {
    Set(usize, i32),
    Make(usize, i32),
    Erase(usize),
    Find(usize),
    Mutate(usize, i32),
    Iterate,
}

fn arb_model_key() -> impl Strategy<Value = ModelKey> {
    prop_oneof![
        proptest::collection::vec(any::<u8>(), 0..6).prop_map(ModelKey::Bytes),
        (0u64..64).prop_map(ModelKey::Int),
        // Raw keys on a handful of natural slots build long clusters.
        (0u64..4, 0u64..16).prop_map(|(slot, hi)| ModelKey::Raw(slot | (hi << 32))),
    ]
}

fn arb_scenario() -> impl Strategy<Value = (Vec<ModelKey>, Vec<Op>)> {
    proptest::collection::vec(arb_model_key(), 1..=48).prop_flat_map(|pool| {
        let idx = 0..pool.len();
        let op = prop_oneof![
            3 => (idx.clone(), any::<i32>()).prop_map(|(i, v)| Op::Set(i, v)),
            1 => (idx.clone(), any::<i32>()).prop_map(|(i, v)| Op::Make(i, v)),
            2 => idx.clone().prop_map(Op::Erase),
            1 => idx.clone().prop_map(Op::Find),
            1 => (idx.clone(), any::<i32>()).prop_map(|(i, d)| Op::Mutate(i, d)),
            1 => Just(Op::Iterate),
        ];
        proptest::collection::vec(op, 1..200).prop_map(move |ops| (pool.clone(), ops))
    })
}

// Property: state-machine equivalence against hashbrown::HashMap.
// Invariants exercised after every operation:
// - `set` returns the previous value; `make` reports presence and keeps the
//   existing value.
// - `erase` reports presence; erasing an absent key leaves occupied and
//   capacity untouched.
// - `validate()` holds (density, sentinel, reachability, unique references).
// - Load stays at or below 3/4 and capacity never drops below the floor.
// - `len` matches the model; iteration yields exactly the model's keys.
proptest! {
    #![proptest_config(ProptestConfig { cases: 128, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine(initial_pow in 0u32..7, (pool, ops) in arb_scenario()) {
        let initial = 1usize << initial_pow;
        let mut sut: DenseMap<'static, i32> = DenseMap::with_capacity(initial).unwrap();
        let mut model: HashMap<ModelKey, i32> = HashMap::new();

        for op in ops {
            match op {
                Op::Set(i, v) => {
                    let k = &pool[i];
                    let prev = sut.set(k.key(), v).unwrap();
                    prop_assert_eq!(prev, model.insert(k.clone(), v));
                }
                Op::Make(i, v) => {
                    let k = &pool[i];
                    let (slot, found) = sut.make(k.key(), || v).unwrap();
                    let current = *slot;
                    prop_assert_eq!(found, model.contains_key(k));
                    let expected = *model.entry(k.clone()).or_insert(v);
                    prop_assert_eq!(current, expected);
                }
                Op::Erase(i) => {
                    let k = &pool[i];
                    let before = (sut.occupied(), sut.capacity());
                    let erased = sut.erase(&k.key());
                    prop_assert_eq!(erased, model.remove(k).is_some());
                    if !erased {
                        prop_assert_eq!((sut.occupied(), sut.capacity()), before);
                    }
                }
                Op::Find(i) => {
                    let k = &pool[i];
                    prop_assert_eq!(sut.get(&k.key()), model.get(k));
                }
                Op::Mutate(i, d) => {
                    let k = &pool[i];
                    if let Some(v) = sut.get_mut(&k.key()) {
                        *v = v.wrapping_add(d);
                    }
                    if let Some(v) = model.get_mut(k) {
                        *v = v.wrapping_add(d);
                    }
                }
                Op::Iterate => {
                    let s_keys: BTreeSet<ModelKey> = sut.keys().map(ModelKey::from_key).collect();
                    let m_keys: BTreeSet<ModelKey> = model.keys().cloned().collect();
                    prop_assert_eq!(s_keys, m_keys);
                }
            }

            prop_assert_eq!(sut.validate(), Ok(()));
            prop_assert_eq!(sut.len(), model.len());
            prop_assert!(sut.len() * 4 <= sut.capacity() * 3);
            prop_assert!(sut.capacity() >= initial);
        }

        for (k, v) in &model {
            prop_assert_eq!(sut.get(&k.key()), Some(v));
        }
    }
}

// Property: erasing in any order from a table built with any insertion order
// keeps every survivor reachable, and draining returns the table to its
// floor with an all-empty index.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_drain_in_random_order(
        keys in proptest::collection::btree_set(0u64..512, 1..200),
        seed in any::<u64>(),
    ) {
        let mut sut: DenseMap<'static, u64> = DenseMap::new();
        for &k in &keys {
            // Low bits only: heavy clustering on raw hashes.
            prop_assert_eq!(sut.set(Key::integer_raw(k & 63 | (k << 32)), k).unwrap(), None);
        }

        let mut order: Vec<u64> = keys.iter().copied().collect();
        let mut s = seed | 1;
        for i in (1..order.len()).rev() {
            s = s.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            order.swap(i, (s >> 33) as usize % (i + 1));
        }

        for (n, &k) in order.iter().enumerate() {
            prop_assert!(sut.erase(&Key::integer_raw(k & 63 | (k << 32))));
            prop_assert_eq!(sut.validate(), Ok(()));
            prop_assert_eq!(sut.len(), order.len() - n - 1);
            for &rest in &order[n + 1..] {
                prop_assert_eq!(sut.get(&Key::integer_raw(rest & 63 | (rest << 32))), Some(&rest));
            }
        }

        prop_assert_eq!(sut.capacity(), crate::DEFAULT_INITIAL_CAPACITY);
        prop_assert!(sut.index.iter().all(|&s| s == 0));
        prop_assert!(sut.dense.iter().all(Option::is_none));
    }
}
