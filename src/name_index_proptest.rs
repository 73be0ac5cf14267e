#![cfg(test)]

// Property tests for NameIndex kept inside the crate next to the structure
// they exercise.

use crate::name_index::{CaseSensitivity, IndexConfig, NameIndex};
use proptest::prelude::*;
use std::collections::HashMap;

#[derive(Clone, Debug)]
enum Op {
    Add(usize),
    Remove(usize),
    Find(usize),
    Reset,
}

fn arb_config() -> impl Strategy<Value = IndexConfig> {
    (1usize..=4, 0usize..=3, 1usize..=3, any::<bool>()).prop_map(|(c, s, g, sensitive)| {
        IndexConfig::default()
            .with_compartments(c)
            .with_slots_per_compartment(s)
            .with_growth_step(g)
            .with_case(if sensitive {
                CaseSensitivity::Sensitive
            } else {
                CaseSensitivity::Insensitive
            })
    })
}

fn arb_scenario() -> impl Strategy<Value = (IndexConfig, Vec<String>, Vec<Op>)> {
    (arb_config(), proptest::collection::vec("[a-cA-C]{0,3}", 1..=12)).prop_flat_map(
        |(config, pool)| {
            let idx = 0..pool.len();
            let op = prop_oneof![
                3 => idx.clone().prop_map(Op::Add),
                2 => idx.clone().prop_map(Op::Remove),
                2 => idx.prop_map(Op::Find),
                1 => Just(Op::Reset),
            ];
            proptest::collection::vec(op, 1..80)
                .prop_map(move |ops| (config, pool.clone(), ops))
        },
    )
}

fn model_key(case: CaseSensitivity, name: &str) -> String {
    match case {
        CaseSensitivity::Sensitive => name.to_string(),
        CaseSensitivity::Insensitive => name.to_ascii_lowercase(),
    }
}

// Property: state-machine equivalence against std::collections::HashMap.
// Invariants exercised across random operation sequences:
// - Every stored name resolves to its element, across any number of
//   expansions (full rehash) and slot reuse after removal.
// - Removed names never resolve, even when their slot was reused.
// - Case folding is symmetric between hashing and comparison.
// - `len` matches the model; `reset` empties without shrinking capacity.
proptest! {
    #![proptest_config(ProptestConfig { cases: 128, .. ProptestConfig::default() })]
    #[test]
    fn prop_name_index_matches_model((config, pool, ops) in arb_scenario()) {
        let case = config.case;
        let mut sut: NameIndex<usize> = NameIndex::with_config(config);
        let mut model: HashMap<String, usize> = HashMap::new();

        for op in ops {
            match op {
                Op::Add(i) => {
                    let key = model_key(case, &pool[i]);
                    if !model.contains_key(&key) {
                        let cap = sut.capacity();
                        sut.add(&pool[i], i);
                        model.insert(key, i);
                        prop_assert!(sut.capacity() >= cap);
                    }
                }
                Op::Remove(i) => {
                    let key = model_key(case, &pool[i]);
                    match model.remove(&key) {
                        Some(stored) => prop_assert!(sut.remove(&pool[i], stored)),
                        None => prop_assert!(!sut.remove(&pool[i], i)),
                    }
                }
                Op::Find(i) => {
                    let key = model_key(case, &pool[i]);
                    let found = sut.find(&pool[i], |e| pool[e].as_str());
                    prop_assert_eq!(found, model.get(&key).copied());
                }
                Op::Reset => {
                    let cap = sut.capacity();
                    sut.reset();
                    model.clear();
                    prop_assert_eq!(sut.capacity(), cap);
                }
            }

            prop_assert_eq!(sut.len(), model.len());
            for name in &pool {
                let found = sut.find(name, |e| pool[e].as_str());
                prop_assert_eq!(found, model.get(&model_key(case, name)).copied());
            }
        }
    }
}
