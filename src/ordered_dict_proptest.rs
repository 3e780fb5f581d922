#![cfg(test)]

// Property tests for OrderedDict kept inside the crate so they can check
// the index and log directly.

use crate::error::DictError;
use crate::index_table::SlotState;
use crate::key_ops::StdKeyOps;
use crate::ordered_dict::OrderedDict;
use proptest::prelude::*;
use std::hash::{BuildHasher, Hasher};

// Pool-indexed operations to improve shrinking: indices shrink to earlier keys,
// pool length shrinks, and op lists shrink in length.
#[derive(Clone, Debug)]
enum OpI {
    Set(usize, i32),
    SetDefault(usize, i32),
    Delete(usize),
    Pop(usize),
    PopItem,
    PopItemFirst,
    MoveToEnd(usize, bool),
    Get(usize),
    Iterate,
    DropIndex,
    Compact,
}

fn arb_scenario() -> impl Strategy<Value = (Vec<String>, Vec<OpI>)> {
    proptest::collection::vec("[a-z]{0,4}", 1..=10).prop_flat_map(|pool| {
        let idxs: Vec<usize> = (0..pool.len()).collect();
        let idx = proptest::sample::select(idxs);
        let op = prop_oneof![
            4 => (idx.clone(), any::<i32>()).prop_map(|(i, v)| OpI::Set(i, v)),
            1 => (idx.clone(), any::<i32>()).prop_map(|(i, v)| OpI::SetDefault(i, v)),
            2 => idx.clone().prop_map(OpI::Delete),
            1 => idx.clone().prop_map(OpI::Pop),
            1 => Just(OpI::PopItem),
            1 => Just(OpI::PopItemFirst),
            2 => (idx.clone(), any::<bool>()).prop_map(|(i, last)| OpI::MoveToEnd(i, last)),
            2 => idx.clone().prop_map(OpI::Get),
            1 => Just(OpI::Iterate),
            1 => Just(OpI::DropIndex),
            1 => Just(OpI::Compact),
        ];
        proptest::collection::vec(op, 1..120).prop_map(move |ops| (pool.clone(), ops))
    })
}

/// Reference model: a plain vector of pairs in iteration order.
#[derive(Default)]
struct Model(Vec<(String, i32)>);

impl Model {
    fn position(&self, k: &str) -> Option<usize> {
        self.0.iter().position(|(mk, _)| mk == k)
    }

    fn set(&mut self, k: &str, v: i32) -> Option<i32> {
        match self.position(k) {
            Some(i) => Some(std::mem::replace(&mut self.0[i].1, v)),
            None => {
                self.0.push((k.to_string(), v));
                None
            }
        }
    }

    fn remove(&mut self, k: &str) -> Option<i32> {
        self.position(k).map(|i| self.0.remove(i).1)
    }
}

fn check_structure<O>(d: &OrderedDict<String, i32, O>) -> Result<(), TestCaseError> {
    let entries = d.core().entries();
    prop_assert_eq!(entries.len() + entries.dead(), entries.ever_used());
    prop_assert_eq!(entries.live_buckets().count(), d.len());
    prop_assert_eq!(d.iter().count(), d.len());
    prop_assert_eq!(d.iter().rev().count(), d.len());
    Ok(())
}

fn run_scenario<O>(
    mut sut: OrderedDict<String, i32, O>,
    pool: Vec<String>,
    ops: Vec<OpI>,
) -> Result<(), TestCaseError>
where
    O: crate::key_ops::KeyOps<String>,
{
    let mut model = Model::default();
    for op in ops {
        match op {
            OpI::Set(i, v) => {
                let k = &pool[i];
                prop_assert_eq!(sut.set(k.clone(), v), model.set(k, v));
            }
            OpI::SetDefault(i, v) => {
                let k = &pool[i];
                let expected = match model.position(k) {
                    Some(p) => model.0[p].1,
                    None => {
                        model.0.push((k.clone(), v));
                        v
                    }
                };
                prop_assert_eq!(*sut.setdefault(k.clone(), v), expected);
            }
            OpI::Delete(i) => {
                let k = &pool[i];
                let expected = model.remove(k).map(drop).ok_or(DictError::KeyNotFound);
                prop_assert_eq!(sut.delete(k), expected);
            }
            OpI::Pop(i) => {
                let k = &pool[i];
                let expected = model.remove(k).ok_or(DictError::KeyNotFound);
                prop_assert_eq!(sut.pop(k), expected);
            }
            OpI::PopItem => {
                let expected = model.0.pop().ok_or(DictError::Empty);
                prop_assert_eq!(sut.popitem(), expected);
            }
            OpI::PopItemFirst => {
                let expected = if model.0.is_empty() {
                    Err(DictError::Empty)
                } else {
                    Ok(model.0.remove(0))
                };
                prop_assert_eq!(sut.popitem_first(), expected);
            }
            OpI::MoveToEnd(i, last) => {
                let k = &pool[i];
                match model.position(k) {
                    Some(p) => {
                        let pair = model.0.remove(p);
                        if last {
                            model.0.push(pair);
                        } else {
                            model.0.insert(0, pair);
                        }
                        prop_assert_eq!(sut.move_to_end(k, last), Ok(()));
                    }
                    None => {
                        prop_assert_eq!(sut.move_to_end(k, last), Err(DictError::KeyNotFound));
                    }
                }
            }
            OpI::Get(i) => {
                let k = &pool[i];
                let expected = model.position(k).map(|p| &model.0[p].1);
                prop_assert_eq!(sut.get(k), expected);
                prop_assert_eq!(sut.contains(k), expected.is_some());
            }
            OpI::Iterate => {
                let got: Vec<(String, i32)> = sut.iter().map(|(k, v)| (k.clone(), *v)).collect();
                prop_assert_eq!(&got, &model.0);
            }
            OpI::DropIndex => {
                sut.drop_index();
                prop_assert_eq!(sut.slot_width(), None);
            }
            OpI::Compact => {
                sut.compact();
                prop_assert_eq!(sut.core().entries().dead(), 0);
            }
        }
        prop_assert_eq!(sut.len(), model.0.len());
        prop_assert_eq!(sut.is_empty(), model.0.is_empty());
        check_structure(&sut)?;
    }
    let got: Vec<(String, i32)> = sut.into_iter().collect();
    prop_assert_eq!(got, model.0);
    Ok(())
}

// Property: State-machine equivalence against an ordered vector model.
// Invariants exercised across random operation sequences:
// - `set` overwrites in place and appends new keys at the end.
// - Deletes, pops and popitem remove exactly the model's entry.
// - `move_to_end` relocates to either end; absent keys are KeyNotFound.
// - Iteration order, `len`, forward and reverse iteration match the model.
// - Lookups survive a dropped index and explicit compaction.
proptest! {
    #![proptest_config(ProptestConfig { cases: 96, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine((pool, ops) in arb_scenario()) {
        run_scenario(OrderedDict::new(), pool, ops)?;
    }
}

// Constant hasher to force all keys onto one probe chain.
#[derive(Clone, Default)]
struct ConstBuildHasher;
struct ConstHasher;
impl BuildHasher for ConstBuildHasher {
    type Hasher = ConstHasher;
    fn build_hasher(&self) -> Self::Hasher {
        ConstHasher
    }
}
impl Hasher for ConstHasher {
    fn write(&mut self, _bytes: &[u8]) {}
    fn finish(&self) -> u64 {
        0
    }
}

// Property: Same state machine with every key colliding, so lookups depend
// entirely on equality and tombstones along a single chain.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_state_machine_collisions((pool, ops) in arb_scenario()) {
        let sut = OrderedDict::with_key_ops(StdKeyOps::with_hasher(ConstBuildHasher));
        run_scenario(sut, pool, ops)?;
    }
}

// Property: every valid slot points at a live record and every live record
// is reachable from exactly one slot, across random set/delete churn.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_index_matches_log(ops in proptest::collection::vec((0u8..24, any::<bool>()), 1..300)) {
        let mut d: OrderedDict<u8, u8> = OrderedDict::new();
        for (k, insert) in ops {
            if insert {
                d.set(k, k);
            } else {
                let _ = d.delete(&k);
            }
        }
        let entries = d.core().entries();
        let table = d.core().index_table().expect("mutations install an index");
        let mut seen = vec![0usize; entries.ever_used()];
        for slot in 0..table.num_slots() {
            if let SlotState::Valid(offset) = table.state(slot) {
                prop_assert!(entries.bucket(offset).is_some(), "slot {} -> dead offset {}", slot, offset);
                seen[offset] += 1;
            }
        }
        for (offset, b) in entries.live_buckets() {
            prop_assert_eq!(seen[offset], 1);
            prop_assert!(table.find_slot_of(b.hash, offset).is_some());
        }
        let (free, _, _) = table.census();
        prop_assert!(free * 3 >= table.num_slots());
    }
}
