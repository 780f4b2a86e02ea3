#![cfg(test)]

// Property tests for Set kept inside the crate so they can drive a
// three-level tree through the same calls users make.

use crate::ops::ElementOps;
use crate::set::Set;
use proptest::prelude::*;
use std::cell::Cell;
use std::collections::HashSet;
use std::rc::Rc;

const DEPTH: usize = 3;

// Hash folds keys onto a few values so buckets see collisions.
#[derive(Clone, Default)]
struct Tally {
    disposed: Rc<Cell<usize>>,
}

impl ElementOps<u8> for Tally {
    type Context = ();

    fn equals(&self, _: &(), a: &u8, b: &u8) -> bool {
        a == b
    }

    fn hash(&self, _: &(), element: &u8) -> u32 {
        u32::from(*element % 5)
    }

    fn dispose(&self, _: &(), _: u8) {
        self.disposed.set(self.disposed.get() + 1);
    }
}

#[derive(Clone, Debug)]
enum Op {
    Insert(usize, u8),
    Remove(usize, u8),
    Exists(usize, u8),
    Count(usize),
    Iterate(usize),
}

fn arb_ops() -> impl Strategy<Value = Vec<Op>> {
    let depth = 0..DEPTH;
    let key = 0u8..24;
    let op = prop_oneof![
        (depth.clone(), key.clone()).prop_map(|(d, k)| Op::Insert(d, k)),
        (depth.clone(), key.clone()).prop_map(|(d, k)| Op::Remove(d, k)),
        (depth.clone(), key).prop_map(|(d, k)| Op::Exists(d, k)),
        depth.clone().prop_map(Op::Count),
        depth.prop_map(Op::Iterate),
    ];
    proptest::collection::vec(op, 1..80)
}

fn node(root: &Set<u8, Tally>, depth: usize) -> &Set<u8, Tally> {
    let mut set = root;
    for _ in 0..depth {
        set = &set.sub_sets()[0];
    }
    set
}

fn node_mut(root: &mut Set<u8, Tally>, depth: usize) -> &mut Set<u8, Tally> {
    let mut set = root;
    for _ in 0..depth {
        set = set.sub_set_mut(0).unwrap();
    }
    set
}

// Property: a root/child/grandchild chain behaves like three std HashSets
// where each level sees itself and everything below it.
// - `insert`/`remove` affect only the addressed level.
// - `exists`, `count` and `iter` aggregate over the visible levels.
// - Every element inserted is disposed exactly once by the end.
proptest! {
    #![proptest_config(ProptestConfig { cases: 64, .. ProptestConfig::default() })]
    #[test]
    fn prop_sub_set_tree_matches_model(ops in arb_ops()) {
        let tally = Tally::default();
        let disposed = Rc::clone(&tally.disposed);
        let mut root = Set::new(tally);
        root.create_sub_set().create_sub_set();

        let mut models: [HashSet<u8>; DEPTH] = Default::default();
        let mut inserted = 0usize;

        for op in ops {
            match op {
                Op::Insert(d, k) => {
                    let replaced = models[d].contains(&k);
                    let before = disposed.get();
                    node_mut(&mut root, d).insert(k);
                    models[d].insert(k);
                    inserted += 1;
                    prop_assert_eq!(disposed.get(), before + usize::from(replaced));
                }
                Op::Remove(d, k) => {
                    let removed = node_mut(&mut root, d).remove(&k);
                    prop_assert_eq!(removed, models[d].remove(&k));
                }
                Op::Exists(d, k) => {
                    let visible = models[d..].iter().any(|m| m.contains(&k));
                    prop_assert_eq!(node(&root, d).exists(&k), visible);
                    prop_assert_eq!(node(&root, d).value(&k).is_some(), visible);
                }
                Op::Count(d) => {
                    let expected: usize = models[d..].iter().map(HashSet::len).sum();
                    prop_assert_eq!(node(&root, d).count(), expected);
                }
                Op::Iterate(d) => {
                    let mut seen: Vec<u8> = node(&root, d).iter().copied().collect();
                    let mut expected: Vec<u8> =
                        models[d..].iter().flat_map(|m| m.iter().copied()).collect();
                    seen.sort_unstable();
                    expected.sort_unstable();
                    prop_assert_eq!(seen, expected);
                }
            }
        }

        let removed_total = inserted - models.iter().map(HashSet::len).sum::<usize>();
        prop_assert_eq!(disposed.get(), removed_total);
        drop(root);
        prop_assert_eq!(disposed.get(), inserted);
    }
}
