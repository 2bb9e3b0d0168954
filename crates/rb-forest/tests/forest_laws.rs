use std::collections::BTreeMap;

use proptest::prelude::*;
use rb_forest::{FnAugment, Forest, Tree};

#[derive(Clone, Debug)]
enum Op {
    Insert(u16, u32),
    Remove(u16),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => (0u16..200, any::<u32>()).prop_map(|(k, v)| Op::Insert(k, v)),
        1 => (0u16..200).prop_map(Op::Remove),
    ]
}

fn entries<A: rb_forest::Augment<u16, u32>>(tree: &Tree<u16, u32, A>) -> Vec<(u16, u32)> {
    tree.iter().collect()
}

proptest! {
    #[test]
    fn updates_keep_invariants_and_match_btreemap(ops in prop::collection::vec(op(), 0..200)) {
        let forest = Forest::new();
        let mut tree = forest.empty();
        let mut model = BTreeMap::new();
        for op in ops {
            match op {
                Op::Insert(k, v) => {
                    tree = tree.insert(k, v).unwrap();
                    model.insert(k, v);
                }
                Op::Remove(k) => {
                    tree = tree.remove(&k).unwrap();
                    model.remove(&k);
                }
            }
            prop_assert!(tree.validate().is_ok());
        }
        let expected: Vec<_> = model.into_iter().collect();
        prop_assert_eq!(entries(&tree), expected);
    }

    #[test]
    fn split_then_join_restores_content(
        keys in prop::collection::btree_set(0u16..1_000, 0..150),
        pivot in 0u16..1_000,
    ) {
        let forest = Forest::new();
        let tree = forest
            .from_sorted_iter(keys.iter().map(|&k| (k, u32::from(k) * 3)))
            .unwrap();
        let (l, found, r) = tree.split(&pivot).unwrap();
        prop_assert!(l.validate().is_ok());
        prop_assert!(r.validate().is_ok());
        prop_assert_eq!(found.is_some(), keys.contains(&pivot));

        let rebuilt = match found {
            Some(v) => l.join(pivot, v, &r).unwrap(),
            None => l.concat(&r).unwrap(),
        };
        prop_assert!(rebuilt.validate().is_ok());
        prop_assert_eq!(entries(&rebuilt), entries(&tree));
    }

    #[test]
    fn old_versions_survive_later_updates(
        base in prop::collection::btree_map(0u16..500, any::<u32>(), 0..100),
        ops in prop::collection::vec(op(), 1..50),
    ) {
        let forest = Forest::new();
        let tree = forest.from_sorted_iter(base.clone()).unwrap();
        let mut next = tree.clone();
        for op in ops {
            next = match op {
                Op::Insert(k, v) => next.insert(k, v).unwrap(),
                Op::Remove(k) => next.remove(&k).unwrap(),
            };
        }
        let expected: Vec<_> = base.into_iter().collect();
        prop_assert_eq!(entries(&tree), expected);
        prop_assert!(tree.validate().is_ok());
    }

    #[test]
    fn aggregate_equals_in_order_fold(ops in prop::collection::vec(op(), 0..150)) {
        // Non-commutative: concatenation of keys in order.
        let aug: FnAugment<Vec<u16>, _, _> = FnAugment::new(
            |k: &u16, _: &u32| vec![*k],
            |a: &Vec<u16>, b: &Vec<u16>| a.iter().chain(b).copied().collect::<Vec<u16>>(),
        );
        let forest = Forest::with_augment(aug);
        let mut tree = forest.empty();
        for op in ops {
            tree = match op {
                Op::Insert(k, v) => tree.insert(k, v).unwrap(),
                Op::Remove(k) => tree.remove(&k).unwrap(),
            };
        }
        prop_assert!(tree.validate().is_ok());
        let folded: Vec<u16> = tree.iter().map(|(k, _)| k).collect();
        match tree.augment() {
            Some(agg) => prop_assert_eq!(agg, folded),
            None => prop_assert!(folded.is_empty()),
        }
    }

    #[test]
    fn union_matches_model(
        a in prop::collection::btree_map(0u16..300, any::<u32>(), 0..80),
        b in prop::collection::btree_map(0u16..300, any::<u32>(), 0..80),
    ) {
        let forest = Forest::new();
        let ta = forest.from_sorted_iter(a.clone()).unwrap();
        let tb = forest.from_sorted_iter(b.clone()).unwrap();
        let merged = ta.union(&tb, |_, ours, theirs| ours.wrapping_add(theirs)).unwrap();
        prop_assert!(merged.validate().is_ok());

        let mut model = a;
        for (k, v) in b {
            model
                .entry(k)
                .and_modify(|ours| *ours = ours.wrapping_add(v))
                .or_insert(v);
        }
        let expected: Vec<_> = model.into_iter().collect();
        prop_assert_eq!(entries(&merged), expected);
    }

    #[test]
    fn rank_and_select_agree(keys in prop::collection::btree_set(0u16..2_000, 1..200)) {
        let forest = Forest::new();
        let tree = forest.from_sorted_iter(keys.iter().map(|&k| (k, 0u32))).unwrap();
        prop_assert!(tree.validate().is_ok());
        for (i, k) in keys.iter().enumerate() {
            prop_assert_eq!(tree.rank(k), i);
            prop_assert_eq!(tree.get_by_rank(i).map(|(k, _)| k), Some(*k));
        }
    }
}
