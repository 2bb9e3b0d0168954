use std::thread;

use rb_forest::{Forest, ForestConfig, ForestError, Reclamation, SearchResult, Tree};

fn keys<A: rb_forest::Augment<i32, String>>(tree: &Tree<i32, String, A>) -> Vec<i32> {
    tree.iter().map(|(k, _)| k).collect()
}

fn scenario_tree(forest: &Forest<i32, String>) -> Tree<i32, String> {
    let mut tree = forest.empty();
    for k in [5, 3, 8, 1, 4, 7, 9] {
        tree = tree.insert(k, format!("v{k}")).unwrap();
    }
    tree
}

#[test]
fn inserting_out_of_order_keeps_keys_sorted() {
    let forest = Forest::new();
    let tree = scenario_tree(&forest);
    assert_eq!(keys(&tree), [1, 3, 4, 5, 7, 8, 9]);
    tree.validate().unwrap();
    assert_eq!(tree.get(&4).as_deref(), Some("v4"));
}

#[test]
fn split_at_absent_key() {
    let forest = Forest::new();
    let tree = scenario_tree(&forest);
    let (l, found, r) = tree.split(&6).unwrap();
    assert_eq!(keys(&l), [1, 3, 4, 5]);
    assert_eq!(keys(&r), [7, 8, 9]);
    assert_eq!(found, None);
    l.validate().unwrap();
    r.validate().unwrap();
}

#[test]
fn join_reassembles_split() {
    let forest = Forest::new();
    let tree = scenario_tree(&forest);
    let (l, _, r) = tree.split(&6).unwrap();
    let joined = l.join(6, "v6".to_string(), &r).unwrap();
    assert_eq!(keys(&joined), [1, 3, 4, 5, 6, 7, 8, 9]);
    joined.validate().unwrap();

    let (l, found, r) = tree.split(&5).unwrap();
    let found = found.unwrap();
    let rebuilt = l.join(5, found, &r).unwrap();
    assert!(rebuilt.iter().eq(tree.iter()));
}

#[test]
fn delete_present_and_absent_keys() {
    let forest = Forest::new();
    let tree = scenario_tree(&forest);
    let without_five = tree.remove(&5).unwrap();
    assert_eq!(keys(&without_five), [1, 3, 4, 7, 8, 9]);
    without_five.validate().unwrap();

    let unchanged = tree.remove(&100).unwrap();
    assert!(unchanged.ptr_eq(&tree));
    assert_eq!(unchanged.version(), tree.version());
    assert!(unchanged.iter().eq(tree.iter()));

    assert_eq!(tree.try_remove(&100).unwrap_err(), ForestError::KeyNotFound);
    let (_, removed) = tree.try_remove(&3).unwrap();
    assert_eq!(removed, "v3");
}

#[test]
fn older_versions_are_untouched_by_updates() {
    let forest = Forest::new();
    let base = scenario_tree(&forest);
    let before: Vec<_> = base.iter().collect();

    let grown = base.insert(6, "six".into()).unwrap();
    let overwritten = base.insert(5, "five".into()).unwrap();
    let shrunk = base.remove(&1).unwrap();
    let (_, _, _) = base.split(&4).unwrap();

    assert_eq!(base.iter().collect::<Vec<_>>(), before);
    assert_eq!(grown.len(), 8);
    assert_eq!(overwritten.get(&5).as_deref(), Some("five"));
    assert_eq!(base.get(&5).as_deref(), Some("v5"));
    assert_eq!(shrunk.first().map(|(k, _)| k), Some(3));
    base.validate().unwrap();
    assert_ne!(grown.version(), base.version());
}

#[test]
fn concurrent_inserts_from_one_base() {
    let forest = Forest::new();
    let base = scenario_tree(&forest);
    let before: Vec<_> = base.iter().collect();

    let (h2, h3) = thread::scope(|s| {
        let a = s.spawn(|| base.insert(2, "two".into()).unwrap());
        let b = s.spawn(|| base.insert(10, "ten".into()).unwrap());
        (a.join().unwrap(), b.join().unwrap())
    });

    h2.validate().unwrap();
    h3.validate().unwrap();
    assert_eq!(keys(&h2), [1, 2, 3, 4, 5, 7, 8, 9]);
    assert_eq!(keys(&h3), [1, 3, 4, 5, 7, 8, 9, 10]);
    assert_eq!(base.iter().collect::<Vec<_>>(), before);
}

#[test]
fn many_threads_share_one_forest() {
    let forest = Forest::new();
    let base = forest
        .from_sorted_iter((0..1_000).map(|k| (k * 10, k.to_string())))
        .unwrap();

    let results: Vec<Tree<i32, String>> = thread::scope(|s| {
        let workers: Vec<_> = (0..8)
            .map(|t| {
                let base = base.clone();
                s.spawn(move || {
                    let mut tree = base;
                    for i in 0..200 {
                        let key = i * 10 + t + 1;
                        tree = tree.insert(key, format!("t{t}")).unwrap();
                        if i % 4 == 0 {
                            tree = tree.remove(&(i * 10)).unwrap();
                        }
                        let (inserted, removed) = (i as usize + 1, i as usize / 4 + 1);
                        assert_eq!(tree.len(), 1_000 + inserted - removed);
                    }
                    tree
                })
            })
            .collect();
        workers.into_iter().map(|w| w.join().unwrap()).collect()
    });

    assert_eq!(base.len(), 1_000);
    base.validate().unwrap();
    for (t, tree) in results.iter().enumerate() {
        tree.validate().unwrap();
        assert_eq!(tree.len(), 1_000 + 200 - 50);
        assert_eq!(tree.get(&(t as i32 + 1)).as_deref(), Some(format!("t{t}").as_str()));
        assert!(!tree.contains_key(&0));
    }
    drop(results);
    drop(base);
    assert_eq!(forest.stats().live, 0);
}

#[test]
fn join_checks_ordering_and_forest() {
    let forest = Forest::new();
    let tree = scenario_tree(&forest);
    let (l, _, r) = tree.split(&6).unwrap();

    let err = l.join(4, "x".into(), &r).unwrap_err();
    assert!(matches!(err, ForestError::InvariantViolation(_)));
    let err = l.join(8, "x".into(), &r).unwrap_err();
    assert!(matches!(err, ForestError::InvariantViolation(_)));
    assert!(matches!(
        r.concat(&l).unwrap_err(),
        ForestError::InvariantViolation(_)
    ));

    let other = Forest::new();
    let stranger = other.empty().insert(100, "far".into()).unwrap();
    assert_eq!(l.join(6, "x".into(), &stranger).unwrap_err(), ForestError::ForeignTree);
    assert_eq!(forest.register(&stranger).unwrap_err(), ForestError::ForeignTree);
}

#[test]
fn concat_and_union() {
    let forest = Forest::new();
    let tree = scenario_tree(&forest);
    let (l, _, r) = tree.split(&5).unwrap();
    let glued = l.concat(&r).unwrap();
    glued.validate().unwrap();
    assert_eq!(keys(&glued), [1, 3, 4, 7, 8, 9]);

    let evens = forest
        .from_sorted_iter((0..10).map(|k| (k * 2, format!("e{k}"))))
        .unwrap();
    let merged = tree.union(&evens, |_, ours, theirs| ours + "+" + &theirs).unwrap();
    merged.validate().unwrap();
    assert_eq!(
        keys(&merged),
        [0, 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 12, 14, 16, 18]
    );
    assert_eq!(merged.get(&4).as_deref(), Some("v4+e2"));
    assert_eq!(merged.get(&6).as_deref(), Some("e3"));
}

#[test]
fn order_statistics_and_search() {
    let forest = Forest::new();
    let tree = scenario_tree(&forest);

    assert_eq!(tree.first(), Some((1, "v1".to_string())));
    assert_eq!(tree.last(), Some((9, "v9".to_string())));
    assert_eq!(tree.get_by_rank(3).map(|(k, _)| k), Some(5));
    assert_eq!(tree.get_by_rank(7), None);
    assert_eq!(tree.rank(&1), 0);
    assert_eq!(tree.rank(&6), 4);
    assert_eq!(tree.rank(&100), 7);

    let here = tree.search_by(|k, _| k.cmp(&7));
    assert_eq!(here.into_here().map(|(k, _)| k), Some(7));
    match tree.search_by(|k, _| k.cmp(&6)) {
        SearchResult::LeftOf((k, _)) => assert_eq!(k, 7),
        SearchResult::RightOf((k, _)) => assert_eq!(k, 5),
        other => panic!("unexpected search result {other:?}"),
    }
    let empty = forest.empty();
    assert_eq!(empty.search_by(|k: &i32, _| k.cmp(&1)), SearchResult::Empty);
    assert_eq!(tree.search_by(|_, v| v.as_str().cmp("v0")).map(|(k, _)| k), SearchResult::LeftOf(1));
    assert_eq!(tree.search_by(|k, _| k.cmp(&10)).map(|(k, _)| k), SearchResult::RightOf(9));
}

#[test]
fn double_ended_and_range_iteration() {
    let forest = Forest::new();
    let tree = forest.from_sorted_iter((1..=20).map(|k| (k, k.to_string()))).unwrap();

    let rev: Vec<i32> = tree.iter().rev().map(|(k, _)| k).collect();
    assert_eq!(rev, (1..=20).rev().collect::<Vec<_>>());

    let mut it = tree.iter();
    assert_eq!(it.len(), 20);
    assert_eq!(it.next().map(|(k, _)| k), Some(1));
    assert_eq!(it.next_back().map(|(k, _)| k), Some(20));
    assert_eq!(it.len(), 18);
    let middle: Vec<i32> = it.map(|(k, _)| k).collect();
    assert_eq!(middle, (2..=19).collect::<Vec<_>>());

    let in_range: Vec<i32> = tree.range(5..9).map(|(k, _)| k).collect();
    assert_eq!(in_range, [5, 6, 7, 8]);
    let in_range: Vec<i32> = tree.range(15..).rev().map(|(k, _)| k).collect();
    assert_eq!(in_range, [20, 19, 18, 17, 16, 15]);
    assert_eq!(tree.range(..=0).count(), 0);
    assert_eq!(tree.range(0..=3).len(), 3);
    assert_eq!(tree.range(30..40).next(), None);

    let owned: Vec<i32> = tree.clone().into_iter().map(|(k, _)| k).collect();
    assert_eq!(owned.len(), 20);
    let restarted: Vec<i32> = (&tree).into_iter().map(|(k, _)| k).collect();
    assert_eq!(owned, restarted);
}

#[test]
fn from_sorted_iter_rejects_unsorted_input() {
    let forest: Forest<i32, ()> = Forest::new();
    let err = forest.from_sorted_iter([(1, ()), (3, ()), (2, ())]).unwrap_err();
    assert!(matches!(err, ForestError::InvariantViolation(_)));
    let err = forest.from_sorted_iter([(1, ()), (1, ())]).unwrap_err();
    assert!(matches!(err, ForestError::InvariantViolation(_)));
    assert_eq!(forest.stats().live, 0);

    let tree = forest.from_entries([(3, ()), (1, ()), (2, ()), (1, ())]).unwrap();
    assert_eq!(tree.iter().map(|(k, _)| k).collect::<Vec<_>>(), [1, 2, 3]);
    tree.validate().unwrap();
}

#[test]
fn capacity_exhaustion_leaves_existing_trees_intact() {
    let forest = Forest::with_config(ForestConfig::default().with_max_nodes(8));
    let tree = forest.from_sorted_iter((0..8).map(|k| (k, k))).unwrap();
    assert_eq!(forest.stats().live, 8);

    let err = tree.insert(100, 100).unwrap_err();
    assert_eq!(err, ForestError::CapacityExceeded { max: 8 });
    assert_eq!(forest.stats().live, 8);
    tree.validate().unwrap();
    assert_eq!(tree.iter().map(|(k, _)| k).collect::<Vec<_>>(), (0..8).collect::<Vec<_>>());

    drop(tree);
    assert_eq!(forest.stats().live, 0);
    let fresh = forest.empty().insert(1, 1).unwrap();
    assert_eq!(fresh.len(), 1);
}

#[test]
fn dropping_handles_reclaims_nodes() {
    let forest = Forest::new();
    let a = forest.from_sorted_iter((0..100).map(|k| (k, k))).unwrap();
    let b = a.insert(1_000, 0).unwrap();
    let live_with_both = forest.stats().live;
    assert!(live_with_both > 100);
    // The two versions share everything off the insertion path.
    assert!(live_with_both < 150);

    drop(a);
    assert_eq!(forest.stats().live, 101);
    drop(b);
    assert_eq!(forest.stats().live, 0);
    assert!(forest.stats().free >= live_with_both);
}

#[test]
fn deferred_reclamation_batches_and_collects() {
    let config = ForestConfig::default().with_reclamation(Reclamation::Deferred { batch: 1_000 });
    let forest = Forest::with_config(config);
    let tree = forest.from_sorted_iter((0..10).map(|k| (k, k))).unwrap();
    drop(tree);
    let stats = forest.stats();
    assert_eq!(stats.retired, 1);
    assert_eq!(stats.live, 10);

    assert_eq!(forest.collect(), 10);
    assert_eq!(forest.stats().live, 0);
    assert_eq!(forest.stats().retired, 0);
}

#[test]
fn registry_tracks_versions() {
    let forest = Forest::new();
    let a = forest.empty().insert(1, "a".to_string()).unwrap();
    let b = a.insert(2, "b".into()).unwrap();
    let va = forest.register(&a).unwrap();
    let vb = forest.register(&b).unwrap();
    assert_eq!(forest.versions(), [va, vb]);
    assert_eq!(forest.len(), 2);

    drop(a);
    let a = forest.get(va).unwrap();
    assert_eq!(keys(&a), [1]);
    assert!(forest.unregister(vb).is_some());
    assert!(forest.get(vb).is_none());
    assert_eq!(forest.len(), 1);
}

#[test]
fn black_height_survives_split_and_join() {
    let forest = Forest::new();
    assert_eq!(forest.empty().black_height(), 0);
    let tree = scenario_tree(&forest);
    let (l, _, r) = tree.split(&6).unwrap();
    let joined = l.join(6, "v6".to_string(), &r).unwrap();
    let halves = l.black_height().max(r.black_height());
    assert!(joined.black_height() >= halves);
    assert!(joined.black_height() <= halves + 1);

    let wide: Forest<i32, ()> = Forest::new();
    let full = wide.from_sorted_iter((0..1_023).map(|k| (k, ()))).unwrap();
    assert_eq!(full.black_height(), 8);
    for tree in [&l, &r, &joined] {
        assert!((1usize << (tree.black_height() + 1)) - 1 <= tree.len());
    }
}

#[test]
fn parallel_deferred_updates_drain_on_collect() {
    let config = ForestConfig::default().with_reclamation(Reclamation::Deferred { batch: 7 });
    let forest: Forest<i32, i32> = Forest::with_config(config);
    thread::scope(|s| {
        for t in 0..8 {
            let forest = &forest;
            s.spawn(move || {
                let mut tree = forest.empty();
                for i in 0..3_000 {
                    let key = (i * 7 + t) % 257;
                    tree = if i % 3 == 2 {
                        tree.remove(&key).unwrap()
                    } else {
                        tree.insert(key, i).unwrap()
                    };
                }
                tree.validate().unwrap();
            });
        }
    });
    forest.collect();
    let stats = forest.stats();
    assert_eq!(stats.live, 0);
    assert_eq!(stats.retired, 0);
    assert_eq!(stats.free, stats.high_water as usize);
}
