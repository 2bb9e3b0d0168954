//! In-order traversal over a tree snapshot.
//!
//! Traversal keeps two explicit stacks of node indices, one per end, so memory
//! stays at O(height) whatever the tree looks like. Nodes reachable from a
//! handle are immutable, which makes iteration safe next to any number of
//! concurrent readers and writers. Dropping an iterator early needs no
//! cleanup.

use std::borrow::Borrow;
use std::iter::FusedIterator;
use std::ops::{Bound, RangeBounds};

use crate::red_black::util::{count_prefix, RbArena};
use crate::tree::Tree;
use crate::types::Augment;

/// Position state shared by [`Iter`] and [`IntoIter`].
#[derive(Clone, Debug, Default)]
struct Stacks {
    /// Nodes whose left subtree is done; the top is the next entry.
    front: Vec<u32>,
    /// Mirror of `front` for reverse order.
    back: Vec<u32>,
    remaining: usize,
}

impl Stacks {
    fn full<K, V, T>(arena: &RbArena<K, V, T>, root: Option<u32>) -> Self {
        let mut cursor = Self {
            remaining: root.map_or(0, |r| arena.node(r).n as usize),
            ..Self::default()
        };
        cursor.descend_front(arena, root);
        cursor.descend_back(arena, root);
        cursor
    }

    fn range<K, V, T, Q, R>(arena: &RbArena<K, V, T>, root: Option<u32>, bounds: &R) -> Self
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
        R: RangeBounds<Q>,
    {
        let start = bounds.start_bound();
        let end = bounds.end_bound();
        let below_start = |k: &K| {
            let k: &Q = k.borrow();
            match start {
                Bound::Included(q) => k < q,
                Bound::Excluded(q) => k <= q,
                Bound::Unbounded => false,
            }
        };
        let within_end = |k: &K| {
            let k: &Q = k.borrow();
            match end {
                Bound::Included(q) => k <= q,
                Bound::Excluded(q) => k < q,
                Bound::Unbounded => true,
            }
        };

        let mut cursor = Self::default();
        let mut curr = root;
        while let Some(i) = curr {
            let node = arena.node(i);
            if below_start(&node.k) {
                curr = node.r;
            } else {
                cursor.front.push(i);
                curr = node.l;
            }
        }
        let mut curr = root;
        while let Some(i) = curr {
            let node = arena.node(i);
            if within_end(&node.k) {
                cursor.back.push(i);
                curr = node.r;
            } else {
                curr = node.l;
            }
        }
        let skipped = count_prefix(arena, root, below_start);
        let taken = count_prefix(arena, root, within_end);
        cursor.remaining = taken.saturating_sub(skipped);
        cursor
    }

    fn descend_front<K, V, T>(&mut self, arena: &RbArena<K, V, T>, mut curr: Option<u32>) {
        while let Some(i) = curr {
            self.front.push(i);
            curr = arena.node(i).l;
        }
    }

    fn descend_back<K, V, T>(&mut self, arena: &RbArena<K, V, T>, mut curr: Option<u32>) {
        while let Some(i) = curr {
            self.back.push(i);
            curr = arena.node(i).r;
        }
    }

    fn next<K, V, T>(&mut self, arena: &RbArena<K, V, T>) -> Option<u32> {
        if self.remaining == 0 {
            return None;
        }
        let i = self.front.pop()?;
        let r = arena.node(i).r;
        self.descend_front(arena, r);
        self.remaining -= 1;
        Some(i)
    }

    fn next_back<K, V, T>(&mut self, arena: &RbArena<K, V, T>) -> Option<u32> {
        if self.remaining == 0 {
            return None;
        }
        let i = self.back.pop()?;
        let l = arena.node(i).l;
        self.descend_back(arena, l);
        self.remaining -= 1;
        Some(i)
    }
}

fn entry<K: Clone, V: Clone, T>(arena: &RbArena<K, V, T>, i: u32) -> (K, V) {
    let node = arena.node(i);
    (node.k.clone(), node.v.clone())
}

/// Borrowing iterator over `(key, value)` pairs in ascending key order.
pub struct Iter<'a, K, V, A: Augment<K, V>> {
    arena: &'a RbArena<K, V, A::Value>,
    cursor: Stacks,
}

impl<'a, K, V, A: Augment<K, V>> Iter<'a, K, V, A> {
    pub(crate) fn new(tree: &'a Tree<K, V, A>) -> Self {
        let arena = tree.arena();
        Self {
            arena,
            cursor: Stacks::full(arena, tree.root()),
        }
    }

    /// Iterates the subtree hanging at `root`, which `tree` keeps alive.
    pub(crate) fn below(tree: &'a Tree<K, V, A>, root: Option<u32>) -> Self {
        let arena = tree.arena();
        Self {
            arena,
            cursor: Stacks::full(arena, root),
        }
    }

    pub(crate) fn range<Q, R>(tree: &'a Tree<K, V, A>, bounds: R) -> Self
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
        R: RangeBounds<Q>,
    {
        let arena = tree.arena();
        Self {
            arena,
            cursor: Stacks::range(arena, tree.root(), &bounds),
        }
    }
}

impl<K, V, A: Augment<K, V>> Clone for Iter<'_, K, V, A> {
    fn clone(&self) -> Self {
        Self {
            arena: self.arena,
            cursor: self.cursor.clone(),
        }
    }
}

impl<K: Clone, V: Clone, A: Augment<K, V>> Iterator for Iter<'_, K, V, A> {
    type Item = (K, V);

    fn next(&mut self) -> Option<(K, V)> {
        let i = self.cursor.next(self.arena)?;
        Some(entry(self.arena, i))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.cursor.remaining, Some(self.cursor.remaining))
    }
}

impl<K: Clone, V: Clone, A: Augment<K, V>> DoubleEndedIterator for Iter<'_, K, V, A> {
    fn next_back(&mut self) -> Option<(K, V)> {
        let i = self.cursor.next_back(self.arena)?;
        Some(entry(self.arena, i))
    }
}

impl<K: Clone, V: Clone, A: Augment<K, V>> ExactSizeIterator for Iter<'_, K, V, A> {}

impl<K: Clone, V: Clone, A: Augment<K, V>> FusedIterator for Iter<'_, K, V, A> {}

/// Owning iterator: keeps its tree (and so every node it visits) alive.
pub struct IntoIter<K, V, A: Augment<K, V>> {
    tree: Tree<K, V, A>,
    cursor: Stacks,
}

impl<K, V, A: Augment<K, V>> IntoIter<K, V, A> {
    pub(crate) fn new(tree: Tree<K, V, A>) -> Self {
        let cursor = Stacks::full(tree.arena(), tree.root());
        Self { tree, cursor }
    }
}

impl<K: Clone, V: Clone, A: Augment<K, V>> Iterator for IntoIter<K, V, A> {
    type Item = (K, V);

    fn next(&mut self) -> Option<(K, V)> {
        let arena = self.tree.arena();
        let i = self.cursor.next(arena)?;
        Some(entry(arena, i))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.cursor.remaining, Some(self.cursor.remaining))
    }
}

impl<K: Clone, V: Clone, A: Augment<K, V>> DoubleEndedIterator for IntoIter<K, V, A> {
    fn next_back(&mut self) -> Option<(K, V)> {
        let arena = self.tree.arena();
        let i = self.cursor.next_back(arena)?;
        Some(entry(arena, i))
    }
}

impl<K: Clone, V: Clone, A: Augment<K, V>> ExactSizeIterator for IntoIter<K, V, A> {}

impl<K: Clone, V: Clone, A: Augment<K, V>> FusedIterator for IntoIter<K, V, A> {}
