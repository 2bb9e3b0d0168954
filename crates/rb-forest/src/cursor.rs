//! Read-only cursor over a tree snapshot.
//!
//! Nodes carry no parent links, so a cursor remembers the path from the
//! root to its current node. An empty path is the "ghost" position that
//! sits between the last and the first entry: stepping forward from it
//! lands on the first entry, stepping back lands on the last.

use std::borrow::Borrow;
use std::cmp::Ordering;
use std::fmt;

use crate::iter::Iter;
use crate::red_black::RbNode;
use crate::tree::Tree;
use crate::types::Augment;

#[inline]
fn side<K, V, T>(node: &RbNode<K, V, T>, right: bool) -> Option<u32> {
    if right {
        node.r
    } else {
        node.l
    }
}

pub struct Cursor<'a, K, V, A: Augment<K, V>> {
    tree: &'a Tree<K, V, A>,
    /// Root first; the last index is the current node.
    path: Vec<u32>,
}

impl<'a, K, V, A: Augment<K, V>> Cursor<'a, K, V, A> {
    /// Cursor on the root, or the ghost position for an empty tree.
    pub(crate) fn new(tree: &'a Tree<K, V, A>) -> Self {
        Self {
            tree,
            path: tree.root().into_iter().collect(),
        }
    }

    pub(crate) fn front(tree: &'a Tree<K, V, A>) -> Self {
        let mut cursor = Self::ghost(tree);
        cursor.move_next();
        cursor
    }

    pub(crate) fn back(tree: &'a Tree<K, V, A>) -> Self {
        let mut cursor = Self::ghost(tree);
        cursor.move_prev();
        cursor
    }

    fn ghost(tree: &'a Tree<K, V, A>) -> Self {
        Self {
            tree,
            path: Vec::new(),
        }
    }

    fn current(&self) -> Option<u32> {
        self.path.last().copied()
    }

    pub fn is_ghost(&self) -> bool {
        self.path.is_empty()
    }

    /// Depth of the current node, the root being 0.
    pub fn depth(&self) -> Option<usize> {
        self.path.len().checked_sub(1)
    }

    fn descend(&mut self, mut curr: Option<u32>, right: bool) {
        let arena = self.tree.arena();
        while let Some(i) = curr {
            self.path.push(i);
            curr = side(&arena.node(i), right);
        }
    }

    fn advance(&mut self, right: bool) {
        let arena = self.tree.arena();
        let Some(curr) = self.current() else {
            self.descend(self.tree.root(), !right);
            return;
        };
        let child = side(&arena.node(curr), right);
        if child.is_some() {
            self.descend(child, !right);
            return;
        }
        // Climb until we leave a subtree hanging on the near side.
        while let Some(child) = self.path.pop() {
            let Some(&parent) = self.path.last() else {
                return;
            };
            if side(&arena.node(parent), !right) == Some(child) {
                return;
            }
        }
    }

    /// In-order successor; wraps through the ghost position.
    pub fn move_next(&mut self) {
        self.advance(true);
    }

    /// In-order predecessor; wraps through the ghost position.
    pub fn move_prev(&mut self) {
        self.advance(false);
    }

    /// Moves to the parent. `false` at the root or the ghost position.
    pub fn move_parent(&mut self) -> bool {
        if self.path.len() < 2 {
            return false;
        }
        self.path.pop();
        true
    }

    fn move_child(&mut self, right: bool) -> bool {
        let Some(curr) = self.current() else {
            return false;
        };
        let child = side(&self.tree.arena().node(curr), right);
        match child {
            Some(child) => {
                self.path.push(child);
                true
            }
            None => false,
        }
    }

    pub fn move_left(&mut self) -> bool {
        self.move_child(false)
    }

    pub fn move_right(&mut self) -> bool {
        self.move_child(true)
    }

    /// Number of entries in the current node's subtree.
    pub fn subtree_len(&self) -> usize {
        self.current()
            .map_or(0, |i| self.tree.arena().node(i).n as usize)
    }

    /// Aggregate over the current node's subtree.
    pub fn subtree_augment(&self) -> Option<A::Value> {
        let i = self.current()?;
        Some(self.tree.arena().node(i).a.clone())
    }

    /// Rank of the current entry in the whole tree.
    pub fn index(&self) -> Option<usize> {
        let arena = self.tree.arena();
        let size = |i: Option<u32>| i.map_or(0, |i| arena.node(i).n as usize);
        let (&curr, _) = self.path.split_last()?;
        let mut rank = size(arena.node(curr).l);
        for pair in self.path.windows(2) {
            let node = arena.node(pair[0]);
            if node.r == Some(pair[1]) {
                rank += size(node.l) + 1;
            }
        }
        Some(rank)
    }

    /// In-order iterator over the current node's subtree; empty at the
    /// ghost position.
    pub fn iter_below(&self) -> Iter<'a, K, V, A> {
        Iter::below(self.tree, self.current())
    }
}

impl<'a, K, V, A> Cursor<'a, K, V, A>
where
    K: Clone,
    V: Clone,
    A: Augment<K, V>,
{
    fn entry(&self, idx: Option<u32>) -> Option<(K, V)> {
        let node = self.tree.arena().node(idx?);
        Some((node.k.clone(), node.v.clone()))
    }

    pub fn key(&self) -> Option<K> {
        let i = self.current()?;
        Some(self.tree.arena().node(i).k.clone())
    }

    pub fn value(&self) -> Option<V> {
        let i = self.current()?;
        Some(self.tree.arena().node(i).v.clone())
    }

    pub fn key_value(&self) -> Option<(K, V)> {
        self.entry(self.current())
    }

    pub fn peek_next(&self) -> Option<(K, V)> {
        let mut next = self.clone();
        next.move_next();
        next.key_value()
    }

    pub fn peek_prev(&self) -> Option<(K, V)> {
        let mut prev = self.clone();
        prev.move_prev();
        prev.key_value()
    }

    pub fn peek_parent(&self) -> Option<(K, V)> {
        let parent = self.path.len().checked_sub(2)?;
        self.entry(Some(self.path[parent]))
    }

    pub fn peek_left(&self) -> Option<(K, V)> {
        let node = self.current().map(|i| self.tree.arena().node(i).l)?;
        self.entry(node)
    }

    pub fn peek_right(&self) -> Option<(K, V)> {
        let node = self.current().map(|i| self.tree.arena().node(i).r)?;
        self.entry(node)
    }
}

impl<'a, K, V, A> Cursor<'a, K, V, A>
where
    K: Ord,
    A: Augment<K, V>,
{
    /// Moves to the first entry whose key is `>= key`, or the ghost
    /// position when there is none.
    pub fn seek<Q>(&mut self, key: &Q)
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.seek_by(key, Ordering::Less);
    }

    /// Moves to the last entry whose key is `<= key`, or the ghost
    /// position when there is none.
    pub fn seek_back<Q>(&mut self, key: &Q)
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.seek_by(key, Ordering::Greater);
    }

    /// Descends towards `key`, remembering the deepest node that lies on
    /// the `toward` side of it.
    fn seek_by<Q>(&mut self, key: &Q, toward: Ordering)
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let arena = self.tree.arena();
        self.path.clear();
        let mut keep = 0;
        let mut curr = self.tree.root();
        while let Some(i) = curr {
            self.path.push(i);
            let node = arena.node(i);
            match key.cmp(node.k.borrow()) {
                Ordering::Equal => {
                    keep = self.path.len();
                    break;
                }
                ord => {
                    if ord == toward {
                        keep = self.path.len();
                    }
                    curr = side(&node, ord == Ordering::Greater);
                }
            }
        }
        self.path.truncate(keep);
    }
}

impl<K, V, A: Augment<K, V>> Clone for Cursor<'_, K, V, A> {
    fn clone(&self) -> Self {
        Self {
            tree: self.tree,
            path: self.path.clone(),
        }
    }
}

impl<K, V, A: Augment<K, V>> fmt::Debug for Cursor<'_, K, V, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cursor")
            .field("version", &self.tree.version())
            .field("path", &self.path)
            .finish()
    }
}
