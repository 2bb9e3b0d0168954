//! Tree handles: immutable snapshots of one persistent red-black tree.
//!
//! A [`Tree`] owns one reference on its root node. Every "mutating" method
//! takes `&self` and returns a new handle; the receiver keeps traversing
//! exactly what it traversed before. Cloning a handle is O(1) and dropping
//! the last handle to a node releases it back to the forest's arena.

use std::borrow::Borrow;
use std::cmp::Ordering;
use std::fmt;
use std::ops::RangeBounds;
use std::sync::Arc;

use crate::cursor::Cursor;
use crate::error::{ForestError, Result};
use crate::forest::Shared;
use crate::iter::{IntoIter, Iter};
use crate::red_black::print::print;
use crate::red_black::util::{count_prefix, Ctx, RbArena, SearchResult};
use crate::red_black::validate::assert_red_black_tree;
use crate::types::{Augment, NoAugment};

pub struct Tree<K, V, A: Augment<K, V> = NoAugment> {
    shared: Arc<Shared<K, V, A>>,
    root: Option<u32>,
    version: u64,
}

impl<K, V, A: Augment<K, V>> Tree<K, V, A> {
    /// Adopts one reference on `root`.
    pub(crate) fn from_parts(shared: Arc<Shared<K, V, A>>, root: Option<u32>) -> Self {
        let version = shared.next_version();
        Self {
            shared,
            root,
            version,
        }
    }

    pub(crate) fn shared(&self) -> &Arc<Shared<K, V, A>> {
        &self.shared
    }

    pub(crate) fn arena(&self) -> &RbArena<K, V, A::Value> {
        &self.shared.arena
    }

    pub(crate) fn root(&self) -> Option<u32> {
        self.root
    }

    /// Opaque tag of this snapshot. Clones share it, derived trees get a
    /// fresh one.
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Id of the [`Forest`](crate::Forest) this tree lives in.
    pub fn forest_id(&self) -> u64 {
        self.shared.id
    }

    pub fn same_forest(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }

    /// Same snapshot: same forest and same root node.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        self.same_forest(other) && self.root == other.root
    }

    pub fn len(&self) -> usize {
        self.root
            .map_or(0, |root| self.shared.arena.node(root).n as usize)
    }

    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// Black height of the root, textbook convention.
    pub fn black_height(&self) -> u32 {
        self.root
            .map_or(0, |root| self.shared.arena.node(root).black_height())
    }

    /// Aggregate over the whole tree, `None` when empty.
    pub fn augment(&self) -> Option<A::Value> {
        self.root
            .map(|root| self.shared.arena.node(root).a.clone())
    }

    pub fn iter(&self) -> Iter<'_, K, V, A> {
        Iter::new(self)
    }

    /// Entries whose keys fall in `bounds`, ascending.
    pub fn range<Q, R>(&self, bounds: R) -> Iter<'_, K, V, A>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
        R: RangeBounds<Q>,
    {
        Iter::range(self, bounds)
    }

    /// Read-only cursor on the root node.
    pub fn cursor(&self) -> Cursor<'_, K, V, A> {
        Cursor::new(self)
    }

    /// Cursor on the smallest entry.
    pub fn cursor_front(&self) -> Cursor<'_, K, V, A> {
        Cursor::front(self)
    }

    /// Cursor on the largest entry.
    pub fn cursor_back(&self) -> Cursor<'_, K, V, A> {
        Cursor::back(self)
    }
}

impl<K, V, A> Tree<K, V, A>
where
    K: Ord + Clone,
    V: Clone,
    A: Augment<K, V>,
{
    fn ctx(&self) -> Ctx<'_, K, V, A> {
        self.shared.ctx()
    }

    /// Wraps a result root into a new handle.
    fn derive(&self, root: Option<u32>) -> Self {
        Self::from_parts(Arc::clone(&self.shared), root)
    }

    fn check_forest(&self, other: &Self) -> Result<()> {
        if self.same_forest(other) {
            Ok(())
        } else {
            Err(ForestError::ForeignTree)
        }
    }

    fn entry(&self, idx: u32) -> (K, V) {
        let node = self.shared.arena.node(idx);
        (node.k.clone(), node.v.clone())
    }

    /// Cursor on the first entry whose key is `>= key`.
    pub fn cursor_at<Q>(&self, key: &Q) -> Cursor<'_, K, V, A>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let mut cursor = Cursor::new(self);
        cursor.seek(key);
        cursor
    }

    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let idx = self.ctx().find(self.root, key)?;
        Some(self.shared.arena.node(idx).v.clone())
    }

    pub fn try_get<Q>(&self, key: &Q) -> Result<V>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.get(key).ok_or(ForestError::KeyNotFound)
    }

    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        self.ctx().find(self.root, key).is_some()
    }

    /// Tree with `key` mapped to `value`, overwriting any previous value.
    pub fn insert(&self, key: K, value: V) -> Result<Self> {
        let ctx = self.ctx();
        let root = ctx.insert(ctx.share(self.root), key, value)?;
        Ok(self.derive(Some(root.into_raw())))
    }

    /// Tree without `key`. An absent key yields a clone of `self`.
    pub fn remove<Q>(&self, key: &Q) -> Result<Self>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        match self.try_remove(key) {
            Ok((tree, _)) => Ok(tree),
            Err(ForestError::KeyNotFound) => Ok(self.clone()),
            Err(err) => Err(err),
        }
    }

    /// Tree without `key` plus the removed value.
    pub fn try_remove<Q>(&self, key: &Q) -> Result<(Self, V)>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let ctx = self.ctx();
        if ctx.find(self.root, key).is_none() {
            return Err(ForestError::KeyNotFound);
        }
        let (root, removed) = ctx.remove(ctx.share(self.root), key)?;
        let removed = removed.ok_or(ForestError::KeyNotFound)?;
        Ok((self.derive(root.map(|root| root.into_raw())), removed))
    }

    /// `(keys < key, value at key, keys > key)`.
    pub fn split<Q>(&self, key: &Q) -> Result<(Self, Option<V>, Self)>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let ctx = self.ctx();
        let (l, found, r) = ctx.split(ctx.share(self.root), key)?;
        let l = ctx.blacken(l)?;
        let r = ctx.blacken(r)?;
        Ok((
            self.derive(l.map(|l| l.into_raw())),
            found,
            self.derive(r.map(|r| r.into_raw())),
        ))
    }

    /// Joins `self`, the entry `(key, value)` and `right`.
    ///
    /// Every key of `self` must be below `key` and every key of `right`
    /// above it; the boundaries are checked in O(log n).
    pub fn join(&self, key: K, value: V, right: &Self) -> Result<Self> {
        self.check_forest(right)?;
        let ctx = self.ctx();
        if let Some(last) = ctx.last(self.root) {
            if self.shared.arena.node(last).k >= key {
                return Err(ForestError::invariant("left tree reaches the join key"));
            }
        }
        if let Some(first) = ctx.first(right.root) {
            if self.shared.arena.node(first).k <= key {
                return Err(ForestError::invariant("right tree reaches the join key"));
            }
        }
        let joined = ctx.join(ctx.share(self.root), key, value, ctx.share(right.root))?;
        let root = ctx.blacken(Some(joined))?;
        Ok(self.derive(root.map(|root| root.into_raw())))
    }

    /// Joins two trees whose key ranges do not overlap, `self` below `right`.
    pub fn concat(&self, right: &Self) -> Result<Self> {
        self.check_forest(right)?;
        let ctx = self.ctx();
        if let (Some(last), Some(first)) = (ctx.last(self.root), ctx.first(right.root)) {
            if self.shared.arena.node(last).k >= self.shared.arena.node(first).k {
                return Err(ForestError::invariant("concatenated trees overlap"));
            }
        }
        let root = ctx.join2(ctx.share(self.root), ctx.share(right.root))?;
        let root = ctx.blacken(root)?;
        Ok(self.derive(root.map(|root| root.into_raw())))
    }

    /// Union of both trees. For keys present in both,
    /// `merge(key, ours, theirs)` picks the value.
    pub fn union<F>(&self, other: &Self, mut merge: F) -> Result<Self>
    where
        F: FnMut(&K, V, V) -> V,
    {
        self.check_forest(other)?;
        let ctx = self.ctx();
        let root = ctx.union(ctx.share(self.root), ctx.share(other.root), &mut merge)?;
        let root = ctx.blacken(root)?;
        Ok(self.derive(root.map(|root| root.into_raw())))
    }

    pub fn first(&self) -> Option<(K, V)> {
        self.ctx().first(self.root).map(|i| self.entry(i))
    }

    pub fn last(&self) -> Option<(K, V)> {
        self.ctx().last(self.root).map(|i| self.entry(i))
    }

    /// The entry with `rank` smaller keys.
    pub fn get_by_rank(&self, rank: usize) -> Option<(K, V)> {
        self.ctx().select(self.root, rank).map(|i| self.entry(i))
    }

    /// Number of keys below `key`.
    pub fn rank<Q>(&self, key: &Q) -> usize
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        count_prefix(self.arena(), self.root, |k: &K| Borrow::<Q>::borrow(k) < key)
    }

    /// Binary search driven by `compare`, which orders an entry against the
    /// target (`Less`: the entry sorts before it).
    pub fn search_by<F>(&self, compare: F) -> SearchResult<(K, V)>
    where
        F: Fn(&K, &V) -> Ordering,
    {
        self.ctx()
            .search_by(self.root, compare)
            .map(|i| self.entry(i))
    }

    /// Full O(n) check of red-black structure, key order, cached heights,
    /// sizes and aggregates.
    pub fn validate(&self) -> Result<()>
    where
        A::Value: PartialEq,
    {
        assert_red_black_tree(&self.shared.arena, &self.shared.aug, self.root)
    }
}

impl<K, V, A> Tree<K, V, A>
where
    K: fmt::Debug,
    V: fmt::Debug,
    A: Augment<K, V>,
{
    /// Multi-line dump of the node structure.
    pub fn print(&self) -> String {
        print(&self.shared.arena, self.root, "")
    }
}

impl<K, V, A: Augment<K, V>> Clone for Tree<K, V, A> {
    fn clone(&self) -> Self {
        if let Some(root) = self.root {
            self.shared.arena.retain(root);
        }
        Self {
            shared: Arc::clone(&self.shared),
            root: self.root,
            version: self.version,
        }
    }
}

impl<K, V, A: Augment<K, V>> Drop for Tree<K, V, A> {
    fn drop(&mut self) {
        if let Some(root) = self.root.take() {
            self.shared.arena.release(root);
        }
    }
}

impl<K, V, A> fmt::Debug for Tree<K, V, A>
where
    K: fmt::Debug + Clone,
    V: fmt::Debug + Clone,
    A: Augment<K, V>,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K: Clone, V: Clone, A: Augment<K, V>> IntoIterator for Tree<K, V, A> {
    type Item = (K, V);
    type IntoIter = IntoIter<K, V, A>;

    fn into_iter(self) -> IntoIter<K, V, A> {
        IntoIter::new(self)
    }
}

impl<'a, K: Clone, V: Clone, A: Augment<K, V>> IntoIterator for &'a Tree<K, V, A> {
    type Item = (K, V);
    type IntoIter = Iter<'a, K, V, A>;

    fn into_iter(self) -> Iter<'a, K, V, A> {
        self.iter()
    }
}
