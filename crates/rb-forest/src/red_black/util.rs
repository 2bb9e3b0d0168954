//! Join-based red-black algorithms over persistent arena nodes.
//!
//! Every structural operation is expressed through [`Ctx::join`] and
//! [`Ctx::split`]. Subtrees travel as owned [`Link`]s: an operation consumes
//! the references it is given and returns references it owns, so shared
//! nodes are only ever read, never rewritten. Touched nodes are rebuilt with
//! [`Ctx::node`], which recomputes the cached height, size and aggregate.
//!
//! Algorithms follow Blelloch, Ferizovic and Sun, "Just Join for Parallel
//! Ordered Sets", expressed in terms of `h`, the black height counting the
//! node itself.

use std::borrow::Borrow;
use std::cmp::Ordering;

use crate::arena::{Arena, Link};
use crate::error::{ForestError, Result};
use crate::types::Augment;

use super::types::RbNode;

pub type RbArena<K, V, T> = Arena<RbNode<K, V, T>>;

type Owned<'a, K, V, A> = Link<'a, RbNode<K, V, <A as Augment<K, V>>::Value>>;
type Sub<'a, K, V, A> = Option<Owned<'a, K, V, A>>;

/// A node taken apart: children as owned links, key and value cloned.
struct Exposed<'a, K, V, A: Augment<K, V>> {
    l: Sub<'a, K, V, A>,
    k: K,
    v: V,
    b: bool,
    r: Sub<'a, K, V, A>,
}

/// Where a search ended, relative to the entry it reports.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SearchResult<T> {
    Empty,
    /// The target sorts just before this entry.
    LeftOf(T),
    Here(T),
    /// The target sorts just after this entry.
    RightOf(T),
}

impl<T> SearchResult<T> {
    pub fn into_here(self) -> Option<T> {
        let Self::Here(value) = self else { return None };
        Some(value)
    }

    pub fn is_here(&self) -> bool {
        matches!(self, Self::Here(_))
    }

    pub fn map<R, F>(self, f: F) -> SearchResult<R>
    where
        F: FnOnce(T) -> R,
    {
        match self {
            Self::Here(value) => SearchResult::Here(f(value)),
            Self::LeftOf(value) => SearchResult::LeftOf(f(value)),
            Self::RightOf(value) => SearchResult::RightOf(f(value)),
            Self::Empty => SearchResult::Empty,
        }
    }
}

/// Arena plus augmentation: everything an operation needs to build nodes.
pub struct Ctx<'a, K, V, A: Augment<K, V>> {
    pub arena: &'a RbArena<K, V, A::Value>,
    pub aug: &'a A,
}

impl<'a, K, V, A: Augment<K, V>> Ctx<'a, K, V, A> {
    pub fn new(arena: &'a RbArena<K, V, A::Value>, aug: &'a A) -> Self {
        Self { arena, aug }
    }
}

impl<'a, K, V, A> Ctx<'a, K, V, A>
where
    K: Ord + Clone,
    V: Clone,
    A: Augment<K, V>,
{
    /// Takes a new reference to `idx`.
    pub fn share(&self, idx: Option<u32>) -> Sub<'a, K, V, A> {
        idx.map(|idx| Link::share(self.arena, idx))
    }

    fn height(t: &Sub<'a, K, V, A>) -> u32 {
        t.as_ref().map_or(0, |t| t.node().h)
    }

    fn is_red(t: &Sub<'a, K, V, A>) -> bool {
        t.as_ref().is_some_and(|t| t.node().is_red())
    }

    fn left_is_red(&self, t: &Owned<'a, K, V, A>) -> bool {
        let l = t.node().l;
        l.is_some_and(|l| self.arena.node(l).is_red())
    }

    fn right_is_red(&self, t: &Owned<'a, K, V, A>) -> bool {
        let r = t.node().r;
        r.is_some_and(|r| self.arena.node(r).is_red())
    }

    /// Allocates a node over `l` and `r`, taking over both references.
    pub fn node(
        &self,
        l: Sub<'a, K, V, A>,
        k: K,
        v: V,
        b: bool,
        r: Sub<'a, K, V, A>,
    ) -> Result<Owned<'a, K, V, A>> {
        let (a, h, n) = {
            let ln = l.as_ref().map(|l| l.node());
            let rn = r.as_ref().map(|r| r.node());
            let a = self.aug.aggregate(
                ln.as_ref().map(|n| &n.a),
                &k,
                &v,
                rn.as_ref().map(|n| &n.a),
            );
            let h = ln.as_ref().map_or(0, |n| n.h) + u32::from(b);
            let n = 1 + ln.as_ref().map_or(0, |n| n.n) + rn.as_ref().map_or(0, |n| n.n);
            (a, h, n)
        };
        Link::allocate(
            self.arena,
            RbNode {
                l: l.map(Link::into_raw),
                r: r.map(Link::into_raw),
                k,
                v,
                b,
                h,
                n,
                a,
            },
        )
    }

    fn expose(&self, t: Owned<'a, K, V, A>) -> Exposed<'a, K, V, A> {
        let node = t.node();
        let parts = Exposed {
            l: self.share(node.l),
            k: node.k.clone(),
            v: node.v.clone(),
            b: node.b,
            r: self.share(node.r),
        };
        // The guard must go before `t`: releasing the last reference
        // reclaims the slot.
        drop(node);
        drop(t);
        parts
    }

    /// Same subtree with the root painted `black` or red.
    fn paint(&self, t: Owned<'a, K, V, A>, black: bool) -> Result<Owned<'a, K, V, A>> {
        if t.node().b == black {
            return Ok(t);
        }
        let e = self.expose(t);
        self.node(e.l, e.k, e.v, black, e.r)
    }

    /// Paints a red root black. Published trees always have a black root.
    pub fn blacken(&self, t: Sub<'a, K, V, A>) -> Result<Sub<'a, K, V, A>> {
        t.map(|t| self.paint(t, true)).transpose()
    }

    /// Requires `h(tl) >= h(tr)`. Walks the right spine of `tl` down to a
    /// black node as tall as `tr` and hangs a red `k` there.
    fn join_right(
        &self,
        tl: Sub<'a, K, V, A>,
        k: K,
        v: V,
        tr: Sub<'a, K, V, A>,
    ) -> Result<Owned<'a, K, V, A>> {
        let hr = Self::height(&tr);
        let Some(tl) = tl else {
            return self.node(None, k, v, false, tr);
        };
        let stop = {
            let n = tl.node();
            n.b && n.h == hr
        };
        if stop {
            return self.node(Some(tl), k, v, false, tr);
        }
        let e = self.expose(tl);
        let r = self.join_right(e.r, k, v, tr)?;
        if e.b && r.node().is_red() && self.right_is_red(&r) {
            // Red-red on the right spine: recolor and rotate left.
            let re = self.expose(r);
            let rr = re.r.map(|rr| self.paint(rr, true)).transpose()?;
            let l = self.node(e.l, e.k, e.v, true, re.l)?;
            return self.node(Some(l), re.k, re.v, false, rr);
        }
        self.node(e.l, e.k, e.v, e.b, Some(r))
    }

    /// Mirror of [`Self::join_right`] for `h(tr) > h(tl)`.
    fn join_left(
        &self,
        tl: Sub<'a, K, V, A>,
        k: K,
        v: V,
        tr: Sub<'a, K, V, A>,
    ) -> Result<Owned<'a, K, V, A>> {
        let hl = Self::height(&tl);
        let Some(tr) = tr else {
            return self.node(tl, k, v, false, None);
        };
        let stop = {
            let n = tr.node();
            n.b && n.h == hl
        };
        if stop {
            return self.node(tl, k, v, false, Some(tr));
        }
        let e = self.expose(tr);
        let l = self.join_left(tl, k, v, e.l)?;
        if e.b && l.node().is_red() && self.left_is_red(&l) {
            let le = self.expose(l);
            let ll = le.l.map(|ll| self.paint(ll, true)).transpose()?;
            let r = self.node(le.r, e.k, e.v, true, e.r)?;
            return self.node(ll, le.k, le.v, false, Some(r));
        }
        self.node(Some(l), e.k, e.v, e.b, e.r)
    }

    /// Every key of `tl` must be below `k`, every key of `tr` above it.
    /// The result may have a red root.
    pub fn join(
        &self,
        tl: Sub<'a, K, V, A>,
        k: K,
        v: V,
        tr: Sub<'a, K, V, A>,
    ) -> Result<Owned<'a, K, V, A>> {
        match Self::height(&tl).cmp(&Self::height(&tr)) {
            Ordering::Greater => {
                let t = self.join_right(tl, k, v, tr)?;
                if t.node().is_red() && self.right_is_red(&t) {
                    return self.paint(t, true);
                }
                Ok(t)
            }
            Ordering::Less => {
                let t = self.join_left(tl, k, v, tr)?;
                if t.node().is_red() && self.left_is_red(&t) {
                    return self.paint(t, true);
                }
                Ok(t)
            }
            Ordering::Equal => {
                let black = Self::is_red(&tl) || Self::is_red(&tr);
                self.node(tl, k, v, black, tr)
            }
        }
    }

    /// Join without a separator key: every key of `tl` below every key of `tr`.
    pub fn join2(&self, tl: Sub<'a, K, V, A>, tr: Sub<'a, K, V, A>) -> Result<Sub<'a, K, V, A>> {
        let Some(tl) = tl else { return Ok(tr) };
        let (l, k, v) = self.split_last(tl)?;
        self.join(l, k, v, tr).map(Some)
    }

    /// Removes the maximum entry of `t`, returning the rest and that entry.
    fn split_last(&self, t: Owned<'a, K, V, A>) -> Result<(Sub<'a, K, V, A>, K, V)> {
        let e = self.expose(t);
        match e.r {
            None => Ok((e.l, e.k, e.v)),
            Some(r) => {
                let (r, k, v) = self.split_last(r)?;
                let t = self.join(e.l, e.k, e.v, r)?;
                Ok((Some(t), k, v))
            }
        }
    }

    /// `(keys < key, value at key, keys > key)`.
    #[allow(clippy::type_complexity)]
    pub fn split<Q>(
        &self,
        t: Sub<'a, K, V, A>,
        key: &Q,
    ) -> Result<(Sub<'a, K, V, A>, Option<V>, Sub<'a, K, V, A>)>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let Some(t) = t else {
            return Ok((None, None, None));
        };
        let ord = key.cmp(t.node().k.borrow());
        let e = self.expose(t);
        match ord {
            Ordering::Less => {
                let (l, found, r) = self.split(e.l, key)?;
                let r = self.join(r, e.k, e.v, e.r)?;
                Ok((l, found, Some(r)))
            }
            Ordering::Greater => {
                let (l, found, r) = self.split(e.r, key)?;
                let l = self.join(e.l, e.k, e.v, l)?;
                Ok((Some(l), found, r))
            }
            Ordering::Equal => Ok((e.l, Some(e.v), e.r)),
        }
    }

    /// Inserts or overwrites `k`. The result has a black root.
    pub fn insert(&self, t: Sub<'a, K, V, A>, k: K, v: V) -> Result<Owned<'a, K, V, A>> {
        let (l, _, r) = self.split(t, &k)?;
        let t = self.join(l, k, v, r)?;
        self.paint(t, true)
    }

    /// Removes `key`, returning the new tree and the removed value.
    pub fn remove<Q>(&self, t: Sub<'a, K, V, A>, key: &Q) -> Result<(Sub<'a, K, V, A>, Option<V>)>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let (l, found, r) = self.split(t, key)?;
        let t = self.join2(l, r)?;
        Ok((self.blacken(t)?, found))
    }

    /// Union of two trees; `merge(key, ours, theirs)` resolves shared keys.
    pub fn union<F>(&self, t1: Sub<'a, K, V, A>, t2: Sub<'a, K, V, A>, merge: &mut F) -> Result<Sub<'a, K, V, A>>
    where
        F: FnMut(&K, V, V) -> V,
    {
        let Some(t2) = t2 else { return Ok(t1) };
        if t1.is_none() {
            return Ok(Some(t2));
        }
        let e = self.expose(t2);
        let (l1, found, r1) = self.split(t1, &e.k)?;
        let v = match found {
            Some(ours) => merge(&e.k, ours, e.v),
            None => e.v,
        };
        let l = self.union(l1, e.l, merge)?;
        let r = self.union(r1, e.r, merge)?;
        self.join(l, e.k, v, r).map(Some)
    }

    /// Balanced tree from `n` entries of `items`, already in strictly
    /// increasing key order. Nodes on the deepest level are red, all others
    /// black.
    pub fn build<I>(&self, items: &mut I, n: usize) -> Result<Sub<'a, K, V, A>>
    where
        I: Iterator<Item = (K, V)>,
    {
        if n == 0 {
            return Ok(None);
        }
        let red_depth = usize::BITS - 1 - n.leading_zeros();
        self.build_level(items, n, 0, red_depth)
    }

    fn build_level<I>(&self, items: &mut I, n: usize, depth: u32, red_depth: u32) -> Result<Sub<'a, K, V, A>>
    where
        I: Iterator<Item = (K, V)>,
    {
        if n == 0 {
            return Ok(None);
        }
        let left = (n - 1) / 2;
        let l = self.build_level(items, left, depth + 1, red_depth)?;
        let Some((k, v)) = items.next() else {
            return Err(ForestError::invariant("sorted input ended early"));
        };
        let r = self.build_level(items, n - 1 - left, depth + 1, red_depth)?;
        let black = depth == 0 || depth != red_depth;
        self.node(l, k, v, black, r).map(Some)
    }

    pub fn find<Q>(&self, root: Option<u32>, key: &Q) -> Option<u32>
    where
        K: Borrow<Q>,
        Q: Ord + ?Sized,
    {
        let mut curr = root;
        while let Some(i) = curr {
            let node = self.arena.node(i);
            curr = match key.cmp(node.k.borrow()) {
                Ordering::Less => node.l,
                Ordering::Greater => node.r,
                Ordering::Equal => return Some(i),
            };
        }
        None
    }

    /// Leftmost node.
    pub fn first(&self, root: Option<u32>) -> Option<u32> {
        let mut curr = root?;
        while let Some(l) = self.arena.node(curr).l {
            curr = l;
        }
        Some(curr)
    }

    /// Rightmost node.
    pub fn last(&self, root: Option<u32>) -> Option<u32> {
        let mut curr = root?;
        while let Some(r) = self.arena.node(curr).r {
            curr = r;
        }
        Some(curr)
    }

    fn size(&self, idx: Option<u32>) -> usize {
        idx.map_or(0, |i| self.arena.node(i).n as usize)
    }

    /// Node holding the `rank`-th smallest key.
    pub fn select(&self, root: Option<u32>, mut rank: usize) -> Option<u32> {
        let mut curr = root;
        while let Some(i) = curr {
            let node = self.arena.node(i);
            let left = self.size(node.l);
            curr = match rank.cmp(&left) {
                Ordering::Less => node.l,
                Ordering::Equal => return Some(i),
                Ordering::Greater => {
                    rank -= left + 1;
                    node.r
                }
            };
        }
        None
    }

    /// Descends by `compare(node key, node value)`, the ordering of the
    /// node relative to the target.
    pub fn search_by<F>(&self, root: Option<u32>, compare: F) -> SearchResult<u32>
    where
        F: Fn(&K, &V) -> Ordering,
    {
        let mut result = SearchResult::Empty;
        let mut curr = root;
        while let Some(i) = curr {
            let node = self.arena.node(i);
            match compare(&node.k, &node.v) {
                Ordering::Greater => {
                    result = SearchResult::LeftOf(i);
                    curr = node.l;
                }
                Ordering::Equal => return SearchResult::Here(i),
                Ordering::Less => {
                    result = SearchResult::RightOf(i);
                    curr = node.r;
                }
            }
        }
        result
    }
}

/// Counts the keys satisfying `below`, which must hold for a prefix of the
/// key order.
pub fn count_prefix<K, V, T, F>(arena: &RbArena<K, V, T>, root: Option<u32>, below: F) -> usize
where
    F: Fn(&K) -> bool,
{
    let size = |i: Option<u32>| i.map_or(0, |i| arena.node(i).n as usize);
    let mut count = 0;
    let mut curr = root;
    while let Some(i) = curr {
        let node = arena.node(i);
        if below(&node.k) {
            count += size(node.l) + 1;
            curr = node.r;
        } else {
            curr = node.l;
        }
    }
    count
}
