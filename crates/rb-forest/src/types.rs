//! Node link trait and the augmentation protocol.
//!
//! Nodes never point at each other by address. Every link is an
//! `Option<u32>` index into the forest's shared [`Arena`](crate::arena::Arena),
//! and a published node is immutable, so links never need a parent pointer.

use std::fmt;
use std::marker::PhantomData;

/// Child links of an arena-resident node (`l` / `r`).
///
/// The arena uses this to release children when a node's refcount reaches
/// zero.
pub trait Node {
    fn l(&self) -> Option<u32>;
    fn r(&self) -> Option<u32>;
}

/// Per-subtree aggregate maintained on every node.
///
/// `combine` must be associative; it need not be commutative, it is always
/// called with the left operand preceding the right one in key order. Both
/// functions must be pure: they run on whichever thread allocates the node.
pub trait Augment<K, V>: Send + Sync {
    type Value: Clone + Send + Sync;

    fn summarize(&self, key: &K, value: &V) -> Self::Value;

    fn combine(&self, left: &Self::Value, right: &Self::Value) -> Self::Value;

    /// `combine(left, summarize(key, value), right)` with absent sides skipped.
    fn aggregate(
        &self,
        left: Option<&Self::Value>,
        key: &K,
        value: &V,
        right: Option<&Self::Value>,
    ) -> Self::Value {
        let mid = self.summarize(key, value);
        let acc = match left {
            Some(left) => self.combine(left, &mid),
            None => mid,
        };
        match right {
            Some(right) => self.combine(&acc, right),
            None => acc,
        }
    }
}

/// Augmentation for plain, unaugmented trees.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoAugment;

impl<K, V> Augment<K, V> for NoAugment {
    type Value = ();

    #[inline]
    fn summarize(&self, _key: &K, _value: &V) {}

    #[inline]
    fn combine(&self, _left: &(), _right: &()) {}

    #[inline]
    fn aggregate(&self, _left: Option<&()>, _key: &K, _value: &V, _right: Option<&()>) {}
}

/// Augmentation built from a user-supplied `(summarize, combine)` pair.
pub struct FnAugment<T, S, C> {
    summarize: S,
    combine: C,
    _value: PhantomData<fn() -> T>,
}

impl<T, S, C> FnAugment<T, S, C> {
    pub fn new(summarize: S, combine: C) -> Self {
        Self {
            summarize,
            combine,
            _value: PhantomData,
        }
    }
}

impl<T, S, C> fmt::Debug for FnAugment<T, S, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnAugment").finish_non_exhaustive()
    }
}

impl<K, V, T, S, C> Augment<K, V> for FnAugment<T, S, C>
where
    T: Clone + Send + Sync,
    S: Fn(&K, &V) -> T + Send + Sync,
    C: Fn(&T, &T) -> T + Send + Sync,
{
    type Value = T;

    fn summarize(&self, key: &K, value: &V) -> T {
        (self.summarize)(key, value)
    }

    fn combine(&self, left: &T, right: &T) -> T {
        (self.combine)(left, right)
    }
}
