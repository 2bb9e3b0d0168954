//! The forest: one arena and one augmentation shared by many tree handles.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::arena::ArenaStats;
use crate::config::ForestConfig;
use crate::error::{ForestError, Result};
use crate::red_black::util::{Ctx, RbArena};
use crate::tree::Tree;
use crate::types::{Augment, NoAugment};

static NEXT_FOREST_ID: AtomicU64 = AtomicU64::new(1);

/// State every handle of a forest points at.
pub(crate) struct Shared<K, V, A: Augment<K, V>> {
    pub(crate) arena: RbArena<K, V, A::Value>,
    pub(crate) aug: A,
    pub(crate) id: u64,
    versions: AtomicU64,
}

impl<K, V, A: Augment<K, V>> Shared<K, V, A> {
    pub(crate) fn next_version(&self) -> u64 {
        self.versions.fetch_add(1, Ordering::Relaxed)
    }

    pub(crate) fn ctx(&self) -> Ctx<'_, K, V, A> {
        Ctx::new(&self.arena, &self.aug)
    }
}

/// A set of persistent red-black trees sharing one node arena.
///
/// Trees are produced as [`Tree`] handles. Handles are independent: any
/// thread may derive new versions from any handle without coordination.
/// The forest itself only keeps an optional registry of handles by version.
pub struct Forest<K, V, A: Augment<K, V> = NoAugment> {
    shared: Arc<Shared<K, V, A>>,
    trees: Mutex<BTreeMap<u64, Tree<K, V, A>>>,
}

impl<K, V> Forest<K, V, NoAugment> {
    pub fn new() -> Self {
        Self::with_config(ForestConfig::default())
    }

    pub fn with_config(config: ForestConfig) -> Self {
        Self::with_augment_and_config(NoAugment, config)
    }
}

impl<K, V> Default for Forest<K, V, NoAugment> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, A: Augment<K, V>> Forest<K, V, A> {
    pub fn with_augment(aug: A) -> Self {
        Self::with_augment_and_config(aug, ForestConfig::default())
    }

    pub fn with_augment_and_config(aug: A, config: ForestConfig) -> Self {
        let id = NEXT_FOREST_ID.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(
            forest = id,
            initial_capacity = config.initial_capacity,
            max_nodes = config.max_nodes,
            reclamation = ?config.reclamation,
            "creating forest"
        );
        Self {
            shared: Arc::new(Shared {
                arena: RbArena::new(&config),
                aug,
                id,
                versions: AtomicU64::new(0),
            }),
            trees: Mutex::new(BTreeMap::new()),
        }
    }

    pub fn id(&self) -> u64 {
        self.shared.id
    }

    pub fn augment(&self) -> &A {
        &self.shared.aug
    }

    /// A fresh empty tree.
    pub fn empty(&self) -> Tree<K, V, A> {
        Tree::from_parts(Arc::clone(&self.shared), None)
    }

    /// Whether `tree` was produced by this forest.
    pub fn owns(&self, tree: &Tree<K, V, A>) -> bool {
        Arc::ptr_eq(&self.shared, tree.shared())
    }

    /// Slot usage of the shared arena.
    pub fn stats(&self) -> ArenaStats {
        self.shared.arena.stats()
    }

    /// Frees every zero-count node parked by deferred reclamation.
    pub fn collect(&self) -> usize {
        self.shared.arena.collect()
    }

    /// Keeps a clone of `tree` under its version tag.
    pub fn register(&self, tree: &Tree<K, V, A>) -> Result<u64> {
        if !self.owns(tree) {
            return Err(ForestError::ForeignTree);
        }
        let version = tree.version();
        tracing::trace!(forest = self.shared.id, version, "registering tree");
        self.trees.lock().insert(version, tree.clone());
        Ok(version)
    }

    pub fn get(&self, version: u64) -> Option<Tree<K, V, A>> {
        self.trees.lock().get(&version).cloned()
    }

    pub fn unregister(&self, version: u64) -> Option<Tree<K, V, A>> {
        self.trees.lock().remove(&version)
    }

    /// Registered version tags in ascending order.
    pub fn versions(&self) -> Vec<u64> {
        self.trees.lock().keys().copied().collect()
    }

    /// Number of registered trees.
    pub fn len(&self) -> usize {
        self.trees.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.trees.lock().is_empty()
    }
}

impl<K, V, A> Forest<K, V, A>
where
    K: Ord + Clone,
    V: Clone,
    A: Augment<K, V>,
{
    /// Builds a balanced tree in O(n) from entries in strictly increasing
    /// key order.
    ///
    /// Out-of-order or duplicate keys yield
    /// [`ForestError::InvariantViolation`].
    pub fn from_sorted_iter<I>(&self, iter: I) -> Result<Tree<K, V, A>>
    where
        I: IntoIterator<Item = (K, V)>,
    {
        let entries: Vec<(K, V)> = iter.into_iter().collect();
        if let Some(at) = entries.windows(2).position(|w| w[0].0 >= w[1].0) {
            return Err(ForestError::invariant(format!(
                "keys are not strictly increasing at position {}",
                at + 1
            )));
        }
        let ctx = self.shared.ctx();
        let n = entries.len();
        let root = ctx.build(&mut entries.into_iter(), n)?;
        Ok(Tree::from_parts(
            Arc::clone(&self.shared),
            root.map(|root| root.into_raw()),
        ))
    }

    /// Builds a tree from entries in any order; the last value wins for
    /// repeated keys.
    pub fn from_entries<I>(&self, iter: I) -> Result<Tree<K, V, A>>
    where
        I: IntoIterator<Item = (K, V)>,
    {
        let mut entries: Vec<(K, V)> = iter.into_iter().collect();
        entries.reverse();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries.dedup_by(|next, kept| next.0 == kept.0);
        self.from_sorted_iter(entries)
    }
}

impl<K, V, A: Augment<K, V>> fmt::Debug for Forest<K, V, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Forest")
            .field("id", &self.shared.id)
            .field("trees", &self.versions())
            .field("stats", &self.stats())
            .finish()
    }
}
