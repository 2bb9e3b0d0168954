//! Persistent, augmented red-black trees sharing one concurrent node arena.
//!
//! A [`Forest`] owns the arena; [`Tree`] handles are immutable snapshots of
//! individual trees in it. Every update (insert, remove, split, join,
//! union) is copy-on-write: it allocates O(log n) fresh nodes along the
//! touched path, reuses every untouched subtree, and returns a new handle.
//! Older handles are never affected, so any number of threads may read from
//! and derive versions off the same handle at once.
//!
//! Balancing is join-based: `join` and `split` are the only primitives that
//! restructure a tree, everything else is composed from them.
//!
//! Instead of pointers, children are `Option<u32>` indices into the arena.
//! Nodes are refcounted (one count per handle root and one per parent
//! link) and return to the arena's lock-free free list when their count
//! reaches zero.
//!
//! # Module layout
//!
//! | Module | Contents |
//! |--------|----------|
//! [`types`] | [`Node`] link trait, [`Augment`] protocol, [`NoAugment`], [`FnAugment`] |
//! [`arena`] | Segmented node store, free list, refcounts, [`Link`](arena::Link) |
//! [`red_black`] | [`RbNode`], join / split core, validator, printer |
//! [`iter`] | In-order [`Iter`] / [`IntoIter`] with explicit stacks |
//! [`cursor`] | Read-only [`Cursor`] with a root-to-node path |
//! [`tree`] | [`Tree`] handle |
//! [`forest`] | [`Forest`] and its handle registry |
//! [`config`] | [`ForestConfig`], [`Reclamation`] |
//! [`error`] | [`ForestError`] |
//!
//! # Example
//!
//! ```
//! use rb_forest::Forest;
//!
//! let forest = Forest::new();
//! let a = forest.empty().insert(2, "two")?.insert(1, "one")?;
//! let b = a.insert(3, "three")?;
//! assert_eq!(a.len(), 2);
//! assert_eq!(b.iter().map(|(k, _)| k).collect::<Vec<_>>(), [1, 2, 3]);
//! # Ok::<(), rb_forest::ForestError>(())
//! ```

pub mod arena;
pub mod config;
pub mod cursor;
pub mod error;
pub mod forest;
pub mod iter;
pub mod red_black;
pub mod tree;
pub mod types;

pub use arena::ArenaStats;
pub use config::{ForestConfig, Reclamation};
pub use cursor::Cursor;
pub use error::{ForestError, Result};
pub use forest::Forest;
pub use iter::{IntoIter, Iter};
pub use red_black::{RbNode, SearchResult};
pub use tree::Tree;
pub use types::{Augment, FnAugment, NoAugment, Node};
