use crate::types::Node;

/// Immutable red-black node stored in the forest arena.
///
/// Once allocated a node is never written again; "changing" it means
/// allocating a replacement.
#[derive(Clone, Debug)]
pub struct RbNode<K, V, T> {
    pub l: Option<u32>,
    pub r: Option<u32>,
    pub k: K,
    pub v: V,
    /// Node color: `true` = black, `false` = red.
    pub b: bool,
    /// Black nodes on any path from this node down to an absent child,
    /// counting this node when it is black.
    pub h: u32,
    /// Number of entries in the subtree.
    pub n: u32,
    /// Cached aggregate of the subtree.
    pub a: T,
}

impl<K, V, T> RbNode<K, V, T> {
    #[inline]
    pub fn is_black(&self) -> bool {
        self.b
    }

    #[inline]
    pub fn is_red(&self) -> bool {
        !self.b
    }

    /// Black-height in the textbook sense: the node itself is not counted.
    #[inline]
    pub fn black_height(&self) -> u32 {
        self.h - u32::from(self.b)
    }
}

impl<K, V, T> Node for RbNode<K, V, T> {
    #[inline]
    fn l(&self) -> Option<u32> {
        self.l
    }

    #[inline]
    fn r(&self) -> Option<u32> {
        self.r
    }
}
