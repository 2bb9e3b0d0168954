//! Index-addressed node store shared by every tree of a forest.
//!
//! Storage is a table of lazily created segments; segment `s` holds
//! `64 << s` slots, so growing never moves a published node and slot
//! indices stay stable for the lifetime of the arena. Creating a segment is
//! the only globally synchronized event (a `OnceLock` initialization).
//!
//! Free slots wait on a lock-free `SegQueue`; never-used slots are handed
//! out by a bump counter.
//!
//! Every live slot carries a refcount: one per handle root and one per
//! parent link. A slot whose count drops to zero is reclaimed through an
//! explicit worklist, which releases its children in turn without
//! recursion. Under [`Reclamation::Deferred`] zero-count slots are parked
//! on a second queue and drained in batches.

use std::fmt;
use std::mem;
use std::sync::atomic::{fence, AtomicU32, AtomicUsize, Ordering};
use std::sync::OnceLock;

use crossbeam_queue::SegQueue;
use parking_lot::{MappedRwLockReadGuard, RwLock, RwLockReadGuard};

use crate::config::{ForestConfig, Reclamation};
use crate::error::{ForestError, Result};
use crate::types::Node;

const FIRST_SEGMENT_BITS: u32 = 6;
const FIRST_SEGMENT: u64 = 1 << FIRST_SEGMENT_BITS;
const SEGMENTS: usize = (u32::BITS - FIRST_SEGMENT_BITS + 1) as usize;

struct Slot<N> {
    refs: AtomicU32,
    node: RwLock<Option<N>>,
}

impl<N> Slot<N> {
    fn vacant() -> Self {
        Self {
            refs: AtomicU32::new(0),
            node: RwLock::new(None),
        }
    }
}

#[inline]
fn locate(idx: u32) -> (usize, usize) {
    let j = idx as u64 + FIRST_SEGMENT;
    let seg = (u64::BITS - 1 - j.leading_zeros() - FIRST_SEGMENT_BITS) as usize;
    let offset = (j - (FIRST_SEGMENT << seg)) as usize;
    (seg, offset)
}

/// Slot usage snapshot.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ArenaStats {
    /// Slots holding a node.
    pub live: usize,
    /// Slots on the free list.
    pub free: usize,
    /// Zero-count slots waiting for a deferred collection.
    pub retired: usize,
    /// Slots ever handed out by the bump counter.
    pub high_water: u32,
}

pub struct Arena<N> {
    segments: Box<[OnceLock<Box<[Slot<N>]>>]>,
    free: SegQueue<u32>,
    bump: AtomicU32,
    live: AtomicUsize,
    max: u32,
    reclamation: Reclamation,
    retired: SegQueue<u32>,
}

impl<N: Node> fmt::Debug for Arena<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Arena")
            .field("max", &self.max)
            .field("reclamation", &self.reclamation)
            .field("stats", &self.stats())
            .finish()
    }
}

impl<N: Node> Arena<N> {
    pub(crate) fn new(config: &ForestConfig) -> Self {
        let arena = Self {
            segments: (0..SEGMENTS).map(|_| OnceLock::new()).collect(),
            free: SegQueue::new(),
            bump: AtomicU32::new(0),
            live: AtomicUsize::new(0),
            max: config.max_nodes.min(u32::MAX - 1),
            reclamation: config.reclamation,
            retired: SegQueue::new(),
        };
        let reserve = config.initial_capacity.min(arena.max);
        if reserve > 0 {
            let (last, _) = locate(reserve - 1);
            for seg in 0..=last {
                arena.segment(seg);
            }
        }
        arena
    }

    fn segment(&self, seg: usize) -> &[Slot<N>] {
        self.segments[seg].get_or_init(|| {
            let size = (FIRST_SEGMENT << seg) as usize;
            tracing::debug!(segment = seg, slots = size, "growing arena");
            (0..size).map(|_| Slot::vacant()).collect()
        })
    }

    fn slot(&self, idx: u32) -> Option<&Slot<N>> {
        let (seg, offset) = locate(idx);
        self.segments.get(seg)?.get()?.get(offset)
    }

    fn live_slot(&self, idx: u32) -> &Slot<N> {
        match self.slot(idx) {
            Some(slot) => slot,
            None => panic!("node index {idx} was never allocated"),
        }
    }

    /// Stores `node` in a fresh slot with a refcount of one.
    ///
    /// `node`'s child links are owned references moving into the new slot.
    /// When allocation fails they are released before the error returns.
    pub(crate) fn allocate(&self, node: N) -> Result<u32> {
        let idx = match self.free.pop() {
            Some(idx) => idx,
            None => match self.bump_index() {
                Ok(idx) => idx,
                Err(err) => {
                    for child in [node.l(), node.r()].into_iter().flatten() {
                        self.release(child);
                    }
                    return Err(err);
                }
            },
        };
        let (seg, offset) = locate(idx);
        let slot = &self.segment(seg)[offset];
        *slot.node.write() = Some(node);
        slot.refs.store(1, Ordering::Release);
        self.live.fetch_add(1, Ordering::Relaxed);
        Ok(idx)
    }

    fn bump_index(&self) -> Result<u32> {
        let max = self.max;
        self.bump
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| {
                (n < max).then_some(n + 1)
            })
            .map_err(|_| {
                tracing::warn!(max, "arena capacity exceeded");
                ForestError::CapacityExceeded { max }
            })
    }

    /// Read-only view of a live node, `None` for free or unknown slots.
    pub fn get(&self, idx: u32) -> Option<MappedRwLockReadGuard<'_, N>> {
        let guard = self.slot(idx)?.node.read();
        RwLockReadGuard::try_map(guard, Option::as_ref).ok()
    }

    /// Read-only view of a node the caller holds a reference to.
    ///
    /// # Panics
    ///
    /// Panics if the slot is free, which means a refcount was lost.
    pub(crate) fn node(&self, idx: u32) -> MappedRwLockReadGuard<'_, N> {
        match self.get(idx) {
            Some(node) => node,
            None => panic!("node {idx} is not live"),
        }
    }

    pub fn contains(&self, idx: u32) -> bool {
        self.get(idx).is_some()
    }

    pub fn refs(&self, idx: u32) -> u32 {
        self.slot(idx)
            .map_or(0, |slot| slot.refs.load(Ordering::Acquire))
    }

    /// Adds one reference to a live node.
    ///
    /// # Panics
    ///
    /// Panics if `idx` lies outside every allocated segment.
    pub(crate) fn retain(&self, idx: u32) {
        self.live_slot(idx).refs.fetch_add(1, Ordering::Relaxed);
    }

    /// Drops one reference; at zero the slot and everything it alone kept
    /// alive go back to the free list, now or at the next collection.
    ///
    /// # Panics
    ///
    /// Panics if `idx` lies outside every allocated segment.
    pub(crate) fn release(&self, idx: u32) {
        if !self.decrement(idx) {
            return;
        }
        match self.reclamation {
            Reclamation::Immediate => {
                self.reclaim(vec![idx]);
            }
            Reclamation::Deferred { batch } => {
                self.retired.push(idx);
                if self.retired.len() >= batch.max(1) {
                    self.collect();
                }
            }
        }
    }

    /// Reclaims every retired slot. Returns how many slots were freed.
    pub(crate) fn collect(&self) -> usize {
        let work: Vec<u32> = std::iter::from_fn(|| self.retired.pop()).collect();
        if work.is_empty() {
            return 0;
        }
        self.reclaim(work)
    }

    fn decrement(&self, idx: u32) -> bool {
        let prev = self.live_slot(idx).refs.fetch_sub(1, Ordering::Release);
        debug_assert!(prev > 0, "refcount underflow on node {idx}");
        if prev == 1 {
            fence(Ordering::Acquire);
            true
        } else {
            false
        }
    }

    fn reclaim(&self, mut work: Vec<u32>) -> usize {
        let mut freed = 0;
        while let Some(idx) = work.pop() {
            let node = self.live_slot(idx).node.write().take();
            if let Some(node) = node {
                for child in [node.l(), node.r()].into_iter().flatten() {
                    if self.decrement(child) {
                        work.push(child);
                    }
                }
                self.live.fetch_sub(1, Ordering::Relaxed);
            }
            self.free.push(idx);
            freed += 1;
        }
        tracing::trace!(freed, "reclaimed arena slots");
        freed
    }

    pub fn stats(&self) -> ArenaStats {
        ArenaStats {
            live: self.live.load(Ordering::Relaxed),
            free: self.free.len(),
            retired: self.retired.len(),
            high_water: self.bump.load(Ordering::Relaxed),
        }
    }

    pub fn max_nodes(&self) -> u32 {
        self.max
    }
}

/// Owned reference to a live node: releases its count when dropped.
///
/// Every intermediate subtree produced while joining or splitting travels
/// as a `Link`, so an error part-way through an operation (`?`) releases
/// whatever was already allocated.
pub struct Link<'a, N: Node> {
    arena: &'a Arena<N>,
    idx: u32,
}

impl<'a, N: Node> Link<'a, N> {
    /// Takes an additional reference to `idx`.
    pub(crate) fn share(arena: &'a Arena<N>, idx: u32) -> Self {
        arena.retain(idx);
        Self { arena, idx }
    }

    pub(crate) fn allocate(arena: &'a Arena<N>, node: N) -> Result<Self> {
        arena.allocate(node).map(|idx| Self { arena, idx })
    }

    #[inline]
    pub fn index(&self) -> u32 {
        self.idx
    }

    #[inline]
    pub fn node(&self) -> MappedRwLockReadGuard<'a, N> {
        self.arena.node(self.idx)
    }

    /// Gives up ownership without releasing; the count moves to the caller.
    pub(crate) fn into_raw(self) -> u32 {
        let idx = self.idx;
        mem::forget(self);
        idx
    }
}

impl<N: Node> Clone for Link<'_, N> {
    fn clone(&self) -> Self {
        Self::share(self.arena, self.idx)
    }
}

impl<N: Node> Drop for Link<'_, N> {
    fn drop(&mut self) {
        self.arena.release(self.idx);
    }
}

impl<N: Node> fmt::Debug for Link<'_, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Link").field(&self.idx).finish()
    }
}
