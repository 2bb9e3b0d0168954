use std::cmp::Ordering;

use crate::error::{ForestError, Result};
use crate::types::Augment;

use super::util::RbArena;

struct Summary {
    h: u32,
    n: u32,
}

/// Checks every red-black, ordering and cache invariant of the tree at
/// `root`, plus liveness and refcounts of every reachable node.
///
/// Aggregates are recomputed bottom-up with `aug` and compared against the
/// cached ones.
pub fn assert_red_black_tree<K, V, A>(
    arena: &RbArena<K, V, A::Value>,
    aug: &A,
    root: Option<u32>,
) -> Result<()>
where
    K: Ord,
    A: Augment<K, V>,
    A::Value: PartialEq,
{
    let Some(root) = root else {
        return Ok(());
    };
    let root_is_red = match arena.get(root) {
        Some(node) => node.is_red(),
        None => return Err(ForestError::invariant(format!("root {root} is not live"))),
    };
    if root_is_red {
        return Err(ForestError::invariant("root is not black"));
    }
    check(arena, aug, root, None, None).map(|_| ())
}

fn check<K, V, A>(
    arena: &RbArena<K, V, A::Value>,
    aug: &A,
    idx: u32,
    lo: Option<&K>,
    hi: Option<&K>,
) -> Result<Summary>
where
    K: Ord,
    A: Augment<K, V>,
    A::Value: PartialEq,
{
    let Some(node) = arena.get(idx) else {
        return Err(ForestError::invariant(format!("node {idx} is not live")));
    };
    if arena.refs(idx) == 0 {
        return Err(ForestError::invariant(format!("node {idx} has no references")));
    }
    if lo.is_some_and(|lo| lo.cmp(&node.k) != Ordering::Less)
        || hi.is_some_and(|hi| hi.cmp(&node.k) != Ordering::Greater)
    {
        return Err(ForestError::invariant(format!("node {idx} is out of key order")));
    }

    let expected = {
        let [l, r] = [node.l, node.r].map(|child| child.and_then(|c| arena.get(c)));
        if node.is_red() && [&l, &r].into_iter().flatten().any(|c| c.is_red()) {
            return Err(ForestError::invariant(format!("red node {idx} has a red child")));
        }
        aug.aggregate(
            l.as_ref().map(|c| &c.a),
            &node.k,
            &node.v,
            r.as_ref().map(|c| &c.a),
        )
    };

    let left = match node.l {
        Some(l) => Some(check(arena, aug, l, lo, Some(&node.k))?),
        None => None,
    };
    let right = match node.r {
        Some(r) => Some(check(arena, aug, r, Some(&node.k), hi)?),
        None => None,
    };
    let lh = left.as_ref().map_or(0, |s| s.h);
    let rh = right.as_ref().map_or(0, |s| s.h);
    if lh != rh {
        return Err(ForestError::invariant(format!(
            "black height mismatch under node {idx}: {lh} != {rh}"
        )));
    }
    if node.h != lh + u32::from(node.b) {
        return Err(ForestError::invariant(format!("node {idx} caches a stale black height")));
    }
    let n = 1 + left.as_ref().map_or(0, |s| s.n) + right.as_ref().map_or(0, |s| s.n);
    if node.n != n {
        return Err(ForestError::invariant(format!(
            "node {idx} caches size {} but holds {n}",
            node.n
        )));
    }
    if expected != node.a {
        return Err(ForestError::invariant(format!("node {idx} caches a stale aggregate")));
    }
    Ok(Summary { h: node.h, n })
}
