use std::fmt::Debug;

use super::util::RbArena;

/// Debug printer for red-black trees.
pub fn print<K, V, T>(arena: &RbArena<K, V, T>, node: Option<u32>, tab: &str) -> String
where
    K: Debug,
    V: Debug,
{
    match node {
        None => "∅".to_string(),
        Some(i) => {
            let Some(n) = arena.get(i) else {
                return format!("Node[{i}] <free>");
            };
            let color = if n.is_black() { "black" } else { "red" };
            let left = print(arena, n.l, &format!("{tab}  "));
            let right = print(arena, n.r, &format!("{tab}  "));
            format!(
                "Node[{i}] {color} h={} n={} {{ {:?} = {:?} }}\n{tab}L={left}\n{tab}R={right}",
                n.h, n.n, n.k, n.v
            )
        }
    }
}
