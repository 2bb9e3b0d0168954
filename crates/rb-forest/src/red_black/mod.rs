//! Persistent red-black trees: node layout, join-based algorithms, checks.

pub mod print;
pub mod types;
pub mod util;
pub mod validate;

pub use types::RbNode;
pub use util::SearchResult;
