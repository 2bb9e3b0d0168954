//! Error type shared by every forest operation.

/// Errors surfaced by arena allocation and tree operations.
///
/// A failed operation never mutates nodes reachable from an existing
/// [`Tree`](crate::Tree): everything it allocated is released before the
/// error is returned.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ForestError {
    #[error("key not found")]
    KeyNotFound,
    #[error("invariant violation: {0}")]
    InvariantViolation(String),
    #[error("arena capacity exceeded ({max} nodes)")]
    CapacityExceeded { max: u32 },
    #[error("trees belong to different forests")]
    ForeignTree,
}

impl ForestError {
    pub(crate) fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }
}

pub type Result<T, E = ForestError> = std::result::Result<T, E>;
