//! Forest configuration.

/// When zero-count nodes go back to the free list.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Reclamation {
    /// Freed during the `release` call that dropped the last reference.
    #[default]
    Immediate,
    /// Parked on a retired queue and freed in batches of at least `batch`
    /// nodes, or when [`Forest::collect`](crate::Forest::collect) runs.
    Deferred { batch: usize },
}

/// Options fixed at forest creation.
#[derive(Clone, Debug)]
pub struct ForestConfig {
    /// Node slots reserved up front.
    pub initial_capacity: u32,
    /// Hard limit on addressable slots.
    pub max_nodes: u32,
    pub reclamation: Reclamation,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            initial_capacity: 0,
            max_nodes: u32::MAX - 1,
            reclamation: Reclamation::Immediate,
        }
    }
}

impl ForestConfig {
    pub fn with_initial_capacity(mut self, capacity: u32) -> Self {
        self.initial_capacity = capacity;
        self
    }

    pub fn with_max_nodes(mut self, max_nodes: u32) -> Self {
        self.max_nodes = max_nodes.min(u32::MAX - 1);
        self
    }

    pub fn with_reclamation(mut self, reclamation: Reclamation) -> Self {
        self.reclamation = reclamation;
        self
    }
}
