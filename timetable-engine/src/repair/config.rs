//! Repair configuration.

/// Bounds on the repair search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepairConfig {
    /// Maximum detect/repair passes before giving up.
    pub max_iterations: usize,

    /// Maximum number of shift amounts tried per candidate train and move.
    /// Smaller shifts are tried first.
    pub max_shift_candidates: usize,
}

impl RepairConfig {
    /// Create a new configuration with the given parameters.
    pub fn new(max_iterations: usize, max_shift_candidates: usize) -> Self {
        Self {
            max_iterations,
            max_shift_candidates,
        }
    }
}

impl Default for RepairConfig {
    fn default() -> Self {
        Self {
            max_iterations: 16,
            max_shift_candidates: 64,
        }
    }
}
