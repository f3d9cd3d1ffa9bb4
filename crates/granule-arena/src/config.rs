//! Arena configuration parameters.

/// Configuration for an [`Arena`](crate::Arena).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ArenaConfig {
    /// Number of objects to reserve room for up front.
    ///
    /// Default: 0. The slot tables grow on demand past this; the value
    /// only avoids reallocation during the first frames of a simulation
    /// whose population size is known.
    pub initial_capacity: usize,
}

impl ArenaConfig {
    /// Create a config reserving room for `initial_capacity` objects.
    pub fn new(initial_capacity: usize) -> Self {
        Self { initial_capacity }
    }
}
