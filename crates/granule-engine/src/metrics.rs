//! Per-step metrics for [`ParticleWorld`](crate::ParticleWorld).

/// Counts and timings collected during a single step.
///
/// All durations are in microseconds.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StepMetrics {
    /// Wall-clock time for the whole step.
    pub total_us: u64,
    /// Time spent clearing and repopulating the grid.
    pub grid_rebuild_us: u64,
    /// Time spent in the parallel update pass.
    pub update_us: u64,
    /// Live objects at the start of the step.
    pub object_count: usize,
    /// Grid inserts that landed in a cell.
    pub grid_inserted: usize,
    /// Grid inserts dropped because the cell was full.
    pub grid_dropped: usize,
    /// Objects not inserted because they were inside the border margin or
    /// outside the world.
    pub grid_skipped: usize,
}

/// Outcome of one grid rebuild.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GridStats {
    /// Inserts that landed in a cell.
    pub inserted: usize,
    /// Inserts dropped because the cell was full.
    pub dropped: usize,
    /// Objects left out of the grid by the border margin.
    pub skipped: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_metrics_are_zero() {
        let m = StepMetrics::default();
        assert_eq!(m.total_us, 0);
        assert_eq!(m.object_count, 0);
        assert_eq!(m.grid_dropped, 0);
        assert_eq!(GridStats::default().inserted, 0);
    }
}
