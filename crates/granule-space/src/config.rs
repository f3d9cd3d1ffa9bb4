//! Grid configuration.

use crate::error::SpaceError;
use crate::grid::check_dimensions;

/// Dimensions of a [`CollisionGrid`](crate::CollisionGrid), in cells.
///
/// One cell covers one simulation unit, so a world `w` units wide needs a
/// grid `w` cells wide. The per-cell capacity is a const parameter of the
/// grid type rather than a runtime setting.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GridConfig {
    /// Number of columns. Default: 64.
    pub width: u32,
    /// Number of rows. Default: 64.
    pub height: u32,
}

impl GridConfig {
    /// Config for a `width` x `height` grid.
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Check the dimensions without allocating.
    pub fn validate(&self) -> Result<(), SpaceError> {
        check_dimensions(self.width, self.height)
    }

    /// Total number of cells.
    pub fn cell_count(&self) -> usize {
        self.width as usize * self.height as usize
    }
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            width: 64,
            height: 64,
        }
    }
}
