//! Error types for grid construction and partitioning.

use std::fmt;

/// Errors arising from grid construction or spatial queries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpaceError {
    /// Attempted to construct a grid with zero cells.
    EmptyGrid,
    /// A dimension exceeds the supported maximum.
    DimensionTooLarge {
        /// Which dimension.
        name: &'static str,
        /// The requested size.
        value: u32,
        /// The largest accepted size.
        max: u32,
    },
    /// A cell coordinate is outside the grid.
    CellOutOfBounds {
        /// Requested column.
        x: u32,
        /// Requested row.
        y: u32,
        /// Grid width.
        width: u32,
        /// Grid height.
        height: u32,
    },
    /// Zero column stripes were requested.
    InvalidStripeCount {
        /// The requested stripe count.
        requested: usize,
    },
}

impl fmt::Display for SpaceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyGrid => write!(f, "grid must have at least one cell"),
            Self::DimensionTooLarge { name, value, max } => {
                write!(f, "{name} = {value} exceeds maximum {max}")
            }
            Self::CellOutOfBounds {
                x,
                y,
                width,
                height,
            } => write!(f, "cell ({x}, {y}) out of bounds for {width}x{height} grid"),
            Self::InvalidStripeCount { requested } => {
                write!(f, "cannot split grid into {requested} stripes")
            }
        }
    }
}

impl std::error::Error for SpaceError {}
