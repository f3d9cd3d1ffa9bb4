//! Uniform spatial hash grid over a bounded 2D domain.

use std::fmt;
use std::ops::Range;
use std::sync::atomic::{AtomicU64, Ordering};

use smallvec::SmallVec;

use crate::cell::CollisionCell;
use crate::config::GridConfig;
use crate::error::SpaceError;

/// Occupants of a 3x3 block of cells.
pub type Neighbours = SmallVec<[u32; 36]>;

/// A `width` x `height` array of [`CollisionCell`]s.
///
/// Cell `(x, y)` lives at flat index `x * height + y`, so each column is
/// contiguous in memory and so is any range of columns. That layout is what
/// lets [`column_stripes_mut`](Self::column_stripes_mut) hand disjoint
/// stripes to different threads.
///
/// The grid is rebuilt from empty every step: [`clear`](Self::clear) resets
/// occupant counts in place and never reallocates. Inserts into a full
/// cell are dropped and tallied in [`overflow_count`](Self::overflow_count)
/// until the next clear.
///
/// # Examples
///
/// ```
/// use granule_space::CollisionGrid;
///
/// let mut grid: CollisionGrid = CollisionGrid::new(8, 8).unwrap();
/// for id in 0..5 {
///     grid.add_atom(3, 3, id);
/// }
/// assert_eq!(grid.cell(3, 3).unwrap().len(), 4);
/// assert_eq!(grid.overflow_count(), 1);
///
/// grid.clear();
/// assert_eq!(grid.occupancy(), 0);
/// ```
pub struct CollisionGrid<const N: usize = 4> {
    width: u32,
    height: u32,
    cells: Vec<CollisionCell<N>>,
    overflow: AtomicU64,
}

impl<const N: usize> CollisionGrid<N> {
    /// Largest accepted width or height.
    pub const MAX_DIM: u32 = u16::MAX as u32;

    /// Create an empty `width` x `height` grid.
    ///
    /// Returns `Err(SpaceError::EmptyGrid)` if either dimension is 0, or
    /// `Err(SpaceError::DimensionTooLarge)` if either exceeds
    /// [`MAX_DIM`](Self::MAX_DIM).
    pub fn new(width: u32, height: u32) -> Result<Self, SpaceError> {
        check_dimensions(width, height)?;
        let cell_count = width as usize * height as usize;
        Ok(Self {
            width,
            height,
            cells: vec![CollisionCell::new(); cell_count],
            overflow: AtomicU64::new(0),
        })
    }

    /// Create a grid from a config.
    pub fn from_config(config: &GridConfig) -> Result<Self, SpaceError> {
        Self::new(config.width, config.height)
    }

    /// Number of columns.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Number of rows.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Total number of cells.
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Flat index of `(x, y)`, or `None` outside the grid.
    #[inline]
    pub fn index_of(&self, x: u32, y: u32) -> Option<usize> {
        if x < self.width && y < self.height {
            Some(x as usize * self.height as usize + y as usize)
        } else {
            None
        }
    }

    /// The cell at `(x, y)`.
    pub fn cell(&self, x: u32, y: u32) -> Result<&CollisionCell<N>, SpaceError> {
        match self.index_of(x, y) {
            Some(i) => Ok(&self.cells[i]),
            None => Err(self.out_of_bounds(x, y)),
        }
    }

    /// The cell at `(x, y)`, mutably.
    pub fn cell_mut(&mut self, x: u32, y: u32) -> Result<&mut CollisionCell<N>, SpaceError> {
        match self.index_of(x, y) {
            Some(i) => Ok(&mut self.cells[i]),
            None => Err(self.out_of_bounds(x, y)),
        }
    }

    /// The cell at flat index `index`.
    pub fn cell_at(&self, index: usize) -> Option<&CollisionCell<N>> {
        self.cells.get(index)
    }

    /// All cells in flat-index order.
    pub fn cells(&self) -> &[CollisionCell<N>] {
        &self.cells
    }

    /// Record object `id` in cell `(x, y)`.
    ///
    /// Returns `false` if `(x, y)` is outside the grid or the cell is full.
    /// A full cell keeps its current occupants; the dropped insert is
    /// counted in [`overflow_count`](Self::overflow_count).
    #[inline]
    pub fn add_atom(&mut self, x: u32, y: u32, id: u32) -> bool {
        let Some(i) = self.index_of(x, y) else {
            return false;
        };
        let added = self.cells[i].add(id);
        if !added {
            *self.overflow.get_mut() += 1;
        }
        added
    }

    /// Remove one occurrence of `id` from cell `(x, y)`. Returns `false` if
    /// it was not there.
    pub fn remove(&mut self, x: u32, y: u32, id: u32) -> bool {
        match self.index_of(x, y) {
            Some(i) => self.cells[i].remove(id),
            None => false,
        }
    }

    /// Empty every cell and reset the overflow tally. Keeps the allocation.
    pub fn clear(&mut self) {
        for cell in &mut self.cells {
            cell.clear();
        }
        *self.overflow.get_mut() = 0;
    }

    /// Inserts dropped because their cell was full, since the last clear.
    pub fn overflow_count(&self) -> u64 {
        self.overflow.load(Ordering::Relaxed)
    }

    /// Total number of occupants across all cells.
    pub fn occupancy(&self) -> usize {
        self.cells.iter().map(CollisionCell::len).sum()
    }

    /// Occupants of the 3x3 block centred on `(x, y)`, clipped to the grid
    /// edges, in flat-index order. Empty if `(x, y)` is outside the grid.
    pub fn neighbours(&self, x: u32, y: u32) -> Neighbours {
        let mut out = Neighbours::new();
        if self.index_of(x, y).is_none() {
            return out;
        }
        let xs = x.saturating_sub(1)..=(x + 1).min(self.width - 1);
        for nx in xs {
            let ys = y.saturating_sub(1)..=(y + 1).min(self.height - 1);
            for ny in ys {
                let i = nx as usize * self.height as usize + ny as usize;
                out.extend(self.cells[i].iter());
            }
        }
        out
    }

    /// Split the grid into at most `n` stripes of whole, contiguous columns.
    ///
    /// Stripes are disjoint, so each can be filled by a different thread.
    /// Columns are spread as evenly as possible; a grid narrower than `n`
    /// yields one stripe per column.
    pub fn column_stripes_mut(&mut self, n: usize) -> Result<Vec<GridStripe<'_, N>>, SpaceError> {
        if n == 0 {
            return Err(SpaceError::InvalidStripeCount { requested: n });
        }
        let stripes = n.min(self.width as usize);
        let base = self.width as usize / stripes;
        let extra = self.width as usize % stripes;
        let height = self.height;
        let overflow = &self.overflow;

        let mut out = Vec::with_capacity(stripes);
        let mut rest: &mut [CollisionCell<N>] = &mut self.cells;
        let mut x_start = 0u32;
        for s in 0..stripes {
            let columns = base + usize::from(s < extra);
            let (head, tail) = std::mem::take(&mut rest).split_at_mut(columns * height as usize);
            rest = tail;
            let x_end = x_start + columns as u32;
            out.push(GridStripe {
                columns: x_start..x_end,
                height,
                cells: head,
                overflow,
            });
            x_start = x_end;
        }
        Ok(out)
    }

    fn out_of_bounds(&self, x: u32, y: u32) -> SpaceError {
        SpaceError::CellOutOfBounds {
            x,
            y,
            width: self.width,
            height: self.height,
        }
    }
}

pub(crate) fn check_dimensions(width: u32, height: u32) -> Result<(), SpaceError> {
    if width == 0 || height == 0 {
        return Err(SpaceError::EmptyGrid);
    }
    let max = CollisionGrid::<4>::MAX_DIM;
    if width > max {
        return Err(SpaceError::DimensionTooLarge {
            name: "width",
            value: width,
            max,
        });
    }
    if height > max {
        return Err(SpaceError::DimensionTooLarge {
            name: "height",
            value: height,
            max,
        });
    }
    Ok(())
}

impl<const N: usize> Clone for CollisionGrid<N> {
    fn clone(&self) -> Self {
        Self {
            width: self.width,
            height: self.height,
            cells: self.cells.clone(),
            overflow: AtomicU64::new(self.overflow_count()),
        }
    }
}

impl<const N: usize> fmt::Debug for CollisionGrid<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CollisionGrid")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("capacity", &N)
            .field("occupancy", &self.occupancy())
            .field("overflow", &self.overflow_count())
            .finish()
    }
}

// ── GridStripe ──────────────────────────────────────────────────

/// Exclusive view of a contiguous range of grid columns.
///
/// Produced by [`CollisionGrid::column_stripes_mut`]. Inserts outside the
/// stripe's columns are rejected, so stripes filled concurrently never
/// write to the same cell. Dropped inserts still count towards the grid's
/// overflow tally.
pub struct GridStripe<'a, const N: usize = 4> {
    columns: Range<u32>,
    height: u32,
    cells: &'a mut [CollisionCell<N>],
    overflow: &'a AtomicU64,
}

impl<const N: usize> GridStripe<'_, N> {
    /// The columns this stripe owns.
    pub fn columns(&self) -> Range<u32> {
        self.columns.clone()
    }

    /// Whether column `x` belongs to this stripe.
    #[inline]
    pub fn owns_column(&self, x: u32) -> bool {
        self.columns.contains(&x)
    }

    /// Record object `id` in cell `(x, y)`.
    ///
    /// Returns `false` if `x` is not one of this stripe's columns, `y` is
    /// outside the grid, or the cell is full.
    #[inline]
    pub fn add_atom(&mut self, x: u32, y: u32, id: u32) -> bool {
        let Some(i) = self.local_index(x, y) else {
            return false;
        };
        let added = self.cells[i].add(id);
        if !added {
            self.overflow.fetch_add(1, Ordering::Relaxed);
        }
        added
    }

    /// The cell at `(x, y)`, if this stripe owns it.
    pub fn cell(&self, x: u32, y: u32) -> Option<&CollisionCell<N>> {
        self.local_index(x, y).map(|i| &self.cells[i])
    }

    /// Empty every cell in the stripe.
    pub fn clear(&mut self) {
        for cell in self.cells.iter_mut() {
            cell.clear();
        }
    }

    #[inline]
    fn local_index(&self, x: u32, y: u32) -> Option<usize> {
        if self.owns_column(x) && y < self.height {
            Some((x - self.columns.start) as usize * self.height as usize + y as usize)
        } else {
            None
        }
    }
}

impl<const N: usize> fmt::Debug for GridStripe<'_, N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GridStripe")
            .field("columns", &self.columns)
            .field("height", &self.height)
            .finish()
    }
}

const _: fn() = || {
    fn assert<T: Send + Sync>() {}
    assert::<CollisionGrid>();
    assert::<GridStripe<'static>>();
};
