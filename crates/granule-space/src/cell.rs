//! Fixed-capacity grid bucket.

/// Occupants of one grid cell, at most `N` object ids.
///
/// Storage is inline, so clearing a cell is a counter reset and a full grid
/// can be rebuilt every step without touching the allocator. Inserting into
/// a full cell is rejected; the caller decides whether that is worth
/// reporting (see [`CollisionGrid::overflow_count`]).
///
/// [`CollisionGrid::overflow_count`]: crate::CollisionGrid::overflow_count
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct CollisionCell<const N: usize = 4> {
    count: usize,
    objects: [u32; N],
}

impl<const N: usize> CollisionCell<N> {
    /// Maximum number of occupants.
    pub const CAPACITY: usize = N;

    /// An empty cell.
    pub const fn new() -> Self {
        Self {
            count: 0,
            objects: [0; N],
        }
    }

    /// Insert `id`. Returns `false`, leaving the cell untouched, if the
    /// cell is already full.
    #[inline]
    pub fn add(&mut self, id: u32) -> bool {
        if self.count < N {
            self.objects[self.count] = id;
            self.count += 1;
            true
        } else {
            false
        }
    }

    /// Remove one occurrence of `id` by swapping the last occupant into its
    /// place. Returns `false` if `id` was not present.
    #[inline]
    pub fn remove(&mut self, id: u32) -> bool {
        match self.as_slice().iter().position(|&o| o == id) {
            Some(i) => {
                self.count -= 1;
                self.objects[i] = self.objects[self.count];
                true
            }
            None => false,
        }
    }

    /// Drop every occupant.
    #[inline]
    pub fn clear(&mut self) {
        self.count = 0;
    }

    /// Number of occupants.
    #[inline]
    pub fn len(&self) -> usize {
        self.count
    }

    /// Whether the cell has no occupants.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Whether another insert would be rejected.
    #[inline]
    pub fn is_full(&self) -> bool {
        self.count == N
    }

    /// Whether `id` is an occupant.
    pub fn contains(&self, id: u32) -> bool {
        self.as_slice().contains(&id)
    }

    /// Occupant ids in insertion order, modulo swap-removals.
    #[inline]
    pub fn as_slice(&self) -> &[u32] {
        &self.objects[..self.count]
    }

    /// Iterate occupant ids.
    pub fn iter(&self) -> std::iter::Copied<std::slice::Iter<'_, u32>> {
        self.as_slice().iter().copied()
    }
}

impl<const N: usize> Default for CollisionCell<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> std::fmt::Debug for CollisionCell<N> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.as_slice()).finish()
    }
}

impl<'a, const N: usize> IntoIterator for &'a CollisionCell<N> {
    type Item = u32;
    type IntoIter = std::iter::Copied<std::slice::Iter<'a, u32>>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fifth_insert_is_dropped() {
        let mut cell: CollisionCell = CollisionCell::new();
        for id in 1..=4 {
            assert!(cell.add(id));
        }
        assert!(cell.is_full());
        assert!(!cell.add(5));
        assert_eq!(cell.len(), 4);
        assert_eq!(cell.as_slice(), &[1, 2, 3, 4]);
    }

    #[test]
    fn remove_swaps_last_into_hole() {
        let mut cell: CollisionCell = CollisionCell::new();
        for id in [10, 20, 30] {
            cell.add(id);
        }
        assert!(cell.remove(10));
        assert_eq!(cell.as_slice(), &[30, 20]);
        assert!(cell.remove(20));
        assert_eq!(cell.as_slice(), &[30]);
    }

    #[test]
    fn remove_absent_is_noop() {
        let mut cell: CollisionCell = CollisionCell::new();
        cell.add(1);
        cell.add(2);
        assert!(!cell.remove(99));
        assert_eq!(cell.as_slice(), &[1, 2]);
    }

    #[test]
    fn remove_only_first_duplicate() {
        let mut cell: CollisionCell = CollisionCell::new();
        cell.add(7);
        cell.add(7);
        assert!(cell.remove(7));
        assert_eq!(cell.as_slice(), &[7]);
    }

    #[test]
    fn clear_resets_count() {
        let mut cell: CollisionCell<2> = CollisionCell::new();
        cell.add(1);
        cell.add(2);
        cell.clear();
        assert!(cell.is_empty());
        assert!(cell.add(3));
        assert_eq!(cell.iter().collect::<Vec<_>>(), vec![3]);
    }

    #[test]
    fn custom_capacity() {
        let mut cell: CollisionCell<8> = CollisionCell::new();
        for id in 0..8 {
            assert!(cell.add(id));
        }
        assert!(!cell.add(8));
        assert_eq!(CollisionCell::<8>::CAPACITY, 8);
    }
}
