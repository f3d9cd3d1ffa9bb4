//! Objects that occupy a point in grid space.

/// Anything with a 2D position measured in grid cells.
///
/// The grid's cell size is one unit, so an object at `[3.7, 1.2]` lives in
/// cell `(3, 1)`.
pub trait Positioned {
    /// Current position as `[x, y]`.
    fn position(&self) -> [f32; 2];

    /// The cell containing this object, or `None` for negative or
    /// non-finite coordinates.
    fn cell(&self) -> Option<(u32, u32)> {
        let [x, y] = self.position();
        if x.is_finite() && y.is_finite() && x >= 0.0 && y >= 0.0 {
            Some((x as u32, y as u32))
        } else {
            None
        }
    }
}

impl Positioned for [f32; 2] {
    fn position(&self) -> [f32; 2] {
        *self
    }
}
