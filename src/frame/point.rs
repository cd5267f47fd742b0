use std::fmt;

/// Signed pixel coordinate, row first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Point2D {
    pub row: i32,
    pub col: i32,
}

impl Point2D {
    #[inline]
    pub const fn new(row: i32, col: i32) -> Self {
        Self { row, col }
    }

    /// Build a point from window coordinates, where x is the column and y the row.
    #[inline]
    pub const fn from_xy(x: i32, y: i32) -> Self {
        Self { row: y, col: x }
    }

    #[inline]
    pub const fn offset(self, drow: i32, dcol: i32) -> Self {
        Self {
            row: self.row + drow,
            col: self.col + dcol,
        }
    }

    /// Component-wise difference `self - other` as (drow, dcol).
    #[inline]
    pub fn delta(self, other: Point2D) -> (f32, f32) {
        (
            (self.row - other.row) as f32,
            (self.col - other.col) as f32,
        )
    }

    /// Euclidean distance to another point.
    #[inline]
    pub fn distance(self, other: Point2D) -> f32 {
        let (dr, dc) = self.delta(other);
        (dr * dr + dc * dc).sqrt()
    }
}

impl fmt::Display for Point2D {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}
