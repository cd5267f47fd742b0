/// Position of a point within the five-point constellation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PointRole {
    /// The tracked target itself
    Center,
    Left,
    Right,
    Top,
    Bottom,
}

impl PointRole {
    /// All roles in storage order.
    pub const ALL: [PointRole; 5] = [
        PointRole::Center,
        PointRole::Left,
        PointRole::Right,
        PointRole::Top,
        PointRole::Bottom,
    ];

    /// The four peripheral roles in storage order.
    pub const PERIPHERAL: [PointRole; 4] = [
        PointRole::Left,
        PointRole::Right,
        PointRole::Top,
        PointRole::Bottom,
    ];

    #[inline]
    pub fn index(self) -> usize {
        match self {
            PointRole::Center => 0,
            PointRole::Left => 1,
            PointRole::Right => 2,
            PointRole::Top => 3,
            PointRole::Bottom => 4,
        }
    }

    /// Offset (drow, dcol) of this role from the center at the given radius.
    #[inline]
    pub fn nominal_offset(self, radius: i32) -> (i32, i32) {
        match self {
            PointRole::Center => (0, 0),
            PointRole::Left => (0, -radius),
            PointRole::Right => (0, radius),
            PointRole::Top => (-radius, 0),
            PointRole::Bottom => (radius, 0),
        }
    }
}
