use serde::{Deserialize, Serialize};

/// Integer point in pixel coordinates (x to the right, y down)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct PointI {
    /// X coordinate
    pub x: i32,
    /// Y coordinate
    pub y: i32,
}

impl PointI {
    /// Create a new integer point
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Step vector from `self` to `other`
    pub fn delta(&self, other: &PointI) -> (i32, i32) {
        (other.x - self.x, other.y - self.y)
    }
}
