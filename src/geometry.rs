//! Map-space coordinates shared by the layout allocator and the camera.

use serde::{Deserialize, Serialize};

/// A point on the quest map (or on screen, for pointer input).
///
/// Serialized as `[x, y]` so persisted `mapPosition` arrays load directly.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct MapPosition(pub f64, pub f64);

impl MapPosition {
    pub const ORIGIN: MapPosition = MapPosition(0.0, 0.0);

    pub fn new(x: f64, y: f64) -> Self {
        Self(x, y)
    }

    pub fn x(&self) -> f64 {
        self.0
    }

    pub fn y(&self) -> f64 {
        self.1
    }

    /// Euclidean distance between two points
    pub fn distance(&self, other: &MapPosition) -> f64 {
        let dx = self.0 - other.0;
        let dy = self.1 - other.1;
        (dx * dx + dy * dy).sqrt()
    }

    pub fn offset(&self, dx: f64, dy: f64) -> Self {
        Self(self.0 + dx, self.1 + dy)
    }

    /// Component-wise `self - other`
    pub fn minus(&self, other: &MapPosition) -> Self {
        Self(self.0 - other.0, self.1 - other.1)
    }

    /// Component-wise `self + other`
    pub fn plus(&self, other: &MapPosition) -> Self {
        Self(self.0 + other.0, self.1 + other.1)
    }

    /// Snap both axes to the nearest multiple of `grid`.
    /// Half-way values round toward positive infinity.
    pub fn snapped(&self, grid: f64) -> Self {
        Self(snap_axis(self.0, grid), snap_axis(self.1, grid))
    }
}

fn snap_axis(value: f64, grid: f64) -> f64 {
    if grid <= 0.0 {
        return value;
    }
    (value / grid + 0.5).floor() * grid
}
