use crate::models::PointI;
use serde::{Deserialize, Serialize};

/// Reference square location in canonical image coordinates
///
/// The frame is geometry only: it assumes every photo has been cropped so the
/// reference square lands on exactly this region after resizing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationFrame {
    /// Top-left corner of the reference square
    pub top_left: PointI,
    /// Bottom-right corner of the reference square
    pub bottom_right: PointI,
    /// Physical side length of the reference square (in units, e.g. cm)
    pub side_units: f64,
}

impl CalibrationFrame {
    /// Side length of the reference square in pixels (horizontal extent)
    pub fn side_px(&self) -> i32 {
        self.bottom_right.x - self.top_left.x
    }
}

impl Default for CalibrationFrame {
    fn default() -> Self {
        Self {
            top_left: PointI::new(50, 50),
            bottom_right: PointI::new(150, 150),
            side_units: 1.0,
        }
    }
}

/// Pixels per physical length unit
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize)]
#[serde(transparent)]
pub struct ScaleFactor(f64);

impl ScaleFactor {
    /// Wrap a pixels-per-unit value
    pub fn new(pixels_per_unit: f64) -> Self {
        Self(pixels_per_unit)
    }

    /// Pixels per unit
    pub fn pixels_per_unit(&self) -> f64 {
        self.0
    }

    /// Grid spacing in whole pixels (one unit per cell, at least 1)
    pub fn grid_step(&self) -> u32 {
        (self.0 as u32).max(1)
    }

    /// Convert an area in square pixels into square units
    pub fn to_square_units(&self, pixel_area: f64) -> f64 {
        pixel_area / (self.0 * self.0)
    }
}
