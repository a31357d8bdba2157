use crate::models::{CalibrationFrame, ScaleFactor};

/// Derive pixels-per-unit from the reference square
///
/// Only the frame geometry is used; pixel data never enters into it.
pub fn calibrate(frame: &CalibrationFrame) -> ScaleFactor {
    ScaleFactor::new(frame.side_px() as f64 / frame.side_units)
}
