pub mod calibration;
pub mod contour;
pub mod matrix;
pub mod point;

pub use calibration::{CalibrationFrame, ScaleFactor};
pub use contour::Contour;
pub use matrix::BitMatrix;
pub use point::PointI;
