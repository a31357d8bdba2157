//! RustArea - measure object area against a reference square
//!
//! A photo is decoded to grayscale and resized to a canonical resolution. A
//! reference square of known physical size, at a fixed location in that
//! raster, fixes the pixels-per-unit scale. The image is then thresholded,
//! the largest external contour is selected, and its area is reported in
//! square units. An annotated copy with the contour and a one-unit grid is
//! written alongside.

#![warn(missing_docs)]
#![allow(clippy::missing_docs_in_private_items)]

/// Pixels-per-unit derivation from the reference square
pub mod calibrator;
/// Contour stroke, grid overlay and blending
pub mod compositor;
/// Engine configuration, JSON file and environment overrides
pub mod config;
/// Error types
pub mod error;
/// Decode, grayscale conversion and canonical resize
pub mod loader;
/// Core data structures (BitMatrix, PointI, Contour, ScaleFactor)
pub mod models;
/// Output naming and atomic JPEG publishing
pub mod output;
/// End-to-end measurement engine
pub mod pipeline;
/// Thresholding and contour selection
pub mod segmenter;
/// Helpers shared by the command-line tool
pub mod tools;
/// Utility functions (grayscale, binarization, geometry)
pub mod utils;
/// Upload and processed directories
pub mod workspace;

pub use config::MeasureConfig;
pub use error::{DecodeFailure, ErrorKind, MeasureError, Result};
pub use models::{BitMatrix, CalibrationFrame, Contour, PointI, ScaleFactor};
pub use pipeline::{Measurement, Measurer, StageTimings};
pub use segmenter::Threshold;
pub use workspace::Workspace;

use std::path::Path;

/// Measure the largest object in the image at `image_path`
///
/// # Arguments
/// * `image_path` - Photo containing the reference square and the object
/// * `threshold` - Intensity at or above which a pixel is foreground, 0..=255
///
/// # Returns
/// The written annotated image path and the area in square units
///
/// Uses the default configuration with `AREA_*` environment overrides.
pub fn measure<P: AsRef<Path>>(image_path: P, threshold: i64) -> Result<Measurement> {
    Measurer::new(MeasureConfig::from_env())?.measure(image_path, threshold)
}
