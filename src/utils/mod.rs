//! Utility functions for image processing
//!
//! This module provides the raster helpers the measurement stages share:
//! - Grayscale conversion (RGB to luminance and back)
//! - Binarization (fixed global threshold)
//! - Geometry (shoelace area, chain compression)

pub mod binarization;
pub mod geometry;
pub mod grayscale;
