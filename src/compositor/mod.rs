//! Annotate the canonical raster and publish it
//!
//! The selected contour is stroked onto an RGB copy of the raster, a grid with
//! one cell per physical unit is drawn on a black overlay, and the two are
//! blended with fixed weights.

/// Weighted image blending
pub mod blend;
/// Contour strokes and grid overlay
pub mod draw;

use crate::config::MeasureConfig;
use crate::error::{MeasureError, Result};
use crate::models::{BitMatrix, Contour, ScaleFactor};
use crate::output::{ensure_parent, mask_path, write_jpeg};
use crate::segmenter::Segmentation;
use crate::utils::grayscale::gray_to_rgb;
use blend::add_weighted;
use draw::{grid_overlay, stroke_contour};
use image::{GrayImage, Rgb, RgbImage};
use std::path::{Path, PathBuf};

/// Build the annotated image for `gray`
pub fn compose(
    gray: &GrayImage,
    contour: Option<&Contour>,
    scale: ScaleFactor,
    config: &MeasureConfig,
) -> RgbImage {
    let (width, height) = gray.dimensions();
    let rgb = gray_to_rgb(gray.as_raw(), width as usize, height as usize);
    let mut annotated =
        RgbImage::from_raw(width, height, rgb).unwrap_or_else(|| RgbImage::new(width, height));

    if let Some(contour) = contour {
        stroke_contour(
            &mut annotated,
            contour,
            config.stroke_width,
            Rgb(config.contour_color),
        );
    }

    let overlay = grid_overlay(width, height, scale.grid_step(), Rgb(config.grid_color));
    add_weighted(&annotated, &overlay, config.blend)
}

fn dump_mask(mask: &BitMatrix, output: &Path) -> Result<()> {
    let path = mask_path(output);
    ensure_parent(&path)?;
    mask.to_gray_image()
        .save(&path)
        .map_err(|source| MeasureError::Encode { path, source })
}

/// Compose, write to `output`, and convert the contour area to square units
///
/// Returns the written path and the area in square units.
pub fn render(
    gray: &GrayImage,
    segmentation: &Segmentation,
    scale: ScaleFactor,
    config: &MeasureConfig,
    output: &Path,
) -> Result<(PathBuf, f64)> {
    let composite = compose(gray, segmentation.contour.as_ref(), scale, config);

    // Mask first: a failed dump must not leave a published composite
    if config.dump_mask {
        dump_mask(&segmentation.mask, output)?;
        tracing::debug!("mask written to {}", mask_path(output).display());
    }

    if let Err(err) = write_jpeg(&composite, output) {
        if config.dump_mask {
            let _ = std::fs::remove_file(mask_path(output));
        }
        return Err(err);
    }

    Ok((output.to_path_buf(), scale.to_square_units(segmentation.pixel_area)))
}
