//! Decode an input photo into a canonical-resolution grayscale raster

use crate::config::{CanonicalSize, ResizePolicy};
use crate::error::{DecodeFailure, MeasureError, Result};
use crate::utils::grayscale::rgb_to_grayscale;
use image::imageops::{self, FilterType};
use image::{DynamicImage, GrayImage, ImageError};
use std::path::Path;

/// Aspect mismatch above which stretching is reported
const ASPECT_TOLERANCE: f64 = 0.01;

/// Load `path` as grayscale and bring it to the canonical size
pub fn load_canonical<P: AsRef<Path>>(
    path: P,
    size: CanonicalSize,
    policy: ResizePolicy,
) -> Result<GrayImage> {
    let gray = load_grayscale(path)?;
    Ok(normalize(gray, size, policy))
}

/// Decode `path` into a grayscale raster at its native size
///
/// The format is sniffed from the file contents, so uploads with a wrong or
/// missing extension still decode.
pub fn load_grayscale<P: AsRef<Path>>(path: P) -> Result<GrayImage> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(MeasureError::decode(path, DecodeFailure::NotFound));
    }

    let decoded = image::io::Reader::open(path)
        .and_then(|reader| reader.with_guessed_format())
        .map_err(ImageError::IoError)
        .and_then(|reader| reader.decode())
        .map_err(|e| MeasureError::decode(path, e))?;

    let gray =
        to_grayscale(decoded).ok_or_else(|| MeasureError::decode(path, DecodeFailure::Empty))?;
    if gray.width() == 0 || gray.height() == 0 {
        return Err(MeasureError::decode(path, DecodeFailure::Empty));
    }
    Ok(gray)
}

fn to_grayscale(image: DynamicImage) -> Option<GrayImage> {
    match image {
        DynamicImage::ImageLuma8(gray) => Some(gray),
        other => {
            let rgb = other.to_rgb8();
            let (width, height) = rgb.dimensions();
            let gray = rgb_to_grayscale(rgb.as_raw(), width as usize, height as usize);
            GrayImage::from_raw(width, height, gray)
        }
    }
}

/// Resize a grayscale raster to the canonical size using bilinear sampling
pub fn normalize(gray: GrayImage, size: CanonicalSize, policy: ResizePolicy) -> GrayImage {
    let (width, height) = gray.dimensions();
    if (width, height) == (size.width, size.height) {
        return gray;
    }

    match policy {
        ResizePolicy::Stretch => {
            let source_aspect = width as f64 / height as f64;
            let distortion = (source_aspect / size.aspect() - 1.0).abs();
            if distortion > ASPECT_TOLERANCE {
                tracing::warn!(
                    "stretching {}x{} to {}x{} distorts measured areas by {:.1}%",
                    width,
                    height,
                    size.width,
                    size.height,
                    distortion * 100.0
                );
            }
            imageops::resize(&gray, size.width, size.height, FilterType::Triangle)
        }
        ResizePolicy::Fit => {
            let scale = (size.width as f64 / width as f64).min(size.height as f64 / height as f64);
            let fit_w = ((width as f64 * scale).round() as u32).clamp(1, size.width);
            let fit_h = ((height as f64 * scale).round() as u32).clamp(1, size.height);
            let resized = imageops::resize(&gray, fit_w, fit_h, FilterType::Triangle);

            let mut canvas = GrayImage::new(size.width, size.height);
            let offset_x = ((size.width - fit_w) / 2) as i64;
            let offset_y = ((size.height - fit_h) / 2) as i64;
            imageops::replace(&mut canvas, &resized, offset_x, offset_y);
            canvas
        }
    }
}
