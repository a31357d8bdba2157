//! Threshold a canonical raster and pick the largest external contour
//!
//! - Binarization with a fixed global threshold (`>=` is foreground)
//! - External border following, 8-connected (`imageproc` contours)
//! - Collinear vertex removal and shoelace area per contour
//! - Selection of the strictly largest contour, first one wins ties

use crate::error::MeasureError;
use crate::models::{BitMatrix, Contour, PointI};
use crate::utils::binarization::threshold_binarize;
use crate::utils::geometry::compress_chain;
use image::{GrayImage, Luma};
use imageproc::contours::{BorderType, find_contours};

/// Validated 8-bit binarization threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Threshold(u8);

impl Threshold {
    /// Threshold value
    pub fn value(&self) -> u8 {
        self.0
    }
}

impl From<u8> for Threshold {
    fn from(value: u8) -> Self {
        Self(value)
    }
}

impl TryFrom<i64> for Threshold {
    type Error = MeasureError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        u8::try_from(value)
            .map(Self)
            .map_err(|_| MeasureError::InvalidThreshold(value))
    }
}

/// Output of the segmentation stage
#[derive(Debug, Clone)]
pub struct Segmentation {
    /// Binary mask the contours were traced on
    pub mask: BitMatrix,
    /// Largest external contour, if any foreground exists
    pub contour: Option<Contour>,
    /// Area of `contour` in square pixels, 0 when there is none
    pub pixel_area: f64,
    /// Number of external contours found
    pub contour_count: usize,
}

/// Copy of `mask` with a one-pixel background margin on every side
///
/// Regions touching the raster edge then get a closed border of their own,
/// and every region that is not inside a hole has no parent.
fn padded_mask(mask: &BitMatrix) -> GrayImage {
    let (width, height) = (mask.width() as u32, mask.height() as u32);
    GrayImage::from_fn(width + 2, height + 2, |x, y| {
        let inside = x >= 1 && y >= 1 && x <= width && y <= height;
        if inside && mask.get(x as usize - 1, y as usize - 1) {
            Luma([255])
        } else {
            Luma([0])
        }
    })
}

/// Boundary pixel chains of the external borders, in raster order of their
/// start pixels
///
/// Regions nested inside a hole of another region are skipped. Pixels outside
/// the mask count as background.
pub fn trace_external_borders(mask: &BitMatrix) -> Vec<Vec<PointI>> {
    if mask.width() == 0 || mask.height() == 0 {
        return Vec::new();
    }

    find_contours::<i32>(&padded_mask(mask))
        .into_iter()
        .filter(|c| c.border_type == BorderType::Outer && c.parent.is_none())
        .map(|c| {
            let mut chain: Vec<PointI> = c
                .points
                .iter()
                .map(|p| PointI::new(p.x - 1, p.y - 1))
                .collect();
            chain.dedup();
            if chain.len() > 1 && chain.first() == chain.last() {
                chain.pop();
            }
            chain
        })
        .collect()
}

/// Extract external contours with collinear points removed, in scan order
pub fn find_external_contours(mask: &BitMatrix) -> Vec<Contour> {
    trace_external_borders(mask)
        .iter()
        .map(|chain| Contour::new(compress_chain(chain)))
        .collect()
}

/// Pick the contour with the strictly largest area; the earliest wins ties
pub fn select_largest(contours: Vec<Contour>) -> Option<Contour> {
    let mut best: Option<Contour> = None;
    for contour in contours {
        if best.as_ref().is_none_or(|current| contour.area > current.area) {
            best = Some(contour);
        }
    }
    best
}

/// Binarize `gray` at `threshold` and select the largest external contour
pub fn segment(gray: &GrayImage, threshold: Threshold) -> Segmentation {
    let (width, height) = (gray.width() as usize, gray.height() as usize);
    let mask = threshold_binarize(gray.as_raw(), width, height, threshold.value());

    let contours = find_external_contours(&mask);
    let contour_count = contours.len();
    let contour = select_largest(contours);
    let pixel_area = contour.as_ref().map_or(0.0, |c| c.area);

    Segmentation {
        mask,
        contour,
        pixel_area,
        contour_count,
    }
}
