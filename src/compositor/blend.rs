use crate::config::BlendWeights;
use image::RgbImage;
use rayon::prelude::*;

/// Per-channel `round(base * w.image + overlay * w.overlay)`, saturated to 0..=255
///
/// Both images must have the same dimensions.
pub fn add_weighted(base: &RgbImage, overlay: &RgbImage, weights: BlendWeights) -> RgbImage {
    debug_assert_eq!(base.dimensions(), overlay.dimensions());
    let (width, height) = base.dimensions();
    let row_len = width as usize * 3;

    let mut out = vec![0u8; row_len * height as usize];
    if row_len == 0 {
        return RgbImage::new(width, height);
    }

    out.par_chunks_mut(row_len)
        .zip(base.as_raw().par_chunks(row_len))
        .zip(overlay.as_raw().par_chunks(row_len))
        .for_each(|((dst, a), b)| {
            for ((d, &a), &b) in dst.iter_mut().zip(a).zip(b) {
                let v = a as f32 * weights.image + b as f32 * weights.overlay;
                *d = v.round().clamp(0.0, 255.0) as u8;
            }
        });

    RgbImage::from_raw(width, height, out).unwrap_or_else(|| RgbImage::new(width, height))
}
