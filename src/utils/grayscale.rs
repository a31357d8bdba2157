//! Grayscale conversions
//! Y = 0.299*R + 0.587*G + 0.114*B
//! Uses integer arithmetic: Y = (77*R + 150*G + 29*B) >> 8
//! The weights sum to 256 so pure white stays 255.

use rayon::prelude::*;

const COEF_R: u32 = 77;
const COEF_G: u32 = 150;
const COEF_B: u32 = 29;

/// Convert RGB image to grayscale, processing rows in parallel
pub fn rgb_to_grayscale(rgb: &[u8], width: usize, height: usize) -> Vec<u8> {
    let mut gray = vec![0u8; width * height];
    if width == 0 {
        return gray;
    }

    gray.par_chunks_mut(width).enumerate().for_each(|(y, row)| {
        let row_start = y * width * 3;
        for (x, out) in row.iter_mut().enumerate() {
            let idx = row_start + x * 3;
            let r = rgb[idx] as u32;
            let g = rgb[idx + 1] as u32;
            let b = rgb[idx + 2] as u32;
            *out = ((COEF_R * r + COEF_G * g + COEF_B * b) >> 8).min(255) as u8;
        }
    });

    gray
}

/// Expand grayscale to RGB by replicating the intensity into each channel
pub fn gray_to_rgb(gray: &[u8], width: usize, height: usize) -> Vec<u8> {
    let mut rgb = vec![0u8; width * height * 3];
    if width == 0 {
        return rgb;
    }

    rgb.par_chunks_mut(width * 3)
        .enumerate()
        .for_each(|(y, row)| {
            let src = &gray[y * width..(y + 1) * width];
            for (px, &v) in row.chunks_exact_mut(3).zip(src) {
                px[0] = v;
                px[1] = v;
                px[2] = v;
            }
        });

    rgb
}
