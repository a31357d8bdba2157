use crate::models::{Contour, PointI};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_line_segment_mut};
use rayon::prelude::*;

/// Offsets covered by a round pen of diameter `width`
fn pen_offsets(width: u32) -> Vec<(i32, i32)> {
    let half = width as f32 / 2.0;
    let reach = half as i32;
    let limit = half * half;
    let mut offsets = Vec::new();
    for dy in -reach..=reach {
        for dx in -reach..=reach {
            if (dx * dx + dy * dy) as f32 <= limit {
                offsets.push((dx, dy));
            }
        }
    }
    offsets
}

fn as_f32(p: PointI, (dx, dy): (i32, i32)) -> (f32, f32) {
    ((p.x + dx) as f32, (p.y + dy) as f32)
}

/// Stroke the closed outline of `contour` with a `width`-pixel pen
pub fn stroke_contour(image: &mut RgbImage, contour: &Contour, width: u32, color: Rgb<u8>) {
    let points = &contour.points;
    match points.len() {
        0 => {}
        1 => {
            let p = points[0];
            draw_filled_circle_mut(image, (p.x, p.y), (width / 2) as i32, color);
        }
        n => {
            let offsets = pen_offsets(width);
            for i in 0..n {
                let a = points[i];
                let b = points[(i + 1) % n];
                for &offset in &offsets {
                    draw_line_segment_mut(image, as_f32(a, offset), as_f32(b, offset), color);
                }
            }
        }
    }
}

/// Black canvas with 1-pixel lines every `step` rows and columns, starting at 0
pub fn grid_overlay(width: u32, height: u32, step: u32, color: Rgb<u8>) -> RgbImage {
    let step = step.max(1) as usize;
    let row_len = width as usize * 3;
    let mut data = vec![0u8; row_len * height as usize];
    if row_len == 0 {
        return RgbImage::new(width, height);
    }

    data.par_chunks_mut(row_len)
        .enumerate()
        .for_each(|(y, row)| {
            let full_line = y % step == 0;
            for (x, px) in row.chunks_exact_mut(3).enumerate() {
                if full_line || x % step == 0 {
                    px.copy_from_slice(&color.0);
                }
            }
        });

    RgbImage::from_raw(width, height, data).unwrap_or_else(|| RgbImage::new(width, height))
}
