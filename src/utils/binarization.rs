use crate::models::BitMatrix;
use rayon::prelude::*;

/// Simple global threshold binarization
/// Pixels `>= threshold` become foreground (true), the rest background
pub fn threshold_binarize(gray: &[u8], width: usize, height: usize, threshold: u8) -> BitMatrix {
    let mut binary = BitMatrix::new(width, height);

    for y in 0..height {
        let row = &gray[y * width..(y + 1) * width];
        for (x, &value) in row.iter().enumerate() {
            if value >= threshold {
                binary.set(x, y, true);
            }
        }
    }

    binary
}

/// Count of foreground pixels for every threshold 0..=255
///
/// `counts[t]` is the number of pixels that `threshold_binarize(.., t)` marks
/// as foreground. Used by threshold sweeps to skip empty masks cheaply.
pub fn foreground_counts(gray: &[u8]) -> [usize; 256] {
    let histogram = gray
        .par_chunks(4096)
        .map(|chunk| {
            let mut local = [0usize; 256];
            for &pixel in chunk {
                local[pixel as usize] += 1;
            }
            local
        })
        .reduce(
            || [0usize; 256],
            |mut a, b| {
                for (dst, src) in a.iter_mut().zip(b.iter()) {
                    *dst += src;
                }
                a
            },
        );

    let mut counts = [0usize; 256];
    let mut running = 0usize;
    for t in (0..256).rev() {
        running += histogram[t];
        counts[t] = running;
    }
    counts
}
