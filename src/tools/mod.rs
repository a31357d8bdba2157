use crate::models::BitMatrix;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

const IMAGE_EXTENSIONS: [&str; 6] = ["png", "jpg", "jpeg", "gif", "bmp", "tiff"];

/// Summary statistics for grayscale data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GrayStats {
    /// Minimum grayscale value.
    pub min: u8,
    /// Maximum grayscale value.
    pub max: u8,
    /// Average grayscale value.
    pub avg: u8,
}

/// Summary statistics for a binary mask.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaskStats {
    /// Count of foreground pixels.
    pub foreground_pixels: usize,
    /// Total pixels in the mask.
    pub total_pixels: usize,
    /// Ratio of foreground pixels to total pixels.
    pub foreground_ratio: f64,
}

/// Compute min/max/avg for grayscale values.
pub fn grayscale_stats(gray: &[u8]) -> GrayStats {
    if gray.is_empty() {
        return GrayStats { min: 0, max: 0, avg: 0 };
    }
    let mut min = u8::MAX;
    let mut max = u8::MIN;
    let mut sum: u64 = 0;
    for &v in gray {
        min = min.min(v);
        max = max.max(v);
        sum += v as u64;
    }
    let avg = (sum / gray.len() as u64) as u8;
    GrayStats { min, max, avg }
}

/// Compute foreground pixel stats for a mask.
pub fn mask_stats(mask: &BitMatrix) -> MaskStats {
    let foreground = mask.count_ones();
    let total = mask.width() * mask.height();
    let ratio = if total == 0 {
        0.0
    } else {
        foreground as f64 / total as f64
    };
    MaskStats {
        foreground_pixels: foreground,
        total_pixels: total,
        foreground_ratio: ratio,
    }
}

/// Default batch limit from environment variables.
///
/// Returns `None` (every image) when `AREA_BATCH_LIMIT` is unset or set to `0`.
pub fn batch_limit_from_env() -> Option<usize> {
    match env::var("AREA_BATCH_LIMIT") {
        Ok(value) => value
            .trim()
            .parse::<usize>()
            .ok()
            .and_then(|v| if v == 0 { None } else { Some(v) }),
        Err(_) => None,
    }
}

/// Image paths under `root`, sorted, truncated to `limit`.
pub fn image_paths<P: AsRef<Path>>(root: P, limit: Option<usize>) -> Vec<PathBuf> {
    let mut images = collect_images(root.as_ref());
    images.sort();
    if let Some(limit) = limit {
        images.truncate(limit);
    }
    images
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().to_lowercase())
        .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
}

fn collect_images(root: &Path) -> Vec<PathBuf> {
    let mut stack = vec![root.to_path_buf()];
    let mut images = Vec::new();

    while let Some(dir) = stack.pop() {
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(_) => continue,
        };

        for entry in entries.flatten() {
            let path = entry.path();
            if path.is_dir() {
                stack.push(path);
            } else if is_image(&path) {
                images.push(path);
            }
        }
    }

    images
}

/// Inclusive threshold range `from..=to` in steps of `step`, always ending at `to`.
pub fn threshold_range(from: i64, to: i64, step: i64) -> Vec<i64> {
    if step <= 0 || from > to {
        return Vec::new();
    }
    let mut values: Vec<i64> = (from..=to).step_by(step as usize).collect();
    if values.last() != Some(&to) {
        values.push(to);
    }
    values
}
