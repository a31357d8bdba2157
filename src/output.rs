//! Output naming and publishing
//!
//! Per-request names combine the input stem, the threshold, a timestamp and a
//! process-wide sequence number, so concurrent measurements never share a
//! file. Every write lands in a temporary sibling first and is renamed into
//! place, which keeps readers from seeing a partially written JPEG.

use crate::config::OutputPolicy;
use crate::error::{MeasureError, Result};
use crate::segmenter::Threshold;
use image::RgbImage;
use image::codecs::jpeg::JpegEncoder;
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// JPEG quality for annotated images
const JPEG_QUALITY: u8 = 95;

const MAX_STEM_LEN: usize = 48;

static OUTPUT_SEQUENCE: AtomicU64 = AtomicU64::new(0);

/// Reduce a file stem to `[A-Za-z0-9_-]`, bounded in length
fn clean_stem(stem: &str) -> String {
    let cleaned: String = stem
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .take(MAX_STEM_LEN)
        .collect();
    if cleaned.is_empty() {
        "image".to_string()
    } else {
        cleaned
    }
}

/// Pick the output path for one measurement
pub fn output_path(policy: &OutputPolicy, stem: &str, threshold: Threshold) -> PathBuf {
    match policy {
        OutputPolicy::Fixed { path } => path.clone(),
        OutputPolicy::PerRequest { dir } => {
            let nanos = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_nanos())
                .unwrap_or(0);
            let sequence = OUTPUT_SEQUENCE.fetch_add(1, Ordering::Relaxed);
            dir.join(format!(
                "combined-{}-t{:03}-{}-{}.jpg",
                clean_stem(stem),
                threshold.value(),
                nanos,
                sequence
            ))
        }
    }
}

pub(crate) fn ensure_parent(path: &Path) -> Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            fs::create_dir_all(parent).map_err(|e| MeasureError::io(parent, e))
        }
        _ => Ok(()),
    }
}

fn temp_sibling(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    let sequence = OUTPUT_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    path.with_file_name(format!(".{name}.{sequence}.tmp"))
}

fn encode_jpeg(image: &RgbImage, tmp: &Path, target: &Path) -> Result<()> {
    let file = File::create(tmp).map_err(|e| MeasureError::io(tmp, e))?;
    let mut writer = BufWriter::new(file);
    JpegEncoder::new_with_quality(&mut writer, JPEG_QUALITY)
        .encode_image(image)
        .map_err(|source| MeasureError::Encode {
            path: target.to_path_buf(),
            source,
        })?;
    writer.flush().map_err(|e| MeasureError::io(tmp, e))
}

/// Encode `image` as JPEG and publish it at `path` atomically
pub fn write_jpeg(image: &RgbImage, path: &Path) -> Result<()> {
    ensure_parent(path)?;
    let tmp = temp_sibling(path);

    let published = encode_jpeg(image, &tmp, path)
        .and_then(|()| fs::rename(&tmp, path).map_err(|e| MeasureError::io(path, e)));
    if published.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    published
}

/// Path the debug mask for `output` is written to
pub fn mask_path(output: &Path) -> PathBuf {
    output.with_extension("mask.png")
}

/// `(nanos, sequence)` of a per-request output or mask named with `prefix`
fn output_key(file_name: &str, prefix: &str) -> Option<(u128, u64)> {
    let rest = file_name.strip_prefix(prefix)?;
    let base = rest
        .strip_suffix(".mask.png")
        .or_else(|| rest.strip_suffix(".jpg"))?;
    let mut parts = base.split('-');
    parts.next()?.parse::<u8>().ok()?;
    let nanos = parts.next()?.parse::<u128>().ok()?;
    let sequence = parts.next()?.parse::<u64>().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some((nanos, sequence))
}

/// Remove per-request outputs for `stem` in `dir` that are older than `keep`
///
/// Older means an earlier `(nanos, sequence)` pair, so the newest output of a
/// stem survives even when several callers prune at once. Debug masks go
/// with their images. Returns how many files were removed; failures are
/// logged and skipped.
pub fn prune_superseded(dir: &Path, stem: &str, keep: &Path) -> usize {
    let prefix = format!("combined-{}-t", clean_stem(stem));
    let Some(keep_key) = keep
        .file_name()
        .and_then(|n| n.to_str())
        .and_then(|n| output_key(n, &prefix))
    else {
        return 0;
    };

    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) => {
            tracing::warn!("cannot list {}: {}", dir.display(), err);
            return 0;
        }
    };

    let mut removed = 0;
    for entry in entries.flatten() {
        let name = entry.file_name();
        let Some(key) = name.to_str().and_then(|n| output_key(n, &prefix)) else {
            continue;
        };
        if key >= keep_key {
            continue;
        }
        match fs::remove_file(entry.path()) {
            Ok(()) => removed += 1,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => tracing::warn!(
                "cannot remove superseded output {}: {}",
                entry.path().display(),
                err
            ),
        }
    }
    removed
}
