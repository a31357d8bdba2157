//! Upload and processed-image directories
//!
//! A workspace keeps uploaded photos under `uploads/` and annotated results
//! under `processed/`, so a photo can be uploaded once and re-measured at
//! different thresholds by name.

use crate::config::{MeasureConfig, OutputPolicy};
use crate::error::{DecodeFailure, MeasureError, Result};
use crate::output::prune_superseded;
use crate::pipeline::{Measurement, Measurer};
use std::fs;
use std::path::{Path, PathBuf};

const UPLOADS: &str = "uploads";
const PROCESSED: &str = "processed";

/// Reduce a client-supplied file name to a safe single path component
///
/// Directory parts are dropped, characters outside `[A-Za-z0-9._-]` become
/// `_`, and leading dots are stripped. Returns `None` if nothing is left.
pub fn sanitize_file_name(name: &str) -> Option<String> {
    let base = name.rsplit(['/', '\\']).next().unwrap_or("");
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');
    if cleaned.is_empty() {
        None
    } else {
        Some(cleaned.to_string())
    }
}

/// Directory pair plus the engine that measures its uploads
#[derive(Debug, Clone)]
pub struct Workspace {
    uploads: PathBuf,
    processed: PathBuf,
    measurer: Measurer,
}

impl Workspace {
    /// Open (creating if needed) a workspace rooted at `root`
    ///
    /// Per-request output is redirected into `root/processed`; a fixed output
    /// path in `config` is kept as is.
    pub fn open<P: AsRef<Path>>(root: P, mut config: MeasureConfig) -> Result<Self> {
        let root = root.as_ref();
        let uploads = root.join(UPLOADS);
        let processed = root.join(PROCESSED);
        for dir in [&uploads, &processed] {
            fs::create_dir_all(dir).map_err(|e| MeasureError::io(dir, e))?;
        }

        if let OutputPolicy::PerRequest { .. } = config.output {
            config.output = OutputPolicy::PerRequest {
                dir: processed.clone(),
            };
        }

        Ok(Self {
            uploads,
            processed,
            measurer: Measurer::new(config)?,
        })
    }

    /// Directory holding uploaded originals
    pub fn uploads_dir(&self) -> &Path {
        &self.uploads
    }

    /// Directory holding annotated outputs
    pub fn processed_dir(&self) -> &Path {
        &self.processed
    }

    /// Engine used for measurements
    pub fn measurer(&self) -> &Measurer {
        &self.measurer
    }

    /// Resolve a stored upload by name
    pub fn upload_path(&self, name: &str) -> Result<PathBuf> {
        match sanitize_file_name(name) {
            Some(clean) if clean == name => Ok(self.uploads.join(clean)),
            _ => Err(MeasureError::InvalidConfig(format!(
                "upload name {name:?} is not a plain file name"
            ))),
        }
    }

    /// Store raw upload bytes under a sanitized `name`; returns the stored name
    pub fn store(&self, name: &str, bytes: &[u8]) -> Result<String> {
        let clean = sanitize_file_name(name).ok_or_else(|| {
            MeasureError::InvalidConfig(format!("upload name {name:?} is empty"))
        })?;
        let target = self.uploads.join(&clean);
        fs::write(&target, bytes).map_err(|e| MeasureError::io(&target, e))?;
        tracing::info!("file uploaded: {}", clean);
        Ok(clean)
    }

    /// Copy an image file into the uploads directory; returns the stored name
    pub fn ingest<P: AsRef<Path>>(&self, source: P) -> Result<String> {
        let source = source.as_ref();
        if !source.is_file() {
            return Err(MeasureError::decode(source, DecodeFailure::NotFound));
        }
        let name = source
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let bytes = fs::read(source).map_err(|e| MeasureError::io(source, e))?;
        self.store(&name, &bytes)
    }

    /// Measure a stored upload at `threshold`
    ///
    /// Only the newest annotated image of an upload is kept: once the new one
    /// is published, earlier per-request outputs of the same upload are
    /// removed from the processed directory.
    pub fn measure_upload(&self, name: &str, threshold: i64) -> Result<Measurement> {
        let path = self.upload_path(name)?;
        tracing::info!("measuring {} at threshold {}", name, threshold);
        let measurement = self.measurer.measure(&path, threshold)?;

        if let OutputPolicy::PerRequest { dir } = &self.measurer.config().output {
            let stem = Path::new(name)
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
            let removed = prune_superseded(dir, &stem, &measurement.output_path);
            if removed > 0 {
                tracing::debug!("removed {} superseded outputs of {}", removed, name);
            }
        }
        Ok(measurement)
    }
}
