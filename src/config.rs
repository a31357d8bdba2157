//! Engine configuration
//!
//! Every constant the measurement depends on lives here, defaulting to the
//! values the tool has always used: a 1920x1080 canonical raster, a 1 cm
//! reference square at (50,50)-(150,150), a 3 px green contour and a 0.8/0.2
//! blend. Values can come from code, a JSON file, or `AREA_*` environment
//! variables.

use crate::error::{MeasureError, Result};
use crate::models::CalibrationFrame;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Target raster size every input is normalized to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CanonicalSize {
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
}

impl CanonicalSize {
    /// Width divided by height
    pub fn aspect(&self) -> f64 {
        self.width as f64 / self.height as f64
    }
}

impl Default for CanonicalSize {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
        }
    }
}

/// How inputs are brought to the canonical size
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResizePolicy {
    /// Scale each axis independently to the exact canonical size.
    /// Distorts geometry when the aspect ratio differs.
    #[default]
    Stretch,
    /// Scale uniformly to fit and center on a black canvas
    Fit,
}

/// Weights for `image * w_image + overlay * w_overlay`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BlendWeights {
    /// Weight of the contour-annotated image
    pub image: f32,
    /// Weight of the grid overlay
    pub overlay: f32,
}

impl Default for BlendWeights {
    fn default() -> Self {
        Self {
            image: 0.8,
            overlay: 0.2,
        }
    }
}

/// Where annotated images are written
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum OutputPolicy {
    /// A fresh file per call inside `dir`
    PerRequest {
        /// Output directory, created on demand
        dir: PathBuf,
    },
    /// Always the same file; concurrent callers overwrite each other
    Fixed {
        /// Output file
        path: PathBuf,
    },
}

impl Default for OutputPolicy {
    fn default() -> Self {
        Self::PerRequest {
            dir: PathBuf::from("processed"),
        }
    }
}

/// Full configuration of a [`crate::Measurer`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeasureConfig {
    /// Canonical raster size
    pub canonical: CanonicalSize,
    /// Resize behavior for non-canonical inputs
    pub resize: ResizePolicy,
    /// Reference square geometry
    pub calibration: CalibrationFrame,
    /// RGB color of the contour stroke
    pub contour_color: [u8; 3],
    /// Contour stroke width in pixels
    pub stroke_width: u32,
    /// RGB color of grid lines on the overlay
    pub grid_color: [u8; 3],
    /// Blend weights
    pub blend: BlendWeights,
    /// Output location policy
    pub output: OutputPolicy,
    /// Also write the binary mask next to each output
    pub dump_mask: bool,
}

impl Default for MeasureConfig {
    fn default() -> Self {
        Self {
            canonical: CanonicalSize::default(),
            resize: ResizePolicy::default(),
            calibration: CalibrationFrame::default(),
            contour_color: [0, 255, 0],
            stroke_width: 3,
            grid_color: [255, 255, 255],
            blend: BlendWeights::default(),
            output: OutputPolicy::default(),
            dump_mask: false,
        }
    }
}

fn parse_u32(value: Option<String>) -> Option<u32> {
    value.and_then(|v| v.trim().parse::<u32>().ok())
}

fn parse_flag(value: Option<String>) -> Option<bool> {
    value.map(|v| {
        matches!(
            v.trim().to_ascii_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        )
    })
}

impl MeasureConfig {
    /// Defaults with `AREA_*` environment overrides applied
    pub fn from_env() -> Self {
        Self::default().with_overrides(|name| std::env::var(name).ok())
    }

    /// Apply overrides from a variable lookup
    ///
    /// Recognized names: `AREA_OUTPUT_DIR`, `AREA_CANONICAL_WIDTH`,
    /// `AREA_CANONICAL_HEIGHT`, `AREA_RESIZE` (`stretch` | `fit`) and
    /// `AREA_DEBUG_DUMP`. Unparseable values are ignored.
    pub fn with_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup("AREA_OUTPUT_DIR").filter(|d| !d.trim().is_empty()) {
            self.output = OutputPolicy::PerRequest {
                dir: PathBuf::from(dir.trim()),
            };
        }
        if let Some(width) = parse_u32(lookup("AREA_CANONICAL_WIDTH")) {
            self.canonical.width = width;
        }
        if let Some(height) = parse_u32(lookup("AREA_CANONICAL_HEIGHT")) {
            self.canonical.height = height;
        }
        match lookup("AREA_RESIZE").as_deref().map(str::trim) {
            Some("fit") => self.resize = ResizePolicy::Fit,
            Some("stretch") => self.resize = ResizePolicy::Stretch,
            _ => {}
        }
        if let Some(dump) = parse_flag(lookup("AREA_DEBUG_DUMP")) {
            self.dump_mask = dump;
        }
        self
    }

    /// Load a JSON config file; missing fields keep their defaults
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| MeasureError::io(path, e))?;
        let config: Self = serde_json::from_str(&text).map_err(|e| {
            MeasureError::InvalidConfig(format!("{}: {}", path.display(), e))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.canonical.width == 0 || self.canonical.height == 0 {
            return Err(MeasureError::InvalidConfig(format!(
                "canonical size {}x{} has no pixels",
                self.canonical.width, self.canonical.height
            )));
        }

        let frame = &self.calibration;
        if frame.side_px() <= 0 {
            return Err(MeasureError::InvalidConfig(format!(
                "reference square ({}, {})-({}, {}) has no width",
                frame.top_left.x, frame.top_left.y, frame.bottom_right.x, frame.bottom_right.y
            )));
        }
        if !(frame.side_units.is_finite() && frame.side_units > 0.0) {
            return Err(MeasureError::InvalidConfig(format!(
                "reference side length {} must be positive",
                frame.side_units
            )));
        }

        let weights = [self.blend.image, self.blend.overlay];
        if weights.iter().any(|w| !(0.0..=1.0).contains(w)) {
            return Err(MeasureError::InvalidConfig(format!(
                "blend weights {:?} must lie in [0, 1]",
                weights
            )));
        }

        if self.stroke_width == 0 {
            return Err(MeasureError::InvalidConfig(
                "stroke width must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PointI;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn test_defaults_are_valid() {
        let config = MeasureConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.canonical, CanonicalSize { width: 1920, height: 1080 });
        assert_eq!(config.resize, ResizePolicy::Stretch);
        assert_eq!(config.contour_color, [0, 255, 0]);
    }

    #[test]
    fn test_env_overrides() {
        let config = MeasureConfig::default().with_overrides(lookup_from(&[
            ("AREA_OUTPUT_DIR", "/tmp/out"),
            ("AREA_CANONICAL_WIDTH", "640"),
            ("AREA_CANONICAL_HEIGHT", "not a number"),
            ("AREA_RESIZE", "fit"),
            ("AREA_DEBUG_DUMP", "yes"),
        ]));
        assert_eq!(
            config.output,
            OutputPolicy::PerRequest {
                dir: PathBuf::from("/tmp/out")
            }
        );
        assert_eq!(config.canonical.width, 640);
        assert_eq!(config.canonical.height, 1080);
        assert_eq!(config.resize, ResizePolicy::Fit);
        assert!(config.dump_mask);
    }

    #[test]
    fn test_no_overrides_keeps_defaults() {
        let config = MeasureConfig::default().with_overrides(|_| None);
        assert_eq!(config, MeasureConfig::default());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = MeasureConfig::default();
        config.calibration.bottom_right = PointI::new(50, 150);
        assert!(matches!(config.validate(), Err(MeasureError::InvalidConfig(_))));

        let mut config = MeasureConfig::default();
        config.calibration.side_units = 0.0;
        assert!(config.validate().is_err());

        let mut config = MeasureConfig::default();
        config.blend.overlay = 1.5;
        assert!(config.validate().is_err());

        let mut config = MeasureConfig::default();
        config.canonical.height = 0;
        assert!(config.validate().is_err());

        let mut config = MeasureConfig::default();
        config.stroke_width = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_json() {
        let json = r#"{
            "resize": "fit",
            "output": { "mode": "fixed", "path": "processed/combined.jpg" },
            "calibration": {
                "top_left": { "x": 0, "y": 0 },
                "bottom_right": { "x": 50, "y": 50 },
                "side_units": 2.0
            }
        }"#;
        let config: MeasureConfig = serde_json::from_str(json).expect("valid json");
        assert_eq!(config.resize, ResizePolicy::Fit);
        assert_eq!(config.calibration.side_px(), 50);
        assert_eq!(config.stroke_width, 3);
        assert_eq!(
            config.output,
            OutputPolicy::Fixed {
                path: PathBuf::from("processed/combined.jpg")
            }
        );
    }
}
