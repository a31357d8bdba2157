use crate::calibrator::calibrate;
use crate::compositor;
use crate::config::MeasureConfig;
use crate::error::Result;
use crate::loader::{load_canonical, normalize};
use crate::models::{Contour, ScaleFactor};
use crate::output::output_path;
use crate::segmenter::{Segmentation, Threshold, segment};
use crate::utils::binarization::foreground_counts;
use image::GrayImage;
use rayon::prelude::*;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Wall-clock time spent in each stage, in milliseconds
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct StageTimings {
    /// Decode and resize
    pub load_ms: f64,
    /// Binarize, trace and select
    pub segment_ms: f64,
    /// Draw, blend and write
    pub composite_ms: f64,
}

/// Result of one measurement
#[derive(Debug, Clone, Serialize)]
pub struct Measurement {
    /// Annotated image that was written
    pub output_path: PathBuf,
    /// Area of the largest contour in square units
    pub area_units: f64,
    /// Area of the largest contour in square pixels
    pub pixel_area: f64,
    /// Pixels per unit used for the conversion
    pub scale: ScaleFactor,
    /// Threshold the mask was built with
    pub threshold: u8,
    /// Number of external contours in the mask
    pub contour_count: usize,
    /// Bounding box of the selected contour as `(min_x, min_y, max_x, max_y)`
    pub bounding_box: Option<(i32, i32, i32, i32)>,
    /// Selected contour
    #[serde(skip)]
    pub contour: Option<Contour>,
    /// Per-stage timings
    pub timings: StageTimings,
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

/// Measurement engine: loader, calibrator, segmenter and compositor in sequence
///
/// Holds only configuration. Every call rebuilds all intermediate data, so a
/// single `Measurer` can be shared across threads.
#[derive(Debug, Clone, Default)]
pub struct Measurer {
    config: MeasureConfig,
}

impl Measurer {
    /// Create an engine after validating `config`
    pub fn new(config: MeasureConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Active configuration
    pub fn config(&self) -> &MeasureConfig {
        &self.config
    }

    /// Pixels per unit implied by the configured reference square
    pub fn scale(&self) -> ScaleFactor {
        calibrate(&self.config.calibration)
    }

    /// Measure the largest object in the image at `image_path`
    ///
    /// The threshold is checked before the file is touched. A missing or
    /// undecodable input fails without writing anything.
    pub fn measure<P: AsRef<Path>>(&self, image_path: P, threshold: i64) -> Result<Measurement> {
        let threshold = Threshold::try_from(threshold)?;
        let image_path = image_path.as_ref();

        let start = Instant::now();
        let gray = load_canonical(image_path, self.config.canonical, self.config.resize)?;
        let load_ms = elapsed_ms(start);

        let stem = image_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.run(&gray, threshold, &stem, load_ms)
    }

    /// Measure an already decoded grayscale raster of any size
    ///
    /// `label` names the output file in per-request mode.
    pub fn measure_image(
        &self,
        gray: GrayImage,
        threshold: i64,
        label: &str,
    ) -> Result<Measurement> {
        let threshold = Threshold::try_from(threshold)?;

        let start = Instant::now();
        let gray = normalize(gray, self.config.canonical, self.config.resize);
        let load_ms = elapsed_ms(start);

        self.run(&gray, threshold, label, load_ms)
    }

    /// Area in square units for each threshold, without writing any output
    ///
    /// The image is decoded once; thresholds are evaluated in parallel and
    /// returned in the order given.
    pub fn sweep<P, I>(&self, image_path: P, thresholds: I) -> Result<Vec<(u8, f64)>>
    where
        P: AsRef<Path>,
        I: IntoIterator<Item = i64>,
    {
        let thresholds = thresholds
            .into_iter()
            .map(Threshold::try_from)
            .collect::<Result<Vec<_>>>()?;
        let gray = load_canonical(image_path, self.config.canonical, self.config.resize)?;
        let scale = self.scale();
        let counts = foreground_counts(gray.as_raw());

        Ok(thresholds
            .par_iter()
            .map(|&t| {
                if counts[t.value() as usize] == 0 {
                    return (t.value(), 0.0);
                }
                let seg = segment(&gray, t);
                (t.value(), scale.to_square_units(seg.pixel_area))
            })
            .collect())
    }

    /// Segment a canonical raster without composing or writing anything
    pub fn segment_canonical(&self, gray: &GrayImage, threshold: i64) -> Result<Segmentation> {
        let threshold = Threshold::try_from(threshold)?;
        Ok(segment(gray, threshold))
    }

    fn run(
        &self,
        gray: &GrayImage,
        threshold: Threshold,
        stem: &str,
        load_ms: f64,
    ) -> Result<Measurement> {
        let scale = self.scale();

        let start = Instant::now();
        let segmentation = segment(gray, threshold);
        let segment_ms = elapsed_ms(start);

        let start = Instant::now();
        let target = output_path(&self.config.output, stem, threshold);
        let (output_path, area_units) =
            compositor::render(gray, &segmentation, scale, &self.config, &target)?;
        let composite_ms = elapsed_ms(start);

        let timings = StageTimings {
            load_ms,
            segment_ms,
            composite_ms,
        };
        tracing::debug!(
            "stages: load {:.1} ms, segment {:.1} ms, composite {:.1} ms",
            timings.load_ms,
            timings.segment_ms,
            timings.composite_ms
        );
        tracing::info!(
            threshold = threshold.value(),
            contours = segmentation.contour_count,
            area = area_units,
            "image saved to {}",
            output_path.display()
        );

        let bounding_box = segmentation.contour.as_ref().and_then(|c| c.bounding_box());
        Ok(Measurement {
            output_path,
            area_units,
            pixel_area: segmentation.pixel_area,
            scale,
            threshold: threshold.value(),
            contour_count: segmentation.contour_count,
            bounding_box,
            contour: segmentation.contour,
            timings,
        })
    }
}
