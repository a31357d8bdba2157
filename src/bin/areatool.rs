use clap::{Args, Parser, Subcommand};
use rayon::prelude::*;
use rust_area::config::OutputPolicy;
use rust_area::loader::load_canonical;
use rust_area::tools::{
    batch_limit_from_env, grayscale_stats, image_paths, mask_stats, threshold_range,
};
use rust_area::{ErrorKind, MeasureConfig, MeasureError, Measurement, Measurer, Workspace};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;

type CliError = Box<dyn std::error::Error + Send + Sync>;
type CliResult<T> = Result<T, CliError>;

#[derive(Parser)]
#[command(name = "areatool", version, about = "Measure object area against a reference square")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Args)]
struct EngineArgs {
    /// JSON engine configuration; `AREA_*` variables apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Directory for annotated images; workspace commands always write to
    /// `<workspace>/processed`.
    #[arg(long)]
    out_dir: Option<PathBuf>,
}

impl EngineArgs {
    fn measure_config(&self) -> CliResult<MeasureConfig> {
        let mut config = match &self.config {
            Some(path) => MeasureConfig::from_json_file(path)?,
            None => MeasureConfig::from_env(),
        };
        if let Some(dir) = &self.out_dir {
            config.output = OutputPolicy::PerRequest { dir: dir.clone() };
        }
        Ok(config)
    }

    fn measurer(&self) -> CliResult<Measurer> {
        Ok(Measurer::new(self.measure_config()?)?)
    }
}

#[derive(Subcommand)]
enum Command {
    /// Measure the largest object in one image
    Measure {
        #[arg(long)]
        image: PathBuf,
        #[arg(long, allow_hyphen_values = true)]
        threshold: i64,
        #[command(flatten)]
        engine: EngineArgs,
        /// Print a JSON report instead of text
        #[arg(long)]
        json: bool,
    },
    /// Print grayscale, mask and contour stats without writing anything
    Inspect {
        #[arg(long)]
        image: PathBuf,
        #[arg(long, allow_hyphen_values = true)]
        threshold: i64,
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Area for a range of thresholds without writing anything
    Sweep {
        #[arg(long)]
        image: PathBuf,
        #[arg(long, default_value_t = 0)]
        from: i64,
        #[arg(long, default_value_t = 255)]
        to: i64,
        #[arg(long, default_value_t = 16)]
        step: i64,
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long)]
        json: bool,
    },
    /// Copy an image into a workspace and measure it
    Upload {
        #[arg(long)]
        workspace: PathBuf,
        #[arg(long)]
        image: PathBuf,
        #[arg(long, allow_hyphen_values = true)]
        threshold: i64,
        #[command(flatten)]
        engine: EngineArgs,
        #[arg(long)]
        json: bool,
    },
    /// Re-measure a previously uploaded image at another threshold
    Rethreshold {
        #[arg(long)]
        workspace: PathBuf,
        #[arg(long)]
        name: String,
        #[arg(long, allow_hyphen_values = true)]
        threshold: i64,
        #[command(flatten)]
        engine: EngineArgs,
        #[arg(long)]
        json: bool,
    },
    /// Measure every image under a directory tree
    Batch {
        #[arg(long)]
        root: PathBuf,
        #[arg(long, allow_hyphen_values = true)]
        threshold: i64,
        #[arg(long)]
        limit: Option<usize>,
        #[command(flatten)]
        engine: EngineArgs,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let result = match cli.command {
        Command::Measure {
            image,
            threshold,
            engine,
            json,
        } => measure_cmd(&image, threshold, &engine, json),
        Command::Inspect {
            image,
            threshold,
            config,
        } => inspect_cmd(&image, threshold, config.as_deref()),
        Command::Sweep {
            image,
            from,
            to,
            step,
            config,
            json,
        } => sweep_cmd(&image, from, to, step, config.as_deref(), json),
        Command::Upload {
            workspace,
            image,
            threshold,
            engine,
            json,
        } => upload_cmd(&workspace, &image, threshold, &engine, json),
        Command::Rethreshold {
            workspace,
            name,
            threshold,
            engine,
            json,
        } => rethreshold_cmd(&workspace, &name, threshold, &engine, json),
        Command::Batch {
            root,
            threshold,
            limit,
            engine,
        } => batch_cmd(&root, threshold, limit, &engine),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::from(exit_code(err.as_ref()))
        }
    }
}

fn exit_code(err: &(dyn std::error::Error + 'static)) -> u8 {
    match err.downcast_ref::<MeasureError>().map(MeasureError::kind) {
        Some(ErrorKind::InvalidInput) => 2,
        Some(ErrorKind::Decode) => 3,
        Some(ErrorKind::Io) => 4,
        None => 1,
    }
}

fn engine_from(config: Option<&Path>) -> CliResult<Measurer> {
    EngineArgs {
        config: config.map(Path::to_path_buf),
        out_dir: None,
    }
    .measurer()
}

fn report(measurement: &Measurement, json: bool) -> CliResult<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(measurement)?);
    } else {
        println!("Area: {:.4} square units", measurement.area_units);
        println!(
            "Pixels: {:.0} px^2 at {:.2} px/unit, threshold {}",
            measurement.pixel_area,
            measurement.scale.pixels_per_unit(),
            measurement.threshold
        );
        println!("Contours: {}", measurement.contour_count);
        println!("Output: {}", measurement.output_path.display());
    }
    Ok(())
}

fn measure_cmd(image: &Path, threshold: i64, engine: &EngineArgs, json: bool) -> CliResult<()> {
    let measurer = engine.measurer()?;
    let measurement = measurer.measure(image, threshold)?;
    report(&measurement, json)
}

fn inspect_cmd(image: &Path, threshold: i64, config: Option<&Path>) -> CliResult<()> {
    let measurer = engine_from(config)?;
    let settings = measurer.config();
    let gray = load_canonical(image, settings.canonical, settings.resize)?;
    let segmentation = measurer.segment_canonical(&gray, threshold)?;

    println!(
        "Image: {} ({}x{} canonical)",
        image.display(),
        gray.width(),
        gray.height()
    );
    let gray_stats = grayscale_stats(gray.as_raw());
    println!(
        "Grayscale range: {}-{}, average: {}",
        gray_stats.min, gray_stats.max, gray_stats.avg
    );

    let stats = mask_stats(&segmentation.mask);
    println!(
        "Mask: foreground_pixels={} total={} foreground_ratio={:.2}%",
        stats.foreground_pixels,
        stats.total_pixels,
        stats.foreground_ratio * 100.0
    );
    println!("External contours: {}", segmentation.contour_count);
    match &segmentation.contour {
        Some(contour) => println!(
            "Largest: {:.0} px^2, {} vertices, bbox {:?}",
            segmentation.pixel_area,
            contour.len(),
            contour.bounding_box()
        ),
        None => println!("Largest: none"),
    }
    println!(
        "Scale: {:.2} px/unit, area {:.4} square units",
        measurer.scale().pixels_per_unit(),
        measurer.scale().to_square_units(segmentation.pixel_area)
    );
    Ok(())
}

fn sweep_cmd(
    image: &Path,
    from: i64,
    to: i64,
    step: i64,
    config: Option<&Path>,
    json: bool,
) -> CliResult<()> {
    let thresholds = threshold_range(from, to, step);
    if thresholds.is_empty() {
        return Err(MeasureError::InvalidConfig(format!(
            "empty threshold range {from}..={to} step {step}"
        ))
        .into());
    }

    let measurer = engine_from(config)?;
    let start = Instant::now();
    let areas = measurer.sweep(image, thresholds)?;
    tracing::debug!(
        "swept {} thresholds in {:.1} ms",
        areas.len(),
        start.elapsed().as_secs_f64() * 1000.0
    );

    if json {
        let rows: Vec<serde_json::Value> = areas
            .iter()
            .map(|&(threshold, area)| {
                serde_json::json!({ "threshold": threshold, "area_units": area })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
    } else {
        println!("threshold  area");
        for (threshold, area) in areas {
            println!("{threshold:>9}  {area:.4}");
        }
    }
    Ok(())
}

fn upload_cmd(
    workspace: &Path,
    image: &Path,
    threshold: i64,
    engine: &EngineArgs,
    json: bool,
) -> CliResult<()> {
    let workspace = Workspace::open(workspace, engine.measure_config()?)?;
    let name = workspace.ingest(image)?;
    let measurement = workspace.measure_upload(&name, threshold)?;
    if !json {
        println!("Stored as: {name}");
    }
    report(&measurement, json)
}

fn rethreshold_cmd(
    workspace: &Path,
    name: &str,
    threshold: i64,
    engine: &EngineArgs,
    json: bool,
) -> CliResult<()> {
    let workspace = Workspace::open(workspace, engine.measure_config()?)?;
    let measurement = workspace.measure_upload(name, threshold)?;
    report(&measurement, json)
}

fn batch_cmd(
    root: &Path,
    threshold: i64,
    limit: Option<usize>,
    engine: &EngineArgs,
) -> CliResult<()> {
    let mut config = engine.measure_config()?;
    if let OutputPolicy::Fixed { .. } = config.output {
        tracing::warn!(
            "fixed output path is shared by every image; switching to per-request names"
        );
        config.output = OutputPolicy::default();
    }
    let measurer = Measurer::new(config)?;

    let images = image_paths(root, limit.or_else(batch_limit_from_env));
    if images.is_empty() {
        println!("No images found under {}", root.display());
        return Ok(());
    }

    let start = Instant::now();
    let results: Vec<(PathBuf, rust_area::Result<Measurement>)> = images
        .into_par_iter()
        .map(|path| {
            let result = measurer.measure(&path, threshold);
            (path, result)
        })
        .collect();

    let mut failures = 0usize;
    let mut first_error: Option<MeasureError> = None;
    for (path, result) in results {
        match result {
            Ok(m) => println!(
                "{}: {:.4} -> {}",
                path.display(),
                m.area_units,
                m.output_path.display()
            ),
            Err(err) => {
                failures += 1;
                eprintln!("{}: {}", path.display(), err);
                first_error.get_or_insert(err);
            }
        }
    }
    tracing::info!(
        failures,
        "batch finished in {:.1} ms",
        start.elapsed().as_secs_f64() * 1000.0
    );

    match first_error {
        Some(err) => Err(err.into()),
        None => Ok(()),
    }
}
