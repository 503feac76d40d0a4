//! fieldndvi CLI - NDVI time series over a field boundary

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use fieldndvi_algorithms::imagery::{ndvi, NdviParams};
use fieldndvi_algorithms::statistics::scene_mean;
use fieldndvi_algorithms::vector::{clip_raster, ClipParams};
use fieldndvi_core::io::{read_geotiff, read_geotiff_info, write_geotiff};
use fieldndvi_core::Raster;
use fieldndvi_pipeline::{
    load_boundary, Pipeline, PipelineConfig, ProcessingMode, SceneId, StageStore,
};

// ─── CLI structure ──────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "fieldndvi")]
#[command(author, version, about = "NDVI time series over a field boundary", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show information about a raster file
    Info {
        /// Input raster file
        input: PathBuf,
    },
    /// Compute NDVI from a multi-band scene
    Ndvi {
        /// Input scene
        input: PathBuf,
        /// Output NDVI raster
        output: PathBuf,
        /// Red band (1-based)
        #[arg(long, default_value = "3")]
        red: usize,
        /// Near-infrared band (1-based)
        #[arg(long, default_value = "4")]
        nir: usize,
    },
    /// Mask and crop a raster to a GeoJSON boundary
    Clip {
        /// Input raster
        input: PathBuf,
        /// GeoJSON boundary
        boundary: PathBuf,
        /// Output raster
        output: PathBuf,
        /// Keep the input extent, only mask
        #[arg(long)]
        no_crop: bool,
    },
    /// Print the mean of the valid cells of a single-band raster
    Mean {
        /// Input raster
        input: PathBuf,
    },
    /// Run the whole pipeline over a data directory
    Run {
        /// Data directory holding IMAGENS_PLANET/, gleba01.geojson and the outputs
        #[arg(short, long, default_value = "data")]
        data_dir: PathBuf,
        /// JSON configuration file; flags below override it
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Scene directory
        #[arg(long)]
        scenes: Option<PathBuf>,
        /// GeoJSON boundary
        #[arg(short, long)]
        boundary: Option<PathBuf>,
        /// Output CSV table
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Pass rasters between stages in memory instead of writing them
        #[arg(long)]
        in_memory: bool,
        /// Number of worker threads (default: all cores)
        #[arg(short, long)]
        threads: Option<usize>,
        /// Process scenes one at a time
        #[arg(long, conflicts_with = "threads")]
        sequential: bool,
    },
}

// ─── Helpers ────────────────────────────────────────────────────────────

fn setup_logging(verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("setting default subscriber failed")
}

fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

fn read_scene(path: &Path) -> Result<Raster<f64>> {
    let pb = spinner("Reading scene...");
    let raster: Raster<f64> = read_geotiff(path).context("Failed to read scene")?;
    pb.finish_and_clear();
    info!(
        "Input: {} x {}, {} band(s)",
        raster.cols(),
        raster.rows(),
        raster.band_count()
    );
    Ok(raster)
}

fn read_index(path: &Path) -> Result<Raster<f32>> {
    let pb = spinner("Reading raster...");
    let raster: Raster<f32> = read_geotiff(path).context("Failed to read raster")?;
    pb.finish_and_clear();
    Ok(raster)
}

fn write_result(raster: &Raster<f32>, path: &Path) -> Result<()> {
    let pb = spinner("Writing output...");
    write_geotiff(raster, path).context("Failed to write output")?;
    pb.finish_and_clear();
    Ok(())
}

fn done(name: &str, path: &Path, elapsed: std::time::Duration) {
    println!("{} saved to: {}", name, path.display());
    println!("  Processing time: {:.2?}", elapsed);
}

#[allow(clippy::too_many_arguments)]
fn build_config(
    data_dir: PathBuf,
    config: Option<PathBuf>,
    scenes: Option<PathBuf>,
    boundary: Option<PathBuf>,
    output: Option<PathBuf>,
    in_memory: bool,
    threads: Option<usize>,
    sequential: bool,
) -> Result<PipelineConfig> {
    let mut cfg = match config {
        Some(path) => {
            let text = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config {}", path.display()))?;
            serde_json::from_str(&text)
                .with_context(|| format!("Invalid config {}", path.display()))?
        }
        None => PipelineConfig::from_data_dir(&data_dir),
    };

    if let Some(scenes) = scenes {
        cfg.scene_dir = scenes;
    }
    if let Some(boundary) = boundary {
        cfg.boundary = boundary;
    }
    if let Some(output) = output {
        cfg.output = output;
    }
    if in_memory {
        cfg.stages = StageStore::InMemory;
    }
    if sequential {
        cfg.mode = ProcessingMode::Sequential;
    } else if threads.is_some() {
        cfg.mode = ProcessingMode::from_threads(threads);
    }

    Ok(cfg)
}

// ─── Main ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose)?;

    match cli.command {
        Commands::Info { input } => {
            let meta = read_geotiff_info(&input).context("Failed to read raster header")?;
            let raster = read_scene(&input)?;
            let bounds = raster.bounds();

            println!("File: {}", input.display());
            println!(
                "Dimensions: {} x {} x {} band(s) ({} cells)",
                meta.cols,
                meta.rows,
                meta.band_count,
                raster.len()
            );
            println!("Data type: {}", meta.data_type);
            println!("Cell size: {}", raster.cell_size());
            println!(
                "Bounds: ({:.6}, {:.6}) - ({:.6}, {:.6})",
                bounds.0, bounds.1, bounds.2, bounds.3
            );
            if let Some(crs) = &meta.crs {
                println!("CRS: {}", crs);
            }
            if let Some(nodata) = meta.nodata {
                println!("NoData: {}", nodata);
            }
            for band in 1..=raster.band_count() {
                let stats = raster.statistics(band)?;
                println!("\nBand {}:", band);
                if let (Some(min), Some(max)) = (stats.min, stats.max) {
                    println!("  Min: {:.4}", min);
                    println!("  Max: {:.4}", max);
                }
                if let Some(mean) = stats.mean {
                    println!("  Mean: {:.4}", mean);
                }
                println!(
                    "  Valid cells: {} ({:.1}%)",
                    stats.valid_count,
                    100.0 * stats.valid_count as f64 / (raster.rows() * raster.cols()).max(1) as f64
                );
            }
        }

        Commands::Ndvi {
            input,
            output,
            red,
            nir,
        } => {
            let scene = read_scene(&input)?;
            let start = Instant::now();
            let result = ndvi(&scene, &NdviParams { red_band: red, nir_band: nir })
                .context("Failed to calculate NDVI")?;
            let elapsed = start.elapsed();
            write_result(&result, &output)?;
            done("NDVI", &output, elapsed);
        }

        Commands::Clip {
            input,
            boundary,
            output,
            no_crop,
        } => {
            let raster = read_index(&input)?;
            let boundary = load_boundary(&boundary).context("Failed to read boundary")?;
            let start = Instant::now();
            let result = clip_raster(&raster, &boundary, &ClipParams { crop: !no_crop })
                .context("Failed to clip raster")?;
            let elapsed = start.elapsed();
            info!("Output: {} x {}", result.cols(), result.rows());
            write_result(&result, &output)?;
            done("Clipped raster", &output, elapsed);
        }

        Commands::Mean { input } => {
            let raster = read_index(&input)?;
            let mean = scene_mean(&raster).context("Failed to compute mean")?;
            match SceneId::from_path(&input) {
                Some(id) => println!("{},{:?}", id.sample_date(), mean),
                None => println!("{:?}", mean),
            }
        }

        Commands::Run {
            data_dir,
            config,
            scenes,
            boundary,
            output,
            in_memory,
            threads,
            sequential,
        } => {
            let cfg = build_config(
                data_dir, config, scenes, boundary, output, in_memory, threads, sequential,
            )?;
            let output = cfg.output.clone();

            let pipeline = Pipeline::new(cfg).context("Failed to prepare run")?;
            let pb = spinner(&format!("Processing {} scenes...", pipeline.scenes().len()));
            let report = pipeline.execute().context("Run failed")?;
            pb.finish_and_clear();

            for failure in &report.failures {
                println!("  skipped {}: {}", failure.scene, failure.error);
            }
            println!(
                "processed {} scenes: {} written, {} skipped",
                report.attempted(),
                report.records.len(),
                report.skipped()
            );
            println!("  Table: {}", output.display());
        }
    }

    Ok(())
}
