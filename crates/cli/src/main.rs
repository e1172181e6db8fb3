//! gridstat CLI - zonal and windowed raster statistics

mod document;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

use gridstat_algorithms::ProcessingMode;
use gridstat_algorithms::statistics::{
    Connectivity, LocalStatistic, ResultTable, Statistic, ZonalParams, aggregate, local_stats,
    regions, zonal_stats_with,
};
use gridstat_algorithms::vector::Coverage;
use gridstat_core::raster::AnyRaster;
use gridstat_core::with_any_raster;

use document::{read_features, read_raster, write_json, write_raster};

// ─── CLI structure ──────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "gridstat")]
#[command(author, version, about = "Zonal and windowed raster statistics", long_about = None)]
struct Cli {
    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Worker threads (0 = all cores, 1 = sequential)
    #[arg(short = 'j', long, global = true, default_value = "0")]
    threads: usize,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show information about a raster document
    Info {
        /// Input raster document
        input: PathBuf,
    },
    /// Statistics of a raster per zone
    Zonal {
        /// Data raster document
        data: PathBuf,
        /// Zone document: feature collection or single-band integer raster
        zones: PathBuf,
        /// How the zone document is interpreted
        #[arg(long, value_enum, default_value = "features")]
        zone_kind: ZoneKind,
        /// Comma-separated statistics
        #[arg(short, long, default_value = "mean", value_delimiter = ',')]
        stats: Vec<String>,
        /// Zone values to report (raster zones only)
        #[arg(long, value_delimiter = ',')]
        values: Option<Vec<i64>>,
        /// Claim only cells whose center lies inside a polygon
        #[arg(long)]
        cell_center: bool,
        /// Partials merged per combine step
        #[arg(long, default_value = "8")]
        fan_in: usize,
        /// Write the table as JSON instead of printing it
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Coarsen a raster by reducing blocks of cells
    Aggregate {
        /// Input raster document
        input: PathBuf,
        /// Output raster document
        output: PathBuf,
        /// Block rows
        #[arg(long, default_value = "2")]
        fy: usize,
        /// Block columns
        #[arg(long, default_value = "2")]
        fx: usize,
        #[arg(short, long, default_value = "mean")]
        stat: String,
    },
    /// Reduce the bands of a raster per cell
    Local {
        /// Input raster document
        input: PathBuf,
        /// Output raster document
        output: PathBuf,
        /// Statistic, or minband / maxband
        #[arg(short, long, default_value = "mean")]
        stat: String,
    },
    /// Label connected patches of equal value
    Regions {
        /// Input raster document
        input: PathBuf,
        /// Output raster document
        output: PathBuf,
        /// 4 or 8
        #[arg(short, long, default_value = "4")]
        connectivity: usize,
        /// Values labeled separately; other non-zero values form one class
        #[arg(long, value_delimiter = ',')]
        values: Option<Vec<i64>>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ZoneKind {
    Features,
    Raster,
}

// ─── Helpers ────────────────────────────────────────────────────────────

fn setup_logging(verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("Failed to install logger")
}

fn spinner(msg: &str) -> Result<ProgressBar> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    Ok(pb)
}

fn load(path: &Path) -> Result<AnyRaster> {
    let pb = spinner("Reading raster...")?;
    let raster = read_raster(path)?;
    pb.finish_and_clear();
    let (bands, rows, cols) = raster.shape();
    info!("Input: {} x {} x {} ({})", bands, rows, cols, raster.data_type());
    Ok(raster)
}

fn save(raster: &AnyRaster, path: &Path) -> Result<()> {
    let pb = spinner("Writing output...")?;
    write_raster(raster, path).context("Failed to write output")?;
    pb.finish_and_clear();
    Ok(())
}

fn done(name: &str, path: &Path, elapsed: std::time::Duration) {
    println!("{} saved to: {}", name, path.display());
    println!("  Processing time: {:.2?}", elapsed);
}

fn processing_mode(threads: usize) -> ProcessingMode {
    match threads {
        0 => ProcessingMode::Parallel,
        1 => ProcessingMode::Sequential,
        n => ProcessingMode::ParallelWith(n),
    }
}

fn print_info(path: &Path, raster: &AnyRaster) {
    let (bands, rows, cols) = raster.shape();
    let t = raster.transform();
    let valid = raster.validity_mask().iter().filter(|&&ok| ok).count();
    let total = bands * rows * cols;

    println!("File: {}", path.display());
    println!("Type: {}", raster.data_type());
    println!("Dimensions: {} bands x {} rows x {} cols", bands, rows, cols);
    println!("Cell size: {} x {}", t.pixel_width, t.pixel_height.abs());
    with_any_raster!(raster, s => {
        let b = s.bounds();
        println!(
            "Bounds: ({:.6}, {:.6}) - ({:.6}, {:.6})",
            b.min_x, b.min_y, b.max_x, b.max_y
        );
        println!("Chunks: {}", s.chunk_grid().len());
    });
    if let Some(crs) = raster.crs() {
        println!("CRS: {}", crs);
    }
    if let Some(nodata) = raster.nodata_f64() {
        println!("NoData: {}", nodata);
    }
    if total > 0 {
        println!(
            "Valid cells: {} ({:.1}%)",
            valid,
            100.0 * valid as f64 / total as f64
        );
    }
}

fn run_zonal(
    data: &AnyRaster,
    zones_path: &Path,
    kind: ZoneKind,
    params: &ZonalParams,
) -> Result<ResultTable> {
    let table = match kind {
        ZoneKind::Features => {
            let zones = read_features(zones_path)?;
            info!("Zones: {} features", zones.len());
            with_any_raster!(data, d => zonal_stats_with(&zones, d, params))?
        }
        ZoneKind::Raster => {
            let zones = read_raster(zones_path)?;
            with_any_raster!(&zones, z => with_any_raster!(data, d => zonal_stats_with(z, d, params)))?
        }
    };
    Ok(table)
}

// ─── Main ───────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose)?;
    let mode = processing_mode(cli.threads);

    match cli.command {
        Commands::Info { input } => {
            let raster = load(&input)?;
            print_info(&input, &raster);
        }

        Commands::Zonal {
            data,
            zones,
            zone_kind,
            stats,
            values,
            cell_center,
            fan_in,
            output,
        } => {
            let raster = load(&data)?;
            let params = ZonalParams {
                stats: Statistic::parse_list(&stats)?,
                coverage: if cell_center {
                    Coverage::CellCenter
                } else {
                    Coverage::AllTouched
                },
                raster_feature_values: values,
                processing: mode,
                fan_in,
            };

            let start = Instant::now();
            let pb = spinner("Computing zonal statistics...")?;
            let table = run_zonal(&raster, &zones, zone_kind, &params)?;
            pb.finish_and_clear();

            match output {
                Some(path) => {
                    write_json(&table, &path).context("Failed to write table")?;
                    done("Zonal statistics", &path, start.elapsed());
                }
                None => print!("{}", table),
            }
        }

        Commands::Aggregate {
            input,
            output,
            fy,
            fx,
            stat,
        } => {
            let raster = load(&input)?;
            let stat: Statistic = stat.parse()?;
            let start = Instant::now();
            let pb = spinner("Aggregating...")?;
            let result = mode.install(|_| with_any_raster!(&raster, s => aggregate(s, [fy, fx], stat)))?;
            pb.finish_and_clear();
            save(&result, &output)?;
            done("Aggregate", &output, start.elapsed());
        }

        Commands::Local {
            input,
            output,
            stat,
        } => {
            let raster = load(&input)?;
            let stat: LocalStatistic = stat.parse()?;
            let start = Instant::now();
            let pb = spinner("Reducing bands...")?;
            let result = mode.install(|_| with_any_raster!(&raster, s => local_stats(s, stat)))?;
            pb.finish_and_clear();
            save(&result, &output)?;
            done("Local statistic", &output, start.elapsed());
        }

        Commands::Regions {
            input,
            output,
            connectivity,
            values,
        } => {
            let raster = load(&input)?;
            let connectivity = Connectivity::try_from(connectivity)?;
            let start = Instant::now();
            let pb = spinner("Labeling regions...")?;
            let labels = mode.install(|_| {
                with_any_raster!(&raster, s => regions(s, connectivity, values.as_deref()))
            })?;
            pb.finish_and_clear();
            save(&AnyRaster::from(labels), &output)?;
            done("Regions", &output, start.elapsed());
        }
    }

    Ok(())
}
