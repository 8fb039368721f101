//! waterdetect CLI - water detection, 1 if found, 0 if not

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Parser;

use waterdetect::core::{ALBEDO_WATER_MAX, MODIS_REF7_WATER_MAX, NDVI_WATER_MAX};
use waterdetect::{DetectionConfig, DetectionParams, LayerCatalog, RunOptions, WaterThresholds};

#[derive(Parser)]
#[command(name = "waterdetect")]
#[command(author, version, about = "Water detection, 1 if found, 0 if not", long_about = None)]
struct Cli {
    /// Name of the NDVI map [-]
    #[arg(long, default_value = "ndvi")]
    ndvi: String,

    /// Name of the Albedo map [-]
    #[arg(long)]
    albedo: Option<String>,

    /// Name of the MODIS surface reflectance band 7 map [-]
    #[arg(long = "modref7", visible_alias = "Modref7")]
    modref7: Option<String>,

    /// Name of the output water layer [0/1]
    #[arg(long, default_value = "water")]
    water: String,

    /// Directory searched for input layers and receiving the output
    #[arg(long, default_value = ".")]
    mapset: PathBuf,

    /// Replace an existing output layer
    #[arg(long)]
    overwrite: bool,

    /// Albedo below which a pixel may be water
    #[arg(long, default_value_t = ALBEDO_WATER_MAX)]
    albedo_max: f64,

    /// MODIS band 7 reflectance below which a pixel may be water
    #[arg(long, default_value_t = MODIS_REF7_WATER_MAX)]
    ref7_max: f64,

    /// NDVI below which a pixel may be water
    #[arg(long, default_value_t = NDVI_WATER_MAX)]
    ndvi_max: f64,

    /// Rows processed per block
    #[arg(long, default_value_t = 64)]
    block_rows: usize,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn setup_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_target(false)
        .init();
}

impl Cli {
    fn config(&self) -> DetectionConfig {
        DetectionConfig {
            ndvi: self.ndvi.clone(),
            albedo: self.albedo.clone(),
            modref7: self.modref7.clone(),
            water: self.water.clone(),
        }
    }

    fn options(&self) -> RunOptions {
        RunOptions {
            thresholds: WaterThresholds {
                albedo_max: self.albedo_max,
                ref7_max: self.ref7_max,
                ndvi_max: self.ndvi_max,
            },
            params: DetectionParams {
                block_rows: self.block_rows,
                ..DetectionParams::default()
            },
            overwrite: self.overwrite,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    let config = cli.config();
    let options = cli.options();
    let catalog = LayerCatalog::new(cli.mapset.clone());

    let start = Instant::now();
    let output = waterdetect::run(&config, &catalog, &options)
        .with_context(|| format!("Water detection into <{}> failed", config.water))?;

    println!("Water mask saved to: {}", output.display());
    println!("  Processing time: {:.2?}", start.elapsed());
    Ok(())
}
