//! End-to-end water detection over GDAL rasters

use std::path::{Path, PathBuf};

use crate::core::{
    DetectionConfig, DetectionParams, LayerSelection, WaterDetector, WaterThresholds,
};
use crate::io::{GdalLayer, GdalMaskWriter, History, LayerCatalog, LayerSource, MaskSink};
use crate::types::{WaterError, WaterResult};

/// Options for a run beyond the layer names
#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub thresholds: WaterThresholds,
    pub params: DetectionParams,
    /// Replace an existing output layer
    pub overwrite: bool,
}

/// Detect water for `config`, resolving layer names through `catalog`.
///
/// The configuration is validated before any layer is looked up or opened.
/// The mask is written next to its final path and renamed over any existing
/// output only after every row and the history are written.
/// Returns the path of the written mask.
pub fn run(
    config: &DetectionConfig,
    catalog: &LayerCatalog,
    options: &RunOptions,
) -> WaterResult<PathBuf> {
    let selection = config.selection()?;
    log::info!(
        "Water detection in {} mode: ndvi=<{}> {}=<{}> -> <{}>",
        selection.mode,
        selection.ndvi,
        selection.mode.secondary_key(),
        selection.secondary,
        selection.output
    );

    let ndvi_path = catalog.locate(&selection.ndvi)?;
    let secondary_path = catalog.locate(&selection.secondary)?;
    ensure_output_is_not_input(
        &catalog.output_path(&selection.output),
        &[ndvi_path.as_path(), secondary_path.as_path()],
    )?;
    let output_path = catalog.prepare_output(&selection.output, options.overwrite)?;

    let mut ndvi = GdalLayer::open(&selection.ndvi, &ndvi_path)?;
    let mut secondary = GdalLayer::open(&selection.secondary, &secondary_path)?;
    ndvi.header().ensure_same_extent(secondary.header())?;

    let staging_path = LayerCatalog::staging_path(&output_path);
    if let Err(e) = write_mask(&selection, options, &staging_path, &mut ndvi, &mut secondary) {
        if staging_path.exists() {
            if let Err(cleanup) = std::fs::remove_file(&staging_path) {
                log::warn!("Cannot remove {}: {}", staging_path.display(), cleanup);
            }
        }
        return Err(e);
    }

    // existing output is only replaced by a complete mask
    std::fs::rename(&staging_path, &output_path)?;

    log::info!("Water mask written to {}", output_path.display());
    Ok(output_path)
}

fn write_mask(
    selection: &LayerSelection,
    options: &RunOptions,
    path: &Path,
    ndvi: &mut GdalLayer,
    secondary: &mut GdalLayer,
) -> WaterResult<()> {
    // the dataset is closed on drop, before the rename
    let mut writer = GdalMaskWriter::create(&selection.output, path, ndvi.header())?;

    let detector = WaterDetector::new(options.thresholds, options.params.clone());
    detector.detect(selection.mode, ndvi, secondary, &mut writer)?;

    writer.write_history(&History::new(selection, options.thresholds))
}

/// Fail when `output` is the same file as one of the inputs
fn ensure_output_is_not_input(output: &Path, inputs: &[&Path]) -> WaterResult<()> {
    if !output.exists() {
        return Ok(());
    }
    let output = output.canonicalize()?;
    for input in inputs {
        if input.canonicalize()? == output {
            return Err(WaterError::Config(format!(
                "output {} is also an input layer",
                output.display()
            )));
        }
    }
    Ok(())
}
