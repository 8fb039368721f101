//! waterdetect: water detection from satellite-derived rasters
//!
//! Classifies every pixel as water (1), not water (0) or null from an NDVI layer
//! combined with either broadband albedo or MODIS band 7 surface reflectance.
//! Rasters are read and written row by row through GDAL.

pub mod types;
pub mod io;
pub mod core;
pub mod pipeline;

// Re-export main types and functions for easier access
pub use types::{
    CellType, ClassificationMode, LayerHeader, MaskCell, RowBuffer, WaterError, WaterResult,
    MASK_NULL, NOT_WATER, WATER,
};

pub use crate::core::{
    water, water_modis, DetectionConfig, DetectionParams, WaterClassifier, WaterDetector,
    WaterThresholds,
};
pub use io::{GdalLayer, GdalMaskWriter, History, LayerCatalog, LayerSource, MaskSink};
pub use pipeline::{run, RunOptions};
