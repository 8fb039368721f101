//! Core water detection modules

pub mod classifier;
pub mod config;
pub mod detector;

// Re-export main types
pub use classifier::{
    water, water_modis, WaterClassifier, WaterThresholds, ALBEDO_WATER_MAX, MODIS_REF7_WATER_MAX,
    NDVI_WATER_MAX,
};
pub use config::{DetectionConfig, LayerSelection};
pub use detector::{DetectionParams, WaterDetector};
