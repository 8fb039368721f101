//! Per-pixel water classification.
//!
//! Open water combines a dark surface with little or no vegetation, so both
//! classifiers take the same shape: a strict upper bound on the reflective
//! discriminant (broadband albedo or MODIS band 7 reflectance) AND a strict
//! upper bound on NDVI.

use serde::{Deserialize, Serialize};

use crate::types::{MaskCell, NOT_WATER, WATER};

/// Albedo below which a surface may be water (exclusive)
pub const ALBEDO_WATER_MAX: f64 = 0.1;

/// MODIS band 7 (2105-2155 nm) surface reflectance below which a surface may be water (exclusive)
pub const MODIS_REF7_WATER_MAX: f64 = 0.04;

/// NDVI below which a surface may be water (exclusive), shared by both classifiers
pub const NDVI_WATER_MAX: f64 = 0.1;

/// Water detection from albedo and NDVI using the pinned thresholds.
///
/// Returns 1 when `albedo < 0.1` and `ndvi < 0.1`, otherwise 0.
pub fn water(albedo: f64, ndvi: f64) -> MaskCell {
    WaterThresholds::default().water(albedo, ndvi)
}

/// Water detection from MODIS band 7 reflectance and NDVI using the pinned thresholds.
///
/// Returns 1 when `surf_ref_7 < 0.04` and `ndvi < 0.1`, otherwise 0.
pub fn water_modis(surf_ref_7: f64, ndvi: f64) -> MaskCell {
    WaterThresholds::default().water_modis(surf_ref_7, ndvi)
}

/// Pixel classifier used by the row driver
pub trait WaterClassifier: Sync {
    /// Classify a pixel from broadband albedo and NDVI
    fn water(&self, albedo: f64, ndvi: f64) -> MaskCell;

    /// Classify a pixel from MODIS band 7 reflectance and NDVI
    fn water_modis(&self, surf_ref_7: f64, ndvi: f64) -> MaskCell;
}

/// Threshold set for both classifiers
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WaterThresholds {
    /// Exclusive upper bound on albedo
    pub albedo_max: f64,
    /// Exclusive upper bound on MODIS band 7 reflectance
    pub ref7_max: f64,
    /// Exclusive upper bound on NDVI
    pub ndvi_max: f64,
}

impl Default for WaterThresholds {
    fn default() -> Self {
        Self {
            albedo_max: ALBEDO_WATER_MAX,
            ref7_max: MODIS_REF7_WATER_MAX,
            ndvi_max: NDVI_WATER_MAX,
        }
    }
}

impl WaterThresholds {
    fn classify(&self, discriminant: f64, discriminant_max: f64, ndvi: f64) -> MaskCell {
        if discriminant < discriminant_max && ndvi < self.ndvi_max {
            WATER
        } else {
            NOT_WATER
        }
    }
}

impl WaterClassifier for WaterThresholds {
    fn water(&self, albedo: f64, ndvi: f64) -> MaskCell {
        self.classify(albedo, self.albedo_max, ndvi)
    }

    fn water_modis(&self, surf_ref_7: f64, ndvi: f64) -> MaskCell {
        self.classify(surf_ref_7, self.ref7_max, ndvi)
    }
}
