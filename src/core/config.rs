use serde::{Deserialize, Serialize};

use crate::types::{ClassificationMode, WaterError, WaterResult};

/// Layer names chosen for one run, before validation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectionConfig {
    /// NDVI input layer
    pub ndvi: String,
    /// Broadband albedo input layer
    pub albedo: Option<String>,
    /// MODIS band 7 surface reflectance input layer
    pub modref7: Option<String>,
    /// Output water layer
    pub water: String,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            ndvi: "ndvi".to_string(),
            albedo: None,
            modref7: None,
            water: "water".to_string(),
        }
    }
}

/// Validated inputs and output for one run; exactly one secondary layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerSelection {
    pub ndvi: String,
    pub secondary: String,
    pub mode: ClassificationMode,
    pub output: String,
}

impl DetectionConfig {
    pub fn albedo(ndvi: &str, albedo: &str, water: &str) -> Self {
        Self {
            ndvi: ndvi.to_string(),
            albedo: Some(albedo.to_string()),
            modref7: None,
            water: water.to_string(),
        }
    }

    pub fn modis(ndvi: &str, modref7: &str, water: &str) -> Self {
        Self {
            ndvi: ndvi.to_string(),
            albedo: None,
            modref7: Some(modref7.to_string()),
            water: water.to_string(),
        }
    }

    /// Resolve the classification mode. Fails when neither or both secondary
    /// layers are given, or when a layer name is empty.
    pub fn selection(&self) -> WaterResult<LayerSelection> {
        if self.ndvi.trim().is_empty() {
            return Err(WaterError::Config("NDVI layer name is empty".to_string()));
        }
        if self.water.trim().is_empty() {
            return Err(WaterError::Config("output layer name is empty".to_string()));
        }

        let (mode, secondary) = match (&self.albedo, &self.modref7) {
            (Some(albedo), None) => (ClassificationMode::Albedo, albedo),
            (None, Some(modref7)) => (ClassificationMode::Modis, modref7),
            (None, None) => {
                return Err(WaterError::Config(
                    "needs either albedo or MODIS surface reflectance in band 7".to_string(),
                ))
            }
            (Some(_), Some(_)) => {
                return Err(WaterError::Config(
                    "albedo and MODIS band 7 reflectance are mutually exclusive, give only one"
                        .to_string(),
                ))
            }
        };

        if secondary.trim().is_empty() {
            return Err(WaterError::Config(format!(
                "{} layer name is empty",
                mode.secondary_key()
            )));
        }

        Ok(LayerSelection {
            ndvi: self.ndvi.clone(),
            secondary: secondary.clone(),
            mode,
            output: self.water.clone(),
        })
    }
}
