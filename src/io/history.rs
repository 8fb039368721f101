//! Provenance record attached to the output mask

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use crate::core::{LayerSelection, WaterThresholds};
use crate::types::ClassificationMode;

/// Prefix of every metadata key written to the output
pub const METADATA_PREFIX: &str = "WATER_";

/// Who produced an output mask, when, and from which inputs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct History {
    pub map: String,
    pub created: DateTime<Utc>,
    pub creator: String,
    pub command: String,
    pub mode: ClassificationMode,
    /// (option key, layer name) of every input
    pub inputs: Vec<(String, String)>,
    pub thresholds: WaterThresholds,
}

impl History {
    /// History for the current process: timestamped now, command line from `std::env::args`
    pub fn new(selection: &LayerSelection, thresholds: WaterThresholds) -> Self {
        let command = std::env::args().collect::<Vec<_>>().join(" ");
        let creator = std::env::var("USER")
            .or_else(|_| std::env::var("USERNAME"))
            .unwrap_or_else(|_| "unknown".to_string());

        Self {
            map: selection.output.clone(),
            created: Utc::now(),
            creator,
            command,
            mode: selection.mode,
            inputs: vec![
                ("ndvi".to_string(), selection.ndvi.clone()),
                (selection.mode.secondary_key().to_string(), selection.secondary.clone()),
            ],
            thresholds,
        }
    }

    pub fn with_command(mut self, command: impl Into<String>) -> Self {
        self.command = command.into();
        self
    }

    /// Flatten into `(key, value)` metadata items
    pub fn metadata_items(&self) -> Vec<(String, String)> {
        let mut items = vec![
            key_value("MAP", &self.map),
            key_value("DESCRIPTION", "Water detection, 1 if found, 0 if not"),
            key_value("CREATED", &self.created.to_rfc3339_opts(SecondsFormat::Secs, true)),
            key_value("CREATOR", &self.creator),
            key_value("COMMAND", &self.command),
            key_value("MODE", &self.mode.to_string()),
        ];

        for (key, layer) in &self.inputs {
            items.push(key_value(&format!("SOURCE_{}", key.to_uppercase()), layer));
        }

        items.push(key_value("NDVI_MAX", &self.thresholds.ndvi_max.to_string()));
        match self.mode {
            ClassificationMode::Albedo => {
                items.push(key_value("ALBEDO_MAX", &self.thresholds.albedo_max.to_string()))
            }
            ClassificationMode::Modis => {
                items.push(key_value("REF7_MAX", &self.thresholds.ref7_max.to_string()))
            }
        }

        items
    }
}

fn key_value(key: &str, value: &str) -> (String, String) {
    (format!("{}{}", METADATA_PREFIX, key), value.to_string())
}
