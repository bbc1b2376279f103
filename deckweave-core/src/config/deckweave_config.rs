//! Top-level Deckweave configuration with file-over-defaults resolution.

use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{EntityConfig, InsightConfig, SynthesisConfig};
use crate::errors::ConfigError;

/// Top-level configuration aggregating all sub-configs.
///
/// Resolution order (highest priority first):
/// 1. Project config (`deckweave.toml` in project root)
/// 2. Compiled defaults
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct DeckweaveConfig {
    pub synthesis: SynthesisConfig,
    pub entities: EntityConfig,
    pub insights: InsightConfig,
}

impl DeckweaveConfig {
    /// Load configuration, merging `deckweave.toml` from `root` over the
    /// compiled defaults when it exists.
    pub fn load(root: &Path) -> Result<Self, ConfigError> {
        let path = root.join("deckweave.toml");
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(&path).map_err(|e| ConfigError::ReadError {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

        let config: Self = toml::from_str(&raw).map_err(|e| ConfigError::ParseError {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Reject thresholds outside their meaningful ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Some(t) = self.synthesis.cluster_similarity_threshold {
            if !(0.0..=1.0).contains(&t) {
                return Err(ConfigError::InvalidValue {
                    field: "synthesis.cluster_similarity_threshold".to_string(),
                    message: format!("{t} is outside [0, 1]"),
                });
            }
        }
        if let Some(t) = self.entities.merge_similarity_threshold {
            if !(0.0..=1.0).contains(&t) {
                return Err(ConfigError::InvalidValue {
                    field: "entities.merge_similarity_threshold".to_string(),
                    message: format!("{t} is outside [0, 1]"),
                });
            }
        }
        if let Some(t) = self.insights.trend_confidence_threshold {
            if !(0.0..=1.0).contains(&t) {
                return Err(ConfigError::InvalidValue {
                    field: "insights.trend_confidence_threshold".to_string(),
                    message: format!("{t} is outside [0, 1]"),
                });
            }
        }
        Ok(())
    }
}
