//! Synthesis configuration.

use serde::{Deserialize, Serialize};

/// Configuration for document graph building and clustering.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SynthesisConfig {
    /// Shared-entity count above which SIMILAR_TO is emitted. Default: 2.
    pub shared_entity_threshold: Option<usize>,
    /// Average-linkage similarity required to merge clusters. Default: 0.6.
    pub cluster_similarity_threshold: Option<f64>,
    /// Minimum documents per emitted cluster. Default: 2.
    pub min_cluster_size: Option<usize>,
    /// Use normalized numeric comparison for contradiction detection
    /// instead of raw string inequality. Default: false.
    pub normalized_metric_comparison: Option<bool>,
}

impl SynthesisConfig {
    pub fn effective_shared_entity_threshold(&self) -> usize {
        self.shared_entity_threshold.unwrap_or(2)
    }

    pub fn effective_cluster_similarity_threshold(&self) -> f64 {
        self.cluster_similarity_threshold.unwrap_or(0.6)
    }

    pub fn effective_min_cluster_size(&self) -> usize {
        self.min_cluster_size.unwrap_or(2)
    }

    pub fn effective_normalized_metric_comparison(&self) -> bool {
        self.normalized_metric_comparison.unwrap_or(false)
    }
}
