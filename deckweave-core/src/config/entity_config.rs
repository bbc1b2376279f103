//! Entity mapping configuration.

use serde::{Deserialize, Serialize};

/// Configuration for entity extraction and relationship mapping.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct EntityConfig {
    /// Similarity at or above which same-type entities merge. Default: 0.85.
    pub merge_similarity_threshold: Option<f64>,
    /// Document co-occurrences required to infer a partnership. Default: 3.
    pub cooccurrence_threshold: Option<usize>,
    /// Characters of context captured around each mention. Default: 100.
    pub context_window: Option<usize>,
}

impl EntityConfig {
    pub fn effective_merge_similarity_threshold(&self) -> f64 {
        self.merge_similarity_threshold.unwrap_or(0.85)
    }

    pub fn effective_cooccurrence_threshold(&self) -> usize {
        self.cooccurrence_threshold.unwrap_or(3)
    }

    pub fn effective_context_window(&self) -> usize {
        self.context_window.unwrap_or(100)
    }
}
