//! Insight generation configuration.

use serde::{Deserialize, Serialize};

/// Configuration for trend detection and insight scoring.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct InsightConfig {
    /// Minimum |r| for an accepted trend. Default: 0.7.
    pub trend_confidence_threshold: Option<f64>,
    /// Z-score above which a point is anomalous. Default: 3.0.
    pub anomaly_zscore_threshold: Option<f64>,
    /// Maximum insights returned by a generation pass. Default: 10.
    pub max_insights: Option<usize>,
    /// Minimum documents per extracted theme. Default: 2.
    pub theme_min_support: Option<usize>,
    /// DBSCAN neighborhood radius on 1 - cosine distances. Default: 0.3.
    pub theme_eps: Option<f64>,
}

impl InsightConfig {
    pub fn effective_trend_confidence_threshold(&self) -> f64 {
        self.trend_confidence_threshold.unwrap_or(0.7)
    }

    pub fn effective_anomaly_zscore_threshold(&self) -> f64 {
        self.anomaly_zscore_threshold.unwrap_or(3.0)
    }

    pub fn effective_max_insights(&self) -> usize {
        self.max_insights.unwrap_or(10)
    }

    pub fn effective_theme_min_support(&self) -> usize {
        self.theme_min_support.unwrap_or(2)
    }

    pub fn effective_theme_eps(&self) -> f64 {
        self.theme_eps.unwrap_or(0.3)
    }
}
