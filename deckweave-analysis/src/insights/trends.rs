//! Time-series trend and pattern detection.

use deckweave_core::config::InsightConfig;
use deckweave_core::types::collections::FxHashMap;
use deckweave_core::types::value::ScalarValue;
use tracing::{debug, warn};

use super::stats;
use super::types::{DetectedPattern, PatternKind, Trend, TrendDirection};

const MIN_TREND_POINTS: usize = 3;
const MIN_ANOMALY_POINTS: usize = 5;
const PATTERN_CORRELATION_FLOOR: f64 = 0.7;

/// Detects linear trends and anomalies across metric time series.
pub struct TrendAnalyzer {
    confidence_threshold: f64,
    anomaly_zscore: f64,
}

impl TrendAnalyzer {
    pub fn new(config: &InsightConfig) -> Self {
        Self {
            confidence_threshold: config.effective_trend_confidence_threshold(),
            anomaly_zscore: config.effective_anomaly_zscore_threshold(),
        }
    }

    /// One trend per metric whose series correlates strongly enough.
    /// Series with fewer than three points are skipped with a log.
    pub fn analyze_trends(
        &self,
        metrics_over_time: &FxHashMap<String, Vec<(u64, f64)>>,
    ) -> Vec<Trend> {
        let mut names: Vec<&String> = metrics_over_time.keys().collect();
        names.sort_unstable();

        let mut trends = Vec::new();
        for name in names {
            let mut series = metrics_over_time[name].clone();
            if series.len() < MIN_TREND_POINTS {
                debug!(
                    metric = %name,
                    points = series.len(),
                    "not enough points for trend analysis"
                );
                continue;
            }
            series.sort_by_key(|&(t, _)| t);
            let values: Vec<f64> = series.iter().map(|&(_, v)| v).collect();

            let Some(fit) = stats::linear_fit(&values) else {
                continue;
            };
            if fit.r.abs() < self.confidence_threshold {
                continue;
            }

            let anomalies = stats::zscore_anomalies(&values, self.anomaly_zscore);
            if !anomalies.is_empty() {
                warn!(
                    metric = %name,
                    indices = ?anomalies,
                    "anomalous points inside trending series"
                );
            }

            let series_mean = stats::mean(&values);
            let magnitude = if series_mean.abs() > 0.0 {
                (fit.slope / series_mean).abs()
            } else {
                0.0
            };
            trends.push(Trend {
                metric: name.clone(),
                direction: if fit.slope > 0.0 {
                    TrendDirection::Increasing
                } else {
                    TrendDirection::Decreasing
                },
                magnitude,
                time_period: (series[0].0, series[series.len() - 1].0),
                confidence: fit.r.abs(),
            });
        }
        trends
    }

    /// Growth, decline, and anomaly patterns over per-key numeric
    /// series assembled from ordered data points.
    pub fn detect_patterns(
        &self,
        data_points: &[FxHashMap<String, ScalarValue>],
    ) -> Vec<DetectedPattern> {
        let mut series: FxHashMap<&str, Vec<f64>> = FxHashMap::default();
        for point in data_points {
            for (key, value) in point {
                if let Some(n) = value.as_number() {
                    series.entry(key).or_default().push(n);
                }
            }
        }

        let mut keys: Vec<&str> = series.keys().copied().collect();
        keys.sort_unstable();

        let mut patterns = Vec::new();
        for key in keys {
            let values = &series[key];

            if values.len() >= MIN_TREND_POINTS {
                if let Some(fit) = stats::linear_fit(values) {
                    if fit.r.abs() > PATTERN_CORRELATION_FLOOR {
                        patterns.push(DetectedPattern {
                            kind: if fit.slope > 0.0 {
                                PatternKind::Growth
                            } else {
                                PatternKind::Decline
                            },
                            area: key.to_string(),
                            magnitude: fit.slope.abs(),
                            confidence: fit.r.abs(),
                            anomaly_indices: Vec::new(),
                        });
                    }
                }
            }

            if values.len() >= MIN_ANOMALY_POINTS {
                let anomalies = stats::zscore_anomalies(values, self.anomaly_zscore);
                if !anomalies.is_empty() {
                    patterns.push(DetectedPattern {
                        kind: PatternKind::Anomaly,
                        area: key.to_string(),
                        magnitude: anomalies.len() as f64,
                        confidence: 0.8,
                        anomaly_indices: anomalies,
                    });
                }
            }
        }
        patterns
    }
}
