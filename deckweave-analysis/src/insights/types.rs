//! Insight, theme, and trend value objects.

use serde::Serialize;
use std::fmt;

/// Category of an actionable insight. The category drives the
/// prioritization multiplier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightKind {
    Financial,
    Operational,
    Strategic,
    Risk,
    Opportunity,
}

impl InsightKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Financial => "financial",
            Self::Operational => "operational",
            Self::Strategic => "strategic",
            Self::Risk => "risk",
            Self::Opportunity => "opportunity",
        }
    }

    /// Priority multiplier. Risks outrank opportunities outrank plain
    /// financial findings.
    pub fn multiplier(&self) -> f64 {
        match self {
            Self::Risk => 1.5,
            Self::Opportunity => 1.3,
            Self::Financial => 1.2,
            Self::Strategic => 1.1,
            Self::Operational => 1.0,
        }
    }
}

impl fmt::Display for InsightKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Increasing,
    Decreasing,
}

impl TrendDirection {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Increasing => "increasing",
            Self::Decreasing => "decreasing",
        }
    }
}

impl fmt::Display for TrendDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A cross-document theme discovered by density clustering.
#[derive(Debug, Clone, Serialize)]
pub struct Theme {
    pub name: String,
    pub documents: Vec<String>,
    pub frequency: usize,
    pub entities: Vec<String>,
    pub confidence: f64,
}

/// A detected time-series trend.
#[derive(Debug, Clone, Serialize)]
pub struct Trend {
    pub metric: String,
    pub direction: TrendDirection,
    /// |slope| relative to the series mean.
    pub magnitude: f64,
    /// (first, last) timestamps of the analyzed window, epoch seconds.
    pub time_period: (u64, u64),
    pub confidence: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternKind {
    Growth,
    Decline,
    Anomaly,
}

/// A growth/decline/anomaly pattern found in raw data-point series.
#[derive(Debug, Clone, Serialize)]
pub struct DetectedPattern {
    pub kind: PatternKind,
    pub area: String,
    pub magnitude: f64,
    pub confidence: f64,
    /// Indices into the series, only for anomaly patterns.
    pub anomaly_indices: Vec<usize>,
}

/// An actionable, prioritized insight.
#[derive(Debug, Clone, Serialize)]
pub struct Insight {
    pub kind: InsightKind,
    pub title: String,
    pub description: String,
    pub supporting_data: serde_json::Map<String, serde_json::Value>,
    pub confidence: f64,
    pub priority: i64,
    pub source_ids: Vec<String>,
}
