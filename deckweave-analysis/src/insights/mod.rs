//! Theme extraction, trend analysis, and insight generation.

pub mod generator;
pub mod stats;
pub mod themes;
pub mod trends;
pub mod types;

pub use generator::{AnalysisInputs, InsightGenerator};
pub use themes::ThemeExtractor;
pub use trends::TrendAnalyzer;
pub use types::{DetectedPattern, Insight, InsightKind, PatternKind, Theme, Trend, TrendDirection};
