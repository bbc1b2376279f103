//! Orchestration: group observations, detect conflicts, resolve them.

use deckweave_core::errors::SynthesisError;
use deckweave_core::types::collections::{FxHashMap, FxHashSet};
use deckweave_core::types::value::ScalarValue;
use serde::Serialize;
use tracing::info;

use super::detector::ConflictDetector;
use super::resolver::ConflictResolver;
use super::types::{Conflict, Observation, Resolution};

/// One source's worth of field values, with provenance.
#[derive(Debug, Clone)]
pub struct SourceRecord {
    pub source_id: String,
    pub source_type: String,
    /// Epoch seconds.
    pub extraction_date: u64,
    pub confidence: f64,
    pub data: FxHashMap<String, ScalarValue>,
}

/// A field's final value after conflict processing.
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedField {
    pub value: Option<ScalarValue>,
    pub confidence: f64,
    pub strategy: String,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct ProcessSummary {
    pub total_fields: usize,
    pub conflicts_detected: usize,
    pub conflicts_resolved: usize,
    pub manual_review_required: usize,
}

/// Full outcome of one processing pass.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessReport {
    pub resolved: FxHashMap<String, ResolvedField>,
    pub conflicts: Vec<Conflict>,
    pub resolutions: Vec<Resolution>,
    pub summary: ProcessSummary,
}

/// Detector and resolver wired together, with resolution history.
pub struct ConflictResolutionEngine {
    detector: ConflictDetector,
    resolver: ConflictResolver,
    history: Vec<Resolution>,
}

impl ConflictResolutionEngine {
    pub fn new() -> Result<Self, SynthesisError> {
        Ok(Self {
            detector: ConflictDetector::new()?,
            resolver: ConflictResolver::new(),
            history: Vec::new(),
        })
    }

    pub fn with_resolver(resolver: ConflictResolver) -> Result<Self, SynthesisError> {
        Ok(Self {
            detector: ConflictDetector::new()?,
            resolver,
            history: Vec::new(),
        })
    }

    /// Group observations by field, detect conflicts, and resolve each
    /// with its kind's default strategy. Non-conflicting fields keep
    /// their highest-confidence value.
    pub fn process_observations(&mut self, sources: &[SourceRecord]) -> ProcessReport {
        let field_data = group_by_field(sources);
        let conflicts = self.detector.detect_conflicts(&field_data);

        let mut resolutions = Vec::with_capacity(conflicts.len());
        let mut resolved: FxHashMap<String, ResolvedField> = FxHashMap::default();
        let mut under_review: FxHashSet<&str> = FxHashSet::default();
        for conflict in &conflicts {
            let resolution = self.resolver.resolve_conflict(conflict, None);
            if resolution.requires_review {
                under_review.insert(conflict.field_name.as_str());
            } else {
                resolved.insert(
                    conflict.field_name.clone(),
                    ResolvedField {
                        value: resolution.resolved_value.clone(),
                        confidence: resolution.confidence,
                        strategy: resolution.strategy.name().to_string(),
                    },
                );
            }
            resolutions.push(resolution);
        }

        // Fields held for review get no fallback value.
        for (field_name, observations) in &field_data {
            if resolved.contains_key(field_name) || under_review.contains(field_name.as_str()) {
                continue;
            }
            if let Some(best) = observations.iter().max_by(|a, b| {
                a.confidence
                    .partial_cmp(&b.confidence)
                    .unwrap_or(std::cmp::Ordering::Equal)
            }) {
                resolved.insert(
                    field_name.clone(),
                    ResolvedField {
                        value: Some(best.value.clone()),
                        confidence: best.confidence,
                        strategy: "no_conflict".to_string(),
                    },
                );
            }
        }

        self.history.extend(resolutions.iter().cloned());
        let summary = ProcessSummary {
            total_fields: field_data.len(),
            conflicts_detected: conflicts.len(),
            conflicts_resolved: resolutions.iter().filter(|r| !r.requires_review).count(),
            manual_review_required: resolutions.iter().filter(|r| r.requires_review).count(),
        };
        info!(
            fields = summary.total_fields,
            conflicts = summary.conflicts_detected,
            review = summary.manual_review_required,
            "processed observations"
        );

        ProcessReport {
            resolved,
            conflicts,
            resolutions,
            summary,
        }
    }

    pub fn resolution_history(&self) -> &[Resolution] {
        &self.history
    }
}

fn group_by_field(sources: &[SourceRecord]) -> FxHashMap<String, Vec<Observation>> {
    let mut field_data: FxHashMap<String, Vec<Observation>> = FxHashMap::default();
    for source in sources {
        for (field_name, value) in &source.data {
            field_data
                .entry(field_name.clone())
                .or_default()
                .push(Observation {
                    value: value.clone(),
                    source_id: source.source_id.clone(),
                    source_type: source.source_type.clone(),
                    extraction_date: source.extraction_date,
                    confidence: source.confidence,
                    context: None,
                });
        }
    }
    field_data
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(id: &str, date: u64, confidence: f64, data: &[(&str, ScalarValue)]) -> SourceRecord {
        SourceRecord {
            source_id: id.to_string(),
            source_type: "report".to_string(),
            extraction_date: date,
            confidence,
            data: data
                .iter()
                .map(|(k, v)| (k.to_string(), v.clone()))
                .collect(),
        }
    }

    #[test]
    fn agreeing_sources_resolve_without_conflict() {
        let sources = vec![
            source("a.xlsx", 1, 0.9, &[("revenue", ScalarValue::Number(100.0))]),
            source("b.pdf", 2, 0.7, &[("revenue", ScalarValue::Number(100.2))]),
        ];
        let mut engine = ConflictResolutionEngine::new().unwrap();
        let report = engine.process_observations(&sources);

        assert_eq!(report.summary.conflicts_detected, 0);
        assert_eq!(report.resolved["revenue"].strategy, "no_conflict");
        assert_eq!(
            report.resolved["revenue"].value,
            Some(ScalarValue::Number(100.0))
        );
    }

    #[test]
    fn conflicting_numbers_get_weighted_average() {
        let sources = vec![
            source("a.xlsx", 1, 0.8, &[("revenue", ScalarValue::Number(100.0))]),
            source("b.pdf", 2, 0.2, &[("revenue", ScalarValue::Number(200.0))]),
        ];
        let mut engine = ConflictResolutionEngine::new().unwrap();
        let report = engine.process_observations(&sources);

        assert_eq!(report.summary.conflicts_detected, 1);
        assert_eq!(report.summary.conflicts_resolved, 1);
        let field = &report.resolved["revenue"];
        assert_eq!(field.strategy, "weighted_average");
        assert_eq!(field.value, Some(ScalarValue::Number(120.0)));
    }

    #[test]
    fn mixed_fields_report_counts() {
        let sources = vec![
            source(
                "a.xlsx",
                1,
                0.8,
                &[
                    ("revenue", ScalarValue::Number(100.0)),
                    ("status", "expanding".into()),
                ],
            ),
            source(
                "b.pdf",
                2,
                0.6,
                &[
                    ("revenue", ScalarValue::Number(300.0)),
                    ("status", "expanding".into()),
                    ("period", "Q3 2024".into()),
                ],
            ),
        ];
        let mut engine = ConflictResolutionEngine::new().unwrap();
        let report = engine.process_observations(&sources);

        assert_eq!(report.summary.total_fields, 3);
        assert_eq!(report.summary.conflicts_detected, 1);
        assert_eq!(report.resolved.len(), 3);
        assert_eq!(report.resolved["status"].strategy, "no_conflict");
        assert_eq!(report.resolved["period"].strategy, "no_conflict");
        assert_eq!(engine.resolution_history().len(), 1);
    }

    #[test]
    fn history_accumulates_across_passes() {
        let sources = vec![
            source("a.xlsx", 1, 0.8, &[("revenue", ScalarValue::Number(100.0))]),
            source("b.pdf", 2, 0.2, &[("revenue", ScalarValue::Number(200.0))]),
        ];
        let mut engine = ConflictResolutionEngine::new().unwrap();
        engine.process_observations(&sources);
        engine.process_observations(&sources);
        assert_eq!(engine.resolution_history().len(), 2);
    }
}
