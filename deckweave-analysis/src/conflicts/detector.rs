//! Detection of contradictions between per-field observations.

use deckweave_core::errors::SynthesisError;
use deckweave_core::types::collections::{FxHashMap, FxHashSet};
use deckweave_core::types::value::ScalarValue;
use regex::Regex;
use tracing::debug;

use super::types::{Conflict, ConflictKind, Observation};
use crate::synthesis::types::now_epoch;

/// Relative difference beyond which two numeric values conflict.
pub const NUMERIC_TOLERANCE: f64 = 0.01;

/// Relative spread at which numeric severity saturates.
const MAX_SEVERITY_SPREAD: f64 = 0.5;

const YES_VARIANTS: &[&str] = &["yes", "y", "true", "1", "enabled", "on"];
const NO_VARIANTS: &[&str] = &["no", "n", "false", "0", "disabled", "off"];

const DATE_PATTERNS: &[&str] = &[
    r"\d{1,2}[-/]\d{1,2}[-/]\d{2,4}",
    r"\d{4}[-/]\d{1,2}[-/]\d{1,2}",
    r"(?i)(?:Q[1-4]|FY)\s*\d{4}",
    r"(?i)(?:Jan|Feb|Mar|Apr|May|Jun|Jul|Aug|Sep|Oct|Nov|Dec)\s+\d{1,2},?\s+\d{4}",
];

/// Parses the numeric magnitude out of a scalar. Text values shed
/// currency symbols and thousands separators, then a leading number
/// with an optional K/M/B multiplier is read off: `"$1,234.5M"` is
/// 1_234_500_000.
pub fn numeric_magnitude(value: &ScalarValue) -> Option<f64> {
    match value {
        ScalarValue::Number(n) => Some(*n),
        ScalarValue::Text(s) => {
            let cleaned: String = s.chars().filter(|&c| c != '$' && c != ',').collect();
            let cleaned = cleaned.trim_start();
            let digits: String = cleaned
                .chars()
                .take_while(|c| c.is_ascii_digit() || *c == '.')
                .collect();
            if digits.is_empty() {
                return None;
            }
            let base: f64 = digits.parse().ok()?;
            let suffix = cleaned[digits.len()..].trim_start().chars().next();
            let factor = match suffix {
                Some('K') => 1e3,
                Some('M') => 1e6,
                Some('B') => 1e9,
                _ => 1.0,
            };
            Some(base * factor)
        }
    }
}

fn is_boolean_like(value: &str) -> Option<bool> {
    let normalized = value.trim().to_lowercase();
    if YES_VARIANTS.contains(&normalized.as_str()) {
        Some(true)
    } else if NO_VARIANTS.contains(&normalized.as_str()) {
        Some(false)
    } else {
        None
    }
}

/// Groups observations per field and detects typed conflicts. Conflict
/// IDs are sequential per detector instance.
pub struct ConflictDetector {
    numeric_tolerance: f64,
    date_patterns: Vec<Regex>,
    conflict_seq: u64,
}

impl ConflictDetector {
    pub fn new() -> Result<Self, SynthesisError> {
        let date_patterns = DATE_PATTERNS
            .iter()
            .map(|p| {
                Regex::new(p).map_err(|e| SynthesisError::PatternCompilation {
                    pattern: (*p).to_string(),
                    message: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            numeric_tolerance: NUMERIC_TOLERANCE,
            date_patterns,
            conflict_seq: 0,
        })
    }

    /// One conflict at most per field, in field-name order.
    pub fn detect_conflicts(
        &mut self,
        field_data: &FxHashMap<String, Vec<Observation>>,
    ) -> Vec<Conflict> {
        let mut fields: Vec<&String> = field_data.keys().collect();
        fields.sort_unstable();

        let mut conflicts = Vec::new();
        for field in fields {
            let observations = &field_data[field];
            if observations.len() < 2 {
                continue;
            }
            if let Some(conflict) = self.detect_field_conflict(field, observations) {
                conflicts.push(conflict);
            }
        }
        conflicts
    }

    fn detect_field_conflict(
        &mut self,
        field_name: &str,
        observations: &[Observation],
    ) -> Option<Conflict> {
        let sample = observations.iter().find(|o| match &o.value {
            ScalarValue::Text(s) => !s.trim().is_empty(),
            ScalarValue::Number(_) => true,
        })?;

        match &sample.value {
            ScalarValue::Number(_) => self.detect_numeric_conflict(field_name, observations),
            ScalarValue::Text(s) => {
                if self.is_date_string(s) {
                    self.detect_date_conflict(field_name, observations)
                } else if is_boolean_like(s).is_some() {
                    self.detect_boolean_conflict(field_name, observations)
                } else if numeric_magnitude(&sample.value).is_some() {
                    self.detect_numeric_conflict(field_name, observations)
                } else {
                    self.detect_categorical_conflict(field_name, observations)
                }
            }
        }
    }

    fn detect_numeric_conflict(
        &mut self,
        field_name: &str,
        observations: &[Observation],
    ) -> Option<Conflict> {
        let mut values = Vec::new();
        let mut valid = Vec::new();
        for obs in observations {
            if let Some(n) = numeric_magnitude(&obs.value) {
                values.push(n);
                valid.push(obs.clone());
            } else {
                debug!(field = field_name, value = %obs.value, "skipping non-numeric observation");
            }
        }
        if values.len() < 2 {
            return None;
        }

        let mean = values.iter().sum::<f64>() / values.len() as f64;
        let max_diff = values
            .iter()
            .map(|v| (v - mean).abs())
            .fold(0.0f64, f64::max);
        let relative_diff = if mean != 0.0 {
            max_diff / mean.abs()
        } else if max_diff > 0.0 {
            f64::INFINITY
        } else {
            0.0
        };

        if relative_diff <= self.numeric_tolerance {
            return None;
        }
        Some(Conflict {
            conflict_id: self.next_conflict_id(field_name),
            kind: ConflictKind::NumericMismatch,
            field_name: field_name.to_string(),
            observations: valid,
            severity: (relative_diff / MAX_SEVERITY_SPREAD).min(1.0),
            description: format!("Numeric values differ by {:.1}%", relative_diff * 100.0),
            detected_at: now_epoch(),
        })
    }

    fn detect_date_conflict(
        &mut self,
        field_name: &str,
        observations: &[Observation],
    ) -> Option<Conflict> {
        let unique = unique_values(observations);
        if unique.len() < 2 {
            return None;
        }
        Some(Conflict {
            conflict_id: self.next_conflict_id(field_name),
            kind: ConflictKind::DateMismatch,
            field_name: field_name.to_string(),
            observations: observations.to_vec(),
            severity: 0.7,
            description: format!("Different dates found: {}", unique.join(", ")),
            detected_at: now_epoch(),
        })
    }

    fn detect_boolean_conflict(
        &mut self,
        field_name: &str,
        observations: &[Observation],
    ) -> Option<Conflict> {
        let polarities: FxHashSet<bool> = observations
            .iter()
            .filter_map(|o| o.value.as_text().and_then(is_boolean_like))
            .collect();
        if polarities.len() < 2 {
            // Same answer in different spellings is only a surface
            // disagreement.
            if unique_values(observations).len() > 1 {
                return Some(Conflict {
                    conflict_id: self.next_conflict_id(field_name),
                    kind: ConflictKind::SemanticConflict,
                    field_name: field_name.to_string(),
                    observations: observations.to_vec(),
                    severity: 0.3,
                    description: "Equivalent values in different forms".to_string(),
                    detected_at: now_epoch(),
                });
            }
            return None;
        }
        Some(Conflict {
            conflict_id: self.next_conflict_id(field_name),
            kind: ConflictKind::BooleanMismatch,
            field_name: field_name.to_string(),
            observations: observations.to_vec(),
            severity: 1.0,
            description: "Conflicting boolean values".to_string(),
            detected_at: now_epoch(),
        })
    }

    fn detect_categorical_conflict(
        &mut self,
        field_name: &str,
        observations: &[Observation],
    ) -> Option<Conflict> {
        let unique = unique_values(observations);
        if unique.len() < 2 {
            return None;
        }

        let lowered: FxHashSet<String> = unique.iter().map(|v| v.trim().to_lowercase()).collect();
        let (kind, severity, description) = if lowered.len() == 1 {
            (
                ConflictKind::SemanticConflict,
                0.3,
                "Equivalent values in different forms".to_string(),
            )
        } else {
            (
                ConflictKind::CategoricalMismatch,
                0.8,
                format!("Different values: {}", unique.join(", ")),
            )
        };
        Some(Conflict {
            conflict_id: self.next_conflict_id(field_name),
            kind,
            field_name: field_name.to_string(),
            observations: observations.to_vec(),
            severity,
            description,
            detected_at: now_epoch(),
        })
    }

    fn is_date_string(&self, value: &str) -> bool {
        self.date_patterns.iter().any(|p| p.is_match(value))
    }

    fn next_conflict_id(&mut self, field_name: &str) -> String {
        self.conflict_seq += 1;
        format!("conflict_{field_name}_{:04}", self.conflict_seq)
    }
}

/// Distinct non-empty value renderings, first-seen order.
fn unique_values(observations: &[Observation]) -> Vec<String> {
    let mut seen = FxHashSet::default();
    let mut unique = Vec::new();
    for obs in observations {
        let rendered = obs.value.to_string();
        if rendered.is_empty() {
            continue;
        }
        if seen.insert(rendered.clone()) {
            unique.push(rendered);
        }
    }
    unique
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obs(value: impl Into<ScalarValue>, source: &str, confidence: f64) -> Observation {
        Observation {
            value: value.into(),
            source_id: source.to_string(),
            source_type: "report".to_string(),
            extraction_date: 0,
            confidence,
            context: None,
        }
    }

    fn field(name: &str, observations: Vec<Observation>) -> FxHashMap<String, Vec<Observation>> {
        let mut map = FxHashMap::default();
        map.insert(name.to_string(), observations);
        map
    }

    #[test]
    fn magnitude_parses_currency_strings() {
        assert_eq!(numeric_magnitude(&"$1,234.5M".into()), Some(1_234_500_000.0));
        assert_eq!(numeric_magnitude(&"$2.5B".into()), Some(2_500_000_000.0));
        assert_eq!(numeric_magnitude(&"750K".into()), Some(750_000.0));
        assert_eq!(numeric_magnitude(&"1,500".into()), Some(1500.0));
        assert_eq!(numeric_magnitude(&"12.5%".into()), Some(12.5));
        assert_eq!(numeric_magnitude(&ScalarValue::Number(7.0)), Some(7.0));
        assert_eq!(numeric_magnitude(&"steady growth".into()), None);
    }

    #[test]
    fn values_within_tolerance_do_not_conflict() {
        let mut detector = ConflictDetector::new().unwrap();
        let data = field(
            "revenue",
            vec![obs(100.0, "a", 0.9), obs(100.5, "b", 0.8)],
        );
        assert!(detector.detect_conflicts(&data).is_empty());
    }

    #[test]
    fn divergent_numbers_conflict_with_scaled_severity() {
        let mut detector = ConflictDetector::new().unwrap();
        let data = field("revenue", vec![obs(100.0, "a", 0.9), obs(150.0, "b", 0.8)]);
        let conflicts = detector.detect_conflicts(&data);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].kind, ConflictKind::NumericMismatch);
        // max diff 25 over mean 125 = 0.2 relative, severity 0.2/0.5.
        assert!((conflicts[0].severity - 0.4).abs() < 1e-9);
    }

    #[test]
    fn currency_text_compares_as_numbers() {
        let mut detector = ConflictDetector::new().unwrap();
        let data = field(
            "revenue",
            vec![obs("$10.2M", "a", 0.9), obs("$10.2M", "b", 0.7)],
        );
        assert!(detector.detect_conflicts(&data).is_empty());

        let data = field(
            "revenue",
            vec![obs("$10.2M", "a", 0.9), obs("$8.0M", "b", 0.7)],
        );
        assert_eq!(detector.detect_conflicts(&data).len(), 1);
    }

    #[test]
    fn differing_dates_are_a_date_mismatch() {
        let mut detector = ConflictDetector::new().unwrap();
        let data = field(
            "reporting_period",
            vec![obs("Q3 2024", "a", 0.9), obs("Q4 2024", "b", 0.8)],
        );
        let conflicts = detector.detect_conflicts(&data);
        assert_eq!(conflicts[0].kind, ConflictKind::DateMismatch);
        assert!((conflicts[0].severity - 0.7).abs() < 1e-9);
    }

    #[test]
    fn opposite_booleans_are_maximum_severity() {
        let mut detector = ConflictDetector::new().unwrap();
        let data = field(
            "is_active",
            vec![obs("yes", "a", 0.9), obs("no", "b", 0.8)],
        );
        let conflicts = detector.detect_conflicts(&data);
        assert_eq!(conflicts[0].kind, ConflictKind::BooleanMismatch);
        assert_eq!(conflicts[0].severity, 1.0);
    }

    #[test]
    fn same_polarity_spellings_are_semantic() {
        let mut detector = ConflictDetector::new().unwrap();
        let data = field(
            "is_active",
            vec![obs("yes", "a", 0.9), obs("enabled", "b", 0.8)],
        );
        let conflicts = detector.detect_conflicts(&data);
        assert_eq!(conflicts[0].kind, ConflictKind::SemanticConflict);
    }

    #[test]
    fn case_differences_are_semantic_not_categorical() {
        let mut detector = ConflictDetector::new().unwrap();
        let data = field(
            "status",
            vec![obs("Active Pilot", "a", 0.9), obs("active pilot", "b", 0.8)],
        );
        let conflicts = detector.detect_conflicts(&data);
        assert_eq!(conflicts[0].kind, ConflictKind::SemanticConflict);

        let data = field(
            "status",
            vec![obs("expanding", "a", 0.9), obs("contracting", "b", 0.8)],
        );
        let conflicts = detector.detect_conflicts(&data);
        assert_eq!(conflicts[0].kind, ConflictKind::CategoricalMismatch);
        assert!((conflicts[0].severity - 0.8).abs() < 1e-9);
    }

    #[test]
    fn single_observation_fields_are_skipped() {
        let mut detector = ConflictDetector::new().unwrap();
        let data = field("revenue", vec![obs(100.0, "a", 0.9)]);
        assert!(detector.detect_conflicts(&data).is_empty());
    }

    #[test]
    fn conflict_ids_are_sequential() {
        let mut detector = ConflictDetector::new().unwrap();
        let mut data = field("alpha", vec![obs(1.0, "a", 0.9), obs(2.0, "b", 0.8)]);
        data.insert(
            "beta".to_string(),
            vec![obs(1.0, "a", 0.9), obs(3.0, "b", 0.8)],
        );
        let conflicts = detector.detect_conflicts(&data);
        assert_eq!(conflicts[0].conflict_id, "conflict_alpha_0001");
        assert_eq!(conflicts[1].conflict_id, "conflict_beta_0002");
    }
}
