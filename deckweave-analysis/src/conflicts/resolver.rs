//! Resolution strategies for detected conflicts.

use deckweave_core::types::collections::FxHashMap;
use deckweave_core::types::value::ScalarValue;
use serde_json::json;

use super::detector::numeric_magnitude;
use super::types::{Conflict, ConflictKind, Observation, Resolution, ResolutionStrategy};
use crate::synthesis::types::now_epoch;

/// Canonical form of a value for vote counting. Boolean-like strings
/// collapse to "true"/"false", other text lowercases and trims.
fn normalize_for_vote(value: &ScalarValue) -> String {
    match value {
        ScalarValue::Number(n) => n.to_string(),
        ScalarValue::Text(s) => {
            let normalized = s.trim().to_lowercase();
            match normalized.as_str() {
                "yes" | "y" | "true" | "1" | "enabled" | "on" => "true".to_string(),
                "no" | "n" | "false" | "0" | "disabled" | "off" => "false".to_string(),
                _ => normalized,
            }
        }
    }
}

fn numeric_observations(conflict: &Conflict) -> Vec<(f64, &Observation)> {
    conflict
        .observations
        .iter()
        .filter_map(|obs| numeric_magnitude(&obs.value).map(|n| (n, obs)))
        .collect()
}

/// Applies a resolution strategy to a conflict and records the outcome
/// with a justification and audit trail.
pub struct ConflictResolver {
    /// Source-type ranking for [`ResolutionStrategy::SourcePriority`];
    /// lower rank wins.
    source_priorities: FxHashMap<String, usize>,
}

impl ConflictResolver {
    pub fn new() -> Self {
        Self {
            source_priorities: FxHashMap::default(),
        }
    }

    pub fn with_source_priorities(priorities: FxHashMap<String, usize>) -> Self {
        Self {
            source_priorities: priorities,
        }
    }

    /// Per-kind default strategy.
    pub fn default_strategy(kind: ConflictKind) -> ResolutionStrategy {
        match kind {
            ConflictKind::NumericMismatch => ResolutionStrategy::WeightedAverage,
            ConflictKind::DateMismatch => ResolutionStrategy::MostRecent,
            ConflictKind::CategoricalMismatch => ResolutionStrategy::HighestConfidence,
            ConflictKind::BooleanMismatch => ResolutionStrategy::MajorityVote,
            ConflictKind::SemanticConflict => ResolutionStrategy::HighestConfidence,
        }
    }

    /// Resolve with the given strategy, or the kind's default.
    pub fn resolve_conflict(
        &self,
        conflict: &Conflict,
        strategy: Option<ResolutionStrategy>,
    ) -> Resolution {
        let strategy = strategy.unwrap_or_else(|| Self::default_strategy(conflict.kind));
        match strategy {
            ResolutionStrategy::MostRecent => self.resolve_most_recent(conflict),
            ResolutionStrategy::HighestConfidence => self.resolve_highest_confidence(conflict),
            ResolutionStrategy::MajorityVote => self.resolve_majority_vote(conflict),
            ResolutionStrategy::Average => self.resolve_average(conflict),
            ResolutionStrategy::Median => self.resolve_median(conflict),
            ResolutionStrategy::WeightedAverage => self.resolve_weighted_average(conflict),
            ResolutionStrategy::SourcePriority => self.resolve_source_priority(conflict),
            ResolutionStrategy::ManualReview => Self::manual_review_required(conflict),
        }
    }

    fn resolve_most_recent(&self, conflict: &Conflict) -> Resolution {
        let Some(most_recent) = conflict
            .observations
            .iter()
            .max_by_key(|obs| obs.extraction_date)
        else {
            return Self::manual_review_required(conflict);
        };

        Resolution {
            conflict_id: conflict.conflict_id.clone(),
            strategy: ResolutionStrategy::MostRecent,
            resolved_value: Some(most_recent.value.clone()),
            // Recency alone does not prove correctness.
            confidence: most_recent.confidence * 0.9,
            justification: format!(
                "Selected most recent value from {} (extracted at {})",
                most_recent.source_id, most_recent.extraction_date
            ),
            audit_trail: vec![json!({
                "action": "selected_most_recent",
                "source": most_recent.source_id,
                "timestamp": now_epoch(),
            })],
            requires_review: false,
        }
    }

    fn resolve_highest_confidence(&self, conflict: &Conflict) -> Resolution {
        let Some(best) = conflict.observations.iter().max_by(|a, b| {
            a.confidence
                .partial_cmp(&b.confidence)
                .unwrap_or(std::cmp::Ordering::Equal)
        }) else {
            return Self::manual_review_required(conflict);
        };

        Resolution {
            conflict_id: conflict.conflict_id.clone(),
            strategy: ResolutionStrategy::HighestConfidence,
            resolved_value: Some(best.value.clone()),
            confidence: best.confidence,
            justification: format!(
                "Selected highest confidence value from {} (confidence: {:.2})",
                best.source_id, best.confidence
            ),
            audit_trail: vec![json!({
                "action": "selected_highest_confidence",
                "source": best.source_id,
                "confidence": best.confidence,
                "timestamp": now_epoch(),
            })],
            requires_review: false,
        }
    }

    fn resolve_majority_vote(&self, conflict: &Conflict) -> Resolution {
        let mut groups: FxHashMap<String, Vec<&Observation>> = FxHashMap::default();
        for obs in &conflict.observations {
            groups
                .entry(normalize_for_vote(&obs.value))
                .or_default()
                .push(obs);
        }

        // Largest group wins; ties break on the smaller normalized key.
        let Some((_, majority)) = groups
            .iter()
            .max_by(|(k1, v1), (k2, v2)| v1.len().cmp(&v2.len()).then_with(|| k2.cmp(k1)))
        else {
            return Self::manual_review_required(conflict);
        };

        let vote_ratio = majority.len() as f64 / conflict.observations.len() as f64;
        let avg_confidence =
            majority.iter().map(|obs| obs.confidence).sum::<f64>() / majority.len() as f64;
        let distribution: FxHashMap<&str, usize> = groups
            .iter()
            .map(|(k, v)| (k.as_str(), v.len()))
            .collect();

        Resolution {
            conflict_id: conflict.conflict_id.clone(),
            strategy: ResolutionStrategy::MajorityVote,
            resolved_value: Some(majority[0].value.clone()),
            confidence: avg_confidence * vote_ratio,
            justification: format!(
                "Majority vote: {}/{} sources agree on this value",
                majority.len(),
                conflict.observations.len()
            ),
            audit_trail: vec![json!({
                "action": "majority_vote",
                "vote_distribution": distribution,
                "timestamp": now_epoch(),
            })],
            requires_review: false,
        }
    }

    fn resolve_average(&self, conflict: &Conflict) -> Resolution {
        let numeric = numeric_observations(conflict);
        if numeric.is_empty() {
            return Self::manual_review_required(conflict);
        }
        let values: Vec<f64> = numeric.iter().map(|&(n, _)| n).collect();
        let average = values.iter().sum::<f64>() / values.len() as f64;

        Resolution {
            conflict_id: conflict.conflict_id.clone(),
            strategy: ResolutionStrategy::Average,
            resolved_value: Some(ScalarValue::Number(average)),
            confidence: 0.7,
            justification: format!("Averaged {} numeric values", values.len()),
            audit_trail: vec![json!({
                "action": "calculated_average",
                "values": values,
                "result": average,
                "timestamp": now_epoch(),
            })],
            requires_review: false,
        }
    }

    fn resolve_median(&self, conflict: &Conflict) -> Resolution {
        let numeric = numeric_observations(conflict);
        if numeric.is_empty() {
            return Self::manual_review_required(conflict);
        }
        let mut values: Vec<f64> = numeric.iter().map(|&(n, _)| n).collect();
        values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        let mid = values.len() / 2;
        let median = if values.len() % 2 == 0 {
            (values[mid - 1] + values[mid]) / 2.0
        } else {
            values[mid]
        };

        Resolution {
            conflict_id: conflict.conflict_id.clone(),
            strategy: ResolutionStrategy::Median,
            resolved_value: Some(ScalarValue::Number(median)),
            confidence: 0.75,
            justification: format!("Median of {} numeric values", values.len()),
            audit_trail: vec![json!({
                "action": "calculated_median",
                "values": values,
                "result": median,
                "timestamp": now_epoch(),
            })],
            requires_review: false,
        }
    }

    fn resolve_weighted_average(&self, conflict: &Conflict) -> Resolution {
        let numeric = numeric_observations(conflict);
        let mut weighted_sum = 0.0;
        let mut weight_sum = 0.0;
        let mut used = Vec::new();
        for (value, obs) in &numeric {
            weighted_sum += value * obs.confidence;
            weight_sum += obs.confidence;
            used.push(json!({
                "value": value,
                "weight": obs.confidence,
                "source": obs.source_id,
            }));
        }
        if weight_sum <= 0.0 {
            return Self::manual_review_required(conflict);
        }
        let weighted_avg = weighted_sum / weight_sum;

        Resolution {
            conflict_id: conflict.conflict_id.clone(),
            strategy: ResolutionStrategy::WeightedAverage,
            resolved_value: Some(ScalarValue::Number(weighted_avg)),
            confidence: weight_sum / used.len() as f64,
            justification: format!("Confidence-weighted average of {} values", used.len()),
            audit_trail: vec![json!({
                "action": "calculated_weighted_average",
                "values_and_weights": used,
                "result": weighted_avg,
                "timestamp": now_epoch(),
            })],
            requires_review: false,
        }
    }

    fn resolve_source_priority(&self, conflict: &Conflict) -> Resolution {
        if self.source_priorities.is_empty() {
            return self.resolve_highest_confidence(conflict);
        }

        let best = conflict
            .observations
            .iter()
            .filter_map(|obs| {
                self.source_priorities
                    .get(&obs.source_type)
                    .map(|&rank| (rank, obs))
            })
            .min_by_key(|&(rank, _)| rank);
        let Some((_, best)) = best else {
            return self.resolve_highest_confidence(conflict);
        };

        Resolution {
            conflict_id: conflict.conflict_id.clone(),
            strategy: ResolutionStrategy::SourcePriority,
            resolved_value: Some(best.value.clone()),
            confidence: best.confidence,
            justification: format!(
                "Selected value from highest priority source: {}",
                best.source_type
            ),
            audit_trail: vec![json!({
                "action": "source_priority_selection",
                "source": best.source_id,
                "source_type": best.source_type,
                "timestamp": now_epoch(),
            })],
            requires_review: false,
        }
    }

    fn manual_review_required(conflict: &Conflict) -> Resolution {
        Resolution {
            conflict_id: conflict.conflict_id.clone(),
            strategy: ResolutionStrategy::ManualReview,
            resolved_value: None,
            confidence: 0.0,
            justification: "Conflict requires manual review".to_string(),
            audit_trail: vec![json!({
                "action": "flagged_for_review",
                "reason": "No automatic resolution available",
                "timestamp": now_epoch(),
            })],
            requires_review: true,
        }
    }
}

impl Default for ConflictResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obs(
        value: impl Into<ScalarValue>,
        source: &str,
        source_type: &str,
        date: u64,
        confidence: f64,
    ) -> Observation {
        Observation {
            value: value.into(),
            source_id: source.to_string(),
            source_type: source_type.to_string(),
            extraction_date: date,
            confidence,
            context: None,
        }
    }

    fn conflict(kind: ConflictKind, observations: Vec<Observation>) -> Conflict {
        Conflict {
            conflict_id: "conflict_revenue_0001".to_string(),
            kind,
            field_name: "revenue".to_string(),
            observations,
            severity: 0.5,
            description: String::new(),
            detected_at: 0,
        }
    }

    #[test]
    fn numeric_default_is_weighted_average() {
        let c = conflict(
            ConflictKind::NumericMismatch,
            vec![
                obs(100.0, "a", "report", 1, 0.9),
                obs(200.0, "b", "memo", 2, 0.1),
            ],
        );
        let resolution = ConflictResolver::new().resolve_conflict(&c, None);
        assert_eq!(resolution.strategy, ResolutionStrategy::WeightedAverage);
        // (100*0.9 + 200*0.1) / 1.0
        assert_eq!(resolution.resolved_value, Some(ScalarValue::Number(110.0)));
        assert!((resolution.confidence - 0.5).abs() < 1e-9);
        assert!(!resolution.audit_trail.is_empty());
        assert!(!resolution.requires_review);
    }

    #[test]
    fn weighted_average_lands_between_extremes() {
        let c = conflict(
            ConflictKind::NumericMismatch,
            vec![
                obs("$10.0M", "a", "report", 1, 0.8),
                obs("$14.0M", "b", "memo", 2, 0.4),
            ],
        );
        let resolution = ConflictResolver::new().resolve_conflict(&c, None);
        let Some(ScalarValue::Number(value)) = resolution.resolved_value else {
            panic!("expected numeric resolution");
        };
        assert!(value > 10_000_000.0 && value < 14_000_000.0);
    }

    #[test]
    fn date_default_picks_most_recent() {
        let c = conflict(
            ConflictKind::DateMismatch,
            vec![
                obs("Q3 2024", "older.pdf", "report", 100, 0.9),
                obs("Q4 2024", "newer.pdf", "report", 200, 0.8),
            ],
        );
        let resolution = ConflictResolver::new().resolve_conflict(&c, None);
        assert_eq!(resolution.strategy, ResolutionStrategy::MostRecent);
        assert_eq!(resolution.resolved_value, Some("Q4 2024".into()));
        assert!((resolution.confidence - 0.72).abs() < 1e-9);
        assert!(resolution.justification.contains("newer.pdf"));
    }

    #[test]
    fn categorical_default_picks_highest_confidence() {
        let c = conflict(
            ConflictKind::CategoricalMismatch,
            vec![
                obs("expanding", "a", "report", 1, 0.6),
                obs("contracting", "b", "memo", 2, 0.9),
            ],
        );
        let resolution = ConflictResolver::new().resolve_conflict(&c, None);
        assert_eq!(resolution.strategy, ResolutionStrategy::HighestConfidence);
        assert_eq!(resolution.resolved_value, Some("contracting".into()));
        assert!((resolution.confidence - 0.9).abs() < 1e-9);
    }

    #[test]
    fn majority_vote_collapses_boolean_spellings() {
        let c = conflict(
            ConflictKind::BooleanMismatch,
            vec![
                obs("yes", "a", "report", 1, 0.8),
                obs("enabled", "b", "memo", 2, 0.6),
                obs("no", "c", "email", 3, 0.9),
            ],
        );
        let resolution = ConflictResolver::new().resolve_conflict(&c, None);
        assert_eq!(resolution.strategy, ResolutionStrategy::MajorityVote);
        // "yes" and "enabled" normalize to the same vote.
        assert_eq!(resolution.resolved_value, Some("yes".into()));
        // avg(0.8, 0.6) * 2/3
        assert!((resolution.confidence - 0.7 * 2.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn median_of_even_count_averages_middle_pair() {
        let c = conflict(
            ConflictKind::NumericMismatch,
            vec![
                obs(10.0, "a", "r", 1, 0.5),
                obs(20.0, "b", "r", 2, 0.5),
                obs(30.0, "c", "r", 3, 0.5),
                obs(100.0, "d", "r", 4, 0.5),
            ],
        );
        let resolution =
            ConflictResolver::new().resolve_conflict(&c, Some(ResolutionStrategy::Median));
        assert_eq!(resolution.resolved_value, Some(ScalarValue::Number(25.0)));
        assert!((resolution.confidence - 0.75).abs() < 1e-9);
    }

    #[test]
    fn source_priority_prefers_ranked_source_type() {
        let mut priorities = FxHashMap::default();
        priorities.insert("audited_report".to_string(), 0);
        priorities.insert("memo".to_string(), 5);
        let resolver = ConflictResolver::with_source_priorities(priorities);

        let c = conflict(
            ConflictKind::NumericMismatch,
            vec![
                obs(100.0, "a", "memo", 1, 0.95),
                obs(120.0, "b", "audited_report", 2, 0.5),
            ],
        );
        let resolution = resolver.resolve_conflict(&c, Some(ResolutionStrategy::SourcePriority));
        assert_eq!(resolution.resolved_value, Some(ScalarValue::Number(120.0)));
        assert!(resolution.justification.contains("audited_report"));
    }

    #[test]
    fn unranked_sources_fall_back_to_confidence() {
        let resolver = ConflictResolver::new();
        let c = conflict(
            ConflictKind::NumericMismatch,
            vec![
                obs(100.0, "a", "memo", 1, 0.95),
                obs(120.0, "b", "report", 2, 0.5),
            ],
        );
        let resolution = resolver.resolve_conflict(&c, Some(ResolutionStrategy::SourcePriority));
        assert_eq!(resolution.strategy, ResolutionStrategy::HighestConfidence);
        assert_eq!(resolution.resolved_value, Some(ScalarValue::Number(100.0)));
    }

    #[test]
    fn average_of_text_only_values_needs_review() {
        let c = conflict(
            ConflictKind::CategoricalMismatch,
            vec![
                obs("expanding", "a", "r", 1, 0.5),
                obs("contracting", "b", "r", 2, 0.5),
            ],
        );
        let resolution =
            ConflictResolver::new().resolve_conflict(&c, Some(ResolutionStrategy::Average));
        assert_eq!(resolution.strategy, ResolutionStrategy::ManualReview);
        assert!(resolution.requires_review);
        assert!(resolution.resolved_value.is_none());
        assert_eq!(resolution.confidence, 0.0);
    }
}
