//! Conflict engine value objects.

use deckweave_core::types::value::ScalarValue;
use serde::Serialize;
use std::fmt;

/// Kind of contradiction found between observations of one field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictKind {
    NumericMismatch,
    DateMismatch,
    CategoricalMismatch,
    BooleanMismatch,
    /// Values differ only in spelling or casing.
    SemanticConflict,
}

impl ConflictKind {
    pub fn name(&self) -> &'static str {
        match self {
            Self::NumericMismatch => "numeric_mismatch",
            Self::DateMismatch => "date_mismatch",
            Self::CategoricalMismatch => "categorical_mismatch",
            Self::BooleanMismatch => "boolean_mismatch",
            Self::SemanticConflict => "semantic_conflict",
        }
    }
}

impl fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How a conflict gets resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionStrategy {
    MostRecent,
    HighestConfidence,
    MajorityVote,
    Average,
    Median,
    WeightedAverage,
    SourcePriority,
    ManualReview,
}

impl ResolutionStrategy {
    pub fn name(&self) -> &'static str {
        match self {
            Self::MostRecent => "most_recent",
            Self::HighestConfidence => "highest_confidence",
            Self::MajorityVote => "majority_vote",
            Self::Average => "average",
            Self::Median => "median",
            Self::WeightedAverage => "weighted_average",
            Self::SourcePriority => "source_priority",
            Self::ManualReview => "manual_review",
        }
    }
}

impl fmt::Display for ResolutionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One observed value for a field, from one source.
#[derive(Debug, Clone, Serialize)]
pub struct Observation {
    pub value: ScalarValue,
    pub source_id: String,
    pub source_type: String,
    /// Epoch seconds when the source was extracted.
    pub extraction_date: u64,
    pub confidence: f64,
    pub context: Option<String>,
}

impl fmt::Display for Observation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (from {}, confidence: {:.2})",
            self.value, self.source_id, self.confidence
        )
    }
}

/// A detected contradiction across two or more observations.
#[derive(Debug, Clone, Serialize)]
pub struct Conflict {
    pub conflict_id: String,
    pub kind: ConflictKind,
    pub field_name: String,
    pub observations: Vec<Observation>,
    /// 0.0 to 1.0.
    pub severity: f64,
    pub description: String,
    pub detected_at: u64,
}

impl fmt::Display for Conflict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let values: Vec<String> = self.observations.iter().map(|o| o.value.to_string()).collect();
        write!(f, "Conflict in {}: {}", self.field_name, values.join(" vs "))
    }
}

/// Outcome of resolving one conflict.
#[derive(Debug, Clone, Serialize)]
pub struct Resolution {
    pub conflict_id: String,
    pub strategy: ResolutionStrategy,
    /// `None` when the conflict is flagged for manual review.
    pub resolved_value: Option<ScalarValue>,
    pub confidence: f64,
    pub justification: String,
    pub audit_trail: Vec<serde_json::Value>,
    pub requires_review: bool,
}
