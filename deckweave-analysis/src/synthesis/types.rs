//! Synthesis graph value objects.

use deckweave_core::types::collections::{FxHashMap, FxHashSet};
use deckweave_core::types::value::ScalarValue;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// Current time as epoch seconds. The core never parses calendar dates;
/// timestamps only need to be monotonic and comparable.
pub(crate) fn now_epoch() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Classified document category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    FinancialReport,
    Presentation,
    Spreadsheet,
    ResearchReport,
    NewsArticle,
    RegulatoryFiling,
    InternalMemo,
    Unknown,
}

impl DocumentType {
    pub fn name(&self) -> &'static str {
        match self {
            Self::FinancialReport => "financial_report",
            Self::Presentation => "presentation",
            Self::Spreadsheet => "spreadsheet",
            Self::ResearchReport => "research_report",
            Self::NewsArticle => "news_article",
            Self::RegulatoryFiling => "regulatory_filing",
            Self::InternalMemo => "internal_memo",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Directed relationship category between two documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationshipType {
    References,
    Contradicts,
    Supplements,
    Updates,
    DerivedFrom,
    SimilarTo,
}

impl RelationshipType {
    pub fn name(&self) -> &'static str {
        match self {
            Self::References => "references",
            Self::Contradicts => "contradicts",
            Self::Supplements => "supplements",
            Self::Updates => "updates",
            Self::DerivedFrom => "derived_from",
            Self::SimilarTo => "similar_to",
        }
    }
}

impl fmt::Display for RelationshipType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Raw per-document extraction record handed over by the extraction
/// layer. All fields beyond `source_path` are optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExtractionRecord {
    pub doc_id: Option<String>,
    pub source_path: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub metadata: FxHashMap<String, String>,
    #[serde(default)]
    pub financial_metrics: FxHashMap<String, ScalarValue>,
    #[serde(default)]
    pub source_refs: Vec<String>,
}

/// A document in the synthesis graph. Immutable within a synthesis run.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentNode {
    pub doc_id: String,
    pub doc_type: DocumentType,
    pub source_path: String,
    /// Raw text content, kept for the finer-grained entity layer.
    pub content: String,
    /// Epoch seconds at node creation.
    pub extraction_date: u64,
    pub metadata: FxHashMap<String, String>,
    pub entities: FxHashSet<String>,
    pub topics: FxHashSet<String>,
    pub key_metrics: FxHashMap<String, ScalarValue>,
    pub time_references: FxHashSet<String>,
    pub confidence_score: f64,
    /// Stable dedup key over type, path, and extraction date.
    pub content_hash: String,
}

/// Directed edge between two document nodes.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentRelationship {
    pub source_doc_id: String,
    pub target_doc_id: String,
    pub relationship_type: RelationshipType,
    pub confidence: f64,
    pub evidence: SmallVec<[String; 2]>,
    #[serde(default)]
    pub metadata: FxHashMap<String, String>,
}

/// A group of topically related documents.
#[derive(Debug, Clone, Serialize)]
pub struct ContentCluster {
    pub cluster_id: String,
    /// Most frequent topic among member nodes; ties resolve to the
    /// lexicographically smallest topic.
    pub theme: String,
    pub documents: FxHashSet<String>,
    pub entities: FxHashSet<String>,
    pub topics: FxHashSet<String>,
    /// Lexicographic (min, max) of member time references, when any exist.
    pub time_range: Option<(String, String)>,
    /// Mean confidence of member nodes.
    pub importance_score: f64,
}

/// One timeline event, ordered by raw date string.
#[derive(Debug, Clone, Serialize)]
pub struct TimelineEntry {
    pub date: String,
    pub doc_id: String,
    pub doc_type: DocumentType,
    pub confidence: f64,
}

/// A detected metric conflict plus a resolution hint.
#[derive(Debug, Clone, Serialize)]
pub struct ConflictRecord {
    pub source_doc: String,
    pub target_doc: String,
    pub evidence: Vec<String>,
    pub confidence: f64,
    pub resolution_hint: String,
}

/// Kinds of synthesis-level insights, each with a fixed importance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SynthesisInsightKind {
    DocumentCoverage,
    KeyEntities,
    TopicDistribution,
    RelationshipPatterns,
    ContentThemes,
}

impl SynthesisInsightKind {
    pub fn importance(&self) -> f64 {
        match self {
            Self::DocumentCoverage => 0.5,
            Self::KeyEntities => 0.8,
            Self::TopicDistribution => 0.7,
            Self::RelationshipPatterns => 0.6,
            Self::ContentThemes => 0.9,
        }
    }
}

/// A summary-level insight over the whole synthesis run.
#[derive(Debug, Clone, Serialize)]
pub struct SynthesisInsight {
    pub kind: SynthesisInsightKind,
    pub description: String,
    pub data: serde_json::Value,
    pub importance: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct SynthesisMetadata {
    pub num_documents: usize,
    pub num_relationships: usize,
    pub num_clusters: usize,
    pub synthesis_timestamp: u64,
}

/// Full result of a synthesis run.
#[derive(Debug, Clone, Serialize)]
pub struct SynthesisResult {
    pub document_graph: FxHashMap<String, DocumentNode>,
    pub relationships: Vec<DocumentRelationship>,
    pub clusters: Vec<ContentCluster>,
    /// entity → documents mentioning it.
    pub entity_map: FxHashMap<String, FxHashSet<String>>,
    pub timeline: Vec<TimelineEntry>,
    pub conflicts: Vec<ConflictRecord>,
    pub insights: Vec<SynthesisInsight>,
    pub metadata: SynthesisMetadata,
}
