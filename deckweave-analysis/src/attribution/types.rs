//! Attribution value objects.

use deckweave_core::types::collections::FxHashMap;
use deckweave_core::types::value::{DataKind, ScalarValue};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of source document a data point can come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceDocumentType {
    Excel,
    Pdf,
    Word,
}

impl SourceDocumentType {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Excel => "excel",
            Self::Pdf => "pdf",
            Self::Word => "word",
        }
    }
}

impl fmt::Display for SourceDocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Where a value lives inside a source document. Structural equality
/// only; owned by the data point that references it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceLocation {
    pub document_id: String,
    /// Sheet name for Excel, `Page N` for PDF.
    pub page_or_sheet: Option<String>,
    /// Cell reference (`B15`) or section name.
    pub cell_or_section: Option<String>,
    pub table_name: Option<String>,
    pub line_number: Option<u32>,
    /// Row/col for Excel, x/y for PDF.
    #[serde(default)]
    pub coordinates: FxHashMap<String, f64>,
    pub surrounding_context: Option<String>,
    pub extraction_method: String,
}

/// Recognized location fields for `track_data_point` (the shape the
/// extraction layer hands over).
#[derive(Debug, Clone, Default)]
pub struct LocationDetails {
    pub page_or_sheet: Option<String>,
    pub cell_or_section: Option<String>,
    pub table_name: Option<String>,
    pub line_number: Option<u32>,
    pub coordinates: FxHashMap<String, f64>,
    pub surrounding_context: Option<String>,
    pub extraction_method: Option<String>,
}

impl LocationDetails {
    pub(crate) fn into_location(self, document_id: &str, default_method: &str) -> SourceLocation {
        SourceLocation {
            document_id: document_id.to_string(),
            page_or_sheet: self.page_or_sheet,
            cell_or_section: self.cell_or_section,
            table_name: self.table_name,
            line_number: self.line_number,
            coordinates: self.coordinates,
            surrounding_context: self.surrounding_context,
            extraction_method: self
                .extraction_method
                .unwrap_or_else(|| default_method.to_string()),
        }
    }
}

/// Extraction quality tier, a deterministic function of confidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionQuality {
    /// confidence ≥ 0.9
    High,
    /// confidence ≥ 0.7
    Medium,
    /// confidence < 0.7
    Low,
}

impl ExtractionQuality {
    pub fn from_confidence(confidence: f64) -> Self {
        if confidence >= 0.9 {
            Self::High
        } else if confidence >= 0.7 {
            Self::Medium
        } else {
            Self::Low
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

impl fmt::Display for ExtractionQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single extracted value plus provenance and quality metadata.
///
/// Immutable after creation except for `secondary_sources`, which grows
/// as cross-references are discovered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataPoint {
    pub id: String,
    pub value: ScalarValue,
    pub data_type: DataKind,
    pub confidence: f64,
    pub extraction_quality: ExtractionQuality,
    pub primary_source: SourceLocation,
    #[serde(default)]
    pub secondary_sources: Vec<SourceLocation>,
    pub context_description: Option<String>,
    pub formula: Option<String>,
    pub calculated: bool,
}

/// A registered source document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub id: String,
    pub name: String,
    pub path: String,
    pub doc_type: SourceDocumentType,
    #[serde(default)]
    pub metadata: FxHashMap<String, serde_json::Value>,
}

/// Verbosity of attribution text. Callers branch on exactly these three
/// names, so the vocabulary is fixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AttributionFormat {
    Minimal,
    #[default]
    Detailed,
    Comprehensive,
}

impl AttributionFormat {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Minimal => "minimal",
            Self::Detailed => "detailed",
            Self::Comprehensive => "comprehensive",
        }
    }
}

impl FromStr for AttributionFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "minimal" => Ok(Self::Minimal),
            "detailed" => Ok(Self::Detailed),
            "comprehensive" => Ok(Self::Comprehensive),
            other => Err(format!("unknown attribution format: {other}")),
        }
    }
}

/// Structured context for a single data point.
#[derive(Debug, Clone, Serialize)]
pub struct SourceContext {
    pub data_point_id: String,
    pub value: ScalarValue,
    pub data_type: DataKind,
    pub source_details: SourceDetails,
    pub quality_assessment: QualityAssessment,
    pub validation: ValidationFlags,
    pub cross_references: CrossReferenceSummary,
}

#[derive(Debug, Clone, Serialize)]
pub struct SourceDetails {
    pub document: String,
    pub location: Option<String>,
    pub page_or_sheet: Option<String>,
    pub table: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct QualityAssessment {
    pub confidence: f64,
    pub quality_level: ExtractionQuality,
    pub calculated: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidationFlags {
    pub extraction_method: String,
    pub has_formula: bool,
    pub has_context: bool,
    pub coordinates_available: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct CrossReferenceSummary {
    pub secondary_sources_count: usize,
    pub has_cross_refs: bool,
}

/// Result of validating a set of data points for mutual consistency.
#[derive(Debug, Clone, Serialize)]
pub struct ConsistencyReport {
    pub consistent: bool,
    pub issues: Vec<String>,
    pub confidence_distribution: ConfidenceDistribution,
    pub source_coverage: SourceCoverage,
    pub quality_assessment: ExtractionQuality,
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct ConfidenceDistribution {
    pub average: f64,
    pub minimum: f64,
    pub maximum: f64,
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct SourceCoverage {
    pub unique_documents: usize,
    pub extraction_methods: Vec<String>,
    pub total_data_points: usize,
}
