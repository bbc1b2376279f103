//! Central registry for document source attribution.

use deckweave_core::types::collections::{FxHashMap, FxHashSet};
use deckweave_core::types::ids::IdGenerator;
use deckweave_core::types::value::{DataKind, ScalarValue};
use serde_json::Value as JsonValue;
use tracing::debug;

use super::types::{
    AttributionFormat, ConfidenceDistribution, ConsistencyReport, CrossReferenceSummary,
    DataPoint, DocumentRecord, ExtractionQuality, LocationDetails, QualityAssessment,
    SourceContext, SourceCoverage, SourceDetails, SourceDocumentType, ValidationFlags,
};

/// Optional fields for `track_data_point`.
#[derive(Debug, Clone)]
pub struct TrackOptions {
    pub confidence: f64,
    pub context: Option<String>,
    pub formula: Option<String>,
}

impl Default for TrackOptions {
    fn default() -> Self {
        Self {
            confidence: 1.0,
            context: None,
            formula: None,
        }
    }
}

/// Registry mapping document and data-point IDs to their locations.
///
/// One tracker per processing session; no internal locking. Unknown-ID
/// lookups return sentinel values rather than erroring, so the rendering
/// layer never crashes mid-deck.
#[derive(Debug, Default)]
pub struct SourceTracker {
    pub(crate) documents: FxHashMap<String, DocumentRecord>,
    pub(crate) data_points: FxHashMap<String, DataPoint>,
    /// document_id → data-point IDs tracked against it, in tracking order.
    pub(crate) source_mappings: FxHashMap<String, Vec<String>>,
    pub(crate) ids: IdGenerator,
}

impl SourceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a document and return its fresh unique ID. Re-registering
    /// the same path creates a new logical document instance.
    pub fn register_document(
        &mut self,
        path: &str,
        doc_type: SourceDocumentType,
        metadata: FxHashMap<String, JsonValue>,
    ) -> String {
        let id = self.ids.next_id("doc");
        let name = path.rsplit('/').next().unwrap_or(path).to_string();
        self.documents.insert(
            id.clone(),
            DocumentRecord {
                id: id.clone(),
                name,
                path: path.to_string(),
                doc_type,
                metadata,
            },
        );
        self.source_mappings.insert(id.clone(), Vec::new());
        id
    }

    /// Track a new data point and return its ID.
    ///
    /// Callers must pass an ID from `register_document`; an unknown
    /// `document_id` still issues a data-point ID but attribution for it
    /// degrades to `"Unknown"`.
    pub fn track_data_point(
        &mut self,
        value: impl Into<ScalarValue>,
        document_id: &str,
        details: LocationDetails,
        options: TrackOptions,
    ) -> String {
        let id = self.ids.next_id("dp");
        let value = value.into();
        let confidence = options.confidence.clamp(0.0, 1.0);

        if !self.documents.contains_key(document_id) {
            debug!(document_id, "tracking data point against unregistered document");
        }

        let data_point = DataPoint {
            id: id.clone(),
            data_type: DataKind::classify(&value),
            value,
            confidence,
            extraction_quality: ExtractionQuality::from_confidence(confidence),
            primary_source: details.into_location(document_id, "automated"),
            secondary_sources: Vec::new(),
            context_description: options.context,
            calculated: options.formula.is_some(),
            formula: options.formula,
        };
        self.data_points.insert(id.clone(), data_point);

        if let Some(mapping) = self.source_mappings.get_mut(document_id) {
            mapping.push(id.clone());
        }
        id
    }

    /// Append a cross-reference location to an existing data point.
    /// No-op when the data point is unknown.
    pub fn add_secondary_source(
        &mut self,
        data_point_id: &str,
        document_id: &str,
        details: LocationDetails,
        context: Option<String>,
    ) {
        let Some(data_point) = self.data_points.get_mut(data_point_id) else {
            debug!(data_point_id, "secondary source for unknown data point ignored");
            return;
        };
        let mut location = details.into_location(document_id, "cross_reference");
        if location.surrounding_context.is_none() {
            location.surrounding_context = context;
        }
        data_point.secondary_sources.push(location);
    }

    /// Build a `file:///` hyperlink to the data point's primary source.
    ///
    /// Excel sources get a `#Sheet!Cell` anchor, PDF sources `#page=N`.
    /// Unknown IDs return `link_text` (or `"No source"`) literally — a
    /// deliberate fallback, not an error.
    pub fn get_source_hyperlink(&self, data_point_id: &str, link_text: Option<&str>) -> String {
        let fallback = || link_text.unwrap_or("No source").to_string();

        let Some(data_point) = self.data_points.get(data_point_id) else {
            return fallback();
        };
        let location = &data_point.primary_source;
        let Some(document) = self.documents.get(&location.document_id) else {
            return fallback();
        };

        let base = format!("file:///{}", percent_encode_path(&document.path));
        match document.doc_type {
            SourceDocumentType::Excel => {
                if let (Some(sheet), Some(cell)) =
                    (&location.page_or_sheet, &location.cell_or_section)
                {
                    return format!("{base}#{sheet}!{cell}");
                }
            }
            SourceDocumentType::Pdf => {
                if let Some(page) = &location.page_or_sheet {
                    let page = page.strip_prefix("Page ").unwrap_or(page);
                    if !page.is_empty() && page.chars().all(|c| c.is_ascii_digit()) {
                        return format!("{base}#page={page}");
                    }
                }
            }
            SourceDocumentType::Word => {}
        }
        base
    }

    /// Human-readable attribution for a data point.
    pub fn get_source_attribution_text(
        &self,
        data_point_id: &str,
        format: AttributionFormat,
    ) -> String {
        let Some(data_point) = self.data_points.get(data_point_id) else {
            return "Source: Unknown".to_string();
        };
        let doc_name = self.document_name(&data_point.primary_source.document_id);

        match format {
            AttributionFormat::Minimal => format!("Source: {doc_name}"),
            AttributionFormat::Detailed => self.detailed_attribution(data_point, &doc_name),
            AttributionFormat::Comprehensive => {
                let mut text = self.detailed_attribution(data_point, &doc_name);
                if !data_point.secondary_sources.is_empty() {
                    let also: Vec<String> = data_point
                        .secondary_sources
                        .iter()
                        .map(|loc| self.document_name(&loc.document_id))
                        .collect();
                    text.push_str(&format!(" | Also in: {}", also.join(", ")));
                }
                text
            }
        }
    }

    fn detailed_attribution(&self, data_point: &DataPoint, doc_name: &str) -> String {
        let location = &data_point.primary_source;
        let mut parts = vec![format!("Source: {doc_name}")];
        if let Some(page_or_sheet) = &location.page_or_sheet {
            parts.push(page_or_sheet.clone());
        }
        if let Some(cell_or_section) = &location.cell_or_section {
            parts.push(cell_or_section.clone());
        }
        if data_point.confidence < 1.0 {
            parts.push(format!("{:.1}% confidence", data_point.confidence * 100.0));
        }
        parts.join(" | ")
    }

    /// Structured quality/validation context for a data point, or `None`
    /// when the ID is unknown.
    pub fn get_source_context(&self, data_point_id: &str) -> Option<SourceContext> {
        let data_point = self.data_points.get(data_point_id)?;
        let location = &data_point.primary_source;

        Some(SourceContext {
            data_point_id: data_point_id.to_string(),
            value: data_point.value.clone(),
            data_type: data_point.data_type,
            source_details: SourceDetails {
                document: self.document_name(&location.document_id),
                location: location.cell_or_section.clone(),
                page_or_sheet: location.page_or_sheet.clone(),
                table: location.table_name.clone(),
            },
            quality_assessment: QualityAssessment {
                confidence: data_point.confidence,
                quality_level: data_point.extraction_quality,
                calculated: data_point.calculated,
            },
            validation: ValidationFlags {
                extraction_method: location.extraction_method.clone(),
                has_formula: data_point.formula.is_some(),
                has_context: data_point.context_description.is_some(),
                coordinates_available: !location.coordinates.is_empty(),
            },
            cross_references: CrossReferenceSummary {
                secondary_sources_count: data_point.secondary_sources.len(),
                has_cross_refs: !data_point.secondary_sources.is_empty(),
            },
        })
    }

    /// Validate consistency across a set of data points. Unknown IDs are
    /// skipped silently and contribute nothing to the statistics.
    pub fn validate_data_consistency(&self, data_point_ids: &[String]) -> ConsistencyReport {
        let valid: Vec<&DataPoint> = data_point_ids
            .iter()
            .filter_map(|id| self.data_points.get(id))
            .collect();

        if valid.is_empty() {
            let consistent = data_point_ids.is_empty();
            let issues = if consistent {
                Vec::new()
            } else {
                vec!["No valid data points found".to_string()]
            };
            return ConsistencyReport {
                consistent,
                issues,
                confidence_distribution: ConfidenceDistribution::default(),
                source_coverage: SourceCoverage::default(),
                quality_assessment: ExtractionQuality::Low,
            };
        }

        let confidences: Vec<f64> = valid.iter().map(|dp| dp.confidence).collect();
        let minimum = confidences.iter().cloned().fold(f64::INFINITY, f64::min);
        let maximum = confidences.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let average = confidences.iter().sum::<f64>() / confidences.len() as f64;

        let mut methods = FxHashSet::default();
        let mut doc_ids = FxHashSet::default();
        for dp in &valid {
            methods.insert(dp.primary_source.extraction_method.clone());
            doc_ids.insert(dp.primary_source.document_id.clone());
        }
        let mut extraction_methods: Vec<String> = methods.into_iter().collect();
        extraction_methods.sort();

        let mut issues = Vec::new();
        let consistent = minimum >= 0.5;
        if !consistent {
            issues.push(format!(
                "Minimum confidence {minimum:.2} below 0.5 threshold"
            ));
        }

        ConsistencyReport {
            consistent,
            issues,
            confidence_distribution: ConfidenceDistribution {
                average,
                minimum,
                maximum,
            },
            source_coverage: SourceCoverage {
                unique_documents: doc_ids.len(),
                extraction_methods,
                total_data_points: valid.len(),
            },
            quality_assessment: ExtractionQuality::from_confidence(average),
        }
    }

    /// IDs of all data points tracked against a document, in order.
    pub fn data_points_for_document(&self, document_id: &str) -> &[String] {
        self.source_mappings
            .get(document_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn document(&self, document_id: &str) -> Option<&DocumentRecord> {
        self.documents.get(document_id)
    }

    pub fn data_point(&self, data_point_id: &str) -> Option<&DataPoint> {
        self.data_points.get(data_point_id)
    }

    pub fn document_count(&self) -> usize {
        self.documents.len()
    }

    pub fn data_point_count(&self) -> usize {
        self.data_points.len()
    }

    fn document_name(&self, document_id: &str) -> String {
        self.documents
            .get(document_id)
            .map(|d| d.name.clone())
            .unwrap_or_else(|| "Unknown".to_string())
    }
}

/// Percent-encode a file path for a `file:///` URL, leaving `/` and
/// unreserved characters intact.
fn percent_encode_path(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    for byte in path.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' | b'/' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn excel_tracker() -> (SourceTracker, String) {
        let mut tracker = SourceTracker::new();
        let doc_id = tracker.register_document(
            "Q3.xlsx",
            SourceDocumentType::Excel,
            FxHashMap::default(),
        );
        (tracker, doc_id)
    }

    fn summary_b15() -> LocationDetails {
        LocationDetails {
            page_or_sheet: Some("Summary".to_string()),
            cell_or_section: Some("B15".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn minimal_attribution_and_hyperlink() {
        let (mut tracker, doc_id) = excel_tracker();
        let dp_id =
            tracker.track_data_point(10_200_000i64, &doc_id, summary_b15(), TrackOptions::default());

        assert_eq!(
            tracker.get_source_attribution_text(&dp_id, AttributionFormat::Minimal),
            "Source: Q3.xlsx"
        );
        assert_eq!(
            tracker.get_source_hyperlink(&dp_id, None),
            "file:///Q3.xlsx#Summary!B15"
        );
    }

    #[test]
    fn detailed_attribution_contains_location() {
        let (mut tracker, doc_id) = excel_tracker();
        let dp_id = tracker.track_data_point(
            10_200_000i64,
            &doc_id,
            summary_b15(),
            TrackOptions {
                confidence: 0.85,
                ..Default::default()
            },
        );

        let text = tracker.get_source_attribution_text(&dp_id, AttributionFormat::Detailed);
        assert!(text.contains("Q3.xlsx"));
        assert!(text.contains("Summary"));
        assert!(text.contains("B15"));
        assert!(text.contains("85.0% confidence"));
    }

    #[test]
    fn full_confidence_omits_percentage() {
        let (mut tracker, doc_id) = excel_tracker();
        let dp_id =
            tracker.track_data_point(42i64, &doc_id, summary_b15(), TrackOptions::default());
        let text = tracker.get_source_attribution_text(&dp_id, AttributionFormat::Detailed);
        assert!(!text.contains("confidence"));
    }

    #[test]
    fn comprehensive_lists_secondary_sources() {
        let (mut tracker, doc_id) = excel_tracker();
        let other_doc = tracker.register_document(
            "reports/annual.pdf",
            SourceDocumentType::Pdf,
            FxHashMap::default(),
        );
        let dp_id =
            tracker.track_data_point(42i64, &doc_id, summary_b15(), TrackOptions::default());
        tracker.add_secondary_source(
            &dp_id,
            &other_doc,
            LocationDetails {
                page_or_sheet: Some("Page 7".to_string()),
                ..Default::default()
            },
            None,
        );

        let text = tracker.get_source_attribution_text(&dp_id, AttributionFormat::Comprehensive);
        assert!(text.contains("Also in: annual.pdf"));
    }

    #[test]
    fn pdf_hyperlink_uses_page_anchor() {
        let mut tracker = SourceTracker::new();
        let doc_id = tracker.register_document(
            "reports/annual.pdf",
            SourceDocumentType::Pdf,
            FxHashMap::default(),
        );
        let dp_id = tracker.track_data_point(
            "$10M",
            &doc_id,
            LocationDetails {
                page_or_sheet: Some("Page 7".to_string()),
                ..Default::default()
            },
            TrackOptions::default(),
        );
        assert_eq!(
            tracker.get_source_hyperlink(&dp_id, None),
            "file:///reports/annual.pdf#page=7"
        );
    }

    #[test]
    fn unknown_ids_degrade_to_sentinels() {
        let tracker = SourceTracker::new();
        assert_eq!(tracker.get_source_hyperlink("dp-missing", None), "No source");
        assert_eq!(
            tracker.get_source_hyperlink("dp-missing", Some("Revenue")),
            "Revenue"
        );
        assert_eq!(
            tracker.get_source_attribution_text("dp-missing", AttributionFormat::Detailed),
            "Source: Unknown"
        );
        assert!(tracker.get_source_context("dp-missing").is_none());
    }

    #[test]
    fn unregistered_document_degrades_to_unknown_name() {
        let mut tracker = SourceTracker::new();
        let dp_id = tracker.track_data_point(
            5i64,
            "doc-nonexistent",
            LocationDetails::default(),
            TrackOptions::default(),
        );
        assert_eq!(
            tracker.get_source_attribution_text(&dp_id, AttributionFormat::Minimal),
            "Source: Unknown"
        );
    }

    #[test]
    fn confidence_is_clamped() {
        let (mut tracker, doc_id) = excel_tracker();
        let dp_id = tracker.track_data_point(
            1i64,
            &doc_id,
            LocationDetails::default(),
            TrackOptions {
                confidence: 7.5,
                ..Default::default()
            },
        );
        assert_eq!(tracker.data_point(&dp_id).unwrap().confidence, 1.0);

        let dp_id = tracker.track_data_point(
            1i64,
            &doc_id,
            LocationDetails::default(),
            TrackOptions {
                confidence: -3.0,
                ..Default::default()
            },
        );
        assert_eq!(tracker.data_point(&dp_id).unwrap().confidence, 0.0);
    }

    #[test]
    fn consistency_flags_low_confidence() {
        let (mut tracker, doc_id) = excel_tracker();
        let a = tracker.track_data_point(
            1i64,
            &doc_id,
            LocationDetails::default(),
            TrackOptions {
                confidence: 0.95,
                ..Default::default()
            },
        );
        let b = tracker.track_data_point(
            2i64,
            &doc_id,
            LocationDetails::default(),
            TrackOptions {
                confidence: 0.3,
                ..Default::default()
            },
        );

        let report =
            tracker.validate_data_consistency(&[a, b, "dp-missing".to_string()]);
        assert!(!report.consistent);
        assert_eq!(report.issues.len(), 1);
        assert_eq!(report.source_coverage.total_data_points, 2);
        assert_eq!(report.source_coverage.unique_documents, 1);
        assert!((report.confidence_distribution.minimum - 0.3).abs() < 1e-9);
    }

    #[test]
    fn consistency_of_empty_input_is_trivially_true() {
        let tracker = SourceTracker::new();
        let report = tracker.validate_data_consistency(&[]);
        assert!(report.consistent);
        assert!(report.issues.is_empty());
    }

    #[test]
    fn paths_with_spaces_are_encoded() {
        let mut tracker = SourceTracker::new();
        let doc_id = tracker.register_document(
            "fin reports/Q3 final.xlsx",
            SourceDocumentType::Excel,
            FxHashMap::default(),
        );
        let dp_id =
            tracker.track_data_point(1i64, &doc_id, summary_b15(), TrackOptions::default());
        assert_eq!(
            tracker.get_source_hyperlink(&dp_id, None),
            "file:///fin%20reports/Q3%20final.xlsx#Summary!B15"
        );
    }
}
