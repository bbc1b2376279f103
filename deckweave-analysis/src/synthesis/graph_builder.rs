//! Document node construction and pairwise relationship analysis.

use deckweave_core::config::SynthesisConfig;
use deckweave_core::errors::SynthesisError;
use deckweave_core::types::collections::{FxHashMap, FxHashSet};
use deckweave_core::types::ids::{derive_doc_id, IdMode};
use deckweave_core::types::value::ScalarValue;
use regex::Regex;
use smallvec::smallvec;
use tracing::debug;
use xxhash_rust::xxh3::xxh3_64;

use super::types::{
    now_epoch, DocumentNode, DocumentRelationship, DocumentType, ExtractionRecord,
    RelationshipType,
};
use crate::conflicts::detector::numeric_magnitude;

/// Decides whether two values of the same metric disagree.
pub trait MetricComparer: Send + Sync {
    fn conflicting(&self, a: &ScalarValue, b: &ScalarValue) -> bool;
}

/// Rendered-string inequality. `"1500"` and `"1,500"` count as a
/// conflict under this comparer.
#[derive(Debug, Clone, Copy, Default)]
pub struct NaiveStringComparer;

impl MetricComparer for NaiveStringComparer {
    fn conflicting(&self, a: &ScalarValue, b: &ScalarValue) -> bool {
        a.to_string() != b.to_string()
    }
}

/// Parses both values to numeric magnitudes when possible and treats
/// them as conflicting only beyond a relative tolerance. Falls back to
/// string inequality when either side fails to parse.
#[derive(Debug, Clone, Copy)]
pub struct NormalizedNumericComparer {
    pub tolerance: f64,
}

impl Default for NormalizedNumericComparer {
    fn default() -> Self {
        Self { tolerance: 0.01 }
    }
}

impl MetricComparer for NormalizedNumericComparer {
    fn conflicting(&self, a: &ScalarValue, b: &ScalarValue) -> bool {
        match (numeric_magnitude(a), numeric_magnitude(b)) {
            (Some(x), Some(y)) => {
                let scale = x.abs().max(y.abs());
                if scale == 0.0 {
                    false
                } else {
                    (x - y).abs() / scale > self.tolerance
                }
            }
            _ => NaiveStringComparer.conflicting(a, b),
        }
    }
}

struct EntityPatterns {
    company: Regex,
    person: Regex,
    monetary: Regex,
    percentage: Regex,
    date: Regex,
    product: Regex,
}

impl EntityPatterns {
    fn compile() -> Result<Self, SynthesisError> {
        Ok(Self {
            company: compile(
                r"\b[A-Z][A-Za-z]+(?:\s+[A-Z][A-Za-z]+)*(?:\s+(?:Inc|Corp|LLC|Ltd|Company|Co)\.?)\b",
            )?,
            person: compile(r"\b(?:Mr|Ms|Mrs|Dr|Prof)\.?\s+[A-Z][A-Za-z]+(?:\s+[A-Z][A-Za-z]+)*\b")?,
            monetary: compile(
                r"\$[\d,]+(?:\.\d{2})?[MBK]?\b|\b\d+(?:\.\d+)?\s*(?:million|billion|thousand)\b",
            )?,
            percentage: compile(r"\b\d+(?:\.\d+)?%")?,
            date: compile(r"\b\d{1,2}[-/]\d{1,2}[-/]\d{2,4}\b|\b(?:Q[1-4]|FY)\s*\d{4}\b")?,
            product: compile(r"\b[A-Z][A-Za-z]+(?:\s+[A-Z\d]+)*\s+(?:v\d+|Version|Edition)\b")?,
        })
    }

    fn all(&self) -> [&Regex; 6] {
        [
            &self.company,
            &self.person,
            &self.monetary,
            &self.percentage,
            &self.date,
            &self.product,
        ]
    }
}

fn compile(pattern: &str) -> Result<Regex, SynthesisError> {
    Regex::new(pattern).map_err(|e| SynthesisError::PatternCompilation {
        pattern: pattern.to_string(),
        message: e.to_string(),
    })
}

const TOPIC_KEYWORDS: &[(&str, &[&str])] = &[
    ("revenue", &["revenue", "sales", "income", "receipts"]),
    ("profitability", &["profit", "margin", "earnings", "ebitda"]),
    ("growth", &["growth", "expansion", "increase", "yoy"]),
    ("market", &["market", "competition", "share", "position"]),
    ("strategy", &["strategy", "plan", "initiative", "roadmap"]),
    ("risk", &["risk", "threat", "challenge", "mitigation"]),
];

/// Builds typed document nodes from extraction records and derives
/// directed relationships between them.
pub struct DocumentGraphBuilder {
    config: SynthesisConfig,
    id_mode: IdMode,
    doc_counter: u64,
    patterns: EntityPatterns,
    topics: aho_corasick::AhoCorasick,
    topic_names: Vec<&'static str>,
    revenue_metric: Regex,
    profit_metric: Regex,
    relative_time: Regex,
    quarter: Regex,
    comparer: Box<dyn MetricComparer>,
}

impl DocumentGraphBuilder {
    pub fn new(config: SynthesisConfig, id_mode: IdMode) -> Result<Self, SynthesisError> {
        let mut keywords = Vec::new();
        let mut topic_names = Vec::new();
        for (topic, words) in TOPIC_KEYWORDS {
            for word in *words {
                keywords.push(*word);
                topic_names.push(*topic);
            }
        }
        let topics = aho_corasick::AhoCorasick::builder()
            .ascii_case_insensitive(true)
            .build(&keywords)
            .map_err(|e| SynthesisError::PatternCompilation {
                pattern: "topic keywords".to_string(),
                message: e.to_string(),
            })?;

        let comparer: Box<dyn MetricComparer> = if config.effective_normalized_metric_comparison() {
            Box::new(NormalizedNumericComparer::default())
        } else {
            Box::new(NaiveStringComparer)
        };

        Ok(Self {
            config,
            id_mode,
            doc_counter: 0,
            patterns: EntityPatterns::compile()?,
            topics,
            topic_names,
            revenue_metric: compile(r"(?i)revenue[:\s]+\$?([\d,]+(?:\.\d+)?[MBK]?)")?,
            profit_metric: compile(r"(?i)profit[:\s]+\$?([\d,]+(?:\.\d+)?[MBK]?)")?,
            relative_time: compile(
                r"(?i)(?:last|next|current)\s+(?:year|quarter|month)|YTD|year-to-date",
            )?,
            quarter: compile(r"^Q([1-4])\s+(\d{4})$")?,
            comparer,
        })
    }

    /// Swap in a different conflict comparer.
    pub fn with_comparer(mut self, comparer: Box<dyn MetricComparer>) -> Self {
        self.comparer = comparer;
        self
    }

    /// Build a fully classified node from one extraction record.
    pub fn build_document_node(&mut self, record: &ExtractionRecord) -> DocumentNode {
        let doc_type = self.classify_document_type(record);
        let entities = self.extract_entities(record);
        let topics = self.extract_topics(record);
        let key_metrics = self.extract_key_metrics(record);
        let time_references = self.extract_time_references(record);
        let confidence_score = calculate_confidence(record);

        let doc_id = match &record.doc_id {
            Some(id) => id.clone(),
            None => {
                let id = derive_doc_id(
                    self.id_mode,
                    doc_type.name(),
                    &record.source_path,
                    self.doc_counter,
                );
                self.doc_counter += 1;
                id
            }
        };

        let extraction_date = now_epoch();
        let content_hash = format!(
            "{:016x}",
            xxh3_64(
                format!("{}:{}:{extraction_date}", doc_type.name(), record.source_path).as_bytes()
            )
        );

        DocumentNode {
            doc_id,
            doc_type,
            source_path: record.source_path.clone(),
            content: record.content.clone(),
            extraction_date,
            metadata: record.metadata.clone(),
            entities,
            topics,
            key_metrics,
            time_references,
            confidence_score,
            content_hash,
        }
    }

    /// Analyze every unordered pair of nodes for relationships.
    pub fn find_relationships(&self, nodes: &[DocumentNode]) -> Vec<DocumentRelationship> {
        let mut relationships = Vec::new();
        for (i, node1) in nodes.iter().enumerate() {
            for node2 in &nodes[i + 1..] {
                self.analyze_relationship(node1, node2, &mut relationships);
            }
        }
        relationships
    }

    fn classify_document_type(&self, record: &ExtractionRecord) -> DocumentType {
        let path = record.source_path.to_lowercase();
        let content = record.content.to_lowercase();

        if [".xlsx", ".xls", "spreadsheet"].iter().any(|t| path.contains(t)) {
            DocumentType::Spreadsheet
        } else if [".pptx", ".ppt", "presentation"].iter().any(|t| path.contains(t)) {
            DocumentType::Presentation
        } else if ["financial statement", "balance sheet", "income statement"]
            .iter()
            .any(|t| content.contains(t))
        {
            DocumentType::FinancialReport
        } else if ["research report", "analysis report"].iter().any(|t| content.contains(t)) {
            DocumentType::ResearchReport
        } else if ["form 10-k", "form 10-q", "sec filing"].iter().any(|t| content.contains(t)) {
            DocumentType::RegulatoryFiling
        } else {
            DocumentType::Unknown
        }
    }

    fn extract_entities(&self, record: &ExtractionRecord) -> FxHashSet<String> {
        let mut entities = FxHashSet::default();
        for pattern in self.patterns.all() {
            for m in pattern.find_iter(&record.content) {
                entities.insert(m.as_str().to_string());
            }
        }
        // Structured metric names count as entities too.
        for key in record.financial_metrics.keys() {
            entities.insert(key.clone());
        }
        entities
    }

    fn extract_topics(&self, record: &ExtractionRecord) -> FxHashSet<String> {
        let mut topics = FxHashSet::default();
        for m in self.topics.find_iter(&record.content) {
            topics.insert(self.topic_names[m.pattern().as_usize()].to_string());
        }
        topics
    }

    fn extract_key_metrics(&self, record: &ExtractionRecord) -> FxHashMap<String, ScalarValue> {
        let mut metrics: FxHashMap<String, ScalarValue> = record.financial_metrics.clone();

        // First textual mention wins; structured values take precedence.
        if !metrics.contains_key("revenue") {
            if let Some(caps) = self.revenue_metric.captures(&record.content) {
                metrics.insert("revenue".to_string(), ScalarValue::Text(caps[1].to_string()));
            }
        }
        if !metrics.contains_key("profit") {
            if let Some(caps) = self.profit_metric.captures(&record.content) {
                metrics.insert("profit".to_string(), ScalarValue::Text(caps[1].to_string()));
            }
        }
        metrics
    }

    fn extract_time_references(&self, record: &ExtractionRecord) -> FxHashSet<String> {
        let mut refs = FxHashSet::default();
        for m in self.patterns.date.find_iter(&record.content) {
            refs.insert(m.as_str().to_string());
        }
        for m in self.relative_time.find_iter(&record.content) {
            refs.insert(m.as_str().to_string());
        }
        refs
    }

    fn analyze_relationship(
        &self,
        node1: &DocumentNode,
        node2: &DocumentNode,
        out: &mut Vec<DocumentRelationship>,
    ) {
        let mut common: Vec<&str> = node1
            .entities
            .intersection(&node2.entities)
            .map(String::as_str)
            .collect();
        if common.len() > self.config.effective_shared_entity_threshold() {
            common.sort_unstable();
            let denom = node1.entities.len().max(node2.entities.len()).max(1);
            out.push(DocumentRelationship {
                source_doc_id: node1.doc_id.clone(),
                target_doc_id: node2.doc_id.clone(),
                relationship_type: RelationshipType::SimilarTo,
                confidence: common.len() as f64 / denom as f64,
                evidence: smallvec![format!(
                    "Common entities: {}",
                    common[..common.len().min(5)].join(", ")
                )],
                metadata: FxHashMap::default(),
            });
        }

        if !node1.time_references.is_empty()
            && !node2.time_references.is_empty()
            && self.is_update_relationship(node1, node2)
        {
            // Directed newer -> older.
            out.push(DocumentRelationship {
                source_doc_id: node2.doc_id.clone(),
                target_doc_id: node1.doc_id.clone(),
                relationship_type: RelationshipType::Updates,
                confidence: 0.8,
                evidence: smallvec!["Temporal sequence detected".to_string()],
                metadata: FxHashMap::default(),
            });
        }

        let conflicts = self.find_metric_conflicts(node1, node2);
        if !conflicts.is_empty() {
            out.push(DocumentRelationship {
                source_doc_id: node1.doc_id.clone(),
                target_doc_id: node2.doc_id.clone(),
                relationship_type: RelationshipType::Contradicts,
                confidence: 0.9,
                evidence: conflicts.into(),
                metadata: FxHashMap::default(),
            });
        }
    }

    fn is_update_relationship(&self, node1: &DocumentNode, node2: &DocumentNode) -> bool {
        let node1_dates = self.parse_quarter_dates(&node1.time_references);
        let node2_dates = self.parse_quarter_dates(&node2.time_references);
        match (node1_dates.iter().max(), node2_dates.iter().max()) {
            (Some(d1), Some(d2)) => d2 > d1,
            _ => false,
        }
    }

    fn parse_quarter_dates(&self, refs: &FxHashSet<String>) -> Vec<(u32, u32)> {
        refs.iter()
            .filter_map(|r| match self.parse_quarter(r) {
                Some(date) => Some(date),
                None => {
                    debug!(reference = %r, "time reference not in quarter form, skipping");
                    None
                }
            })
            .collect()
    }

    /// Only `Q<n> YYYY` is comparable; everything else is unordered.
    fn parse_quarter(&self, date_str: &str) -> Option<(u32, u32)> {
        let caps = self.quarter.captures(date_str)?;
        let quarter: u32 = caps[1].parse().ok()?;
        let year: u32 = caps[2].parse().ok()?;
        Some((year, quarter))
    }

    fn find_metric_conflicts(&self, node1: &DocumentNode, node2: &DocumentNode) -> Vec<String> {
        let mut shared: Vec<&String> = node1
            .key_metrics
            .keys()
            .filter(|k| node2.key_metrics.contains_key(*k))
            .collect();
        shared.sort_unstable();

        let mut conflicts = Vec::new();
        for metric in shared {
            let val1 = &node1.key_metrics[metric];
            let val2 = &node2.key_metrics[metric];
            if self.comparer.conflicting(val1, val2) {
                conflicts.push(format!("Conflicting {metric}: {val1} vs {val2}"));
            }
        }
        conflicts
    }
}

fn calculate_confidence(record: &ExtractionRecord) -> f64 {
    let mut confidence: f64 = 0.5;
    if !record.financial_metrics.is_empty() {
        confidence += 0.2;
    }
    if !record.source_refs.is_empty() {
        confidence += 0.1;
    }
    if record.metadata.get("author").is_some_and(|a| !a.is_empty()) {
        confidence += 0.1;
    }
    if record.metadata.get("date").is_some_and(|d| !d.is_empty()) {
        confidence += 0.1;
    }
    confidence.min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builder() -> DocumentGraphBuilder {
        DocumentGraphBuilder::new(SynthesisConfig::default(), IdMode::Session).unwrap()
    }

    fn record(path: &str, content: &str) -> ExtractionRecord {
        ExtractionRecord {
            source_path: path.to_string(),
            content: content.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn classifies_by_path_then_content() {
        let mut b = builder();
        let sheet = b.build_document_node(&record("data/q3.xlsx", "balance sheet"));
        assert_eq!(sheet.doc_type, DocumentType::Spreadsheet);

        let fin = b.build_document_node(&record("report.txt", "See the income statement."));
        assert_eq!(fin.doc_type, DocumentType::FinancialReport);

        let filing = b.build_document_node(&record("doc.txt", "Per our Form 10-K disclosure"));
        assert_eq!(filing.doc_type, DocumentType::RegulatoryFiling);

        let unknown = b.build_document_node(&record("notes.txt", "misc"));
        assert_eq!(unknown.doc_type, DocumentType::Unknown);
    }

    #[test]
    fn extracts_entities_topics_and_metrics() {
        let mut b = builder();
        let node = b.build_document_node(&record(
            "brief.txt",
            "Acme Corp reported revenue: $1,200M and profit: $300M. \
             Dr. Jane Smith noted 12.5% growth in market share for Q3 2024.",
        ));

        assert!(node.entities.contains("Acme Corp"));
        assert!(node.entities.iter().any(|e| e.contains("Jane Smith")));
        assert!(node.entities.contains("12.5%"));
        assert!(node.topics.contains("revenue"));
        assert!(node.topics.contains("growth"));
        assert!(node.topics.contains("market"));
        assert_eq!(
            node.key_metrics.get("revenue"),
            Some(&ScalarValue::Text("1,200M".to_string()))
        );
        assert_eq!(
            node.key_metrics.get("profit"),
            Some(&ScalarValue::Text("300M".to_string()))
        );
        assert!(node.time_references.contains("Q3 2024"));
    }

    #[test]
    fn structured_metrics_override_textual_mentions() {
        let mut b = builder();
        let mut rec = record("brief.txt", "revenue: $900M");
        rec.financial_metrics
            .insert("revenue".to_string(), ScalarValue::Number(1_000_000.0));
        let node = b.build_document_node(&rec);
        assert_eq!(
            node.key_metrics.get("revenue"),
            Some(&ScalarValue::Number(1_000_000.0))
        );
        // Metric names are also entities.
        assert!(node.entities.contains("revenue"));
    }

    #[test]
    fn confidence_accumulates_and_caps() {
        let bare = record("a.txt", "");
        assert_eq!(calculate_confidence(&bare), 0.5);

        let mut full = record("a.txt", "");
        full.financial_metrics
            .insert("revenue".to_string(), 1.0.into());
        full.source_refs.push("ref".to_string());
        full.metadata.insert("author".to_string(), "x".to_string());
        full.metadata.insert("date".to_string(), "2024".to_string());
        assert!((calculate_confidence(&full) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn similar_to_requires_more_than_threshold_entities() {
        let mut b = builder();
        let n1 = b.build_document_node(&record(
            "a.txt",
            "Acme Corp, Beta Inc and Gamma Ltd met Dr. Smith.",
        ));
        let n2 = b.build_document_node(&record(
            "b.txt",
            "Acme Corp, Beta Inc and Gamma Ltd hired Dr. Smith.",
        ));
        let rels = b.find_relationships(&[n1, n2]);
        let similar: Vec<_> = rels
            .iter()
            .filter(|r| r.relationship_type == RelationshipType::SimilarTo)
            .collect();
        assert_eq!(similar.len(), 1);
        assert!(similar[0].confidence > 0.0 && similar[0].confidence <= 1.0);
        assert!(similar[0].evidence[0].starts_with("Common entities: "));
    }

    #[test]
    fn two_shared_entities_are_not_enough() {
        let mut b = builder();
        let n1 = b.build_document_node(&record("a.txt", "Acme Corp and Beta Inc."));
        let n2 = b.build_document_node(&record("b.txt", "Acme Corp and Beta Inc."));
        let rels = b.find_relationships(&[n1, n2]);
        assert!(rels
            .iter()
            .all(|r| r.relationship_type != RelationshipType::SimilarTo));
    }

    #[test]
    fn updates_edge_points_newer_to_older() {
        let mut b = builder();
        let older = b.build_document_node(&record("q1.txt", "Results for Q1 2024."));
        let newer = b.build_document_node(&record("q3.txt", "Results for Q3 2024."));
        let rels = b.find_relationships(&[older.clone(), newer.clone()]);

        let updates: Vec<_> = rels
            .iter()
            .filter(|r| r.relationship_type == RelationshipType::Updates)
            .collect();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].source_doc_id, newer.doc_id);
        assert_eq!(updates[0].target_doc_id, older.doc_id);
        assert!((updates[0].confidence - 0.8).abs() < 1e-12);
    }

    #[test]
    fn unparseable_time_refs_never_produce_updates() {
        let mut b = builder();
        let n1 = b.build_document_node(&record("a.txt", "due next quarter"));
        let n2 = b.build_document_node(&record("b.txt", "as of 03/15/2024"));
        let rels = b.find_relationships(&[n1, n2]);
        assert!(rels
            .iter()
            .all(|r| r.relationship_type != RelationshipType::Updates));
    }

    #[test]
    fn naive_comparer_flags_formatting_differences() {
        let mut b = builder();
        let mut r1 = record("a.txt", "");
        r1.financial_metrics
            .insert("revenue".to_string(), ScalarValue::Text("1500".to_string()));
        let mut r2 = record("b.txt", "");
        r2.financial_metrics
            .insert("revenue".to_string(), ScalarValue::Text("1,500".to_string()));

        let n1 = b.build_document_node(&r1);
        let n2 = b.build_document_node(&r2);
        let rels = b.find_relationships(&[n1, n2]);
        let contra: Vec<_> = rels
            .iter()
            .filter(|r| r.relationship_type == RelationshipType::Contradicts)
            .collect();
        assert_eq!(contra.len(), 1);
        assert_eq!(contra[0].evidence[0], "Conflicting revenue: 1500 vs 1,500");
        assert!((contra[0].confidence - 0.9).abs() < 1e-12);
    }

    #[test]
    fn normalized_comparer_tolerates_formatting() {
        let cmp = NormalizedNumericComparer::default();
        assert!(!cmp.conflicting(
            &ScalarValue::Text("1500".to_string()),
            &ScalarValue::Text("1,500".to_string()),
        ));
        assert!(cmp.conflicting(
            &ScalarValue::Text("1500".to_string()),
            &ScalarValue::Text("1800".to_string()),
        ));
        assert!(!cmp.conflicting(
            &ScalarValue::Text("$1.5M".to_string()),
            &ScalarValue::Number(1_500_000.0),
        ));
    }

    #[test]
    fn session_ids_are_unique_for_identical_input() {
        let mut b = builder();
        let n1 = b.build_document_node(&record("same.txt", "x"));
        let n2 = b.build_document_node(&record("same.txt", "x"));
        assert_ne!(n1.doc_id, n2.doc_id);
    }

    #[test]
    fn reproducible_ids_are_stable_for_identical_input() {
        let mut b =
            DocumentGraphBuilder::new(SynthesisConfig::default(), IdMode::Reproducible).unwrap();
        let n1 = b.build_document_node(&record("same.txt", "x"));
        let n2 = b.build_document_node(&record("same.txt", "x"));
        assert_eq!(n1.doc_id, n2.doc_id);
    }

    #[test]
    fn explicit_doc_id_is_respected() {
        let mut b = builder();
        let mut rec = record("a.txt", "");
        rec.doc_id = Some("doc-custom".to_string());
        assert_eq!(b.build_document_node(&rec).doc_id, "doc-custom");
    }

    #[test]
    fn pattern_errors_carry_the_offending_pattern() {
        let err = compile(r"(unclosed").unwrap_err();
        let SynthesisError::PatternCompilation { pattern, message } = err else {
            panic!("expected a pattern compilation error");
        };
        assert_eq!(pattern, r"(unclosed");
        assert!(!message.is_empty());
    }

    #[test]
    fn builder_selects_comparer_from_config() {
        let config = SynthesisConfig {
            normalized_metric_comparison: Some(true),
            ..Default::default()
        };
        let mut b = DocumentGraphBuilder::new(config, IdMode::Session).unwrap();
        let mut r1 = record("a.txt", "");
        r1.financial_metrics
            .insert("revenue".to_string(), ScalarValue::Text("1500".to_string()));
        let mut r2 = record("b.txt", "");
        r2.financial_metrics
            .insert("revenue".to_string(), ScalarValue::Text("1,500".to_string()));

        let n1 = b.build_document_node(&r1);
        let n2 = b.build_document_node(&r2);
        let rels = b.find_relationships(&[n1, n2]);
        assert!(rels
            .iter()
            .all(|r| r.relationship_type != RelationshipType::Contradicts));
    }
}
