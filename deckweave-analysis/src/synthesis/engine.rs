//! Orchestrates a full synthesis run: nodes, relationships, clusters,
//! entity map, timeline, conflicts, and summary insights.

use deckweave_core::config::SynthesisConfig;
use deckweave_core::errors::SynthesisError;
use deckweave_core::types::collections::{FxHashMap, FxHashSet};
use deckweave_core::types::ids::IdMode;
use serde_json::json;
use tracing::info;

use super::clustering::SemanticClusteringEngine;
use super::graph_builder::DocumentGraphBuilder;
use super::types::{
    now_epoch, ConflictRecord, ContentCluster, DocumentNode, DocumentRelationship,
    ExtractionRecord, RelationshipType, SynthesisInsight, SynthesisInsightKind, SynthesisMetadata,
    SynthesisResult, TimelineEntry,
};

pub struct SynthesisEngine {
    graph_builder: DocumentGraphBuilder,
    clustering_engine: SemanticClusteringEngine,
}

impl SynthesisEngine {
    pub fn new(config: SynthesisConfig, id_mode: IdMode) -> Result<Self, SynthesisError> {
        Ok(Self {
            clustering_engine: SemanticClusteringEngine::new(&config),
            graph_builder: DocumentGraphBuilder::new(config, id_mode)?,
        })
    }

    /// Run the full pipeline over a batch of extraction records.
    pub fn synthesize_documents(&mut self, records: &[ExtractionRecord]) -> SynthesisResult {
        let nodes: Vec<DocumentNode> = records
            .iter()
            .map(|r| self.graph_builder.build_document_node(r))
            .collect();

        let relationships = self.graph_builder.find_relationships(&nodes);
        let clusters = self.clustering_engine.cluster_documents(&nodes);
        let entity_map = build_entity_map(&nodes);
        let timeline = extract_timeline(&nodes);
        let conflicts = find_conflicts(&nodes, &relationships);
        let insights = generate_insights(&nodes, &relationships, &clusters);

        info!(
            documents = nodes.len(),
            relationships = relationships.len(),
            clusters = clusters.len(),
            conflicts = conflicts.len(),
            "synthesis complete"
        );

        let metadata = SynthesisMetadata {
            num_documents: nodes.len(),
            num_relationships: relationships.len(),
            num_clusters: clusters.len(),
            synthesis_timestamp: now_epoch(),
        };

        SynthesisResult {
            document_graph: nodes.into_iter().map(|n| (n.doc_id.clone(), n)).collect(),
            relationships,
            clusters,
            entity_map,
            timeline,
            conflicts,
            insights,
            metadata,
        }
    }
}

fn build_entity_map(nodes: &[DocumentNode]) -> FxHashMap<String, FxHashSet<String>> {
    let mut map: FxHashMap<String, FxHashSet<String>> = FxHashMap::default();
    for node in nodes {
        for entity in &node.entities {
            map.entry(entity.clone())
                .or_default()
                .insert(node.doc_id.clone());
        }
    }
    map
}

/// One entry per (node, time reference), sorted by the raw date string
/// with doc ID as tiebreaker.
fn extract_timeline(nodes: &[DocumentNode]) -> Vec<TimelineEntry> {
    let mut timeline = Vec::new();
    for node in nodes {
        for time_ref in &node.time_references {
            timeline.push(TimelineEntry {
                date: time_ref.clone(),
                doc_id: node.doc_id.clone(),
                doc_type: node.doc_type,
                confidence: node.confidence_score,
            });
        }
    }
    timeline.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.doc_id.cmp(&b.doc_id)));
    timeline
}

fn find_conflicts(
    nodes: &[DocumentNode],
    relationships: &[DocumentRelationship],
) -> Vec<ConflictRecord> {
    let by_id: FxHashMap<&str, &DocumentNode> =
        nodes.iter().map(|n| (n.doc_id.as_str(), n)).collect();

    relationships
        .iter()
        .filter(|r| r.relationship_type == RelationshipType::Contradicts)
        .filter_map(|rel| {
            let source = by_id.get(rel.source_doc_id.as_str())?;
            let target = by_id.get(rel.target_doc_id.as_str())?;
            Some(ConflictRecord {
                source_doc: rel.source_doc_id.clone(),
                target_doc: rel.target_doc_id.clone(),
                evidence: rel.evidence.to_vec(),
                confidence: rel.confidence,
                resolution_hint: suggest_conflict_resolution(source, target),
            })
        })
        .collect()
}

/// Confidence wins first, recency second, otherwise punt to a human.
fn suggest_conflict_resolution(source: &DocumentNode, target: &DocumentNode) -> String {
    if source.confidence_score > target.confidence_score {
        format!("Prefer data from {} (higher confidence)", source.doc_id)
    } else if source.extraction_date > target.extraction_date {
        format!("Prefer data from {} (more recent)", source.doc_id)
    } else {
        "Manual review recommended".to_string()
    }
}

fn generate_insights(
    nodes: &[DocumentNode],
    relationships: &[DocumentRelationship],
    clusters: &[ContentCluster],
) -> Vec<SynthesisInsight> {
    let mut insights = Vec::new();

    let mut doc_types: FxHashMap<&str, usize> = FxHashMap::default();
    for node in nodes {
        *doc_types.entry(node.doc_type.name()).or_default() += 1;
    }
    insights.push(make_insight(
        SynthesisInsightKind::DocumentCoverage,
        "Document type distribution",
        json!(doc_types),
    ));

    let mut entity_counts: FxHashMap<&str, usize> = FxHashMap::default();
    for node in nodes {
        for entity in &node.entities {
            *entity_counts.entry(entity.as_str()).or_default() += 1;
        }
    }
    if !entity_counts.is_empty() {
        let mut ranked: Vec<(&str, usize)> = entity_counts.into_iter().collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        ranked.truncate(5);
        let top: FxHashMap<&str, usize> = ranked.into_iter().collect();
        insights.push(make_insight(
            SynthesisInsightKind::KeyEntities,
            "Most frequently mentioned entities",
            json!(top),
        ));
    }

    let mut topic_counts: FxHashMap<&str, usize> = FxHashMap::default();
    for node in nodes {
        for topic in &node.topics {
            *topic_counts.entry(topic.as_str()).or_default() += 1;
        }
    }
    if !topic_counts.is_empty() {
        insights.push(make_insight(
            SynthesisInsightKind::TopicDistribution,
            "Main topics across documents",
            json!(topic_counts),
        ));
    }

    let mut rel_types: FxHashMap<&str, usize> = FxHashMap::default();
    for rel in relationships {
        *rel_types.entry(rel.relationship_type.name()).or_default() += 1;
    }
    if !rel_types.is_empty() {
        insights.push(make_insight(
            SynthesisInsightKind::RelationshipPatterns,
            "Types of relationships found",
            json!(rel_types),
        ));
    }

    if !clusters.is_empty() {
        let themes: Vec<&str> = clusters.iter().map(|c| c.theme.as_str()).collect();
        insights.push(make_insight(
            SynthesisInsightKind::ContentThemes,
            "Major content themes identified",
            json!(themes),
        ));
    }

    insights.sort_by(|a, b| {
        b.importance
            .partial_cmp(&a.importance)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    insights
}

fn make_insight(
    kind: SynthesisInsightKind,
    description: &str,
    data: serde_json::Value,
) -> SynthesisInsight {
    SynthesisInsight {
        kind,
        description: description.to_string(),
        data,
        importance: kind.importance(),
    }
}
