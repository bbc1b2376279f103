//! Top-level entity/relationship mapping facade.

use deckweave_core::config::EntityConfig;
use deckweave_core::errors::SynthesisError;
use deckweave_core::types::collections::FxHashMap;
use serde::Serialize;
use tracing::info;

use super::extraction::{entity_doc_id, EntityPatterns, ExtractionPass};
use super::merge::merge_duplicate_entities;
use super::network::{EntityNetwork, NetworkNode};
use super::relationships::RelationshipDetector;
use super::types::{EntityArena, EntityType, Relationship};
use crate::synthesis::DocumentNode;

/// Inferred category of a timeline event, from occurrence context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Acquisition,
    Partnership,
    ProductLaunch,
    Appointment,
    Financial,
    General,
}

impl EventType {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Acquisition => "acquisition",
            Self::Partnership => "partnership",
            Self::ProductLaunch => "product_launch",
            Self::Appointment => "appointment",
            Self::Financial => "financial",
            Self::General => "general",
        }
    }

    fn infer(context: &str) -> Self {
        let lower = context.to_lowercase();
        let has = |words: &[&str]| words.iter().any(|w| lower.contains(w));
        if has(&["acquired", "acquisition", "bought", "purchased"]) {
            Self::Acquisition
        } else if has(&["partnership", "partner", "collaborate"]) {
            Self::Partnership
        } else if has(&["launched", "released", "introduced"]) {
            Self::ProductLaunch
        } else if has(&["appointed", "hired", "joined"]) {
            Self::Appointment
        } else if has(&["earnings", "revenue", "profit"]) {
            Self::Financial
        } else {
            Self::General
        }
    }
}

/// One dated mention of an entity.
#[derive(Debug, Clone, Serialize)]
pub struct TimelineEvent {
    pub entity: String,
    pub date: String,
    pub document_id: String,
    pub context: String,
    pub event_type: EventType,
}

/// Extracts entities from document nodes, dedups them, detects
/// relationships, and exposes network analysis over the result.
pub struct EntityRelationshipMapper {
    config: EntityConfig,
    patterns: EntityPatterns,
    arena: EntityArena,
    relationships: Vec<Relationship>,
}

impl EntityRelationshipMapper {
    pub fn new(config: EntityConfig) -> Result<Self, SynthesisError> {
        Ok(Self {
            config,
            patterns: EntityPatterns::compile_all()?,
            arena: EntityArena::new(),
            relationships: Vec::new(),
        })
    }

    /// Run per-type extractors over the nodes, then merge duplicates.
    /// `entity_types = None` extracts every type.
    pub fn extract_entities(
        &mut self,
        document_nodes: &[DocumentNode],
        entity_types: Option<&[EntityType]>,
    ) -> &EntityArena {
        let wanted = |t: EntityType| entity_types.map_or(true, |types| types.contains(&t));
        let pass = ExtractionPass {
            patterns: &self.patterns,
            context_window: self.config.effective_context_window(),
        };

        for node in document_nodes {
            let doc_id = entity_doc_id(node).to_string();

            if wanted(EntityType::Company) {
                pass.extract_companies(&mut self.arena, &node.content, &doc_id);
            }
            if wanted(EntityType::Person) {
                pass.extract_people(&mut self.arena, &node.content, &doc_id);
            }
            if wanted(EntityType::Product) {
                pass.extract_products(&mut self.arena, &node.content, &doc_id);
            }
            if wanted(EntityType::FinancialMetric) {
                pass.extract_financials(&mut self.arena, &node.content, &doc_id);
            }
            if wanted(EntityType::Date) {
                pass.extract_dates(&mut self.arena, &node.content, &doc_id);
            }
        }

        self.arena = merge_duplicate_entities(
            &self.arena,
            self.config.effective_merge_similarity_threshold(),
        );
        info!(entities = self.arena.len(), "extracted unique entities");
        &self.arena
    }

    /// Detect explicit and implicit relationships over the current
    /// entity set. Replaces any previous result.
    pub fn identify_relationships(&mut self, documents: &[DocumentNode]) -> &[Relationship] {
        let detector = RelationshipDetector {
            context_window: self.config.effective_context_window(),
            cooccurrence_threshold: self.config.effective_cooccurrence_threshold(),
        };
        self.relationships = detector.detect(&self.arena, documents);
        info!(
            relationships = self.relationships.len(),
            "identified relationships"
        );
        &self.relationships
    }

    pub fn build_network_graph(&self) -> EntityNetwork {
        EntityNetwork::build(&self.arena, &self.relationships)
    }

    pub fn analyze_network_metrics(
        &self,
        network: &EntityNetwork,
    ) -> FxHashMap<String, NetworkNode> {
        network.analyze_metrics(&self.arena)
    }

    /// Dated mentions of one entity, from dates appearing inside its
    /// occurrence contexts, sorted lexicographically by date string.
    pub fn get_entity_timeline(&self, entity_name: &str) -> Vec<TimelineEvent> {
        let Some(entity) = self.arena.by_name(entity_name) else {
            return Vec::new();
        };

        let mut timeline = Vec::new();
        for occurrence in &entity.occurrences {
            for m in self.patterns.date.find_iter(&occurrence.context) {
                timeline.push(TimelineEvent {
                    entity: entity_name.to_string(),
                    date: m.as_str().to_string(),
                    document_id: occurrence.document_id.clone(),
                    context: occurrence.context.clone(),
                    event_type: EventType::infer(&occurrence.context),
                });
            }
        }
        timeline.sort_by(|a, b| a.date.cmp(&b.date));
        timeline
    }

    pub fn entities(&self) -> &EntityArena {
        &self.arena
    }

    pub fn relationships(&self) -> &[Relationship] {
        &self.relationships
    }
}
