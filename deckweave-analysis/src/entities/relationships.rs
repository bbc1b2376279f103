//! Pattern-based and co-occurrence relationship detection.
//!
//! Explicit detectors build one regex per entity-pair-times-alias-pair
//! and pattern family, quadratic-and-then-some in the number of
//! companies per document. Acceptable for small batches; documented as
//! a scaling limit.

use deckweave_core::types::collections::{FxHashMap, FxHashSet};
use regex::Regex;
use tracing::debug;

use super::extraction::{entity_doc_id, extract_context};
use super::types::{EntityArena, EntityId, EntityType, RelationType, Relationship};
use crate::synthesis::DocumentNode;

const OWNERSHIP_PATTERNS: &[&str] = &[
    r"(?i){0}\s+(?:owns?|acquired?|purchased?|bought)\s+{1}",
    r"(?i){1}\s+(?:owned by|acquired by|subsidiary of)\s+{0}",
    r"(?i){0}(?:'s|\s+)(?:acquisition of|purchase of)\s+{1}",
];

const COMPETITION_PATTERNS: &[&str] = &[
    r"(?i){0}\s+(?:competes with|competing with|competitor of|rivals?)\s+{1}",
    r"(?i){0}\s+and\s+{1}\s+(?:compete|are competitors|are rivals)",
    r"(?i)(?:competition|rivalry)\s+between\s+{0}\s+and\s+{1}",
];

const PARTNERSHIP_PATTERNS: &[&str] = &[
    r"(?i){0}\s+(?:partners? with|partnered with|partnership with|collaborates? with)\s+{1}",
    r"(?i)(?:partnership|collaboration|alliance)\s+between\s+{0}\s+and\s+{1}",
    r"(?i){0}\s+and\s+{1}\s+(?:partner|collaborate|form alliance)",
];

const EMPLOYMENT_PATTERNS: &[&str] = &[
    r"(?i){0}\s+(?:works? for|employed by|joins?|joined)\s+{1}",
    r"(?i){0},?\s+(?:CEO|CTO|CFO|President|Director|Manager)\s+(?:of|at)\s+{1}",
    r"(?i){1}(?:'s)?\s+(?:CEO|CTO|CFO|President|Director|Manager),?\s+{0}",
];

fn instantiate(template: &str, name0: &str, name1: &str) -> Option<Regex> {
    let pattern = template
        .replace("{0}", &regex::escape(name0))
        .replace("{1}", &regex::escape(name1));
    match Regex::new(&pattern) {
        Ok(re) => Some(re),
        Err(e) => {
            debug!(pattern, error = %e, "skipping relationship pattern");
            None
        }
    }
}

/// Accumulates relationships with `(source, target, type)` dedup; the
/// first detection of a given edge wins.
pub struct RelationshipSet {
    relationships: Vec<Relationship>,
    seen: FxHashSet<(EntityId, EntityId, RelationType)>,
}

impl RelationshipSet {
    pub fn new() -> Self {
        Self {
            relationships: Vec::new(),
            seen: FxHashSet::default(),
        }
    }

    pub fn add(&mut self, rel: Relationship) {
        if self.seen.insert(rel.key()) {
            self.relationships.push(rel);
        }
    }

    pub fn contains_pair(&self, a: EntityId, b: EntityId) -> bool {
        self.relationships
            .iter()
            .any(|r| (r.source == a && r.target == b) || (r.source == b && r.target == a))
    }

    pub fn into_vec(self) -> Vec<Relationship> {
        self.relationships
    }

    pub fn as_slice(&self) -> &[Relationship] {
        &self.relationships
    }
}

impl Default for RelationshipSet {
    fn default() -> Self {
        Self::new()
    }
}

pub struct RelationshipDetector {
    pub context_window: usize,
    pub cooccurrence_threshold: usize,
}

impl RelationshipDetector {
    pub fn detect(
        &self,
        arena: &EntityArena,
        documents: &[DocumentNode],
    ) -> Vec<Relationship> {
        let mut set = RelationshipSet::new();

        for doc in documents {
            let doc_id = entity_doc_id(doc).to_string();
            let present: Vec<EntityId> = arena
                .iter()
                .filter(|(_, e)| e.documents.contains(&doc_id))
                .map(|(id, _)| id)
                .collect();

            self.detect_ownership(arena, &present, &doc.content, &doc_id, &mut set);
            self.detect_competition(arena, &present, &doc.content, &doc_id, &mut set);
            self.detect_partnership(arena, &present, &doc.content, &doc_id, &mut set);
            self.detect_employment(arena, &present, &doc.content, &doc_id, &mut set);
        }

        self.infer_implicit(arena, documents, &mut set);
        set.into_vec()
    }

    fn companies(&self, arena: &EntityArena, present: &[EntityId]) -> Vec<EntityId> {
        present
            .iter()
            .copied()
            .filter(|&id| arena.get(id).entity_type == EntityType::Company)
            .collect()
    }

    fn pair_matches(
        arena: &EntityArena,
        a: EntityId,
        b: EntityId,
        templates: &[&str],
        content: &str,
    ) -> Option<(String, String)> {
        for template in templates {
            for a_name in arena.get(a).all_names() {
                for b_name in arena.get(b).all_names() {
                    let Some(re) = instantiate(template, a_name, b_name) else {
                        continue;
                    };
                    if re.is_match(content) {
                        return Some((a_name.to_string(), b_name.to_string()));
                    }
                }
            }
        }
        None
    }

    fn detect_ownership(
        &self,
        arena: &EntityArena,
        present: &[EntityId],
        content: &str,
        doc_id: &str,
        set: &mut RelationshipSet,
    ) {
        let companies = self.companies(arena, present);
        for (i, &c1) in companies.iter().enumerate() {
            for &c2 in &companies[i + 1..] {
                if let Some((c1_name, _)) =
                    Self::pair_matches(arena, c1, c2, OWNERSHIP_PATTERNS, content)
                {
                    set.add(Relationship {
                        source: c1,
                        target: c2,
                        relation_type: RelationType::Owns,
                        strength: 1.0,
                        contexts: vec![extract_context(content, &c1_name, self.context_window)],
                        document_ids: std::iter::once(doc_id.to_string()).collect(),
                    });
                }
            }
        }
    }

    fn detect_competition(
        &self,
        arena: &EntityArena,
        present: &[EntityId],
        content: &str,
        doc_id: &str,
        set: &mut RelationshipSet,
    ) {
        let companies = self.companies(arena, present);
        for (i, &c1) in companies.iter().enumerate() {
            for &c2 in &companies[i + 1..] {
                if Self::pair_matches(arena, c1, c2, COMPETITION_PATTERNS, content).is_some() {
                    for (source, target) in [(c1, c2), (c2, c1)] {
                        set.add(Relationship {
                            source,
                            target,
                            relation_type: RelationType::CompetesWith,
                            strength: 1.0,
                            contexts: Vec::new(),
                            document_ids: std::iter::once(doc_id.to_string()).collect(),
                        });
                    }
                }
            }
        }
    }

    fn detect_partnership(
        &self,
        arena: &EntityArena,
        present: &[EntityId],
        content: &str,
        doc_id: &str,
        set: &mut RelationshipSet,
    ) {
        let companies = self.companies(arena, present);
        for (i, &c1) in companies.iter().enumerate() {
            for &c2 in &companies[i + 1..] {
                if let Some((c1_name, c2_name)) =
                    Self::pair_matches(arena, c1, c2, PARTNERSHIP_PATTERNS, content)
                {
                    for (source, target, name) in [(c1, c2, &c1_name), (c2, c1, &c2_name)] {
                        set.add(Relationship {
                            source,
                            target,
                            relation_type: RelationType::PartnersWith,
                            strength: 1.0,
                            contexts: vec![extract_context(content, name, self.context_window)],
                            document_ids: std::iter::once(doc_id.to_string()).collect(),
                        });
                    }
                }
            }
        }
    }

    fn detect_employment(
        &self,
        arena: &EntityArena,
        present: &[EntityId],
        content: &str,
        doc_id: &str,
        set: &mut RelationshipSet,
    ) {
        let people: Vec<EntityId> = present
            .iter()
            .copied()
            .filter(|&id| arena.get(id).entity_type == EntityType::Person)
            .collect();
        let companies = self.companies(arena, present);

        for &person in &people {
            for &company in &companies {
                if let Some((p_name, _)) =
                    Self::pair_matches(arena, person, company, EMPLOYMENT_PATTERNS, content)
                {
                    set.add(Relationship {
                        source: person,
                        target: company,
                        relation_type: RelationType::WorksFor,
                        strength: 1.0,
                        contexts: vec![extract_context(content, &p_name, self.context_window)],
                        document_ids: std::iter::once(doc_id.to_string()).collect(),
                    });
                }
            }
        }
    }

    /// Company pairs co-occurring in enough documents, with no explicit
    /// edge in either direction, get an inferred PARTNERS_WITH edge
    /// with strength proportional to the co-occurrence count.
    fn infer_implicit(
        &self,
        arena: &EntityArena,
        documents: &[DocumentNode],
        set: &mut RelationshipSet,
    ) {
        let mut cooccurrence: FxHashMap<(EntityId, EntityId), usize> = FxHashMap::default();

        for doc in documents {
            let doc_id = entity_doc_id(doc);
            let present: Vec<EntityId> = arena
                .iter()
                .filter(|(_, e)| e.documents.contains(doc_id))
                .map(|(id, _)| id)
                .collect();

            for (i, &e1) in present.iter().enumerate() {
                for &e2 in &present[i + 1..] {
                    let key = if arena.get(e1).name <= arena.get(e2).name {
                        (e1, e2)
                    } else {
                        (e2, e1)
                    };
                    *cooccurrence.entry(key).or_default() += 1;
                }
            }
        }

        let mut pairs: Vec<((EntityId, EntityId), usize)> = cooccurrence.into_iter().collect();
        pairs.sort_by_key(|&((a, b), _)| (a, b));

        for ((e1, e2), count) in pairs {
            if count < self.cooccurrence_threshold {
                continue;
            }
            if arena.get(e1).entity_type != EntityType::Company
                || arena.get(e2).entity_type != EntityType::Company
            {
                continue;
            }
            if set.contains_pair(e1, e2) {
                continue;
            }
            set.add(Relationship {
                source: e1,
                target: e2,
                relation_type: RelationType::PartnersWith,
                strength: (count as f64 / 10.0).min(1.0),
                contexts: vec![format!("Entities co-occur in {count} documents")],
                document_ids: FxHashSet::default(),
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synthesis::DocumentType;

    fn doc(doc_id: &str, content: &str) -> DocumentNode {
        DocumentNode {
            doc_id: doc_id.to_string(),
            doc_type: DocumentType::Unknown,
            source_path: format!("{doc_id}.txt"),
            content: content.to_string(),
            extraction_date: 0,
            metadata: FxHashMap::default(),
            entities: FxHashSet::default(),
            topics: FxHashSet::default(),
            key_metrics: FxHashMap::default(),
            time_references: FxHashSet::default(),
            confidence_score: 1.0,
            content_hash: String::new(),
        }
    }

    fn arena_with(companies: &[(&str, &[&str])]) -> EntityArena {
        let mut arena = EntityArena::new();
        for (name, docs) in companies {
            let id = arena.upsert(name, EntityType::Company);
            for d in *docs {
                arena.get_mut(id).documents.insert(d.to_string());
            }
        }
        arena
    }

    fn detector() -> RelationshipDetector {
        RelationshipDetector {
            context_window: 100,
            cooccurrence_threshold: 3,
        }
    }

    #[test]
    fn ownership_is_directional() {
        let arena = arena_with(&[("Acme Corp", &["d1"]), ("Beta Inc", &["d1"])]);
        let docs = vec![doc("d1", "Acme Corp acquired Beta Inc last spring.")];
        let rels = detector().detect(&arena, &docs);

        assert_eq!(rels.len(), 1);
        assert_eq!(rels[0].relation_type, RelationType::Owns);
        assert_eq!(arena.get(rels[0].source).name, "Acme Corp");
        assert_eq!(arena.get(rels[0].target).name, "Beta Inc");
        assert!(rels[0].document_ids.contains("d1"));
    }

    #[test]
    fn passive_ownership_still_points_to_owner() {
        let arena = arena_with(&[("Acme Corp", &["d1"]), ("Beta Inc", &["d1"])]);
        let docs = vec![doc("d1", "Beta Inc acquired by Acme Corp in 2021.")];
        let rels = detector().detect(&arena, &docs);

        // The passive template binds {1} to the owned company, so the
        // edge still runs owner -> owned.
        assert_eq!(rels.len(), 1);
        assert_eq!(arena.get(rels[0].source).name, "Acme Corp");
    }

    #[test]
    fn competition_is_bidirectional() {
        let arena = arena_with(&[("Acme Corp", &["d1"]), ("Beta Inc", &["d1"])]);
        let docs = vec![doc("d1", "Acme Corp competes with Beta Inc in cloud.")];
        let rels = detector().detect(&arena, &docs);

        let compete: Vec<_> = rels
            .iter()
            .filter(|r| r.relation_type == RelationType::CompetesWith)
            .collect();
        assert_eq!(compete.len(), 2);
        assert_ne!(compete[0].source, compete[1].source);
    }

    #[test]
    fn employment_links_person_to_company() {
        let mut arena = arena_with(&[("Acme Corp", &["d1"])]);
        let person = arena.upsert("Jane Smith", EntityType::Person);
        arena.get_mut(person).documents.insert("d1".to_string());

        let docs = vec![doc("d1", "Jane Smith, CEO of Acme Corp, spoke.")];
        let rels = detector().detect(&arena, &docs);

        let works: Vec<_> = rels
            .iter()
            .filter(|r| r.relation_type == RelationType::WorksFor)
            .collect();
        assert_eq!(works.len(), 1);
        assert_eq!(arena.get(works[0].source).name, "Jane Smith");
        assert_eq!(arena.get(works[0].target).name, "Acme Corp");
    }

    #[test]
    fn cooccurrence_infers_partnership_at_threshold() {
        let arena = arena_with(&[
            ("Acme Corp", &["d1", "d2", "d3"]),
            ("Beta Inc", &["d1", "d2", "d3"]),
        ]);
        let docs = vec![doc("d1", ""), doc("d2", ""), doc("d3", "")];
        let rels = detector().detect(&arena, &docs);

        assert_eq!(rels.len(), 1);
        assert_eq!(rels[0].relation_type, RelationType::PartnersWith);
        assert!((rels[0].strength - 0.3).abs() < 1e-12);
        assert_eq!(rels[0].contexts, vec!["Entities co-occur in 3 documents"]);
    }

    #[test]
    fn cooccurrence_below_threshold_is_ignored() {
        let arena = arena_with(&[
            ("Acme Corp", &["d1", "d2"]),
            ("Beta Inc", &["d1", "d2"]),
        ]);
        let docs = vec![doc("d1", ""), doc("d2", "")];
        assert!(detector().detect(&arena, &docs).is_empty());
    }

    #[test]
    fn explicit_edges_suppress_implicit_inference() {
        let arena = arena_with(&[
            ("Acme Corp", &["d1", "d2", "d3"]),
            ("Beta Inc", &["d1", "d2", "d3"]),
        ]);
        let docs = vec![
            doc("d1", "Acme Corp partnered with Beta Inc."),
            doc("d2", ""),
            doc("d3", ""),
        ];
        let rels = detector().detect(&arena, &docs);

        // Two explicit partnership edges, no inferred one on top.
        assert_eq!(rels.len(), 2);
        assert!(rels
            .iter()
            .all(|r| r.relation_type == RelationType::PartnersWith));
        assert!(rels.iter().all(|r| r.strength == 1.0));
    }

    #[test]
    fn implicit_strength_caps_at_one() {
        let doc_ids: Vec<String> = (0..15).map(|i| format!("d{i}")).collect();
        let mut arena = EntityArena::new();
        for name in ["Acme Corp", "Beta Inc"] {
            let id = arena.upsert(name, EntityType::Company);
            for d in &doc_ids {
                arena.get_mut(id).documents.insert(d.clone());
            }
        }
        let docs: Vec<DocumentNode> = doc_ids.iter().map(|d| doc(d, "")).collect();
        let rels = detector().detect(&arena, &docs);

        assert_eq!(rels.len(), 1);
        assert_eq!(rels[0].strength, 1.0);
    }
}
