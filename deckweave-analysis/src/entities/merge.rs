//! Duplicate-entity detection and greedy merging.

use deckweave_core::types::collections::FxHashMap;
use tracing::info;

use super::types::{Entity, EntityArena};

/// Character-bag similarity in [0, 1]. Exact (case-folded) equality is
/// 1.0 and substring containment 0.9; otherwise the multiset Jaccard of
/// character counts. Anagram-like strings score high by construction.
pub fn string_similarity(s1: &str, s2: &str) -> f64 {
    let s1 = s1.to_lowercase();
    let s2 = s2.to_lowercase();

    if s1 == s2 {
        return 1.0;
    }
    if s1.contains(&s2) || s2.contains(&s1) {
        return 0.9;
    }

    let mut counts1: FxHashMap<char, usize> = FxHashMap::default();
    for c in s1.chars() {
        *counts1.entry(c).or_default() += 1;
    }
    let mut counts2: FxHashMap<char, usize> = FxHashMap::default();
    for c in s2.chars() {
        *counts2.entry(c).or_default() += 1;
    }

    let mut intersection = 0usize;
    let mut union = 0usize;
    for (c, &n1) in &counts1 {
        let n2 = counts2.get(c).copied().unwrap_or(0);
        intersection += n1.min(n2);
        union += n1.max(n2);
    }
    for (c, &n2) in &counts2 {
        if !counts1.contains_key(c) {
            union += n2;
        }
    }

    if union > 0 {
        intersection as f64 / union as f64
    } else {
        0.0
    }
}

/// 0.5 × best name/alias similarity + 0.5 × document-set Jaccard.
/// Entities of different types never match.
pub fn entity_similarity(entity1: &Entity, entity2: &Entity) -> f64 {
    if entity1.entity_type != entity2.entity_type {
        return 0.0;
    }

    let mut name_sim: f64 = 0.0;
    for n1 in entity1.all_names() {
        for n2 in entity2.all_names() {
            name_sim = name_sim.max(string_similarity(n1, n2));
        }
    }

    let union = entity1.documents.union(&entity2.documents).count().max(1);
    let doc_overlap =
        entity1.documents.intersection(&entity2.documents).count() as f64 / union as f64;

    0.5 * name_sim + 0.5 * doc_overlap
}

/// Greedy single-pass merge: each unmerged entity absorbs all later
/// same-type entities whose similarity to it clears the threshold.
/// Absorbed entities are not re-compared, so transitive near-duplicates
/// may survive as separate records.
pub fn merge_duplicate_entities(arena: &EntityArena, threshold: f64) -> EntityArena {
    let entities: Vec<&Entity> = arena.iter().map(|(_, e)| e).collect();
    let mut absorbed = vec![false; entities.len()];
    let mut merged = EntityArena::new();

    for (i, entity1) in entities.iter().enumerate() {
        if absorbed[i] {
            continue;
        }

        let mut combined = (*entity1).clone();
        for (j, entity2) in entities.iter().enumerate().skip(i + 1) {
            if absorbed[j] || entity1.entity_type != entity2.entity_type {
                continue;
            }
            if entity_similarity(entity1, entity2) >= threshold {
                combined.aliases.extend(entity2.aliases.iter().cloned());
                combined.aliases.insert(entity2.name.clone());
                combined.occurrences.extend(entity2.occurrences.iter().cloned());
                combined
                    .documents
                    .extend(entity2.documents.iter().cloned());
                combined.attributes.extend(
                    entity2
                        .attributes
                        .iter()
                        .map(|(k, v)| (k.clone(), v.clone())),
                );
                combined.confidence = combined.confidence.max(entity2.confidence);
                absorbed[j] = true;
            }
        }
        merged.insert(combined);
    }

    info!(
        before = entities.len(),
        after = merged.len(),
        "merged duplicate entities"
    );
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::types::EntityType;

    fn entity(name: &str, docs: &[&str]) -> Entity {
        let mut e = Entity::new(name, EntityType::Company);
        e.documents = docs.iter().map(|d| d.to_string()).collect();
        e
    }

    #[test]
    fn identical_strings_score_one() {
        assert_eq!(string_similarity("Acme Corp", "acme corp"), 1.0);
    }

    #[test]
    fn substring_scores_point_nine() {
        assert_eq!(string_similarity("Acme", "Acme Corp"), 0.9);
    }

    #[test]
    fn disjoint_strings_score_low() {
        assert!(string_similarity("Acme", "Zenith") < 0.5);
    }

    #[test]
    fn anagrams_score_high() {
        // Known limitation of the character-bag measure.
        assert_eq!(string_similarity("abc", "cab"), 1.0);
    }

    #[test]
    fn cross_type_similarity_is_zero() {
        let company = Entity::new("Acme", EntityType::Company);
        let person = Entity::new("Acme", EntityType::Person);
        assert_eq!(entity_similarity(&company, &person), 0.0);
    }

    #[test]
    fn same_docs_and_substring_names_merge() {
        let mut arena = EntityArena::new();
        arena.insert(entity("Acme Corp", &["d1", "d2"]));
        arena.insert(entity("Acme", &["d1", "d2"]));
        // 0.5 * 0.9 + 0.5 * 1.0 = 0.95 >= 0.85
        let merged = merge_duplicate_entities(&arena, 0.85);
        assert_eq!(merged.len(), 1);
        let survivor = merged.by_name("Acme Corp").unwrap();
        assert!(survivor.aliases.contains("Acme"));
        assert_eq!(survivor.documents.len(), 2);
    }

    #[test]
    fn disjoint_documents_block_merge() {
        let mut arena = EntityArena::new();
        arena.insert(entity("Acme Corp", &["d1"]));
        arena.insert(entity("Acme", &["d2"]));
        // 0.5 * 0.9 + 0.5 * 0.0 = 0.45 < 0.85
        let merged = merge_duplicate_entities(&arena, 0.85);
        assert_eq!(merged.len(), 2);
    }

    #[test]
    fn merge_keeps_max_confidence() {
        let mut arena = EntityArena::new();
        let mut a = entity("Acme Corp", &["d1"]);
        a.confidence = 0.6;
        let mut b = entity("Acme Corp Inc", &["d1"]);
        b.confidence = 0.9;
        b.aliases.insert("Acme Corp".to_string());
        arena.insert(a);
        arena.insert(b);

        let merged = merge_duplicate_entities(&arena, 0.85);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged.by_name("Acme Corp").unwrap().confidence, 0.9);
    }

    #[test]
    fn greedy_merge_is_single_pass() {
        // Later entities are compared to the pass anchor only, never to
        // entities the anchor already absorbed.
        let mut arena = EntityArena::new();
        arena.insert(entity("Acme Corporation Holdings", &["d1"]));
        arena.insert(entity("Acme Corporation", &["d1"]));
        arena.insert(entity("Acme", &["d2"]));

        let merged = merge_duplicate_entities(&arena, 0.85);
        assert_eq!(merged.len(), 2);
    }
}
