//! Entity arena and relationship value objects.
//!
//! Entities live in an indexed arena; everything downstream
//! (relationships, network nodes, timelines) refers to them by
//! `EntityId` rather than by cloned records.

use deckweave_core::types::collections::{FxHashMap, FxHashSet};
use serde::Serialize;
use std::fmt;

/// Index into an [`EntityArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct EntityId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Company,
    Person,
    Product,
    Location,
    FinancialMetric,
    Date,
    Technology,
}

impl EntityType {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Company => "company",
            Self::Person => "person",
            Self::Product => "product",
            Self::Location => "location",
            Self::FinancialMetric => "financial_metric",
            Self::Date => "date",
            Self::Technology => "technology",
        }
    }

    pub const ALL: [EntityType; 7] = [
        Self::Company,
        Self::Person,
        Self::Product,
        Self::Location,
        Self::FinancialMetric,
        Self::Date,
        Self::Technology,
    ];
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RelationType {
    Owns,
    WorksFor,
    CompetesWith,
    PartnersWith,
    LocatedIn,
    Produces,
    Uses,
}

impl RelationType {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Owns => "owns",
            Self::WorksFor => "works_for",
            Self::CompetesWith => "competes_with",
            Self::PartnersWith => "partners_with",
            Self::LocatedIn => "located_in",
            Self::Produces => "produces",
            Self::Uses => "uses",
        }
    }
}

impl fmt::Display for RelationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A single mention of an entity inside one document.
#[derive(Debug, Clone, Serialize)]
pub struct Occurrence {
    pub document_id: String,
    pub context: String,
    pub position: Option<usize>,
}

/// An extracted entity. Identity is `(name, entity_type)`.
#[derive(Debug, Clone, Serialize)]
pub struct Entity {
    pub name: String,
    pub entity_type: EntityType,
    pub aliases: FxHashSet<String>,
    pub occurrences: Vec<Occurrence>,
    pub documents: FxHashSet<String>,
    pub attributes: FxHashMap<String, String>,
    pub confidence: f64,
}

impl Entity {
    pub fn new(name: impl Into<String>, entity_type: EntityType) -> Self {
        Self {
            name: name.into(),
            entity_type,
            aliases: FxHashSet::default(),
            occurrences: Vec::new(),
            documents: FxHashSet::default(),
            attributes: FxHashMap::default(),
            confidence: 1.0,
        }
    }

    /// Name plus all aliases, the full surface-form vocabulary.
    pub fn all_names(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.name.as_str()).chain(self.aliases.iter().map(String::as_str))
    }
}

/// A directed edge between two arena entities. Identity is
/// `(source, target, relation_type)`.
#[derive(Debug, Clone, Serialize)]
pub struct Relationship {
    pub source: EntityId,
    pub target: EntityId,
    pub relation_type: RelationType,
    pub strength: f64,
    pub contexts: Vec<String>,
    pub document_ids: FxHashSet<String>,
}

impl Relationship {
    pub fn key(&self) -> (EntityId, EntityId, RelationType) {
        (self.source, self.target, self.relation_type)
    }
}

/// Indexed entity storage keyed by (case-preserved) entity name.
#[derive(Debug, Clone, Default)]
pub struct EntityArena {
    entities: Vec<Entity>,
    by_name: FxHashMap<String, EntityId>,
}

impl EntityArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn get(&self, id: EntityId) -> &Entity {
        &self.entities[id.0]
    }

    pub fn get_mut(&mut self, id: EntityId) -> &mut Entity {
        &mut self.entities[id.0]
    }

    pub fn id_by_name(&self, name: &str) -> Option<EntityId> {
        self.by_name.get(name).copied()
    }

    pub fn by_name(&self, name: &str) -> Option<&Entity> {
        self.id_by_name(name).map(|id| self.get(id))
    }

    /// Existing entity under `name`, or a fresh one of the given type.
    pub fn upsert(&mut self, name: &str, entity_type: EntityType) -> EntityId {
        if let Some(id) = self.by_name.get(name) {
            return *id;
        }
        let id = EntityId(self.entities.len());
        self.entities.push(Entity::new(name, entity_type));
        self.by_name.insert(name.to_string(), id);
        id
    }

    /// Insert a prebuilt entity, replacing any previous one of the same
    /// name in the name index.
    pub fn insert(&mut self, entity: Entity) -> EntityId {
        let id = EntityId(self.entities.len());
        self.by_name.insert(entity.name.clone(), id);
        self.entities.push(entity);
        id
    }

    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &Entity)> {
        self.entities
            .iter()
            .enumerate()
            .map(|(i, e)| (EntityId(i), e))
    }

    /// IDs of all entities of one type, in arena order.
    pub fn ids_of_type(&self, entity_type: EntityType) -> Vec<EntityId> {
        self.iter()
            .filter(|(_, e)| e.entity_type == entity_type)
            .map(|(id, _)| id)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upsert_is_idempotent_per_name() {
        let mut arena = EntityArena::new();
        let a = arena.upsert("Acme Corp", EntityType::Company);
        let b = arena.upsert("Acme Corp", EntityType::Company);
        assert_eq!(a, b);
        assert_eq!(arena.len(), 1);
    }

    #[test]
    fn all_names_includes_aliases() {
        let mut entity = Entity::new("Acme Corp", EntityType::Company);
        entity.aliases.insert("ACME CORP".to_string());
        let names: Vec<&str> = entity.all_names().collect();
        assert!(names.contains(&"Acme Corp"));
        assert!(names.contains(&"ACME CORP"));
    }

    #[test]
    fn ids_of_type_filters() {
        let mut arena = EntityArena::new();
        arena.upsert("Acme Corp", EntityType::Company);
        arena.upsert("Dr. Smith", EntityType::Person);
        arena.upsert("Beta Inc", EntityType::Company);
        assert_eq!(arena.ids_of_type(EntityType::Company).len(), 2);
        assert_eq!(arena.ids_of_type(EntityType::Person).len(), 1);
    }
}
