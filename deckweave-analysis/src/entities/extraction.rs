//! Regex-based entity extraction from document content.
//!
//! Company, person, and product names are normalized
//! (whitespace-collapsed, title-cased) before keying; financial and
//! date entities are keyed on the raw surface form. `"$10 million"`
//! and `"$10,000,000"` therefore never share a key.

use deckweave_core::errors::SynthesisError;
use regex::Regex;
use tracing::debug;

use super::types::{EntityArena, EntityId, EntityType, Occurrence};
use crate::synthesis::DocumentNode;

pub struct EntityPatterns {
    pub company: Regex,
    pub currency: Regex,
    pub percentage: Regex,
    pub person: Regex,
    pub person_title: Regex,
    pub version: Regex,
    pub version_number: Regex,
    pub date: Regex,
}

fn compile(pattern: &str) -> Result<Regex, SynthesisError> {
    Regex::new(pattern).map_err(|e| SynthesisError::PatternCompilation {
        pattern: pattern.to_string(),
        message: e.to_string(),
    })
}

impl EntityPatterns {
    pub fn compile_all() -> Result<Self, SynthesisError> {
        Ok(Self {
            company: compile(
                r"(?i)[A-Z][A-Za-z0-9\s&'-]{1,50}\s*\b(?:Inc|Corp|Corporation|LLC|Ltd|Limited|Company|Co|Group|Holdings|Partners|LP|LLP|SA|AG|GmbH|PLC)\b\.?",
            )?,
            currency: compile(
                r"(?i)\$?\d{1,3}(?:,\d{3})*(?:\.\d{1,2})?(?:\s*(?:million|billion|thousand|M|B|K))?",
            )?,
            percentage: compile(r"\d+(?:\.\d+)?%")?,
            person: compile(
                r"\b(?:Mr\.|Ms\.|Mrs\.|Dr\.|Prof\.|CEO|CTO|CFO|President|Director|Manager)\s+[A-Z][a-z]+(?:\s+[A-Z][a-z]+){1,3}\b",
            )?,
            person_title: compile(
                r"^(Mr\.|Ms\.|Mrs\.|Dr\.|Prof\.|CEO|CTO|CFO|President|Director|Manager)\s+(.+)",
            )?,
            version: compile(r"(?i)\b[A-Za-z0-9\s\-]+\s+(?:v|version|release)?\s*\d+(?:\.\d+)*\b")?,
            version_number: compile(r"(\d+(?:\.\d+)*)")?,
            date: compile(
                r"(?i)\b(?:January|February|March|April|May|June|July|August|September|October|November|December|Jan|Feb|Mar|Apr|May|Jun|Jul|Aug|Sep|Oct|Nov|Dec)\s+\d{1,2},?\s+\d{4}\b|\b\d{1,2}/\d{1,2}/\d{2,4}\b",
            )?,
        })
    }
}

/// Collapse whitespace runs and title-case each word.
pub fn normalize_entity_name(name: &str) -> String {
    name.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => {
                    first.to_uppercase().collect::<String>() + &chars.as_str().to_lowercase()
                }
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn floor_char_boundary(s: &str, mut index: usize) -> usize {
    index = index.min(s.len());
    while !s.is_char_boundary(index) {
        index -= 1;
    }
    index
}

fn ceil_char_boundary(s: &str, mut index: usize) -> usize {
    index = index.min(s.len());
    while index < s.len() && !s.is_char_boundary(index) {
        index += 1;
    }
    index
}

/// Ellipsized window of `window` bytes on either side of the first
/// case-insensitive mention, or empty if the mention is not found.
pub fn extract_context(content: &str, entity_name: &str, window: usize) -> String {
    let pos = match content.to_lowercase().find(&entity_name.to_lowercase()) {
        Some(pos) => pos,
        None => return String::new(),
    };

    let start = floor_char_boundary(content, pos.saturating_sub(window));
    let end = ceil_char_boundary(content, pos + entity_name.len() + window);

    let mut context = content[start..end].to_string();
    if start > 0 {
        context = format!("...{context}");
    }
    if end < content.len() {
        context.push_str("...");
    }
    context.trim().to_string()
}

/// Document ID used for entity bookkeeping: explicit metadata override
/// first, graph ID otherwise.
pub fn entity_doc_id(node: &DocumentNode) -> &str {
    node.metadata
        .get("document_id")
        .map(String::as_str)
        .unwrap_or(&node.doc_id)
}

pub struct ExtractionPass<'a> {
    pub patterns: &'a EntityPatterns,
    pub context_window: usize,
}

impl ExtractionPass<'_> {
    pub fn extract_companies(&self, arena: &mut EntityArena, content: &str, doc_id: &str) {
        for m in self.patterns.company.find_iter(content) {
            let surface = m.as_str().trim().to_string();
            let normalized = normalize_entity_name(&surface);

            let id = arena.upsert(&normalized, EntityType::Company);
            let entity = arena.get_mut(id);
            entity.aliases.insert(surface.clone());
            entity.occurrences.push(Occurrence {
                document_id: doc_id.to_string(),
                context: extract_context(content, &surface, self.context_window),
                position: content.find(&surface),
            });
            entity.documents.insert(doc_id.to_string());

            self.detect_subsidiary_markers(arena, id, &surface, content);
        }
    }

    fn detect_subsidiary_markers(
        &self,
        arena: &mut EntityArena,
        id: EntityId,
        surface: &str,
        content: &str,
    ) {
        let escaped = regex::escape(surface);
        for pattern in [
            format!(r"(?i){escaped}\s+(?:subsidiary|division|unit)"),
            format!(r"(?i)(?:subsidiary|division|unit)\s+of\s+{escaped}"),
        ] {
            match Regex::new(&pattern) {
                Ok(re) if re.is_match(content) => {
                    arena
                        .get_mut(id)
                        .attributes
                        .insert("has_subsidiaries".to_string(), "true".to_string());
                }
                Ok(_) => {}
                Err(e) => debug!(pattern, error = %e, "skipping subsidiary pattern"),
            }
        }
    }

    pub fn extract_people(&self, arena: &mut EntityArena, content: &str, doc_id: &str) {
        for m in self.patterns.person.find_iter(content) {
            let surface = m.as_str().trim().to_string();

            let (title, normalized) = match self.patterns.person_title.captures(&surface) {
                Some(caps) => (
                    Some(caps[1].to_string()),
                    normalize_entity_name(&caps[2]),
                ),
                None => (None, normalize_entity_name(&surface)),
            };

            let id = arena.upsert(&normalized, EntityType::Person);
            let entity = arena.get_mut(id);
            entity.aliases.insert(surface.clone());
            if let Some(title) = title {
                entity
                    .attributes
                    .entry("title".to_string())
                    .or_insert(title);
            }
            entity.occurrences.push(Occurrence {
                document_id: doc_id.to_string(),
                context: extract_context(content, &surface, self.context_window),
                position: None,
            });
            entity.documents.insert(doc_id.to_string());
        }
    }

    pub fn extract_products(&self, arena: &mut EntityArena, content: &str, doc_id: &str) {
        for m in self.patterns.version.find_iter(content) {
            let surface = m.as_str().trim().to_string();
            let normalized = normalize_entity_name(&surface);

            let id = arena.upsert(&normalized, EntityType::Product);
            let entity = arena.get_mut(id);
            entity.aliases.insert(surface.clone());
            if let Some(caps) = self.patterns.version_number.captures(&surface) {
                entity
                    .attributes
                    .entry("version".to_string())
                    .or_insert_with(|| caps[1].to_string());
            }
            entity.documents.insert(doc_id.to_string());
        }
    }

    pub fn extract_financials(&self, arena: &mut EntityArena, content: &str, doc_id: &str) {
        for m in self.patterns.currency.find_iter(content) {
            // Raw surface form is the key; no normalization.
            let surface = m.as_str().to_string();
            let id = arena.upsert(&surface, EntityType::FinancialMetric);
            let entity = arena.get_mut(id);
            entity
                .attributes
                .entry("metric_type".to_string())
                .or_insert_with(|| "currency".to_string());
            entity.documents.insert(doc_id.to_string());
            entity.occurrences.push(Occurrence {
                document_id: doc_id.to_string(),
                context: extract_context(content, &surface, self.context_window),
                position: None,
            });
        }

        for m in self.patterns.percentage.find_iter(content) {
            let surface = m.as_str().to_string();
            let id = arena.upsert(&surface, EntityType::FinancialMetric);
            let entity = arena.get_mut(id);
            entity
                .attributes
                .entry("metric_type".to_string())
                .or_insert_with(|| "percentage".to_string());
            entity.documents.insert(doc_id.to_string());
        }
    }

    pub fn extract_dates(&self, arena: &mut EntityArena, content: &str, doc_id: &str) {
        for m in self.patterns.date.find_iter(content) {
            let surface = m.as_str().trim().to_string();
            let id = arena.upsert(&surface, EntityType::Date);
            let entity = arena.get_mut(id);
            entity.documents.insert(doc_id.to_string());
            entity.occurrences.push(Occurrence {
                document_id: doc_id.to_string(),
                context: extract_context(content, &surface, self.context_window),
                position: None,
            });
        }
    }
}
