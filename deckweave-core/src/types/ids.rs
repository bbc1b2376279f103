//! Identifier generation.
//!
//! Tracker IDs are sequential per generator instance: two calls never
//! return the same ID, even for identical inputs. Document IDs for the
//! synthesis graph are hash-derived, with an explicit choice between
//! reproducible (content-only) and session-unique (content + counter)
//! derivation.

use serde::{Deserialize, Serialize};
use xxhash_rust::xxh3::xxh3_64;

/// Sequential ID generator for a single tracker instance.
///
/// Not thread-safe; a tracker owns exactly one of these.
#[derive(Debug, Default)]
pub struct IdGenerator {
    next: u64,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue the next ID with the given prefix, e.g. `dp-0000002a`.
    pub fn next_id(&mut self, prefix: &str) -> String {
        let id = format!("{}-{:08x}", prefix, self.next);
        self.next += 1;
        id
    }
}

/// How synthesis document IDs are derived when the caller supplies none.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum IdMode {
    /// Hash of document type and path only. The same input always yields
    /// the same ID, suitable for persistent keys.
    Reproducible,
    /// Hash additionally mixes a per-builder counter, so re-submitting
    /// the same document yields a fresh ID. Matches the reference
    /// behavior of session-scoped synthesis.
    #[default]
    Session,
}

/// Derive a 12-hex-char document ID from its type tag and source path.
pub fn derive_doc_id(mode: IdMode, type_tag: &str, source_path: &str, counter: u64) -> String {
    let seed = match mode {
        IdMode::Reproducible => xxh3_64(format!("{type_tag}:{source_path}").as_bytes()),
        IdMode::Session => xxh3_64(format!("{type_tag}:{source_path}:{counter}").as_bytes()),
    };
    format!("{seed:012x}")[..12].to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequential_ids_are_distinct() {
        let mut gen = IdGenerator::new();
        let a = gen.next_id("dp");
        let b = gen.next_id("dp");
        assert_ne!(a, b);
        assert!(a.starts_with("dp-"));
    }

    #[test]
    fn reproducible_ids_are_stable() {
        let a = derive_doc_id(IdMode::Reproducible, "spreadsheet", "Q3.xlsx", 0);
        let b = derive_doc_id(IdMode::Reproducible, "spreadsheet", "Q3.xlsx", 99);
        assert_eq!(a, b);
        assert_eq!(a.len(), 12);
    }

    #[test]
    fn session_ids_differ_per_counter() {
        let a = derive_doc_id(IdMode::Session, "spreadsheet", "Q3.xlsx", 0);
        let b = derive_doc_id(IdMode::Session, "spreadsheet", "Q3.xlsx", 1);
        assert_ne!(a, b);
    }
}
