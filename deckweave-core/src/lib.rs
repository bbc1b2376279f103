//! Core types, errors, configuration, and tracing for Deckweave.
//!
//! Deckweave converts heterogeneous business documents into attributed
//! slide decks. This crate carries everything the analysis crate and the
//! surrounding extraction/rendering layers share: the scalar value model,
//! ID generation, typed collections, per-subsystem error enums, and the
//! layered configuration.

pub mod config;
pub mod errors;
pub mod logging;
pub mod types;

pub use config::DeckweaveConfig;
pub use errors::{AttributionError, ConfigError, InsightError, SynthesisError};
pub use types::value::{DataKind, ScalarValue};
