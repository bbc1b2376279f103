//! Error handling for Deckweave.
//! One error enum per subsystem, `thiserror` only, zero `anyhow`.
//!
//! Lookup misses inside the analysis core deliberately do not surface
//! here: attribution and synthesis degrade to sentinel values so deck
//! rendering never aborts mid-generation. These enums cover the genuinely
//! fatal paths: bad configuration and malformed import payloads.

pub mod attribution_error;
pub mod config_error;
pub mod error_code;
pub mod insight_error;
pub mod synthesis_error;

pub use attribution_error::AttributionError;
pub use config_error::ConfigError;
pub use error_code::DeckweaveErrorCode;
pub use insight_error::InsightError;
pub use synthesis_error::SynthesisError;
