//! Attribution errors.

use super::error_code::{self, DeckweaveErrorCode};

/// Errors raised by the source attribution subsystem.
#[derive(Debug, thiserror::Error)]
pub enum AttributionError {
    #[error("Malformed attribution export: {0}")]
    MalformedExport(String),

    #[error("Unsupported tracker version: {0}")]
    UnsupportedVersion(String),

    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl DeckweaveErrorCode for AttributionError {
    fn error_code(&self) -> &'static str {
        error_code::ATTRIBUTION_ERROR
    }
}
