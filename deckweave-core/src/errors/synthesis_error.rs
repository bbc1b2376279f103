//! Synthesis errors.

use super::error_code::{self, DeckweaveErrorCode};

/// Errors raised by the document synthesis subsystem.
#[derive(Debug, thiserror::Error)]
pub enum SynthesisError {
    #[error("Invalid extraction record: {0}")]
    InvalidRecord(String),

    #[error("Pattern compilation failed for `{pattern}`: {message}")]
    PatternCompilation { pattern: String, message: String },
}

impl DeckweaveErrorCode for SynthesisError {
    fn error_code(&self) -> &'static str {
        error_code::SYNTHESIS_ERROR
    }
}
