//! Insight generation errors.

use super::error_code::{self, DeckweaveErrorCode};

/// Errors raised by the insight generation subsystem.
#[derive(Debug, thiserror::Error)]
pub enum InsightError {
    #[error("Insufficient data for {analysis}: need {needed}, have {actual}")]
    InsufficientData {
        analysis: String,
        needed: usize,
        actual: usize,
    },
}

impl DeckweaveErrorCode for InsightError {
    fn error_code(&self) -> &'static str {
        error_code::INSIGHT_ERROR
    }
}
