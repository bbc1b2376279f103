//! Stable machine-readable error codes.

pub const ATTRIBUTION_ERROR: &str = "DW1001";
pub const SYNTHESIS_ERROR: &str = "DW1002";
pub const INSIGHT_ERROR: &str = "DW1003";
pub const CONFIG_ERROR: &str = "DW1004";

/// Every Deckweave error carries a stable code for log correlation.
pub trait DeckweaveErrorCode {
    fn error_code(&self) -> &'static str;
}
