//! Source attribution: every extracted value traceable to its origin.
//!
//! Extractors register documents and track data points as they surface
//! values; the rendering layer later asks for attribution text and
//! hyperlinks by data-point ID. Lookup misses never panic or error —
//! they degrade to sentinel strings so deck rendering cannot abort
//! halfway through.

pub mod export;
pub mod tracker;
pub mod types;

pub use export::{AttributionExport, ExportMetadata, TRACKER_VERSION};
pub use tracker::{SourceTracker, TrackOptions};
pub use types::{
    AttributionFormat, ConsistencyReport, DataPoint, DocumentRecord, ExtractionQuality,
    LocationDetails, SourceContext, SourceDocumentType, SourceLocation,
};
