//! Conflict detection and resolution between data sources.

pub mod detector;
pub mod engine;
pub mod resolver;
pub mod types;

pub use detector::{numeric_magnitude, ConflictDetector};
pub use engine::{ConflictResolutionEngine, ProcessReport, ProcessSummary, SourceRecord};
pub use resolver::ConflictResolver;
pub use types::{Conflict, ConflictKind, Observation, Resolution, ResolutionStrategy};
