//! Cross-document synthesis: typed document graph, pairwise
//! relationships, semantic clusters, and the orchestrating engine.

pub mod clustering;
pub mod engine;
pub mod graph_builder;
pub mod types;

pub use clustering::SemanticClusteringEngine;
pub use engine::SynthesisEngine;
pub use graph_builder::{
    DocumentGraphBuilder, MetricComparer, NaiveStringComparer, NormalizedNumericComparer,
};
pub use types::{
    ContentCluster, DocumentNode, DocumentRelationship, DocumentType, ExtractionRecord,
    RelationshipType, SynthesisResult,
};
