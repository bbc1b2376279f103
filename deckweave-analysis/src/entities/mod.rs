//! Entity extraction, dedup, relationship detection, and network
//! analysis over synthesized document nodes.

pub mod extraction;
pub mod mapper;
pub mod merge;
pub mod network;
pub mod relationships;
pub mod types;

pub use mapper::EntityRelationshipMapper;
pub use network::{EntityNetwork, NetworkNode};
pub use types::{Entity, EntityArena, EntityId, EntityType, RelationType, Relationship};
