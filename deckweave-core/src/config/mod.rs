//! Configuration for the synthesis core.

pub mod deckweave_config;
pub mod entity_config;
pub mod insight_config;
pub mod synthesis_config;

pub use deckweave_config::DeckweaveConfig;
pub use entity_config::EntityConfig;
pub use insight_config::InsightConfig;
pub use synthesis_config::SynthesisConfig;
