//! Source attribution and cross-document synthesis.
//!
//! The extraction layer feeds raw per-document records in; this crate
//! tracks every scalar value back to its origin ([`attribution`]), builds
//! a typed document graph with relationships and clusters ([`synthesis`]),
//! refines mentions into an entity network ([`entities`]), detects and
//! resolves contradictions ([`conflicts`]), and ranks statistical findings
//! ([`insights`]). The rendering layer consumes the attributed output.
//!
//! Everything here is synchronous, in-memory, CPU-bound work. A tracker
//! or engine instance is not internally synchronized; share one per
//! session or guard it externally.

pub mod attribution;
pub mod conflicts;
pub mod entities;
pub mod insights;
pub mod synthesis;
