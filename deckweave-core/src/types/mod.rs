//! Shared type foundations.

pub mod collections;
pub mod ids;
pub mod value;
