//! Typed collection aliases used across the workspace.
//!
//! FxHash is used everywhere keys are short strings; the core is
//! single-threaded so no concurrent maps are needed.

pub use rustc_hash::{FxHashMap, FxHashSet};
