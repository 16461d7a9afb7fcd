//! Deterministic JSON serialization for persisted storage files.
//!
//! Keeps storage files stable across writes by:
//! - Sorting object keys alphabetically (via `BTreeMap` in stored types)
//! - Using 2-space indentation
//! - Adding trailing newline

mod json;

pub use json::*;
