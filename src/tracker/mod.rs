// src/tracker/mod.rs

//! Commission status tracking engine.
//!
//! - `patterns`: compiles parametrized templates into variant-bound regexes
//! - `extract`: reduces fetched content to the text worth classifying
//! - `classify`: decides Open vs Closed for one snapshot

pub mod classify;
pub mod extract;
pub mod patterns;
pub mod sites;

pub use classify::StatusParser;
pub use extract::Extractor;
pub use patterns::{CompiledPattern, Variant, VariantEngine};
