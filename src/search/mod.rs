//! Search engine: normalized substring lookup, ordering, pagination.
//!
//! The matching method itself lives behind the storage layer's
//! `*_matching` contract; this module owns query normalization, the
//! per-query cache, and the dual-column pagination rules.

pub mod cache;
pub mod engine;

pub use cache::{CachedHits, QueryCache};
pub use engine::{FlatResult, Page, SearchEngine, SearchResult};
