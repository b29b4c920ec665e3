//! Diacritic- and case-insensitive substring search over films and the
//! people credited on them. Display text is normalized into search keys at
//! write time; queries normalize once and match both entity kinds
//! independently, with per-column pagination.

pub mod config;
pub mod credits;
pub mod error;
pub mod import;
pub mod normalize;
pub mod search;
pub mod storage;

pub use error::{CineError, Result};

/// Package version from Cargo.toml.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
