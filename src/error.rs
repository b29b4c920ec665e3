//! Error handling for cinesearch.
//!
//! [`CineError`] is the single error enum for the crate. Storage errors
//! from rusqlite propagate through unchanged; lookups of missing entities
//! surface as the `*NotFound` variants. Invalid page numbers and
//! un-normalizable input are not errors anywhere in this crate: pages are
//! clamped and the normalizer is total.

use std::io;

use thiserror::Error;

use crate::storage::{ActorId, FilmId};

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, CineError>;

/// Main error type for cinesearch operations.
#[derive(Error, Debug)]
pub enum CineError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Migration failed: {0}")]
    Migration(String),

    #[error("Film not found: {0}")]
    FilmNotFound(FilmId),

    #[error("Actor not found: {0}")]
    ActorNotFound(ActorId),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Import error: {0}")]
    Import(String),
}
