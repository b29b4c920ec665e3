//! Storage layer for cinesearch
//!
//! SQLite entity store plus the write path that keeps the normalized
//! search columns in sync with display text.

pub mod migrations;
pub mod sqlite;

pub use sqlite::{Actor, ActorId, Database, Film, FilmId, NewActor, NewFilm};
