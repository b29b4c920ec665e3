//! Bulk load of films with their casts.
//!
//! Takes already-parsed records (the scraper or admin tool that produced
//! them lives outside this crate) and applies each one in its own
//! transaction: the film, its actors, and the credit rows land together or
//! not at all. A record that fails rolls back and is counted; the rest of
//! the batch continues.

use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use tracing::{info, warn};

use crate::error::{CineError, Result};
use crate::storage::{Database, NewActor, NewFilm};

/// One credited person in a film record. `url` is the external identity
/// used for get-or-create, so the same person linked from two films
/// becomes one row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CastMember {
    pub name: String,
    pub url: String,
}

/// One film with its cast, in billing order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MovieRecord {
    pub title: String,
    pub url: String,
    #[serde(default = "empty_metadata")]
    pub metadata: JsonValue,
    #[serde(default)]
    pub cast: Vec<CastMember>,
}

fn empty_metadata() -> JsonValue {
    JsonValue::Object(serde_json::Map::new())
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ImportStats {
    pub films_created: usize,
    pub films_existing: usize,
    pub actors_created: usize,
    pub credits_added: usize,
    pub failed: usize,
}

/// Load a batch of records. Failed records are skipped and counted in
/// `stats.failed`; only infrastructure-level errors abort the batch.
pub fn load_movies(db: &Database, records: &[MovieRecord]) -> Result<ImportStats> {
    let mut stats = ImportStats::default();

    for record in records {
        match load_one(db, record) {
            Ok(record_stats) => {
                info!(title = %record.title, cast = record.cast.len(), "imported film");
                stats.films_created += record_stats.films_created;
                stats.films_existing += record_stats.films_existing;
                stats.actors_created += record_stats.actors_created;
                stats.credits_added += record_stats.credits_added;
            }
            Err(err) => {
                warn!(title = %record.title, %err, "import failed, skipping record");
                stats.failed += 1;
            }
        }
    }

    Ok(stats)
}

fn load_one(db: &Database, record: &MovieRecord) -> Result<ImportStats> {
    if record.title.trim().is_empty() || record.url.trim().is_empty() {
        return Err(CineError::Import(
            "film title and url must not be empty".to_string(),
        ));
    }

    let mut stats = ImportStats::default();
    let tx = db.begin()?;

    // get-or-create by url keeps re-imports idempotent
    let film = match db.film_by_url(&record.url)? {
        Some(existing) => {
            stats.films_existing += 1;
            existing
        }
        None => {
            stats.films_created += 1;
            db.insert_film(&NewFilm {
                title: record.title.clone(),
                url: record.url.clone(),
                metadata: record.metadata.clone(),
            })?
        }
    };

    for (position, member) in record.cast.iter().enumerate() {
        if member.name.trim().is_empty() || member.url.trim().is_empty() {
            return Err(CineError::Import(format!(
                "cast member {} of '{}' has an empty name or url",
                position + 1,
                record.title
            )));
        }
        let actor = match db.actor_by_url(&member.url)? {
            Some(existing) => existing,
            None => {
                stats.actors_created += 1;
                db.insert_actor(&NewActor {
                    name: member.name.clone(),
                    url: member.url.clone(),
                })?
            }
        };
        if db.add_credit(film.id, actor.id, Some(position as i64 + 1))? {
            stats.credits_added += 1;
        }
    }

    tx.commit()?;
    Ok(stats)
}
