//! SQLite entity store with a write-through normalized index.
//!
//! Every write that touches display text recomputes the normalized key in
//! the same statement, so no reader can observe a film or actor whose
//! `*_norm` column disagrees with its display text. Substring matching runs
//! against the normalized columns only; callers never search display text.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use rusqlite::{Connection, Row, Transaction, params};
use serde_json::Value as JsonValue;
use tracing::{debug, info};

use crate::error::{CineError, Result};
use crate::normalize::normalize;
use crate::storage::migrations;

pub type FilmId = i64;
pub type ActorId = i64;

/// A film row as stored, normalized key included.
#[derive(Debug, Clone, PartialEq)]
pub struct Film {
    pub id: FilmId,
    pub title: String,
    pub title_norm: String,
    pub url: String,
    /// Opaque attributes (year, rating, ...); never searched.
    pub metadata: JsonValue,
}

/// An actor row as stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub id: ActorId,
    pub name: String,
    pub name_norm: String,
    pub url: String,
}

/// Write payload for a film. Carries no normalized key; the store derives it.
#[derive(Debug, Clone)]
pub struct NewFilm {
    pub title: String,
    pub url: String,
    pub metadata: JsonValue,
}

/// Write payload for an actor.
#[derive(Debug, Clone)]
pub struct NewActor {
    pub name: String,
    pub url: String,
}

/// SQLite database wrapper for the film/actor catalog.
pub struct Database {
    conn: Connection,
    schema_version: u32,
    write_generation: AtomicU64,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("schema_version", &self.schema_version)
            .finish_non_exhaustive()
    }
}

impl Database {
    /// Open (or create) the database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        Self::from_connection(Connection::open(path)?)
    }

    /// In-memory database, used by tests and benchmarks.
    pub fn open_in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        Self::configure_pragmas(&conn)?;
        let schema_version = migrations::run_migrations(&conn)?;

        Ok(Self {
            conn,
            schema_version,
            write_generation: AtomicU64::new(0),
        })
    }

    fn configure_pragmas(conn: &Connection) -> Result<()> {
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA temp_store = MEMORY;
             PRAGMA foreign_keys = ON;",
        )?;
        Ok(())
    }

    /// Get a reference to the connection.
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Current schema version after migrations.
    pub fn schema_version(&self) -> u32 {
        self.schema_version
    }

    /// Monotonic counter bumped by every mutating call. Cached query
    /// results are stamped with this value and recomputed when it moves,
    /// which gives read-your-writes behavior without explicit invalidation
    /// hooks on each write site.
    pub fn write_generation(&self) -> u64 {
        self.write_generation.load(Ordering::Acquire)
    }

    fn bump_generation(&self) {
        self.write_generation.fetch_add(1, Ordering::AcqRel);
    }

    /// Begin an explicit transaction spanning several writes. Dropping the
    /// returned handle without committing rolls everything back.
    pub fn begin(&self) -> Result<Transaction<'_>> {
        Ok(self.conn.unchecked_transaction()?)
    }

    // -------------------------------------------------------------------------
    // Films
    // -------------------------------------------------------------------------

    pub fn insert_film(&self, film: &NewFilm) -> Result<Film> {
        let title_norm = normalize(&film.title);
        let metadata_json = serde_json::to_string(&film.metadata)?;

        info!(title = %film.title, "saving film");
        self.conn.execute(
            "INSERT INTO films (title, title_norm, url, metadata_json) VALUES (?, ?, ?, ?)",
            params![film.title, title_norm, film.url, metadata_json],
        )?;
        let id = self.conn.last_insert_rowid();
        self.bump_generation();

        Ok(Film {
            id,
            title: film.title.clone(),
            title_norm,
            url: film.url.clone(),
            metadata: film.metadata.clone(),
        })
    }

    pub fn update_film(&self, id: FilmId, film: &NewFilm) -> Result<()> {
        let title_norm = normalize(&film.title);
        let metadata_json = serde_json::to_string(&film.metadata)?;

        info!(film_id = id, title = %film.title, "updating film");
        let changed = self.conn.execute(
            "UPDATE films SET title = ?, title_norm = ?, url = ?, metadata_json = ? WHERE id = ?",
            params![film.title, title_norm, film.url, metadata_json, id],
        )?;
        if changed == 0 {
            return Err(CineError::FilmNotFound(id));
        }
        self.bump_generation();
        Ok(())
    }

    /// Delete a film. Credit rows referencing it cascade away.
    pub fn delete_film(&self, id: FilmId) -> Result<()> {
        let changed = self
            .conn
            .execute("DELETE FROM films WHERE id = ?", [id])?;
        if changed == 0 {
            return Err(CineError::FilmNotFound(id));
        }
        self.bump_generation();
        Ok(())
    }

    pub fn get_film(&self, id: FilmId) -> Result<Option<Film>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, title, title_norm, url, metadata_json FROM films WHERE id = ?",
        )?;
        let mut rows = stmt.query([id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(film_from_row(row)?));
        }
        Ok(None)
    }

    pub fn film_by_url(&self, url: &str) -> Result<Option<Film>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, title, title_norm, url, metadata_json FROM films WHERE url = ?",
        )?;
        let mut rows = stmt.query([url])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(film_from_row(row)?));
        }
        Ok(None)
    }

    /// All films whose normalized title contains `key`, ordered by title
    /// ascending (byte order, so pagination is reproducible). `key` must
    /// already be normalized; callers go through [`crate::normalize`].
    pub fn films_matching(&self, key: &str) -> Result<Vec<Film>> {
        let pattern = like_pattern(key);
        let mut stmt = self.conn.prepare(
            "SELECT id, title, title_norm, url, metadata_json FROM films \
             WHERE title_norm LIKE ? ESCAPE '\\' ORDER BY title",
        )?;
        let rows = stmt.query_map([&pattern], film_from_row)?;
        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        debug!(key, count = results.len(), "film substring scan");
        Ok(results)
    }

    // -------------------------------------------------------------------------
    // Actors
    // -------------------------------------------------------------------------

    pub fn insert_actor(&self, actor: &NewActor) -> Result<Actor> {
        let name_norm = normalize(&actor.name);

        info!(name = %actor.name, "saving actor");
        self.conn.execute(
            "INSERT INTO actors (name, name_norm, url) VALUES (?, ?, ?)",
            params![actor.name, name_norm, actor.url],
        )?;
        let id = self.conn.last_insert_rowid();
        self.bump_generation();

        Ok(Actor {
            id,
            name: actor.name.clone(),
            name_norm,
            url: actor.url.clone(),
        })
    }

    pub fn update_actor(&self, id: ActorId, actor: &NewActor) -> Result<()> {
        let name_norm = normalize(&actor.name);

        info!(actor_id = id, name = %actor.name, "updating actor");
        let changed = self.conn.execute(
            "UPDATE actors SET name = ?, name_norm = ?, url = ? WHERE id = ?",
            params![actor.name, name_norm, actor.url, id],
        )?;
        if changed == 0 {
            return Err(CineError::ActorNotFound(id));
        }
        self.bump_generation();
        Ok(())
    }

    /// Delete an actor. Credit rows referencing it cascade away.
    pub fn delete_actor(&self, id: ActorId) -> Result<()> {
        let changed = self
            .conn
            .execute("DELETE FROM actors WHERE id = ?", [id])?;
        if changed == 0 {
            return Err(CineError::ActorNotFound(id));
        }
        self.bump_generation();
        Ok(())
    }

    pub fn get_actor(&self, id: ActorId) -> Result<Option<Actor>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, name_norm, url FROM actors WHERE id = ?")?;
        let mut rows = stmt.query([id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(actor_from_row(row)?));
        }
        Ok(None)
    }

    pub fn actor_by_url(&self, url: &str) -> Result<Option<Actor>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, name_norm, url FROM actors WHERE url = ?")?;
        let mut rows = stmt.query([url])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(actor_from_row(row)?));
        }
        Ok(None)
    }

    /// All actors whose normalized name contains `key`, ordered by name
    /// ascending. Same contract as [`Self::films_matching`].
    pub fn actors_matching(&self, key: &str) -> Result<Vec<Actor>> {
        let pattern = like_pattern(key);
        let mut stmt = self.conn.prepare(
            "SELECT id, name, name_norm, url FROM actors \
             WHERE name_norm LIKE ? ESCAPE '\\' ORDER BY name",
        )?;
        let rows = stmt.query_map([&pattern], actor_from_row)?;
        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        debug!(key, count = results.len(), "actor substring scan");
        Ok(results)
    }

    // -------------------------------------------------------------------------
    // Credits
    // -------------------------------------------------------------------------

    /// Link an actor to a film. Upserts on the (film, actor) pair, so
    /// re-linking only refreshes the billing ordinal. Fails if either
    /// endpoint is missing (enforced by foreign keys). Returns whether a
    /// new credit row was created, so callers counting rows don't count
    /// refreshes.
    pub fn add_credit(
        &self,
        film_id: FilmId,
        actor_id: ActorId,
        billing: Option<i64>,
    ) -> Result<bool> {
        let inserted = self.conn.execute(
            "INSERT INTO film_credits (film_id, actor_id, billing) VALUES (?, ?, ?) \
             ON CONFLICT(film_id, actor_id) DO NOTHING",
            params![film_id, actor_id, billing],
        )? > 0;
        if !inserted {
            self.conn.execute(
                "UPDATE film_credits SET billing = ? WHERE film_id = ? AND actor_id = ?",
                params![billing, film_id, actor_id],
            )?;
        }
        self.bump_generation();
        Ok(inserted)
    }

    /// Actors credited on a film, billing order first, then name for rows
    /// without an ordinal.
    pub fn film_cast(&self, film_id: FilmId) -> Result<Vec<Actor>> {
        let mut stmt = self.conn.prepare(
            "SELECT a.id, a.name, a.name_norm, a.url \
             FROM actors a JOIN film_credits c ON c.actor_id = a.id \
             WHERE c.film_id = ? \
             ORDER BY c.billing IS NULL, c.billing, a.name",
        )?;
        let rows = stmt.query_map([film_id], actor_from_row)?;
        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }

    /// Films an actor is credited on, same ordering contract as
    /// [`Self::film_cast`].
    pub fn actor_films(&self, actor_id: ActorId) -> Result<Vec<Film>> {
        let mut stmt = self.conn.prepare(
            "SELECT f.id, f.title, f.title_norm, f.url, f.metadata_json \
             FROM films f JOIN film_credits c ON c.film_id = f.id \
             WHERE c.actor_id = ? \
             ORDER BY c.billing IS NULL, c.billing, f.title",
        )?;
        let rows = stmt.query_map([actor_id], film_from_row)?;
        let mut results = Vec::new();
        for row in rows {
            results.push(row?);
        }
        Ok(results)
    }

    pub fn count_films(&self) -> Result<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM films", [], |row| row.get(0))?;
        Ok(count.max(0) as u64)
    }

    pub fn count_actors(&self) -> Result<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM actors", [], |row| row.get(0))?;
        Ok(count.max(0) as u64)
    }
}

/// `%key%` with LIKE wildcards in the key escaped, so a literal `%` or `_`
/// in a normalized title only matches itself.
fn like_pattern(key: &str) -> String {
    let mut escaped = String::with_capacity(key.len() + 2);
    escaped.push('%');
    for c in key.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

fn film_from_row(row: &Row<'_>) -> rusqlite::Result<Film> {
    let metadata_json: String = row.get(4)?;
    let metadata = serde_json::from_str(&metadata_json).map_err(|err| {
        rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(err))
    })?;
    Ok(Film {
        id: row.get(0)?,
        title: row.get(1)?,
        title_norm: row.get(2)?,
        url: row.get(3)?,
        metadata,
    })
}

fn actor_from_row(row: &Row<'_>) -> rusqlite::Result<Actor> {
    Ok(Actor {
        id: row.get(0)?,
        name: row.get(1)?,
        name_norm: row.get(2)?,
        url: row.get(3)?,
    })
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn db() -> Database {
        Database::open_in_memory().unwrap()
    }

    fn new_film(title: &str, url: &str) -> NewFilm {
        NewFilm {
            title: title.to_string(),
            url: url.to_string(),
            metadata: json!({}),
        }
    }

    fn new_actor(name: &str, url: &str) -> NewActor {
        NewActor {
            name: name.to_string(),
            url: url.to_string(),
        }
    }

    #[test]
    fn insert_film_derives_normalized_title() {
        let db = db();
        let film = db.insert_film(&new_film("Pelíšky", "/film/1")).unwrap();
        assert_eq!(film.title_norm, "pelisky");

        let read_back = db.get_film(film.id).unwrap().unwrap();
        assert_eq!(read_back.title_norm, normalize(&read_back.title));
    }

    #[test]
    fn update_film_recomputes_normalized_title() {
        let db = db();
        let film = db.insert_film(&new_film("Kolja", "/film/1")).unwrap();

        db.update_film(film.id, &new_film("Země", "/film/1")).unwrap();

        let read_back = db.get_film(film.id).unwrap().unwrap();
        assert_eq!(read_back.title, "Země");
        assert_eq!(read_back.title_norm, "zeme");
    }

    #[test]
    fn update_missing_film_is_not_found() {
        let db = db();
        let err = db.update_film(999, &new_film("X", "/film/x")).unwrap_err();
        assert!(matches!(err, CineError::FilmNotFound(999)));
    }

    #[test]
    fn metadata_round_trips() {
        let db = db();
        let film = db
            .insert_film(&NewFilm {
                title: "Harakiri".to_string(),
                url: "/film/1".to_string(),
                metadata: json!({"year": 1962, "rating": 8.6}),
            })
            .unwrap();

        let read_back = db.get_film(film.id).unwrap().unwrap();
        assert_eq!(read_back.metadata, json!({"year": 1962, "rating": 8.6}));
    }

    #[test]
    fn matching_is_ordered_by_display_text() {
        let db = db();
        db.insert_film(&new_film("Zelary", "/film/1")).unwrap();
        db.insert_film(&new_film("Kolja", "/film/2")).unwrap();
        db.insert_film(&new_film("Země", "/film/3")).unwrap();

        let hits = db.films_matching("e").unwrap();
        let titles: Vec<&str> = hits.iter().map(|f| f.title.as_str()).collect();
        assert_eq!(titles, ["Kolja", "Zelary", "Země"]);
    }

    #[test]
    fn matching_escapes_like_wildcards() {
        let db = db();
        db.insert_film(&new_film("100% Wolf", "/film/1")).unwrap();
        db.insert_film(&new_film("Wolfen", "/film/2")).unwrap();

        let hits = db.films_matching("100% w").unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "100% Wolf");

        // a bare underscore must not act as a single-char wildcard
        assert!(db.films_matching("_").unwrap().is_empty());
    }

    #[test]
    fn add_credit_requires_both_endpoints() {
        let db = db();
        let film = db.insert_film(&new_film("Kolja", "/film/1")).unwrap();
        assert!(db.add_credit(film.id, 12345, Some(1)).is_err());
    }

    #[test]
    fn add_credit_is_idempotent_on_pair() {
        let db = db();
        let film = db.insert_film(&new_film("Kolja", "/film/1")).unwrap();
        let actor = db.insert_actor(&new_actor("Zdeněk Svěrák", "/a/1")).unwrap();

        assert!(db.add_credit(film.id, actor.id, Some(2)).unwrap());
        // second link refreshes the ordinal and reports no new row
        assert!(!db.add_credit(film.id, actor.id, Some(1)).unwrap());

        let cast = db.film_cast(film.id).unwrap();
        assert_eq!(cast.len(), 1);

        let billing: i64 = db
            .conn()
            .query_row(
                "SELECT billing FROM film_credits WHERE film_id = ? AND actor_id = ?",
                params![film.id, actor.id],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(billing, 1);
    }

    #[test]
    fn cast_orders_by_billing_then_name() {
        let db = db();
        let film = db.insert_film(&new_film("Pelíšky", "/film/1")).unwrap();
        let a = db.insert_actor(&new_actor("Aneta", "/a/1")).unwrap();
        let b = db.insert_actor(&new_actor("Bolek", "/a/2")).unwrap();
        let c = db.insert_actor(&new_actor("Cyril", "/a/3")).unwrap();

        db.add_credit(film.id, c.id, Some(1)).unwrap();
        db.add_credit(film.id, a.id, None).unwrap();
        db.add_credit(film.id, b.id, None).unwrap();

        let cast = db.film_cast(film.id).unwrap();
        let names: Vec<&str> = cast.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, ["Cyril", "Aneta", "Bolek"]);
    }

    #[test]
    fn update_actor_recomputes_normalized_name() {
        let db = db();
        let actor = db.insert_actor(&new_actor("Jirka Novák", "/a/1")).unwrap();

        db.update_actor(actor.id, &new_actor("Jiří Macháček", "/a/1"))
            .unwrap();

        let read_back = db.get_actor(actor.id).unwrap().unwrap();
        assert_eq!(read_back.name, "Jiří Macháček");
        assert_eq!(read_back.name_norm, "jiri machacek");
        assert_eq!(read_back.name_norm, normalize(&read_back.name));
    }

    #[test]
    fn update_missing_actor_is_not_found() {
        let db = db();
        let err = db.update_actor(999, &new_actor("X", "/a/x")).unwrap_err();
        assert!(matches!(err, CineError::ActorNotFound(999)));
    }

    #[test]
    fn deleting_actor_cascades_credits() {
        let db = db();
        let film = db.insert_film(&new_film("Kolja", "/film/1")).unwrap();
        let actor = db.insert_actor(&new_actor("Zdeněk Svěrák", "/a/1")).unwrap();
        db.add_credit(film.id, actor.id, Some(1)).unwrap();

        db.delete_actor(actor.id).unwrap();

        assert!(db.film_cast(film.id).unwrap().is_empty());
        let credits: i64 = db
            .conn()
            .query_row("SELECT COUNT(*) FROM film_credits", [], |row| row.get(0))
            .unwrap();
        assert_eq!(credits, 0);
    }

    #[test]
    fn delete_missing_actor_is_not_found() {
        let db = db();
        let err = db.delete_actor(999).unwrap_err();
        assert!(matches!(err, CineError::ActorNotFound(999)));
    }

    #[test]
    fn deleting_film_cascades_credits() {
        let db = db();
        let film = db.insert_film(&new_film("Kolja", "/film/1")).unwrap();
        let actor = db.insert_actor(&new_actor("Zdeněk Svěrák", "/a/1")).unwrap();
        db.add_credit(film.id, actor.id, Some(1)).unwrap();

        db.delete_film(film.id).unwrap();

        assert!(db.actor_films(actor.id).unwrap().is_empty());
        let credits: i64 = db
            .conn()
            .query_row("SELECT COUNT(*) FROM film_credits", [], |row| row.get(0))
            .unwrap();
        assert_eq!(credits, 0);
    }

    #[test]
    fn writes_bump_generation() {
        let db = db();
        let g0 = db.write_generation();
        let film = db.insert_film(&new_film("Kolja", "/film/1")).unwrap();
        assert!(db.write_generation() > g0);

        let g1 = db.write_generation();
        db.delete_film(film.id).unwrap();
        assert!(db.write_generation() > g1);
    }

    #[test]
    fn rolled_back_transaction_leaves_no_rows() {
        let db = db();
        {
            let _tx = db.begin().unwrap();
            db.insert_film(&new_film("Kolja", "/film/1")).unwrap();
            // dropped without commit
        }
        assert_eq!(db.count_films().unwrap(), 0);
    }
}
