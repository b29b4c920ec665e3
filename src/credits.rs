//! Cast and filmography resolution.
//!
//! Reads go straight to the store on every call, so administrative edits
//! are visible immediately. Missing ids are errors here, unlike search,
//! where an unmatched query is just an empty result.

use crate::error::{CineError, Result};
use crate::storage::{Actor, ActorId, Database, Film, FilmId};

/// Actors credited on the given film, billing order first, then name.
pub fn cast_of(db: &Database, film_id: FilmId) -> Result<Vec<Actor>> {
    if db.get_film(film_id)?.is_none() {
        return Err(CineError::FilmNotFound(film_id));
    }
    db.film_cast(film_id)
}

/// Films the given actor is credited on, same ordering contract.
pub fn filmography_of(db: &Database, actor_id: ActorId) -> Result<Vec<Film>> {
    if db.get_actor(actor_id)?.is_none() {
        return Err(CineError::ActorNotFound(actor_id));
    }
    db.actor_films(actor_id)
}
