//! Shared fixtures for integration tests.

use cinesearch::storage::{Actor, Database, Film, NewActor, NewFilm};
use serde_json::json;

pub fn fresh_db() -> Database {
    Database::open_in_memory().expect("in-memory database")
}

pub fn add_film(db: &Database, title: &str, url: &str) -> Film {
    db.insert_film(&NewFilm {
        title: title.to_string(),
        url: url.to_string(),
        metadata: json!({}),
    })
    .expect("insert film")
}

pub fn add_actor(db: &Database, name: &str, url: &str) -> Actor {
    db.insert_actor(&NewActor {
        name: name.to_string(),
        url: url.to_string(),
    })
    .expect("insert actor")
}

pub struct CzechCorpus {
    pub pelisky: Film,
    pub kolja: Film,
    pub machacek: Actor,
}

/// The corpus from the search contract: two films, one actor credited on
/// Pelíšky.
pub fn czech_corpus(db: &Database) -> CzechCorpus {
    let pelisky = add_film(db, "Pelíšky", "/film/pelisky");
    let kolja = add_film(db, "Kolja", "/film/kolja");
    let machacek = add_actor(db, "Jiří Macháček", "/tvurce/machacek");
    db.add_credit(pelisky.id, machacek.id, Some(1))
        .expect("credit");
    CzechCorpus {
        pelisky,
        kolja,
        machacek,
    }
}
