//! Criterion benchmarks for the normalize and search hot paths.

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use serde_json::json;

use cinesearch::config::Config;
use cinesearch::normalize::normalize;
use cinesearch::search::SearchEngine;
use cinesearch::storage::{Database, NewActor, NewFilm};

fn normalize_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("normalize");

    for size in [10, 100, 1000].iter() {
        let input: String = "Žluťoučký kůň — Příšerně  ".repeat(*size / 10 + 1);

        group.throughput(Throughput::Bytes(input.len() as u64));
        group.bench_with_input(BenchmarkId::new("text_size", size), &input, |b, input| {
            b.iter(|| normalize(black_box(input)));
        });
    }

    group.finish();
}

fn seeded_database() -> Database {
    let db = Database::open_in_memory().expect("in-memory database");
    for i in 0..300 {
        let film = db
            .insert_film(&NewFilm {
                title: format!("Příběh číslo {i:03}"),
                url: format!("/film/{i}"),
                metadata: json!({"year": 1960 + (i % 60)}),
            })
            .expect("insert film");
        for j in 0..3 {
            let url = format!("/tvurce/{}", i * 3 + j);
            let actor = db
                .insert_actor(&NewActor {
                    name: format!("Herec Čtvrtý {:04}", i * 3 + j),
                    url,
                })
                .expect("insert actor");
            db.add_credit(film.id, actor.id, Some(j + 1)).expect("credit");
        }
    }
    db
}

fn search_benchmarks(c: &mut Criterion) {
    let db = seeded_database();

    let mut uncached = Config::default();
    uncached.cache.enabled = false;
    let cold_engine = SearchEngine::new(&db, &uncached);

    let warm_engine = SearchEngine::new(&db, &Config::default());
    // prime the cache once so the warm benchmark measures hits
    warm_engine.search("pribeh", 1, 1).expect("prime");

    let mut group = c.benchmark_group("search");
    group.throughput(Throughput::Elements(1));

    group.bench_function("substring_scan_300_films", |b| {
        b.iter(|| cold_engine.search(black_box("pribeh"), 1, 1).expect("search"));
    });

    group.bench_function("cached_repeat_query", |b| {
        b.iter(|| warm_engine.search(black_box("pribeh"), 1, 1).expect("search"));
    });

    group.bench_function("unmatched_query", |b| {
        b.iter(|| cold_engine.search(black_box("xyzzy"), 1, 1).expect("search"));
    });

    group.finish();
}

criterion_group!(benches, normalize_benchmarks, search_benchmarks);
criterion_main!(benches);
