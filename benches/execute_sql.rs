use criterion::{criterion_group, criterion_main, Criterion};
use emberdb::config::DatabaseConfig;
use emberdb::engine::DatabaseEngine;
use tempfile::TempDir;

fn setup_engine(rows: usize) -> (DatabaseEngine, TempDir) {
    let dir = TempDir::new().expect("temp dir");
    let mut engine = DatabaseEngine::with_config(DatabaseConfig::default());
    engine
        .start("benchdb", dir.path().to_str().expect("utf-8 path"))
        .expect("engine start");

    engine
        .execute_sql("CREATE TABLE items (id INTEGER PRIMARY KEY, name VARCHAR(50), price VARCHAR(10))")
        .expect("create table");
    for i in 0..rows {
        engine
            .execute_sql(&format!(
                "INSERT INTO items (id, name, price) VALUES ({}, 'item{}', '{}')",
                i, i, i
            ))
            .expect("insert");
    }
    (engine, dir)
}

fn bench_point_select(c: &mut Criterion) {
    let (engine, _dir) = setup_engine(1000);
    c.bench_function("point_select_by_primary_key", |b| {
        let mut i = 0usize;
        b.iter(|| {
            // Rotate the key so the query cache does not absorb the work.
            i = (i + 7) % 1000;
            engine
                .execute_sql(&format!("SELECT * FROM items WHERE id = {}", i))
                .expect("select")
        });
    });
}

fn bench_full_scan_with_filter(c: &mut Criterion) {
    let (engine, _dir) = setup_engine(1000);
    c.bench_function("full_scan_with_like_filter", |b| {
        let mut i = 0usize;
        b.iter(|| {
            i = (i + 1) % 10;
            engine
                .execute_sql(&format!("SELECT * FROM items WHERE name LIKE 'item{}%'", i))
                .expect("select")
        });
    });
}

fn bench_insert(c: &mut Criterion) {
    let (engine, _dir) = setup_engine(0);
    c.bench_function("insert_single_row", |b| {
        let mut i = 0usize;
        b.iter(|| {
            i += 1;
            engine
                .execute_sql(&format!(
                    "INSERT INTO items (id, name, price) VALUES ({}, 'bench', '1')",
                    i + 1_000_000
                ))
                .expect("insert")
        });
    });
}

criterion_group!(
    benches,
    bench_point_select,
    bench_full_scan_with_filter,
    bench_insert
);
criterion_main!(benches);
