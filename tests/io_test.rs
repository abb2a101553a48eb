use std::collections::BTreeSet;

use emberdb::config::DatabaseConfig;
use emberdb::engine::DatabaseEngine;
use tempfile::TempDir;

fn start_engine(name: &str) -> (DatabaseEngine, TempDir) {
    let dir = TempDir::new().unwrap();
    let mut engine = DatabaseEngine::with_config(DatabaseConfig::default());
    engine.start(name, dir.path().to_str().unwrap()).unwrap();
    (engine, dir)
}

/// Record sets compared as sets of column/value pairs, ignoring row order
/// and internal record ids.
fn record_set(engine: &DatabaseEngine, table: &str) -> BTreeSet<Vec<(String, String)>> {
    let result = engine
        .execute_sql(&format!("SELECT * FROM {}", table))
        .unwrap();
    result
        .records()
        .unwrap()
        .iter()
        .map(|r| {
            r.values
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect()
        })
        .collect()
}

fn seed_products(engine: &DatabaseEngine) {
    engine
        .execute_sql(
            "CREATE TABLE products (id INTEGER PRIMARY KEY, name VARCHAR(50), price DECIMAL, note VARCHAR(100))",
        )
        .unwrap();
    engine
        .execute_sql("INSERT INTO products (id, name, price, note) VALUES (1, 'Widget', '9.99', 'plain')")
        .unwrap();
    engine
        .execute_sql("INSERT INTO products (id, name, price, note) VALUES (2, 'Gadget, deluxe', '19.99', NULL)")
        .unwrap();
    engine
        .execute_sql("INSERT INTO products (id, name, price, note) VALUES (3, 'Gizmo', '5.00', 'says \"hi\"')")
        .unwrap();
}

#[test]
fn test_csv_round_trip_preserves_record_set() {
    let (engine, dir) = start_engine("csvdb");
    seed_products(&engine);

    let csv_path = dir.path().join("products.csv");
    let exported = engine.export_csv("products", &csv_path).unwrap();
    assert_eq!(exported, 3);

    // Import into a second engine with the same schema.
    let (other, _other_dir) = start_engine("csvdb2");
    other
        .execute_sql(
            "CREATE TABLE products (id INTEGER PRIMARY KEY, name VARCHAR(50), price DECIMAL, note VARCHAR(100))",
        )
        .unwrap();
    let imported = other.import_csv(&csv_path, "products").unwrap();
    assert_eq!(imported, 3);

    assert_eq!(record_set(&engine, "products"), record_set(&other, "products"));
}

#[test]
fn test_csv_export_header_is_in_column_order() {
    let (engine, dir) = start_engine("csvdb");
    seed_products(&engine);

    let csv_path = dir.path().join("products.csv");
    engine.export_csv("products", &csv_path).unwrap();

    let content = std::fs::read_to_string(&csv_path).unwrap();
    assert_eq!(content.lines().next().unwrap(), "id,name,price,note");
}

#[test]
fn test_csv_import_with_unknown_header_fails() {
    let (engine, dir) = start_engine("csvdb");
    engine
        .execute_sql("CREATE TABLE t (id INTEGER PRIMARY KEY)")
        .unwrap();

    let csv_path = dir.path().join("bad.csv");
    std::fs::write(&csv_path, "id,ghost\n1,x\n").unwrap();
    assert!(engine.import_csv(&csv_path, "t").is_err());
}

#[test]
fn test_csv_import_empty_field_becomes_null() {
    let (engine, dir) = start_engine("csvdb");
    engine
        .execute_sql("CREATE TABLE t (id INTEGER PRIMARY KEY, note VARCHAR(20))")
        .unwrap();

    let csv_path = dir.path().join("nulls.csv");
    std::fs::write(&csv_path, "id,note\n1,\n2,present\n").unwrap();
    assert_eq!(engine.import_csv(&csv_path, "t").unwrap(), 2);

    let rows = engine
        .execute_sql("SELECT * FROM t WHERE note IS NULL")
        .unwrap();
    assert_eq!(rows.affected_rows(), 1);
}

#[test]
fn test_backup_round_trip_restores_schema_data_and_indexes() {
    let (engine, dir) = start_engine("sourcedb");
    seed_products(&engine);
    engine
        .execute_sql("CREATE INDEX idx_products_name ON products (name)")
        .unwrap();
    engine
        .execute_sql("CREATE TABLE empty_table (id INTEGER PRIMARY KEY, v VARCHAR(5))")
        .unwrap();

    let backup_path = dir.path().join("backup.sql");
    engine.export_database(&backup_path).unwrap();

    let (restored, _restored_dir) = start_engine("restoredb");
    restored.import_database(&backup_path).unwrap();

    // Same record sets per table.
    assert_eq!(
        record_set(&engine, "products"),
        record_set(&restored, "products")
    );
    assert_eq!(
        record_set(&engine, "empty_table"),
        record_set(&restored, "empty_table")
    );

    // Same schemas.
    let database = restored.database().unwrap();
    let database = database.read().unwrap();
    assert!(database.has_table("products"));
    assert!(database.has_table("empty_table"));
    let table = database.table("products").unwrap();
    let table = table.read().unwrap();
    let column_names: Vec<String> = table.columns().iter().map(|c| c.name.clone()).collect();
    assert_eq!(column_names, vec!["id", "name", "price", "note"]);
    assert!(table.columns()[0].primary_key);

    // Secondary index restored; primary key index rebuilt automatically.
    assert!(table.has_index("name"));
    assert!(table.has_index("id"));
}

#[test]
fn test_backup_script_skips_primary_key_indexes() {
    let (engine, dir) = start_engine("sourcedb");
    seed_products(&engine);
    engine
        .execute_sql("CREATE INDEX idx_products_name ON products (name)")
        .unwrap();

    let backup_path = dir.path().join("backup.sql");
    engine.export_database(&backup_path).unwrap();

    let script = std::fs::read_to_string(&backup_path).unwrap();
    assert!(script.contains("CREATE TABLE products"));
    assert!(script.contains("CREATE INDEX idx_products_name ON products(name);"));
    assert!(!script.contains("idx_products_id"));
}
