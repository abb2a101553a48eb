use emberdb::config::DatabaseConfig;
use emberdb::engine::DatabaseEngine;
use emberdb::query::result::QueryResult;
use emberdb::types::error::DatabaseError;
use tempfile::TempDir;

fn start_engine() -> (DatabaseEngine, TempDir) {
    let dir = TempDir::new().unwrap();
    let mut engine = DatabaseEngine::with_config(DatabaseConfig::default());
    engine
        .start("testdb", dir.path().to_str().unwrap())
        .unwrap();
    (engine, dir)
}

fn select_rows(engine: &DatabaseEngine, sql: &str) -> Vec<Vec<(String, String)>> {
    match engine.execute_sql(sql).unwrap() {
        QueryResult::Select { records } => records
            .iter()
            .map(|r| {
                r.values
                    .iter()
                    .map(|(k, v)| (k.clone(), v.clone()))
                    .collect()
            })
            .collect(),
        other => panic!("expected a result set, got {:?}", other),
    }
}

#[test]
fn test_create_insert_point_select_uses_index() {
    let (engine, _dir) = start_engine();
    engine
        .execute_sql("CREATE TABLE users (id INTEGER PRIMARY KEY, name VARCHAR(50))")
        .unwrap();
    engine
        .execute_sql("INSERT INTO users (id, name) VALUES (1, 'Alice')")
        .unwrap();
    engine
        .execute_sql("INSERT INTO users (id, name) VALUES (2, 'Bob')")
        .unwrap();

    let rows = select_rows(&engine, "SELECT * FROM users WHERE id = 2");
    assert_eq!(rows.len(), 1);
    assert!(rows[0].contains(&("id".to_string(), "2".to_string())));
    assert!(rows[0].contains(&("name".to_string(), "Bob".to_string())));

    // The point lookup must go through the primary-key index.
    let plan = select_rows(&engine, "EXPLAIN SELECT * FROM users WHERE id = 2");
    assert!(plan[0].contains(&("index_used".to_string(), "YES".to_string())));
}

#[test]
fn test_duplicate_primary_key_raises() {
    let (engine, _dir) = start_engine();
    engine
        .execute_sql("CREATE TABLE k (id INTEGER PRIMARY KEY)")
        .unwrap();
    engine.execute_sql("INSERT INTO k (id) VALUES (1)").unwrap();

    let error = engine
        .execute_sql("INSERT INTO k (id) VALUES (1)")
        .unwrap_err();
    assert!(error.to_string().contains("Duplicate primary key value: 1"));
    assert!(error.to_string().starts_with("SQL execution failed"));
}

#[test]
fn test_order_by_two_columns_is_lexicographic() {
    let (engine, _dir) = start_engine();
    engine
        .execute_sql("CREATE TABLE p (id INT PRIMARY KEY, cat VARCHAR(10), price INT)")
        .unwrap();
    for (id, cat, price) in [(1, "E", 100), (2, "E", 50), (3, "B", 15), (4, "B", 25)] {
        engine
            .execute_sql(&format!(
                "INSERT INTO p (id, cat, price) VALUES ({}, '{}', {})",
                id, cat, price
            ))
            .unwrap();
    }

    let rows = select_rows(&engine, "SELECT * FROM p ORDER BY cat ASC, price DESC");
    let ids: Vec<String> = rows
        .iter()
        .map(|row| {
            row.iter()
                .find(|(k, _)| k == "id")
                .map(|(_, v)| v.clone())
                .unwrap()
        })
        .collect();

    // Values compare as strings: within cat B, "25" > "15"; within cat E,
    // "50" > "100" lexicographically.
    assert_eq!(ids, vec!["4", "3", "2", "1"]);
}

#[test]
fn test_limit_and_offset() {
    let (engine, _dir) = start_engine();
    engine
        .execute_sql("CREATE TABLE u (id INT PRIMARY KEY, name VARCHAR(10))")
        .unwrap();
    for i in 1..=20 {
        engine
            .execute_sql(&format!("INSERT INTO u (id, name) VALUES ({}, 'n{}')", i, i))
            .unwrap();
    }

    let rows = select_rows(&engine, "SELECT * FROM u LIMIT 5 OFFSET 10");
    let ids: Vec<String> = rows
        .iter()
        .map(|row| {
            row.iter()
                .find(|(k, _)| k == "id")
                .map(|(_, v)| v.clone())
                .unwrap()
        })
        .collect();
    assert_eq!(ids, vec!["11", "12", "13", "14", "15"]);
}

#[test]
fn test_update_then_reselect_observes_new_state() {
    let (engine, _dir) = start_engine();
    engine
        .execute_sql("CREATE TABLE p (id INT PRIMARY KEY, price VARCHAR(10))")
        .unwrap();
    engine
        .execute_sql("INSERT INTO p (id, price) VALUES (1, '999.99')")
        .unwrap();

    // Warm the cache with the query we will re-run after the update.
    let before = select_rows(&engine, "SELECT price FROM p WHERE id = 1");
    assert_eq!(before[0][0].1, "999.99");

    engine
        .execute_sql("UPDATE p SET price = '1099.99' WHERE id = 1")
        .unwrap();

    let after = select_rows(&engine, "SELECT price FROM p WHERE id = 1");
    assert_eq!(after.len(), 1);
    assert_eq!(after[0][0].1, "1099.99");
}

#[test]
fn test_is_null_predicate() {
    let (engine, _dir) = start_engine();
    engine
        .execute_sql("CREATE TABLE e (id INT PRIMARY KEY, mgr INT)")
        .unwrap();
    engine
        .execute_sql("INSERT INTO e (id, mgr) VALUES (1, NULL)")
        .unwrap();
    engine
        .execute_sql("INSERT INTO e (id, mgr) VALUES (2, 1)")
        .unwrap();

    let rows = select_rows(&engine, "SELECT * FROM e WHERE mgr IS NULL");
    assert_eq!(rows.len(), 1);
    assert!(rows[0].contains(&("id".to_string(), "1".to_string())));

    let rows = select_rows(&engine, "SELECT * FROM e WHERE mgr IS NOT NULL");
    assert_eq!(rows.len(), 1);
    assert!(rows[0].contains(&("id".to_string(), "2".to_string())));
}

#[test]
fn test_like_between_and_in_predicates() {
    let (engine, _dir) = start_engine();
    engine
        .execute_sql("CREATE TABLE t (id INT PRIMARY KEY, name VARCHAR(20))")
        .unwrap();
    for (id, name) in [(1, "Alice"), (2, "Albert"), (3, "Bob")] {
        engine
            .execute_sql(&format!("INSERT INTO t (id, name) VALUES ({}, '{}')", id, name))
            .unwrap();
    }

    assert_eq!(select_rows(&engine, "SELECT * FROM t WHERE name LIKE 'Al%'").len(), 2);
    assert_eq!(
        select_rows(&engine, "SELECT * FROM t WHERE name NOT LIKE 'Al%'").len(),
        1
    );
    assert_eq!(
        select_rows(&engine, "SELECT * FROM t WHERE name BETWEEN 'Albert' AND 'Alice'").len(),
        2
    );
    assert_eq!(
        select_rows(&engine, "SELECT * FROM t WHERE name IN ('Bob', 'Ghost')").len(),
        1
    );
}

#[test]
fn test_identical_selects_are_cached_and_invalidated() {
    let (engine, _dir) = start_engine();
    engine
        .execute_sql("CREATE TABLE c (id INT PRIMARY KEY)")
        .unwrap();
    engine.execute_sql("INSERT INTO c (id) VALUES (1)").unwrap();

    let first = engine.execute_sql("SELECT * FROM c").unwrap();
    let second = engine.execute_sql("SELECT * FROM c").unwrap();
    assert_eq!(first, second);
    assert_eq!(engine.query_cache().unwrap().len(), 1);

    // A write against the table must invalidate the cached result.
    engine.execute_sql("INSERT INTO c (id) VALUES (2)").unwrap();
    let third = engine.execute_sql("SELECT * FROM c").unwrap();
    assert_eq!(third.affected_rows(), 2);
}

#[test]
fn test_no_locks_survive_statement_execution() {
    let (engine, _dir) = start_engine();
    engine
        .execute_sql("CREATE TABLE l (id INT PRIMARY KEY)")
        .unwrap();
    engine.execute_sql("INSERT INTO l (id) VALUES (1)").unwrap();
    engine.execute_sql("SELECT * FROM l").unwrap();
    let _ = engine.execute_sql("INSERT INTO l (id) VALUES (1)");

    let manager = engine.transaction_manager().unwrap();
    assert_eq!(manager.active_count(), 0);

    // Another writer can take the exclusive lock immediately, proving no
    // statement left a lock behind.
    engine.execute_sql("DELETE FROM l").unwrap();
}

#[test]
fn test_engine_not_running_errors() {
    let engine = DatabaseEngine::with_config(DatabaseConfig::default());
    assert!(matches!(
        engine.execute_sql("SELECT * FROM t"),
        Err(DatabaseError::EngineNotRunning)
    ));

    let (mut engine, _dir) = start_engine();
    engine.stop();
    assert!(matches!(
        engine.execute_sql("SELECT 1 FROM t"),
        Err(DatabaseError::EngineNotRunning)
    ));
}

#[test]
fn test_start_and_stop_are_idempotent() {
    let (mut engine, dir) = start_engine();
    engine
        .start("testdb", dir.path().to_str().unwrap())
        .unwrap();
    assert!(engine.is_running());
    engine.stop();
    engine.stop();
    assert!(!engine.is_running());
}

#[test]
fn test_show_statements() {
    let (engine, _dir) = start_engine();
    engine
        .execute_sql("CREATE TABLE a (id INT PRIMARY KEY)")
        .unwrap();
    engine
        .execute_sql("CREATE TABLE b (id INT PRIMARY KEY, tag VARCHAR(5))")
        .unwrap();
    engine
        .execute_sql("CREATE INDEX idx_b_tag ON b (tag)")
        .unwrap();
    engine.execute_sql("INSERT INTO a (id) VALUES (1)").unwrap();

    let tables = select_rows(&engine, "SHOW TABLES");
    assert_eq!(tables.len(), 2);

    let indexes = select_rows(&engine, "SHOW INDEXES FROM b");
    assert_eq!(indexes.len(), 2); // primary key + tag

    let stats = select_rows(&engine, "SHOW STATS");
    assert!(stats
        .iter()
        .any(|row| row.contains(&("statistic".to_string(), "total_tables".to_string()))
            && row.contains(&("value".to_string(), "2".to_string()))));

    let databases = select_rows(&engine, "SHOW DATABASES");
    assert!(databases[0].contains(&("database_name".to_string(), "testdb".to_string())));
}

#[test]
fn test_explain_reports_full_scan_without_index() {
    let (engine, _dir) = start_engine();
    engine
        .execute_sql("CREATE TABLE f (id INT PRIMARY KEY, name VARCHAR(10))")
        .unwrap();

    let plan = select_rows(&engine, "EXPLAIN SELECT * FROM f WHERE name = 'x'");
    assert!(plan[0].contains(&("index_used".to_string(), "NO - FULL TABLE SCAN".to_string())));
    assert!(plan[0].contains(&("estimated_cost".to_string(), "1.0".to_string())));
}

#[test]
fn test_vacuum_and_analyze() {
    let (engine, _dir) = start_engine();
    engine
        .execute_sql("CREATE TABLE v (id INT PRIMARY KEY)")
        .unwrap();

    let result = engine.execute_sql("VACUUM v").unwrap();
    assert_eq!(result.message(), Some("Table v vacuumed successfully"));

    let result = engine.execute_sql("VACUUM").unwrap();
    assert_eq!(result.message(), Some("Database vacuumed successfully"));

    let result = engine.execute_sql("ANALYZE").unwrap();
    assert_eq!(result.message(), Some("Analyzed 1 tables successfully"));
}

#[test]
fn test_join_inner_and_left() {
    let (engine, _dir) = start_engine();
    engine
        .execute_sql("CREATE TABLE users (id INT PRIMARY KEY, name VARCHAR(20))")
        .unwrap();
    engine
        .execute_sql("CREATE TABLE orders (id INT PRIMARY KEY, user_id INT, total VARCHAR(10))")
        .unwrap();
    engine
        .execute_sql("INSERT INTO users (id, name) VALUES (1, 'Alice')")
        .unwrap();
    engine
        .execute_sql("INSERT INTO users (id, name) VALUES (2, 'Bob')")
        .unwrap();
    engine
        .execute_sql("INSERT INTO orders (id, user_id, total) VALUES (10, 1, '99')")
        .unwrap();

    let inner = select_rows(
        &engine,
        "SELECT * FROM users JOIN orders ON users.id = orders.user_id",
    );
    assert_eq!(inner.len(), 1);
    assert!(inner[0].contains(&("users.name".to_string(), "Alice".to_string())));
    assert!(inner[0].contains(&("orders.total".to_string(), "99".to_string())));

    let left = select_rows(
        &engine,
        "SELECT * FROM users LEFT JOIN orders ON users.id = orders.user_id",
    );
    assert_eq!(left.len(), 2);
    let bob_row = left
        .iter()
        .find(|row| row.contains(&("users.name".to_string(), "Bob".to_string())))
        .unwrap();
    assert!(!bob_row.iter().any(|(k, _)| k.starts_with("orders.")));
}

#[test]
fn test_prepared_statement_round_trip() {
    let (engine, _dir) = start_engine();
    engine
        .execute_sql("CREATE TABLE ps (id INT PRIMARY KEY, name VARCHAR(20))")
        .unwrap();

    let mut insert = engine
        .prepare_statement("INSERT INTO ps (id, name) VALUES (?, ?)")
        .unwrap();
    insert.set_int(1, 1).unwrap();
    insert.set_string(2, "O'Brien").unwrap();
    engine.execute_prepared(&insert).unwrap();

    let rows = select_rows(&engine, "SELECT * FROM ps WHERE id = 1");
    assert!(rows[0].contains(&("name".to_string(), "O'Brien".to_string())));

    let mut unset = engine
        .prepare_statement("SELECT * FROM ps WHERE id = ?")
        .unwrap();
    assert!(engine.execute_prepared(&unset).is_err());
    unset.set_int(1, 1).unwrap();
    assert!(engine.execute_prepared(&unset).is_ok());
}

#[test]
fn test_query_history_records_statements() {
    let (engine, _dir) = start_engine();
    engine
        .execute_sql("CREATE TABLE h (id INT PRIMARY KEY)")
        .unwrap();
    engine.execute_sql("INSERT INTO h (id) VALUES (1)").unwrap();
    engine.execute_sql("SELECT * FROM h").unwrap();

    let history = engine.query_history().unwrap();
    assert_eq!(history.len(), 3);
    assert!(history[2].sql.contains("SELECT"));
    assert_eq!(history[1].rows_processed, 1);
}

#[test]
fn test_audit_log_written_for_writes_only() {
    let (mut engine, dir) = start_engine();
    engine
        .execute_sql("CREATE TABLE au (id INT PRIMARY KEY)")
        .unwrap();
    engine.execute_sql("INSERT INTO au (id) VALUES (1)").unwrap();
    engine.execute_sql("SELECT * FROM au").unwrap();
    let _ = engine.execute_sql("INSERT INTO au (id) VALUES (1)");
    engine.stop(); // drains the audit writer

    let audit = std::fs::read_to_string(dir.path().join("audit.log")).unwrap();
    let lines: Vec<&str> = audit.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].contains("|CREATE_TABLE|au|system|SUCCESS|"));
    assert!(lines[1].contains("|INSERT|au|system|SUCCESS|"));
    assert!(lines[2].contains("|INSERT|au|system|FAILURE|"));
    assert!(lines[2].contains("Duplicate primary key value: 1"));
    assert!(!audit.contains("SELECT"));
}

#[test]
fn test_schema_errors() {
    let (engine, _dir) = start_engine();
    let error = engine.execute_sql("SELECT * FROM missing").unwrap_err();
    assert!(error.to_string().contains("does not exist"));

    engine
        .execute_sql("CREATE TABLE dup (id INT PRIMARY KEY)")
        .unwrap();
    let error = engine
        .execute_sql("CREATE TABLE dup (id INT PRIMARY KEY)")
        .unwrap_err();
    assert!(error.to_string().contains("already exists"));

    let error = engine
        .execute_sql("CREATE TABLE bad (id GEOMETRY PRIMARY KEY)")
        .unwrap_err();
    assert!(error.to_string().contains("Unsupported data type"));
}

#[test]
fn test_concurrent_readers_and_writers() {
    let (engine, _dir) = start_engine();
    engine
        .execute_sql("CREATE TABLE cc (id INT PRIMARY KEY)")
        .unwrap();

    std::thread::scope(|scope| {
        for t in 0..4i32 {
            let engine = &engine;
            scope.spawn(move || {
                for i in 0..25 {
                    let id = t * 100 + i;
                    engine
                        .execute_sql(&format!("INSERT INTO cc (id) VALUES ({})", id))
                        .unwrap();
                    let rows = engine
                        .execute_sql(&format!("SELECT * FROM cc WHERE id = {}", id))
                        .unwrap();
                    assert_eq!(rows.affected_rows(), 1);
                }
            });
        }
    });

    assert_eq!(
        engine.execute_sql("SELECT * FROM cc").unwrap().affected_rows(),
        100
    );
    assert_eq!(engine.transaction_manager().unwrap().active_count(), 0);
}

#[test]
fn test_unsupported_statement_is_rejected() {
    let (engine, _dir) = start_engine();
    let error = engine.execute_sql("GRANT ALL TO nobody").unwrap_err();
    assert!(error.to_string().contains("Unsupported SQL statement"));
}
