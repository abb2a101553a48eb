use std::collections::BTreeMap;

use emberdb::query::where_clause::{CompareOp, Predicate, WhereCondition};
use emberdb::schema::{column::ColumnDefinition, table::Table};
use emberdb::types::{data_type::DataType, error::DatabaseError};

fn users_table() -> Table {
    Table::new(
        "users",
        vec![
            ColumnDefinition::new("id", DataType::Integer).primary_key(),
            ColumnDefinition::new("name", DataType::Varchar),
            ColumnDefinition::new("email", DataType::Varchar).unique(),
        ],
    )
}

fn row(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

fn all_columns() -> Vec<String> {
    vec!["*".to_string()]
}

#[test]
fn test_primary_key_column_is_indexed_on_construction() {
    let table = users_table();
    assert!(table.has_index("id"));
    assert!(table.has_index("email"));
    assert!(!table.has_index("name"));
}

#[test]
fn test_insert_and_point_lookup() {
    let mut table = users_table();
    table
        .insert_record(row(&[("id", "1"), ("name", "Alice"), ("email", "a@x.io")]))
        .unwrap();
    table
        .insert_record(row(&[("id", "2"), ("name", "Bob"), ("email", "b@x.io")]))
        .unwrap();

    let condition = WhereCondition::equals("id", "2");
    assert!(table.uses_index(&condition));

    let records = table.select_records(&all_columns(), Some(&condition));
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].value("name"), Some("Bob"));
}

#[test]
fn test_missing_primary_key_is_rejected() {
    let mut table = users_table();
    let result = table.insert_record(row(&[("name", "NoId")]));
    assert!(matches!(
        result,
        Err(DatabaseError::MissingRequiredColumn { .. })
    ));
    assert_eq!(table.record_count(), 0);
}

#[test]
fn test_duplicate_primary_key_is_rejected() {
    let mut table = users_table();
    table.insert_record(row(&[("id", "1")])).unwrap();
    let result = table.insert_record(row(&[("id", "1")]));
    assert!(matches!(
        result,
        Err(DatabaseError::DuplicatePrimaryKey { .. })
    ));
    assert_eq!(table.record_count(), 1);
}

#[test]
fn test_unique_column_is_enforced() {
    let mut table = users_table();
    table
        .insert_record(row(&[("id", "1"), ("email", "same@x.io")]))
        .unwrap();
    let result = table.insert_record(row(&[("id", "2"), ("email", "same@x.io")]));
    assert!(matches!(result, Err(DatabaseError::UniqueViolation { .. })));
}

#[test]
fn test_record_ids_are_dense_and_monotonic() {
    let mut table = users_table();
    for i in 1..=5 {
        table.insert_record(row(&[("id", &i.to_string())])).unwrap();
    }
    let ids: Vec<i32> = table.records().iter().map(|r| r.id).collect();
    assert_eq!(ids, vec![1, 2, 3, 4, 5]);
}

#[test]
fn test_projection_keeps_requested_columns_only() {
    let mut table = users_table();
    table
        .insert_record(row(&[("id", "1"), ("name", "Alice"), ("email", "a@x.io")]))
        .unwrap();

    let records = table.select_records(&["name".to_string(), "ghost".to_string()], None);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].value("name"), Some("Alice"));
    assert_eq!(records[0].value("id"), None);
    // Nonexistent columns are silently absent.
    assert_eq!(records[0].value("ghost"), None);
}

#[test]
fn test_scan_with_non_equality_predicate() {
    let mut table = users_table();
    for (id, name) in [("1", "Alice"), ("2", "Bob"), ("3", "Carol")] {
        table.insert_record(row(&[("id", id), ("name", name)])).unwrap();
    }

    let condition = WhereCondition::new(
        "name",
        Predicate::Compare {
            op: CompareOp::Gt,
            value: "Alice".to_string(),
        },
    );
    assert!(!table.uses_index(&condition));
    let records = table.select_records(&all_columns(), Some(&condition));
    assert_eq!(records.len(), 2);
}

#[test]
fn test_update_maintains_indexes() {
    let mut table = users_table();
    table
        .insert_record(row(&[("id", "1"), ("email", "old@x.io")]))
        .unwrap();

    let mut updates = BTreeMap::new();
    updates.insert("email".to_string(), Some("new@x.io".to_string()));
    let updated = table
        .update_records(&updates, Some(&WhereCondition::equals("id", "1")))
        .unwrap();
    assert_eq!(updated, 1);

    assert_eq!(table.index("email").unwrap().search("new@x.io"), Some(1));
    assert_eq!(table.index("email").unwrap().search("old@x.io"), None);
}

#[test]
fn test_update_rejects_stealing_anothers_unique_value() {
    let mut table = users_table();
    table
        .insert_record(row(&[("id", "1"), ("email", "a@x.io")]))
        .unwrap();
    table
        .insert_record(row(&[("id", "2"), ("email", "b@x.io")]))
        .unwrap();

    let mut updates = BTreeMap::new();
    updates.insert("email".to_string(), Some("a@x.io".to_string()));
    let result = table.update_records(&updates, Some(&WhereCondition::equals("id", "2")));
    assert!(matches!(result, Err(DatabaseError::UniqueViolation { .. })));
}

#[test]
fn test_update_to_own_value_is_allowed() {
    let mut table = users_table();
    table
        .insert_record(row(&[("id", "1"), ("email", "keep@x.io")]))
        .unwrap();

    let mut updates = BTreeMap::new();
    updates.insert("email".to_string(), Some("keep@x.io".to_string()));
    let updated = table
        .update_records(&updates, Some(&WhereCondition::equals("id", "1")))
        .unwrap();
    assert_eq!(updated, 1);
}

#[test]
fn test_update_with_null_clears_the_column() {
    let mut table = users_table();
    table
        .insert_record(row(&[("id", "1"), ("name", "Alice")]))
        .unwrap();

    let mut updates = BTreeMap::new();
    updates.insert("name".to_string(), None);
    table.update_records(&updates, None).unwrap();

    assert_eq!(table.records()[0].value("name"), None);
}

#[test]
fn test_delete_removes_records_and_index_entries() {
    let mut table = users_table();
    for (id, email) in [("1", "a@x.io"), ("2", "b@x.io"), ("3", "c@x.io")] {
        table
            .insert_record(row(&[("id", id), ("email", email)]))
            .unwrap();
    }

    let deleted = table.delete_records(Some(&WhereCondition::equals("id", "2")));
    assert_eq!(deleted, 1);
    assert_eq!(table.record_count(), 2);
    assert_eq!(table.index("id").unwrap().search("2"), None);
    assert_eq!(table.index("email").unwrap().search("b@x.io"), None);
}

#[test]
fn test_delete_without_where_clears_the_table() {
    let mut table = users_table();
    for i in 1..=4 {
        table.insert_record(row(&[("id", &i.to_string())])).unwrap();
    }
    assert_eq!(table.delete_records(None), 4);
    assert_eq!(table.record_count(), 0);
}

#[test]
fn test_create_index_populates_from_existing_records() {
    let mut table = users_table();
    for (id, name) in [("1", "Alice"), ("2", "Bob")] {
        table.insert_record(row(&[("id", id), ("name", name)])).unwrap();
    }

    table.create_index("name").unwrap();
    assert_eq!(table.index("name").unwrap().search("Bob"), Some(2));

    assert!(matches!(
        table.create_index("name"),
        Err(DatabaseError::IndexAlreadyExists { .. })
    ));
    assert!(matches!(
        table.create_index("ghost"),
        Err(DatabaseError::ColumnNotFound { .. })
    ));
}

#[test]
fn test_index_consistency_after_mixed_workload() {
    let mut table = users_table();
    for i in 1..=20 {
        table
            .insert_record(row(&[("id", &format!("{:02}", i)), ("name", "x")]))
            .unwrap();
    }
    table.delete_records(Some(&WhereCondition::equals("id", "07")));
    let mut updates = BTreeMap::new();
    updates.insert("name".to_string(), Some("y".to_string()));
    table
        .update_records(&updates, Some(&WhereCondition::equals("id", "03")))
        .unwrap();

    // Every surviving record's indexed value resolves to its own id, and
    // searches for absent values miss.
    let index = table.index("id").unwrap();
    for record in table.records() {
        let key = record.value("id").unwrap();
        assert_eq!(index.search(key), Some(record.id));
    }
    assert_eq!(index.search("07"), None);
    assert_eq!(index.search("99"), None);
}

#[test]
fn test_auto_increment_and_default_values() {
    let mut table = Table::new(
        "events",
        vec![
            ColumnDefinition::new("id", DataType::Integer)
                .primary_key()
                .auto_increment(),
            ColumnDefinition::new("kind", DataType::Varchar).default_value("generic"),
        ],
    );

    table.insert_record(BTreeMap::new()).unwrap();
    table.insert_record(BTreeMap::new()).unwrap();

    let records = table.records();
    assert_eq!(records[0].value("id"), Some("1"));
    assert_eq!(records[1].value("id"), Some("2"));
    assert_eq!(records[0].value("kind"), Some("generic"));
}
