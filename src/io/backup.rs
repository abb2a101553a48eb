use std::{fs, path::Path};

use chrono::Utc;
use log::{info, warn};

use crate::{engine::DatabaseEngine, types::error::Result};

/// Writes the whole database as a SQL script: per table a CREATE TABLE,
/// one INSERT per record, and a CREATE INDEX for every secondary index
/// (primary-key indexes are rebuilt automatically and are not exported).
pub fn export_database(engine: &DatabaseEngine, file_path: &Path) -> Result<()> {
    info!("Exporting database to {}", file_path.display());

    let database = engine.database()?;
    let mut script = String::new();

    {
        let database = database.read().unwrap();
        script.push_str("-- emberdb database export\n");
        script.push_str(&format!("-- Database: {}\n", database.name()));
        script.push_str(&format!(
            "-- Export date: {}\n\n",
            Utc::now().to_rfc3339()
        ));
    }

    let table_names = database.read().unwrap().table_names();
    for table_name in table_names {
        export_table(engine, &table_name, &mut script)?;
        script.push('\n');
    }

    fs::write(file_path, script)?;
    info!("Database export completed");
    Ok(())
}

fn export_table(engine: &DatabaseEngine, table_name: &str, script: &mut String) -> Result<()> {
    let database = engine.database()?;

    script.push_str(&format!("-- Table: {}\n", table_name));
    {
        let database = database.read().unwrap();
        let table = database.table(table_name)?;
        let table = table.read().unwrap();

        script.push_str(&format!("CREATE TABLE {} (\n", table_name));
        let column_count = table.columns().len();
        for (i, column) in table.columns().iter().enumerate() {
            script.push_str(&format!("    {}", column.to_ddl()));
            if i + 1 < column_count {
                script.push(',');
            }
            script.push('\n');
        }
        script.push_str(");\n\n");
    }

    let result = engine.execute_sql(&format!("SELECT * FROM {}", table_name))?;
    let records = result.records().unwrap_or_default();
    if !records.is_empty() {
        script.push_str(&format!("-- Data for table: {}\n", table_name));
        for record in records {
            let columns: Vec<&str> = record.values.keys().map(String::as_str).collect();
            let values: Vec<String> = record
                .values
                .values()
                .map(|value| format!("'{}'", value.replace('\'', "''")))
                .collect();
            script.push_str(&format!(
                "INSERT INTO {} ({}) VALUES ({});\n",
                table_name,
                columns.join(", "),
                values.join(", ")
            ));
        }
    }

    let database = database.read().unwrap();
    let table = database.table(table_name)?;
    let table = table.read().unwrap();
    let primary_key = table.primary_key_column().map(|c| c.name.clone());
    let secondary: Vec<String> = table
        .indexed_columns()
        .into_iter()
        .filter(|column| Some(column) != primary_key.as_ref())
        .collect();

    if !secondary.is_empty() {
        script.push_str(&format!("\n-- Indexes for table: {}\n", table_name));
        for column in secondary {
            script.push_str(&format!(
                "CREATE INDEX idx_{}_{} ON {}({});\n",
                table_name, column, table_name, column
            ));
        }
    }

    Ok(())
}

/// Replays a SQL script produced by `export_database`: statements are
/// split on `;`, comment lines and blanks are skipped, and each statement
/// executes in order. Failed statements are logged and skipped. Returns
/// the number of statements executed.
pub fn import_database(engine: &DatabaseEngine, file_path: &Path) -> Result<usize> {
    info!("Importing database from {}", file_path.display());

    let content = fs::read_to_string(file_path)?;
    let mut executed = 0;

    for chunk in content.split(';') {
        let statement: String = chunk
            .lines()
            .filter(|line| !line.trim_start().starts_with("--"))
            .collect::<Vec<&str>>()
            .join("\n");
        let statement = statement.trim();
        if statement.is_empty() {
            continue;
        }

        match engine.execute_sql(statement) {
            Ok(_) => executed += 1,
            Err(error) => warn!("Failed to execute statement: {} - {}", statement, error),
        }
    }

    info!("Database import completed, executed {} statements", executed);
    Ok(executed)
}
