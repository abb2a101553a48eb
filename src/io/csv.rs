use std::{
    fs,
    io::Write,
    path::Path,
};

use log::{info, warn};

use crate::{
    engine::DatabaseEngine,
    types::error::{DatabaseError, Result},
};

/// Imports a CSV file into an existing table. The first line is the
/// header; its names must be columns of the target table. Empty fields
/// become NULL. Each data row runs as one INSERT; rows that fail are
/// logged and skipped. Returns the number of rows imported.
pub fn import_csv(engine: &DatabaseEngine, file_path: &Path, table_name: &str) -> Result<usize> {
    info!(
        "Importing CSV file {} into table {}",
        file_path.display(),
        table_name
    );

    let content = fs::read_to_string(file_path)?;
    let mut lines = content.lines();
    let header_line = lines.next().ok_or_else(|| DatabaseError::Parse {
        details: "CSV file is empty".to_string(),
    })?;
    let headers = parse_csv_line(header_line);

    {
        let database = engine.database()?;
        let database = database.read().unwrap();
        let table = database.table(table_name)?;
        let table = table.read().unwrap();
        for header in &headers {
            if !table.has_column(header) {
                return Err(DatabaseError::ColumnNotFound {
                    name: header.clone(),
                    table: table_name.to_string(),
                });
            }
        }
    }

    let mut imported_rows = 0;
    for line in lines {
        if line.trim().is_empty() {
            continue;
        }

        let fields = parse_csv_line(line);
        if fields.len() != headers.len() {
            warn!("Skipping malformed line: {}", line);
            continue;
        }

        let sql = build_insert_sql(table_name, &headers, &fields);
        match engine.execute_sql(&sql) {
            Ok(_) => imported_rows += 1,
            Err(error) => warn!("Failed to import row: {} - {}", line, error),
        }
    }

    info!("Imported {} rows into table {}", imported_rows, table_name);
    Ok(imported_rows)
}

/// Exports a table to CSV: a header line in table-column order, then one
/// line per record with RFC-4180 quoting. Null values export as empty
/// fields. Returns the number of rows written.
pub fn export_csv(engine: &DatabaseEngine, table_name: &str, file_path: &Path) -> Result<usize> {
    info!(
        "Exporting table {} to CSV file {}",
        table_name,
        file_path.display()
    );

    let headers: Vec<String> = {
        let database = engine.database()?;
        let database = database.read().unwrap();
        let table = database.table(table_name)?;
        let table = table.read().unwrap();
        table.columns().iter().map(|c| c.name.clone()).collect()
    };

    let result = engine.execute_sql(&format!("SELECT * FROM {}", table_name))?;
    let records = result.records().unwrap_or_default();

    let mut output = String::new();
    output.push_str(&headers.join(","));
    output.push('\n');

    for record in records {
        let fields: Vec<String> = headers
            .iter()
            .map(|header| escape_csv_value(record.value(header).unwrap_or("")))
            .collect();
        output.push_str(&fields.join(","));
        output.push('\n');
    }

    let mut file = fs::File::create(file_path)?;
    file.write_all(output.as_bytes())?;

    info!(
        "Exported {} rows from table {} to {}",
        records.len(),
        table_name,
        file_path.display()
    );
    Ok(records.len())
}

/// RFC-4180 field parsing: fields containing separators arrive wrapped in
/// double quotes with embedded quotes doubled.
fn parse_csv_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                fields.push(current.clone());
                current.clear();
            }
            c => current.push(c),
        }
    }
    fields.push(current);
    fields
}

fn escape_csv_value(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn build_insert_sql(table_name: &str, headers: &[String], fields: &[String]) -> String {
    let rendered: Vec<String> = fields
        .iter()
        .map(|field| {
            if field.is_empty() {
                "NULL".to_string()
            } else {
                format!("'{}'", field.replace('\'', "''"))
            }
        })
        .collect();

    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        table_name,
        headers.join(", "),
        rendered.join(", ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_csv_line_round_trip() {
        let values = ["plain", "with, comma", "with \"quote\"", ""];
        let line = values
            .iter()
            .map(|v| escape_csv_value(v))
            .collect::<Vec<_>>()
            .join(",");
        assert_eq!(parse_csv_line(&line), values);
    }

    #[test]
    fn test_build_insert_renders_null_for_empty() {
        let sql = build_insert_sql(
            "t",
            &["a".to_string(), "b".to_string()],
            &["x".to_string(), String::new()],
        );
        assert_eq!(sql, "INSERT INTO t (a, b) VALUES ('x', NULL)");
    }
}
