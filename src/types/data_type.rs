use serde::{Deserialize, Serialize};

use crate::types::error::{DatabaseError, Result};

/// Declared column type. Values are carried as strings throughout the
/// engine; the declared type only constrains what the DDL accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DataType {
    Integer,
    Varchar,
    Boolean,
    Date,
    Decimal,
}

impl DataType {
    /// Maps a declared SQL type string to its storage type. VARCHAR may
    /// carry a length suffix which is accepted and ignored.
    pub fn from_type_str(type_str: &str) -> Result<Self> {
        let upper = type_str.trim().to_uppercase();

        if upper.starts_with("VARCHAR") {
            return Ok(DataType::Varchar);
        }

        match upper.as_str() {
            "INT" | "INTEGER" | "BIGINT" | "SMALLINT" | "TINYINT" => Ok(DataType::Integer),
            "CHAR" | "TEXT" => Ok(DataType::Varchar),
            "BOOLEAN" => Ok(DataType::Boolean),
            "DATE" | "DATETIME" | "TIMESTAMP" => Ok(DataType::Date),
            "DECIMAL" | "FLOAT" | "DOUBLE" => Ok(DataType::Decimal),
            _ => Err(DatabaseError::UnsupportedDataType {
                type_name: type_str.to_string(),
            }),
        }
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            DataType::Integer => "INTEGER",
            DataType::Varchar => "VARCHAR",
            DataType::Boolean => "BOOLEAN",
            DataType::Date => "DATE",
            DataType::Decimal => "DECIMAL",
        }
    }
}

impl std::fmt::Display for DataType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.type_name())
    }
}
