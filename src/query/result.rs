use serde::{Deserialize, Serialize};

use crate::schema::record::Record;

/// Outcome of a statement. Select carries the result set, the modifying
/// kinds carry an affected-row count, and DDL carries a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum QueryResult {
    Select { records: Vec<Record> },
    Insert { affected_rows: usize },
    Update { affected_rows: usize },
    Delete { affected_rows: usize },
    CreateTable { message: String },
    DropTable { message: String },
}

impl QueryResult {
    pub fn is_select(&self) -> bool {
        matches!(self, QueryResult::Select { .. })
    }

    pub fn records(&self) -> Option<&[Record]> {
        match self {
            QueryResult::Select { records } => Some(records),
            _ => None,
        }
    }

    pub fn affected_rows(&self) -> usize {
        match self {
            QueryResult::Select { records } => records.len(),
            QueryResult::Insert { affected_rows }
            | QueryResult::Update { affected_rows }
            | QueryResult::Delete { affected_rows } => *affected_rows,
            QueryResult::CreateTable { .. } | QueryResult::DropTable { .. } => 0,
        }
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            QueryResult::CreateTable { message } | QueryResult::DropTable { message } => {
                Some(message)
            }
            _ => None,
        }
    }
}

impl std::fmt::Display for QueryResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueryResult::Select { records } => {
                write!(f, "SELECT result: {} records", records.len())
            }
            QueryResult::Insert { affected_rows } => {
                write!(f, "INSERT result: {} rows affected", affected_rows)
            }
            QueryResult::Update { affected_rows } => {
                write!(f, "UPDATE result: {} rows affected", affected_rows)
            }
            QueryResult::Delete { affected_rows } => {
                write!(f, "DELETE result: {} rows affected", affected_rows)
            }
            QueryResult::CreateTable { message } => write!(f, "CREATE TABLE result: {}", message),
            QueryResult::DropTable { message } => write!(f, "DROP TABLE result: {}", message),
        }
    }
}
