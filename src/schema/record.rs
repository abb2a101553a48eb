use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::types::RecordId;

/// A table row: a dense table-local id plus an ordered column -> value
/// mapping. A null value is represented by the absence of its key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub id: RecordId,
    pub values: BTreeMap<String, String>,
}

impl Record {
    pub fn new(id: RecordId, values: BTreeMap<String, String>) -> Self {
        Self { id, values }
    }

    pub fn value(&self, column: &str) -> Option<&str> {
        self.values.get(column).map(String::as_str)
    }

    /// Projects the record onto the named columns. Columns the record does
    /// not carry are silently absent from the projection.
    pub fn project(&self, columns: &[String]) -> Record {
        let mut projected = BTreeMap::new();
        for column in columns {
            if let Some(value) = self.values.get(column) {
                projected.insert(column.clone(), value.clone());
            }
        }
        Record::new(self.id, projected)
    }
}
