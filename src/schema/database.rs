use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
};

use crate::{
    schema::{column::ColumnDefinition, table::Table},
    types::error::{DatabaseError, Result},
};

/// Named collection of tables. Each table sits behind its own `RwLock`;
/// the lock manager serializes statement-scoped access on top of it, so
/// data guards are only held for the duration of a single table operation.
pub struct Database {
    name: String,
    tables: HashMap<String, Arc<RwLock<Table>>>,
}

impl Database {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tables: HashMap::new(),
        }
    }

    pub fn create_table(&mut self, name: &str, columns: Vec<ColumnDefinition>) -> Result<()> {
        if self.tables.contains_key(name) {
            return Err(DatabaseError::TableAlreadyExists {
                name: name.to_string(),
            });
        }
        self.tables.insert(
            name.to_string(),
            Arc::new(RwLock::new(Table::new(name, columns))),
        );
        Ok(())
    }

    pub fn drop_table(&mut self, name: &str) -> Result<()> {
        if self.tables.remove(name).is_none() {
            return Err(DatabaseError::TableNotFound {
                name: name.to_string(),
            });
        }
        Ok(())
    }

    pub fn table(&self, name: &str) -> Result<Arc<RwLock<Table>>> {
        self.tables
            .get(name)
            .cloned()
            .ok_or_else(|| DatabaseError::TableNotFound {
                name: name.to_string(),
            })
    }

    pub fn has_table(&self, name: &str) -> bool {
        self.tables.contains_key(name)
    }

    /// Table names in sorted order for deterministic listings.
    pub fn table_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tables.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn table_count(&self) -> usize {
        self.tables.len()
    }
}
