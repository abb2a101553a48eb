use std::collections::{BTreeMap, HashMap};

use log::debug;

use crate::{
    index::btree::BTree,
    query::where_clause::{CompareOp, Predicate, WhereCondition},
    schema::{column::ColumnDefinition, record::Record},
    types::{
        error::{DatabaseError, Result},
        RecordId,
    },
};

/// A table: schema, in-memory record vector, and per-column B-tree
/// indexes. Primary-key and unique columns are indexed on construction so
/// their constraints are enforced through index lookups.
pub struct Table {
    name: String,
    columns: Vec<ColumnDefinition>,
    column_index: HashMap<String, usize>,
    indexes: HashMap<String, BTree>,
    records: Vec<Record>,
    next_record_id: RecordId,
}

impl Table {
    pub fn new(name: impl Into<String>, columns: Vec<ColumnDefinition>) -> Self {
        let name = name.into();
        let column_index = columns
            .iter()
            .enumerate()
            .map(|(i, c)| (c.name.clone(), i))
            .collect();

        let mut indexes = HashMap::new();
        for column in &columns {
            if column.is_unique() {
                indexes.insert(column.name.clone(), BTree::new());
            }
        }

        Self {
            name,
            columns,
            column_index,
            indexes,
            records: Vec::new(),
            next_record_id: 1,
        }
    }

    /// Validates constraints, assigns the next record id, and appends the
    /// record, updating every index for the columns it carries.
    pub fn insert_record(&mut self, mut values: BTreeMap<String, String>) -> Result<()> {
        for column in &self.columns {
            if column.auto_increment && !values.contains_key(&column.name) {
                values.insert(column.name.clone(), self.next_record_id.to_string());
            } else if let Some(default) = &column.default_value {
                values
                    .entry(column.name.clone())
                    .or_insert_with(|| default.clone());
            }
        }

        self.validate_insert(&values)?;

        let record = Record::new(self.next_record_id, values);
        self.next_record_id += 1;

        for (column, index) in &mut self.indexes {
            if let Some(value) = record.value(column) {
                index.insert(value, record.id);
            }
        }
        self.records.push(record);
        Ok(())
    }

    fn validate_insert(&self, values: &BTreeMap<String, String>) -> Result<()> {
        for column in &self.columns {
            if column.is_required() && !values.contains_key(&column.name) {
                return Err(DatabaseError::MissingRequiredColumn {
                    column: column.name.clone(),
                });
            }
        }
        self.validate_unique(values, None)
    }

    /// Checks every unique-constrained column through its index, skipping
    /// hits on `exclude_id` so an update can keep its own values.
    fn validate_unique(
        &self,
        values: &BTreeMap<String, String>,
        exclude_id: Option<RecordId>,
    ) -> Result<()> {
        for column in &self.columns {
            if !column.is_unique() {
                continue;
            }
            let Some(value) = values.get(&column.name) else {
                continue;
            };
            let Some(index) = self.indexes.get(&column.name) else {
                continue;
            };
            if let Some(found) = index.search(value) {
                if Some(found) != exclude_id {
                    return if column.primary_key {
                        Err(DatabaseError::DuplicatePrimaryKey {
                            value: value.clone(),
                        })
                    } else {
                        Err(DatabaseError::UniqueViolation {
                            column: column.name.clone(),
                            value: value.clone(),
                        })
                    };
                }
            }
        }
        Ok(())
    }

    /// Retrieves matching records and projects them onto the requested
    /// columns (`*` keeps every column). An equality predicate on an
    /// indexed column is answered by point lookup; everything else scans.
    pub fn select_records(&self, columns: &[String], where_clause: Option<&WhereCondition>) -> Vec<Record> {
        let matching = self.matching_records(where_clause);
        if columns.len() == 1 && columns[0] == "*" {
            return matching.into_iter().cloned().collect();
        }
        matching.into_iter().map(|r| r.project(columns)).collect()
    }

    fn matching_records(&self, where_clause: Option<&WhereCondition>) -> Vec<&Record> {
        let Some(condition) = where_clause else {
            return self.records.iter().collect();
        };

        if let Some(record) = self.point_lookup(condition) {
            debug!(
                "Index point lookup on {}.{}",
                self.name, condition.column
            );
            return vec![record];
        }
        if self.uses_index(condition) {
            // Indexed equality probe that found nothing.
            return Vec::new();
        }

        self.records
            .iter()
            .filter(|r| condition.evaluate(r.value(&condition.column)))
            .collect()
    }

    fn point_lookup(&self, condition: &WhereCondition) -> Option<&Record> {
        if !self.uses_index(condition) {
            return None;
        }
        let Predicate::Compare { value, .. } = &condition.predicate else {
            return None;
        };
        let id = self.indexes.get(&condition.column)?.search(value)?;
        self.record_by_id(id)
    }

    /// Whether this predicate would be answered from an index.
    pub fn uses_index(&self, condition: &WhereCondition) -> bool {
        matches!(
            &condition.predicate,
            Predicate::Compare {
                op: CompareOp::Eq,
                ..
            }
        ) && self.indexes.contains_key(&condition.column)
    }

    pub fn record_by_id(&self, id: RecordId) -> Option<&Record> {
        self.records.iter().find(|r| r.id == id)
    }

    /// Applies the updates to every matching record. `None` values clear a
    /// column. Index entries for the old values are replaced and unique
    /// constraints re-checked (excluding each record's own id). Returns the
    /// number of rows changed.
    pub fn update_records(
        &mut self,
        updates: &BTreeMap<String, Option<String>>,
        where_clause: Option<&WhereCondition>,
    ) -> Result<usize> {
        let target_ids: Vec<RecordId> = self
            .matching_records(where_clause)
            .iter()
            .map(|r| r.id)
            .collect();

        for id in &target_ids {
            let position = self
                .records
                .iter()
                .position(|r| r.id == *id)
                .expect("target record present");

            let mut new_values = self.records[position].values.clone();
            for (column, value) in updates {
                match value {
                    Some(v) => {
                        new_values.insert(column.clone(), v.clone());
                    }
                    None => {
                        new_values.remove(column);
                    }
                }
            }

            self.validate_unique(&new_values, Some(*id))?;

            let old_values = std::mem::replace(&mut self.records[position].values, new_values);
            for (column, index) in &mut self.indexes {
                if let Some(old) = old_values.get(column) {
                    index.delete(old);
                }
                if let Some(new) = self.records[position].values.get(column) {
                    index.insert(new, *id);
                }
            }
        }

        debug!("Updated {} records in table {}", target_ids.len(), self.name);
        Ok(target_ids.len())
    }

    /// Removes every matching record and its index entries. Returns the
    /// number of rows deleted.
    pub fn delete_records(&mut self, where_clause: Option<&WhereCondition>) -> usize {
        let target_ids: Vec<RecordId> = self
            .matching_records(where_clause)
            .iter()
            .map(|r| r.id)
            .collect();

        for id in &target_ids {
            let position = self
                .records
                .iter()
                .position(|r| r.id == *id)
                .expect("target record present");
            let record = self.records.remove(position);

            for (column, index) in &mut self.indexes {
                if let Some(value) = record.value(column) {
                    index.delete(value);
                }
            }
        }

        debug!("Deleted {} records from table {}", target_ids.len(), self.name);
        target_ids.len()
    }

    /// Creates a secondary index over an existing column and populates it
    /// from the current records.
    pub fn create_index(&mut self, column_name: &str) -> Result<()> {
        if !self.column_index.contains_key(column_name) {
            return Err(DatabaseError::ColumnNotFound {
                name: column_name.to_string(),
                table: self.name.clone(),
            });
        }
        if self.indexes.contains_key(column_name) {
            return Err(DatabaseError::IndexAlreadyExists {
                column: column_name.to_string(),
            });
        }

        let mut index = BTree::new();
        for record in &self.records {
            if let Some(value) = record.value(column_name) {
                index.insert(value, record.id);
            }
        }
        self.indexes.insert(column_name.to_string(), index);
        Ok(())
    }

    pub fn vacuum(&mut self) -> String {
        format!("VACUUM completed for table: {}", self.name)
    }

    pub fn analyze(&self) -> String {
        format!(
            "ANALYZE completed for table: {} ({} records)",
            self.name,
            self.records.len()
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn columns(&self) -> &[ColumnDefinition] {
        &self.columns
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn record_count(&self) -> usize {
        self.records.len()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index.contains_key(name)
    }

    pub fn has_index(&self, column: &str) -> bool {
        self.indexes.contains_key(column)
    }

    pub fn index(&self, column: &str) -> Option<&BTree> {
        self.indexes.get(column)
    }

    /// Indexed column names in sorted order.
    pub fn indexed_columns(&self) -> Vec<String> {
        let mut names: Vec<String> = self.indexes.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn primary_key_column(&self) -> Option<&ColumnDefinition> {
        self.columns.iter().find(|c| c.primary_key)
    }
}
