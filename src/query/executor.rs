use std::{
    cmp::Ordering,
    collections::BTreeMap,
    sync::{Arc, RwLock},
};

use log::debug;

use crate::{
    query::{
        result::QueryResult,
        statement::{JoinType, OrderByColumn, ShowKind, Statement},
        where_clause::WhereCondition,
    },
    schema::{database::Database, record::Record, table::Table},
    transaction::transaction::TransactionManager,
    types::{error::Result, RecordId, TransactionId},
};

/// Dispatches parsed statements. Every statement runs inside its own
/// transaction: the executor begins one, takes the locks the statement
/// needs, performs the work, releases the locks, and commits; any error
/// aborts the transaction before being re-raised.
pub struct QueryExecutor {
    database: Arc<RwLock<Database>>,
    transaction_manager: Arc<TransactionManager>,
}

impl QueryExecutor {
    pub fn new(
        database: Arc<RwLock<Database>>,
        transaction_manager: Arc<TransactionManager>,
    ) -> Self {
        Self {
            database,
            transaction_manager,
        }
    }

    pub fn execute(&self, statement: &Statement) -> Result<QueryResult> {
        let transaction = self.transaction_manager.begin();
        match self.execute_in_transaction(statement, transaction.id) {
            Ok(result) => {
                self.transaction_manager.commit(transaction.id)?;
                Ok(result)
            }
            Err(error) => {
                self.transaction_manager.abort(transaction.id);
                Err(error)
            }
        }
    }

    pub fn execute_in_transaction(
        &self,
        statement: &Statement,
        txn_id: TransactionId,
    ) -> Result<QueryResult> {
        match statement {
            Statement::Select {
                table,
                columns,
                where_clause,
                order_by,
                limit,
                offset,
            } => self.execute_select(
                txn_id,
                table,
                columns,
                where_clause.as_ref(),
                order_by,
                *limit,
                *offset,
            ),
            Statement::Join {
                columns,
                left_table,
                right_table,
                left_column,
                right_column,
                join_type,
                where_clause,
            } => self.execute_join(
                txn_id,
                columns,
                left_table,
                right_table,
                left_column,
                right_column,
                *join_type,
                where_clause.as_ref(),
            ),
            Statement::Insert { table, values } => self.execute_insert(txn_id, table, values),
            Statement::Update {
                table,
                updates,
                where_clause,
            } => self.execute_update(txn_id, table, updates, where_clause.as_ref()),
            Statement::Delete {
                table,
                where_clause,
            } => self.execute_delete(txn_id, table, where_clause.as_ref()),
            Statement::CreateTable { table, columns } => {
                self.execute_create_table(txn_id, table, columns)
            }
            Statement::CreateIndex {
                index_name,
                table,
                column,
            } => self.execute_create_index(txn_id, index_name, table, column),
            Statement::Show { kind, table } => self.execute_show(txn_id, *kind, table.as_deref()),
            Statement::Explain { inner } => self.execute_explain(txn_id, inner),
            Statement::Vacuum { table } => self.execute_vacuum(txn_id, table.as_deref()),
            Statement::Analyze { table } => self.execute_analyze(txn_id, table.as_deref()),
        }
    }

    fn table_handle(&self, name: &str) -> Result<Arc<RwLock<Table>>> {
        self.database.read().unwrap().table(name)
    }

    #[allow(clippy::too_many_arguments)]
    fn execute_select(
        &self,
        txn_id: TransactionId,
        table_name: &str,
        columns: &[String],
        where_clause: Option<&WhereCondition>,
        order_by: &[OrderByColumn],
        limit: Option<usize>,
        offset: Option<usize>,
    ) -> Result<QueryResult> {
        debug!("Executing SELECT on table: {}", table_name);
        let resource = table_resource(table_name);
        self.transaction_manager.acquire_shared(txn_id, &resource);

        let result = (|| {
            let table = self.table_handle(table_name)?;
            let table = table.read().unwrap();
            let mut records = table.select_records(columns, where_clause);
            drop(table);

            apply_ordering(&mut records, order_by);
            let records = apply_limit_and_offset(records, limit, offset);
            debug!("SELECT returned {} records", records.len());
            Ok(QueryResult::Select { records })
        })();

        self.transaction_manager.release(txn_id, &resource);
        result
    }

    fn execute_insert(
        &self,
        txn_id: TransactionId,
        table_name: &str,
        values: &BTreeMap<String, String>,
    ) -> Result<QueryResult> {
        debug!("Executing INSERT on table: {}", table_name);
        let resource = table_resource(table_name);
        self.transaction_manager.acquire_exclusive(txn_id, &resource);

        let result = (|| {
            let table = self.table_handle(table_name)?;
            table.write().unwrap().insert_record(values.clone())?;
            Ok(QueryResult::Insert { affected_rows: 1 })
        })();

        self.transaction_manager.release(txn_id, &resource);
        result
    }

    fn execute_update(
        &self,
        txn_id: TransactionId,
        table_name: &str,
        updates: &BTreeMap<String, Option<String>>,
        where_clause: Option<&WhereCondition>,
    ) -> Result<QueryResult> {
        debug!("Executing UPDATE on table: {}", table_name);
        let resource = table_resource(table_name);
        self.transaction_manager.acquire_exclusive(txn_id, &resource);

        let result = (|| {
            let table = self.table_handle(table_name)?;
            let affected_rows = table.write().unwrap().update_records(updates, where_clause)?;
            Ok(QueryResult::Update { affected_rows })
        })();

        self.transaction_manager.release(txn_id, &resource);
        result
    }

    fn execute_delete(
        &self,
        txn_id: TransactionId,
        table_name: &str,
        where_clause: Option<&WhereCondition>,
    ) -> Result<QueryResult> {
        debug!("Executing DELETE on table: {}", table_name);
        let resource = table_resource(table_name);
        self.transaction_manager.acquire_exclusive(txn_id, &resource);

        let result = (|| {
            let table = self.table_handle(table_name)?;
            let affected_rows = table.write().unwrap().delete_records(where_clause);
            Ok(QueryResult::Delete { affected_rows })
        })();

        self.transaction_manager.release(txn_id, &resource);
        result
    }

    fn execute_create_table(
        &self,
        txn_id: TransactionId,
        table_name: &str,
        columns: &[crate::schema::column::ColumnDefinition],
    ) -> Result<QueryResult> {
        debug!("Executing CREATE TABLE: {}", table_name);
        let resource = format!("schema:{}", self.database.read().unwrap().name());
        self.transaction_manager.acquire_exclusive(txn_id, &resource);

        let result = self
            .database
            .write()
            .unwrap()
            .create_table(table_name, columns.to_vec())
            .map(|_| QueryResult::CreateTable {
                message: format!("Table {} created", table_name),
            });

        self.transaction_manager.release(txn_id, &resource);
        result
    }

    fn execute_create_index(
        &self,
        txn_id: TransactionId,
        index_name: &str,
        table_name: &str,
        column: &str,
    ) -> Result<QueryResult> {
        debug!("Executing CREATE INDEX: {} on table {}", index_name, table_name);
        let resource = table_resource(table_name);
        self.transaction_manager.acquire_exclusive(txn_id, &resource);

        let result = (|| {
            let table = self.table_handle(table_name)?;
            table.write().unwrap().create_index(column)?;
            Ok(QueryResult::CreateTable {
                message: format!("Index {} created", index_name),
            })
        })();

        self.transaction_manager.release(txn_id, &resource);
        result
    }

    fn execute_show(
        &self,
        txn_id: TransactionId,
        kind: ShowKind,
        table_name: Option<&str>,
    ) -> Result<QueryResult> {
        debug!("Executing SHOW {:?}", kind);
        let mut records = Vec::new();
        let mut next_id: RecordId = 1;
        let mut push = |records: &mut Vec<Record>, values: BTreeMap<String, String>| {
            records.push(Record::new(next_id, values));
            next_id += 1;
        };

        match kind {
            ShowKind::Tables => {
                for name in self.database.read().unwrap().table_names() {
                    let mut values = BTreeMap::new();
                    values.insert("table_name".to_string(), name);
                    push(&mut records, values);
                }
            }
            ShowKind::Databases => {
                let mut values = BTreeMap::new();
                values.insert(
                    "database_name".to_string(),
                    self.database.read().unwrap().name().to_string(),
                );
                push(&mut records, values);
            }
            ShowKind::Indexes => {
                let table_names = match table_name {
                    Some(name) => vec![name.to_string()],
                    None => self.database.read().unwrap().table_names(),
                };
                for name in table_names {
                    let resource = table_resource(&name);
                    self.transaction_manager.acquire_shared(txn_id, &resource);
                    let result: Result<()> = (|| {
                        let table = self.table_handle(&name)?;
                        let table = table.read().unwrap();
                        for indexed_column in table.indexed_columns() {
                            let mut values = BTreeMap::new();
                            values.insert("table_name".to_string(), name.clone());
                            values.insert("index_name".to_string(), indexed_column);
                            push(&mut records, values);
                        }
                        Ok(())
                    })();
                    self.transaction_manager.release(txn_id, &resource);
                    result?;
                }
            }
            ShowKind::Stats => {
                let table_names = self.database.read().unwrap().table_names();
                let mut total_records = 0;
                for name in &table_names {
                    let table = self.table_handle(name)?;
                    total_records += table.read().unwrap().record_count();
                }

                let mut values = BTreeMap::new();
                values.insert("statistic".to_string(), "total_tables".to_string());
                values.insert("value".to_string(), table_names.len().to_string());
                push(&mut records, values);

                let mut values = BTreeMap::new();
                values.insert("statistic".to_string(), "total_records".to_string());
                values.insert("value".to_string(), total_records.to_string());
                push(&mut records, values);
            }
        }

        Ok(QueryResult::Select { records })
    }

    /// Diagnostic projection of how a statement would run; not a real
    /// plan. One synthetic row with a constant estimated cost.
    fn execute_explain(&self, txn_id: TransactionId, inner: &Statement) -> Result<QueryResult> {
        debug!("Executing EXPLAIN for {}", inner.operation_name());
        let mut values = BTreeMap::new();
        values.insert("step".to_string(), "1".to_string());
        values.insert("operation".to_string(), inner.operation_name().to_string());

        if let Statement::Select {
            table,
            where_clause,
            order_by,
            limit,
            ..
        } = inner
        {
            values.insert("table".to_string(), table.clone());

            if let Some(condition) = where_clause {
                values.insert("filter".to_string(), condition.to_string());

                let resource = table_resource(table);
                self.transaction_manager.acquire_shared(txn_id, &resource);
                let uses_index: Result<bool> = (|| {
                    let table = self.table_handle(table)?;
                    let table = table.read().unwrap();
                    Ok(table.uses_index(condition))
                })();
                self.transaction_manager.release(txn_id, &resource);

                values.insert(
                    "index_used".to_string(),
                    if uses_index? {
                        "YES".to_string()
                    } else {
                        "NO - FULL TABLE SCAN".to_string()
                    },
                );
            }

            if !order_by.is_empty() {
                let ordering = order_by
                    .iter()
                    .map(|column| column.to_string())
                    .collect::<Vec<_>>()
                    .join(", ");
                values.insert("ordering".to_string(), ordering);
            }

            if let Some(limit) = limit {
                values.insert("limit".to_string(), limit.to_string());
            }
        } else if let Some(table) = inner.table_name() {
            values.insert("table".to_string(), table.to_string());
        }

        values.insert("estimated_cost".to_string(), "1.0".to_string());
        Ok(QueryResult::Select {
            records: vec![Record::new(1, values)],
        })
    }

    fn execute_vacuum(&self, txn_id: TransactionId, table_name: Option<&str>) -> Result<QueryResult> {
        debug!("Executing VACUUM");
        match table_name {
            Some(name) => {
                let message = self.with_exclusive_table(txn_id, name, |table| Ok(table.vacuum()))?;
                debug!("{}", message);
                Ok(QueryResult::CreateTable {
                    message: format!("Table {} vacuumed successfully", name),
                })
            }
            None => {
                let table_names = self.database.read().unwrap().table_names();
                for name in table_names {
                    self.with_exclusive_table(txn_id, &name, |table| Ok(table.vacuum()))?;
                }
                Ok(QueryResult::CreateTable {
                    message: "Database vacuumed successfully".to_string(),
                })
            }
        }
    }

    fn execute_analyze(&self, txn_id: TransactionId, table_name: Option<&str>) -> Result<QueryResult> {
        debug!("Executing ANALYZE");
        match table_name {
            Some(name) => {
                let message = self.with_exclusive_table(txn_id, name, |table| Ok(table.analyze()))?;
                debug!("{}", message);
                Ok(QueryResult::CreateTable {
                    message: format!("Table {} analyzed successfully", name),
                })
            }
            None => {
                let table_names = self.database.read().unwrap().table_names();
                for name in &table_names {
                    self.with_exclusive_table(txn_id, name, |table| Ok(table.analyze()))?;
                }
                Ok(QueryResult::CreateTable {
                    message: format!("Analyzed {} tables successfully", table_names.len()),
                })
            }
        }
    }

    fn with_exclusive_table<T>(
        &self,
        txn_id: TransactionId,
        table_name: &str,
        work: impl FnOnce(&mut Table) -> Result<T>,
    ) -> Result<T> {
        let resource = table_resource(table_name);
        self.transaction_manager.acquire_exclusive(txn_id, &resource);
        let result = (|| {
            let table = self.table_handle(table_name)?;
            let mut table = table.write().unwrap();
            work(&mut table)
        })();
        self.transaction_manager.release(txn_id, &resource);
        result
    }

    #[allow(clippy::too_many_arguments)]
    fn execute_join(
        &self,
        txn_id: TransactionId,
        columns: &[String],
        left_table: &str,
        right_table: &str,
        left_column: &str,
        right_column: &str,
        join_type: JoinType,
        where_clause: Option<&WhereCondition>,
    ) -> Result<QueryResult> {
        debug!(
            "Executing {:?} JOIN between {} and {}",
            join_type, left_table, right_table
        );

        // Shared locks in sorted order so concurrent joins cannot cycle.
        let mut resources = vec![table_resource(left_table), table_resource(right_table)];
        resources.sort();
        resources.dedup();
        for resource in &resources {
            self.transaction_manager.acquire_shared(txn_id, resource);
        }

        let result = (|| {
            let left = self.table_handle(left_table)?;
            let right = self.table_handle(right_table)?;
            let left = left.read().unwrap();
            let right = right.read().unwrap();

            let mut rows = nested_loop_join(
                left_table,
                left.records(),
                left_column,
                right_table,
                right.records(),
                right_column,
                join_type,
            );

            if let Some(condition) = where_clause {
                rows.retain(|row| condition.evaluate(joined_value(row, &condition.column)));
            }

            let records = if columns.len() == 1 && columns[0] == "*" {
                rows
            } else {
                rows.iter().map(|row| project_joined(row, columns)).collect()
            };

            Ok(QueryResult::Select { records })
        })();

        for resource in &resources {
            self.transaction_manager.release(txn_id, resource);
        }
        result
    }
}

fn table_resource(table_name: &str) -> String {
    format!("table:{}", table_name)
}

/// Stable multi-column sort. Nulls (absent values) order before non-nulls;
/// a descending column flips the comparison; ties keep input order.
fn apply_ordering(records: &mut [Record], order_by: &[OrderByColumn]) {
    if order_by.is_empty() {
        return;
    }

    records.sort_by(|a, b| {
        for order_column in order_by {
            let ordering = match (a.value(&order_column.column), b.value(&order_column.column)) {
                (None, None) => Ordering::Equal,
                (None, Some(_)) => Ordering::Less,
                (Some(_), None) => Ordering::Greater,
                (Some(left), Some(right)) => left.cmp(right),
            };
            let ordering = if order_column.ascending {
                ordering
            } else {
                ordering.reverse()
            };
            if ordering != Ordering::Equal {
                return ordering;
            }
        }
        Ordering::Equal
    });
}

fn apply_limit_and_offset(
    records: Vec<Record>,
    limit: Option<usize>,
    offset: Option<usize>,
) -> Vec<Record> {
    let offset = offset.unwrap_or(0);
    let limit = limit.unwrap_or(usize::MAX);
    records.into_iter().skip(offset).take(limit).collect()
}

/// Combines two records into one row with `table.column` keys.
fn merge_row(
    id: RecordId,
    left_table: &str,
    left: Option<&Record>,
    right_table: &str,
    right: Option<&Record>,
) -> Record {
    let mut values = BTreeMap::new();
    if let Some(record) = left {
        for (column, value) in &record.values {
            values.insert(format!("{}.{}", left_table, column), value.clone());
        }
    }
    if let Some(record) = right {
        for (column, value) in &record.values {
            values.insert(format!("{}.{}", right_table, column), value.clone());
        }
    }
    Record::new(id, values)
}

#[allow(clippy::too_many_arguments)]
fn nested_loop_join(
    left_table: &str,
    left_records: &[Record],
    left_column: &str,
    right_table: &str,
    right_records: &[Record],
    right_column: &str,
    join_type: JoinType,
) -> Vec<Record> {
    let mut rows = Vec::new();
    let mut next_id: RecordId = 1;
    let mut matched_right = vec![false; right_records.len()];

    for left_record in left_records {
        let mut matched_left = false;
        if let Some(left_value) = left_record.value(left_column) {
            for (right_index, right_record) in right_records.iter().enumerate() {
                if right_record.value(right_column) == Some(left_value) {
                    rows.push(merge_row(
                        next_id,
                        left_table,
                        Some(left_record),
                        right_table,
                        Some(right_record),
                    ));
                    next_id += 1;
                    matched_left = true;
                    matched_right[right_index] = true;
                }
            }
        }

        if !matched_left && matches!(join_type, JoinType::Left | JoinType::Full) {
            rows.push(merge_row(
                next_id,
                left_table,
                Some(left_record),
                right_table,
                None,
            ));
            next_id += 1;
        }
    }

    if matches!(join_type, JoinType::Right | JoinType::Full) {
        for (right_index, right_record) in right_records.iter().enumerate() {
            if !matched_right[right_index] {
                rows.push(merge_row(
                    next_id,
                    left_table,
                    None,
                    right_table,
                    Some(right_record),
                ));
                next_id += 1;
            }
        }
    }

    rows
}

/// Looks a column up in a joined row, accepting both qualified
/// (`table.column`) and bare column names.
fn joined_value<'a>(row: &'a Record, column: &str) -> Option<&'a str> {
    if let Some(value) = row.value(column) {
        return Some(value);
    }
    if !column.contains('.') {
        let suffix = format!(".{}", column);
        return row
            .values
            .iter()
            .find(|(key, _)| key.ends_with(&suffix))
            .map(|(_, value)| value.as_str());
    }
    None
}

fn project_joined(row: &Record, columns: &[String]) -> Record {
    let mut values = BTreeMap::new();
    for column in columns {
        if let Some(value) = joined_value(row, column) {
            values.insert(column.clone(), value.to_string());
        }
    }
    Record::new(row.id, values)
}
