use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{query::where_clause::WhereCondition, schema::column::ColumnDefinition};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JoinType {
    Inner,
    Left,
    Right,
    Full,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ShowKind {
    Tables,
    Indexes,
    Stats,
    Databases,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderByColumn {
    pub column: String,
    pub ascending: bool,
}

impl OrderByColumn {
    pub fn new(column: impl Into<String>, ascending: bool) -> Self {
        Self {
            column: column.into(),
            ascending,
        }
    }
}

impl std::fmt::Display for OrderByColumn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} {}",
            self.column,
            if self.ascending { "ASC" } else { "DESC" }
        )
    }
}

/// A parsed SQL statement. The executor dispatches on the variant.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Select {
        table: String,
        columns: Vec<String>,
        where_clause: Option<WhereCondition>,
        order_by: Vec<OrderByColumn>,
        limit: Option<usize>,
        offset: Option<usize>,
    },
    Join {
        columns: Vec<String>,
        left_table: String,
        right_table: String,
        left_column: String,
        right_column: String,
        join_type: JoinType,
        where_clause: Option<WhereCondition>,
    },
    Insert {
        table: String,
        values: BTreeMap<String, String>,
    },
    Update {
        table: String,
        updates: BTreeMap<String, Option<String>>,
        where_clause: Option<WhereCondition>,
    },
    Delete {
        table: String,
        where_clause: Option<WhereCondition>,
    },
    CreateTable {
        table: String,
        columns: Vec<ColumnDefinition>,
    },
    CreateIndex {
        index_name: String,
        table: String,
        column: String,
    },
    Show {
        kind: ShowKind,
        table: Option<String>,
    },
    Explain {
        inner: Box<Statement>,
    },
    Vacuum {
        table: Option<String>,
    },
    Analyze {
        table: Option<String>,
    },
}

impl Statement {
    /// Statements that never modify data; only these consult or populate
    /// the query cache.
    pub fn is_read_only(&self) -> bool {
        matches!(
            self,
            Statement::Select { .. }
                | Statement::Join { .. }
                | Statement::Show { .. }
                | Statement::Explain { .. }
        )
    }

    /// The table a write statement targets, used for cache invalidation
    /// and audit logging.
    pub fn table_name(&self) -> Option<&str> {
        match self {
            Statement::Select { table, .. }
            | Statement::Insert { table, .. }
            | Statement::Update { table, .. }
            | Statement::Delete { table, .. }
            | Statement::CreateTable { table, .. }
            | Statement::CreateIndex { table, .. } => Some(table),
            Statement::Vacuum { table } | Statement::Analyze { table } => table.as_deref(),
            Statement::Join { left_table, .. } => Some(left_table),
            Statement::Show { table, .. } => table.as_deref(),
            Statement::Explain { inner } => inner.table_name(),
        }
    }

    /// Operation tag used by the audit log and EXPLAIN output.
    pub fn operation_name(&self) -> &'static str {
        match self {
            Statement::Select { .. } => "SELECT",
            Statement::Join { .. } => "JOIN",
            Statement::Insert { .. } => "INSERT",
            Statement::Update { .. } => "UPDATE",
            Statement::Delete { .. } => "DELETE",
            Statement::CreateTable { .. } => "CREATE_TABLE",
            Statement::CreateIndex { .. } => "CREATE_INDEX",
            Statement::Show { .. } => "SHOW",
            Statement::Explain { .. } => "EXPLAIN",
            Statement::Vacuum { .. } => "VACUUM",
            Statement::Analyze { .. } => "ANALYZE",
        }
    }
}
