use thiserror::Error;

use crate::types::PageId;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {details}")]
    Parse { details: String },

    #[error("Unsupported SQL statement: {sql}")]
    UnsupportedStatement { sql: String },

    #[error("Table '{name}' does not exist")]
    TableNotFound { name: String },

    #[error("Table '{name}' already exists")]
    TableAlreadyExists { name: String },

    #[error("Column '{name}' not found in table '{table}'")]
    ColumnNotFound { name: String, table: String },

    #[error("Index already exists for column: {column}")]
    IndexAlreadyExists { column: String },

    #[error("Unsupported data type: {type_name}")]
    UnsupportedDataType { type_name: String },

    #[error("Duplicate primary key value: {value}")]
    DuplicatePrimaryKey { value: String },

    #[error("Unique constraint violated on column '{column}': {value}")]
    UniqueViolation { column: String, value: String },

    #[error("Column '{column}' is required")]
    MissingRequiredColumn { column: String },

    #[error("Page is full (page_id: {page_id})")]
    PageFull { page_id: PageId },

    #[error("Corrupted page: page_id={page_id}, reason={reason}")]
    CorruptedPage { page_id: PageId, reason: String },

    #[error("Database engine is not running")]
    EngineNotRunning,

    #[error("Transaction {id} not found")]
    TransactionNotFound { id: i64 },

    #[error("Cannot {operation} transaction in state {state}")]
    InvalidTransactionState { operation: String, state: String },

    #[error("Failed to acquire {mode} lock on {resource}")]
    LockFailed { mode: String, resource: String },

    #[error("Parameter index out of range: {index}")]
    ParameterOutOfRange { index: usize },

    #[error("Parameter {index} has not been set")]
    ParameterNotSet { index: usize },

    #[error("SQL execution failed: {0}")]
    SqlExecutionFailed(String),
}

pub type Result<T> = std::result::Result<T, DatabaseError>;
