use std::{
    path::Path,
    sync::{Arc, Mutex, RwLock},
};

use chrono::Utc;
use log::{debug, error, info, warn};

use crate::{
    audit::AuditLogger,
    cache::query_cache::QueryCache,
    config::DatabaseConfig,
    io,
    query::{
        executor::QueryExecutor, parser::SqlParser, prepared::PreparedStatement,
        result::QueryResult, statement::Statement,
    },
    schema::database::Database,
    stats::{QueryHistory, QueryStats},
    storage::{buffer_pool::BufferPool, disk_manager::DiskManager},
    transaction::transaction::TransactionManager,
    types::error::{DatabaseError, Result},
};

struct EngineComponents {
    disk_manager: Mutex<DiskManager>,
    buffer_pool: Mutex<BufferPool>,
    transaction_manager: Arc<TransactionManager>,
    database: Arc<RwLock<Database>>,
    parser: SqlParser,
    executor: QueryExecutor,
    query_cache: QueryCache,
    query_history: QueryHistory,
    audit_logger: AuditLogger,
}

/// The engine facade: owns every subsystem, exposes the statement entry
/// point, and manages lifecycle. Start and stop are idempotent.
pub struct DatabaseEngine {
    running: bool,
    config: DatabaseConfig,
    components: Option<EngineComponents>,
}

impl Default for DatabaseEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl DatabaseEngine {
    pub fn new() -> Self {
        Self::with_config(DatabaseConfig::new())
    }

    pub fn with_config(config: DatabaseConfig) -> Self {
        Self {
            running: false,
            config,
            components: None,
        }
    }

    /// Starts the engine with the database name "default" and the
    /// configured data directory.
    pub fn start_default(&mut self) -> Result<()> {
        let data_directory = self.config.data_directory().to_string();
        self.start("default", &data_directory)
    }

    pub fn start(&mut self, database_name: &str, data_directory: &str) -> Result<()> {
        if self.running {
            warn!("Database engine is already running");
            return Ok(());
        }

        info!("Initializing database engine");

        // The disk manager creates the data directory, so it must come
        // first; the audit writer appends into the same directory.
        let disk_manager = DiskManager::new(data_directory, database_name)?;
        let mut audit_logger = AuditLogger::new(Path::new(data_directory).join("audit.log"));
        audit_logger.start();

        let buffer_pool = BufferPool::new(self.config.buffer_pool_size());
        let transaction_manager = Arc::new(TransactionManager::new());
        let database = Arc::new(RwLock::new(Database::new(database_name)));
        let parser = SqlParser::new();
        let executor = QueryExecutor::new(Arc::clone(&database), Arc::clone(&transaction_manager));
        let query_cache = QueryCache::new(
            QueryCache::DEFAULT_MAX_ENTRIES,
            QueryCache::DEFAULT_TTL_SECONDS,
        );
        let query_history = QueryHistory::new(QueryHistory::DEFAULT_CAPACITY);

        self.components = Some(EngineComponents {
            disk_manager: Mutex::new(disk_manager),
            buffer_pool: Mutex::new(buffer_pool),
            transaction_manager,
            database,
            parser,
            executor,
            query_cache,
            query_history,
            audit_logger,
        });
        self.running = true;

        info!("Database engine initialized successfully");
        debug!("Configuration: {}", self.config);
        Ok(())
    }

    /// Flushes dirty pages, closes the data file, and stops the audit
    /// writer. Errors during shutdown are logged, not raised.
    pub fn stop(&mut self) {
        if !self.running {
            warn!("Database engine is not running");
            return;
        }

        info!("Shutting down database engine");
        if let Some(mut components) = self.components.take() {
            {
                let mut buffer_pool = components.buffer_pool.lock().unwrap();
                let mut disk_manager = components.disk_manager.lock().unwrap();
                if let Err(flush_error) = buffer_pool.flush_all(&mut disk_manager) {
                    error!("Failed to flush buffer pool: {}", flush_error);
                }
                if let Err(close_error) = disk_manager.close() {
                    error!("Failed to close database file: {}", close_error);
                }
            }
            components.audit_logger.stop();
        }
        self.running = false;
        info!("Database engine shutdown complete");
    }

    /// The single statement entry point. Consults the query cache, parses,
    /// executes inside a per-statement transaction, maintains the cache,
    /// audit log, and query statistics, and re-wraps subsystem errors
    /// under a uniform prefix.
    pub fn execute_sql(&self, sql: &str) -> Result<QueryResult> {
        self.execute_sql_inner(sql).map_err(|execute_error| {
            match execute_error {
                DatabaseError::EngineNotRunning | DatabaseError::SqlExecutionFailed(_) => {
                    execute_error
                }
                other => {
                    error!("Failed to execute SQL: {} ({})", sql, other);
                    DatabaseError::SqlExecutionFailed(other.to_string())
                }
            }
        })
    }

    fn execute_sql_inner(&self, sql: &str) -> Result<QueryResult> {
        let components = self.components()?;

        if let Some(cached) = components.query_cache.get(sql) {
            debug!("Returning cached result for query: {}", sql);
            return Ok(cached);
        }

        let started_at = Utc::now();
        let timer = std::time::Instant::now();
        let statement = components.parser.parse(sql)?;

        match components.executor.execute(&statement) {
            Ok(result) => {
                components.query_cache.put(sql, &result);
                if !statement.is_read_only() {
                    if let Some(table) = statement.table_name() {
                        components.query_cache.invalidate_table(table);
                    }
                    self.audit(components, &statement, sql, true, None);
                }

                components.query_history.record(
                    sql,
                    started_at,
                    timer.elapsed().as_millis() as u64,
                    result.affected_rows(),
                    false,
                    "Basic execution plan",
                );
                Ok(result)
            }
            Err(execute_error) => {
                if !statement.is_read_only() {
                    self.audit(
                        components,
                        &statement,
                        sql,
                        false,
                        Some(&execute_error.to_string()),
                    );
                }
                Err(execute_error)
            }
        }
    }

    fn audit(
        &self,
        components: &EngineComponents,
        statement: &Statement,
        sql: &str,
        success: bool,
        error: Option<&str>,
    ) {
        components.audit_logger.log_statement(
            statement.operation_name(),
            statement.table_name(),
            sql,
            "system",
            success,
            error,
        );
    }

    pub fn prepare_statement(&self, sql: &str) -> Result<PreparedStatement> {
        self.components()?;
        Ok(PreparedStatement::new(sql))
    }

    pub fn execute_prepared(&self, prepared: &PreparedStatement) -> Result<QueryResult> {
        self.components()?;
        let sql = prepared.executable_sql()?;
        debug!("Executing prepared statement: {}", sql);
        self.execute_sql(&sql)
    }

    pub fn import_csv<P: AsRef<Path>>(&self, file_path: P, table_name: &str) -> Result<usize> {
        io::csv::import_csv(self, file_path.as_ref(), table_name)
    }

    pub fn export_csv<P: AsRef<Path>>(&self, table_name: &str, file_path: P) -> Result<usize> {
        io::csv::export_csv(self, table_name, file_path.as_ref())
    }

    pub fn export_database<P: AsRef<Path>>(&self, file_path: P) -> Result<()> {
        io::backup::export_database(self, file_path.as_ref())
    }

    pub fn import_database<P: AsRef<Path>>(&self, file_path: P) -> Result<usize> {
        io::backup::import_database(self, file_path.as_ref())
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn config(&self) -> &DatabaseConfig {
        &self.config
    }

    pub fn database(&self) -> Result<Arc<RwLock<Database>>> {
        Ok(Arc::clone(&self.components()?.database))
    }

    pub fn transaction_manager(&self) -> Result<Arc<TransactionManager>> {
        Ok(Arc::clone(&self.components()?.transaction_manager))
    }

    pub fn query_cache(&self) -> Result<&QueryCache> {
        Ok(&self.components()?.query_cache)
    }

    /// Snapshot of the bounded query-statistics ring buffer.
    pub fn query_history(&self) -> Result<Vec<QueryStats>> {
        Ok(self.components()?.query_history.snapshot())
    }

    fn components(&self) -> Result<&EngineComponents> {
        self.components
            .as_ref()
            .filter(|_| self.running)
            .ok_or(DatabaseError::EngineNotRunning)
    }
}

impl Drop for DatabaseEngine {
    fn drop(&mut self) {
        if self.running {
            self.stop();
        }
    }
}
