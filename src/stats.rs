use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicU64, Ordering},
        Mutex,
    },
};

use chrono::{DateTime, Utc};

/// Performance record for one executed statement.
#[derive(Debug, Clone)]
pub struct QueryStats {
    pub query_id: u64,
    pub sql: String,
    pub started_at: DateTime<Utc>,
    pub execution_time_ms: u64,
    pub rows_processed: usize,
    pub index_used: bool,
    pub execution_plan: String,
}

/// Bounded ring buffer of the most recent query statistics. Owns the
/// monotonic query-id counter.
pub struct QueryHistory {
    capacity: usize,
    next_query_id: AtomicU64,
    entries: Mutex<VecDeque<QueryStats>>,
}

impl QueryHistory {
    pub const DEFAULT_CAPACITY: usize = 1000;

    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            next_query_id: AtomicU64::new(1),
            entries: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    pub fn record(
        &self,
        sql: &str,
        started_at: DateTime<Utc>,
        execution_time_ms: u64,
        rows_processed: usize,
        index_used: bool,
        execution_plan: &str,
    ) {
        let stats = QueryStats {
            query_id: self.next_query_id.fetch_add(1, Ordering::SeqCst),
            sql: sql.to_string(),
            started_at,
            execution_time_ms,
            rows_processed,
            index_used,
            execution_plan: execution_plan.to_string(),
        };

        let mut entries = self.entries.lock().unwrap();
        if entries.len() == self.capacity {
            entries.pop_front();
        }
        entries.push_back(stats);
    }

    pub fn snapshot(&self) -> Vec<QueryStats> {
        self.entries.lock().unwrap().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
