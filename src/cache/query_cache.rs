use std::{
    collections::{HashMap, VecDeque},
    sync::Mutex,
};

use chrono::{DateTime, Duration, Utc};
use log::debug;

use crate::query::result::QueryResult;

struct CacheEntry {
    result: QueryResult,
    created_at: DateTime<Utc>,
}

struct CacheInner {
    entries: HashMap<String, CacheEntry>,
    // front = least recently used, back = most recently used
    recency: VecDeque<String>,
}

/// Bounded LRU cache of SQL text to result set with a per-entry TTL.
/// Only Select results are stored. Invalidation is a conservative
/// substring match over the uppercased SQL (`FROM <NAME>` / `JOIN <NAME>`),
/// which is exact for the simple identifiers the grammar admits.
pub struct QueryCache {
    max_entries: usize,
    ttl: Duration,
    inner: Mutex<CacheInner>,
}

impl QueryCache {
    pub const DEFAULT_MAX_ENTRIES: usize = 1000;
    pub const DEFAULT_TTL_SECONDS: i64 = 300;

    pub fn new(max_entries: usize, ttl_seconds: i64) -> Self {
        Self {
            max_entries,
            ttl: Duration::seconds(ttl_seconds),
            inner: Mutex::new(CacheInner {
                entries: HashMap::new(),
                recency: VecDeque::new(),
            }),
        }
    }

    pub fn get(&self, sql: &str) -> Option<QueryResult> {
        let mut inner = self.inner.lock().unwrap();

        let expired = match inner.entries.get(sql) {
            None => {
                debug!("Cache miss for query: {}", sql);
                return None;
            }
            Some(entry) => Utc::now() > entry.created_at + self.ttl,
        };

        if expired {
            debug!("Cache entry expired for query: {}", sql);
            inner.entries.remove(sql);
            remove_from_recency(&mut inner.recency, sql);
            return None;
        }

        debug!("Cache hit for query: {}", sql);
        touch(&mut inner.recency, sql);
        inner.entries.get(sql).map(|entry| entry.result.clone())
    }

    /// Stores a result, but only Select results are cacheable.
    pub fn put(&self, sql: &str, result: &QueryResult) {
        if !result.is_select() {
            return;
        }

        let mut inner = self.inner.lock().unwrap();
        let replaced = inner
            .entries
            .insert(
                sql.to_string(),
                CacheEntry {
                    result: result.clone(),
                    created_at: Utc::now(),
                },
            )
            .is_some();

        if replaced {
            touch(&mut inner.recency, sql);
        } else {
            inner.recency.push_back(sql.to_string());
        }

        while inner.entries.len() > self.max_entries {
            if let Some(eldest) = inner.recency.pop_front() {
                inner.entries.remove(&eldest);
                debug!("Evicted cached query: {}", eldest);
            }
        }
        debug!("Cached result for query: {}", sql);
    }

    /// Drops every entry whose SQL references the table.
    pub fn invalidate_table(&self, table_name: &str) {
        let upper_table = table_name.to_uppercase();
        let from_marker = format!("FROM {}", upper_table);
        let join_marker = format!("JOIN {}", upper_table);

        let mut inner = self.inner.lock().unwrap();
        inner.entries.retain(|sql, _| {
            let upper = sql.to_uppercase();
            !(upper.contains(&from_marker) || upper.contains(&join_marker))
        });
        let entries = std::mem::take(&mut inner.entries);
        inner.recency.retain(|sql| entries.contains_key(sql));
        inner.entries = entries;
        debug!("Invalidated cache entries for table: {}", table_name);
    }

    pub fn clear(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.entries.clear();
        inner.recency.clear();
        debug!("Cache cleared");
    }

    pub fn len(&self) -> usize {
        self.inner.lock().unwrap().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn touch(recency: &mut VecDeque<String>, sql: &str) {
    remove_from_recency(recency, sql);
    recency.push_back(sql.to_string());
}

fn remove_from_recency(recency: &mut VecDeque<String>, sql: &str) {
    if let Some(position) = recency.iter().position(|entry| entry == sql) {
        recency.remove(position);
    }
}
