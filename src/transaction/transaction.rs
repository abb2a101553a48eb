use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicI64, Ordering},
        Mutex,
    },
};

use chrono::{DateTime, Utc};
use log::{debug, warn};

use crate::{
    transaction::lock_manager::LockManager,
    types::{
        error::{DatabaseError, Result},
        TransactionId,
    },
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    Active,
    Committed,
    Aborted,
}

impl std::fmt::Display for TransactionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransactionState::Active => f.write_str("ACTIVE"),
            TransactionState::Committed => f.write_str("COMMITTED"),
            TransactionState::Aborted => f.write_str("ABORTED"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Transaction {
    pub id: TransactionId,
    pub start_time: DateTime<Utc>,
    pub state: TransactionState,
}

/// Issues monotonically increasing transaction ids, tracks the active set,
/// and owns the lock manager. Transactions reference the manager by id
/// only; commit and abort are manager operations.
pub struct TransactionManager {
    next_id: AtomicI64,
    active: Mutex<HashMap<TransactionId, Transaction>>,
    lock_manager: LockManager,
}

impl Default for TransactionManager {
    fn default() -> Self {
        Self::new()
    }
}

impl TransactionManager {
    pub fn new() -> Self {
        Self {
            next_id: AtomicI64::new(1),
            active: Mutex::new(HashMap::new()),
            lock_manager: LockManager::new(),
        }
    }

    pub fn begin(&self) -> Transaction {
        let transaction = Transaction {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            start_time: Utc::now(),
            state: TransactionState::Active,
        };
        self.active
            .lock()
            .unwrap()
            .insert(transaction.id, transaction.clone());
        debug!("Started transaction {}", transaction.id);
        transaction
    }

    /// Commits the transaction: releases every lock it holds and removes
    /// it from the active set. Committing an unknown or already-finished
    /// transaction is an error.
    pub fn commit(&self, txn_id: TransactionId) -> Result<()> {
        {
            let mut active = self.active.lock().unwrap();
            match active.get(&txn_id) {
                None => return Err(DatabaseError::TransactionNotFound { id: txn_id }),
                Some(transaction) if transaction.state != TransactionState::Active => {
                    return Err(DatabaseError::InvalidTransactionState {
                        operation: "commit".to_string(),
                        state: transaction.state.to_string(),
                    });
                }
                Some(_) => {
                    active.remove(&txn_id);
                }
            }
        }

        self.lock_manager.release_all(txn_id);
        debug!("Committed transaction {}", txn_id);
        Ok(())
    }

    /// Aborts the transaction. Aborting an unknown transaction is
    /// tolerated and logged; its locks (if any) are still swept.
    pub fn abort(&self, txn_id: TransactionId) {
        let removed = self.active.lock().unwrap().remove(&txn_id);
        if removed.is_none() {
            warn!("Attempting to abort unknown transaction: {}", txn_id);
        }

        self.lock_manager.release_all(txn_id);
        debug!("Aborted transaction {}", txn_id);
    }

    pub fn acquire_shared(&self, txn_id: TransactionId, resource: &str) {
        self.lock_manager.acquire_shared(txn_id, resource);
    }

    pub fn acquire_exclusive(&self, txn_id: TransactionId, resource: &str) {
        self.lock_manager.acquire_exclusive(txn_id, resource);
    }

    pub fn release(&self, txn_id: TransactionId, resource: &str) {
        self.lock_manager.release(txn_id, resource);
    }

    pub fn lock_manager(&self) -> &LockManager {
        &self.lock_manager
    }

    pub fn active_count(&self) -> usize {
        self.active.lock().unwrap().len()
    }

    pub fn is_active(&self, txn_id: TransactionId) -> bool {
        self.active.lock().unwrap().contains_key(&txn_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_monotonic() {
        let manager = TransactionManager::new();
        let a = manager.begin();
        let b = manager.begin();
        assert!(b.id > a.id);
        assert_eq!(manager.active_count(), 2);
    }

    #[test]
    fn test_commit_removes_from_active_set() {
        let manager = TransactionManager::new();
        let txn = manager.begin();
        manager.commit(txn.id).unwrap();
        assert!(!manager.is_active(txn.id));
        assert!(matches!(
            manager.commit(txn.id),
            Err(DatabaseError::TransactionNotFound { .. })
        ));
    }

    #[test]
    fn test_abort_unknown_is_tolerated() {
        let manager = TransactionManager::new();
        manager.abort(999);
        assert_eq!(manager.active_count(), 0);
    }

    #[test]
    fn test_commit_releases_locks() {
        let manager = TransactionManager::new();
        let txn = manager.begin();
        manager.acquire_exclusive(txn.id, "table:users");
        manager.commit(txn.id).unwrap();
        assert!(manager.lock_manager().held_resources(txn.id).is_empty());
    }
}
