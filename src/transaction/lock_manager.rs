use std::{
    collections::HashMap,
    sync::{Arc, Condvar, Mutex},
};

use log::debug;

use crate::types::TransactionId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    Shared,
    Exclusive,
}

/// Reader/writer lock that can be acquired and released from different
/// call frames, which guard-based `RwLock` does not allow. Waiters block
/// on the condvar until the state admits them.
struct ResourceLock {
    state: Mutex<LockState>,
    available: Condvar,
}

#[derive(Default)]
struct LockState {
    readers: usize,
    writer: bool,
}

impl ResourceLock {
    fn new() -> Self {
        Self {
            state: Mutex::new(LockState::default()),
            available: Condvar::new(),
        }
    }

    fn lock_shared(&self) {
        let mut state = self.state.lock().unwrap();
        while state.writer {
            state = self.available.wait(state).unwrap();
        }
        state.readers += 1;
    }

    fn lock_exclusive(&self) {
        let mut state = self.state.lock().unwrap();
        while state.writer || state.readers > 0 {
            state = self.available.wait(state).unwrap();
        }
        state.writer = true;
    }

    fn unlock(&self, mode: LockMode) {
        let mut state = self.state.lock().unwrap();
        match mode {
            LockMode::Shared => state.readers = state.readers.saturating_sub(1),
            LockMode::Exclusive => state.writer = false,
        }
        self.available.notify_all();
    }
}

/// Statement-scoped shared/exclusive locks keyed by resource name
/// (`table:<name>`, `schema:<database>`). The mode held by each
/// transaction is tracked per resource so release is unambiguous.
///
/// There is no deadlock detection: every statement acquires either a
/// single resource or several in sorted order, which cannot cycle.
pub struct LockManager {
    resource_locks: Mutex<HashMap<String, Arc<ResourceLock>>>,
    held: Mutex<HashMap<TransactionId, HashMap<String, LockMode>>>,
}

impl Default for LockManager {
    fn default() -> Self {
        Self::new()
    }
}

impl LockManager {
    pub fn new() -> Self {
        Self {
            resource_locks: Mutex::new(HashMap::new()),
            held: Mutex::new(HashMap::new()),
        }
    }

    pub fn acquire_shared(&self, txn_id: TransactionId, resource: &str) {
        if self.already_holds(txn_id, resource) {
            return;
        }
        let lock = self.resource_lock(resource);
        lock.lock_shared();
        self.record(txn_id, resource, LockMode::Shared);
        debug!("Acquired shared lock on {} for transaction {}", resource, txn_id);
    }

    pub fn acquire_exclusive(&self, txn_id: TransactionId, resource: &str) {
        if self.already_holds(txn_id, resource) {
            return;
        }
        let lock = self.resource_lock(resource);
        lock.lock_exclusive();
        self.record(txn_id, resource, LockMode::Exclusive);
        debug!(
            "Acquired exclusive lock on {} for transaction {}",
            resource, txn_id
        );
    }

    /// Releases whichever mode the transaction holds on the resource.
    /// Releasing a resource the transaction does not hold is a no-op, so
    /// the blanket `release_all` can sweep without bookkeeping errors.
    pub fn release(&self, txn_id: TransactionId, resource: &str) {
        let mode = {
            let mut held = self.held.lock().unwrap();
            let Some(resources) = held.get_mut(&txn_id) else {
                debug!("Transaction {} holds no locks to release", txn_id);
                return;
            };
            let mode = resources.remove(resource);
            if resources.is_empty() {
                held.remove(&txn_id);
            }
            mode
        };

        let Some(mode) = mode else {
            debug!("Transaction {} does not hold {}", txn_id, resource);
            return;
        };

        if let Some(lock) = self.resource_locks.lock().unwrap().get(resource) {
            lock.unlock(mode);
        }
        debug!("Released lock on {} for transaction {}", resource, txn_id);
    }

    pub fn release_all(&self, txn_id: TransactionId) {
        let resources: Vec<String> = {
            let held = self.held.lock().unwrap();
            match held.get(&txn_id) {
                Some(resources) => resources.keys().cloned().collect(),
                None => return,
            }
        };

        for resource in resources {
            self.release(txn_id, &resource);
        }
        debug!("Released all locks for transaction {}", txn_id);
    }

    /// Resources currently held by the transaction, for introspection.
    pub fn held_resources(&self, txn_id: TransactionId) -> Vec<String> {
        self.held
            .lock()
            .unwrap()
            .get(&txn_id)
            .map(|resources| resources.keys().cloned().collect())
            .unwrap_or_default()
    }

    fn already_holds(&self, txn_id: TransactionId, resource: &str) -> bool {
        self.held
            .lock()
            .unwrap()
            .get(&txn_id)
            .map(|resources| resources.contains_key(resource))
            .unwrap_or(false)
    }

    fn resource_lock(&self, resource: &str) -> Arc<ResourceLock> {
        let mut locks = self.resource_locks.lock().unwrap();
        locks
            .entry(resource.to_string())
            .or_insert_with(|| Arc::new(ResourceLock::new()))
            .clone()
    }

    fn record(&self, txn_id: TransactionId, resource: &str, mode: LockMode) {
        self.held
            .lock()
            .unwrap()
            .entry(txn_id)
            .or_default()
            .insert(resource.to_string(), mode);
    }
}
