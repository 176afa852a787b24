//! Concurrent access safety for namespace mutations
//!
//! The store offers no cross-record transactions, so two mutations that
//! touch the same record can interleave their independent writes. The
//! engine serializes writers per record: every mutation write-locks the
//! records it will touch before issuing its write sequence. Reads stay
//! lock-free and rely on the tolerances built into traversal.

use crate::types::NodeId;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Per-record lock manager.
///
/// Fine-grained locking at the record level, so mutations on disjoint
/// parts of the namespace proceed concurrently while mutations sharing
/// a record (a node, or a parent whose children list both touch) are
/// serialized.
pub struct RecordLockManager {
    /// Map from NodeId to its shared read-write lock.
    locks: Arc<RwLock<HashMap<NodeId, Arc<RwLock<()>>>>>,
}

impl RecordLockManager {
    pub fn new() -> Self {
        Self {
            locks: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Get or create the lock for a record.
    pub fn get_lock(&self, id: &NodeId) -> Arc<RwLock<()>> {
        {
            let map = self.locks.read();
            if let Some(lock) = map.get(id) {
                return lock.clone();
            }
        }

        let mut map = self.locks.write();
        // Another thread may have created the entry between the two locks.
        map.entry(*id)
            .or_insert_with(|| Arc::new(RwLock::new(())))
            .clone()
    }

    /// Locks for a set of records in a canonical acquisition order.
    ///
    /// Identifiers are deduplicated and sorted so two mutations locking
    /// overlapping sets always acquire in the same order and cannot
    /// deadlock each other.
    pub fn lock_set(&self, ids: &[NodeId]) -> Vec<Arc<RwLock<()>>> {
        let mut ordered: Vec<NodeId> = ids.to_vec();
        ordered.sort();
        ordered.dedup();
        ordered.iter().map(|id| self.get_lock(id)).collect()
    }
}

impl Default for RecordLockManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::thread;
    use uuid::Uuid;

    #[test]
    fn test_write_excludes_other_writes() {
        let manager = Arc::new(RecordLockManager::new());
        let id = Uuid::new_v4();
        let counter = Arc::new(AtomicUsize::new(0));

        let mut handles = vec![];
        for _ in 0..5 {
            let manager = manager.clone();
            let counter = counter.clone();
            let handle = thread::spawn(move || {
                let lock = manager.get_lock(&id);
                let _guard = lock.write();
                let current = counter.load(Ordering::SeqCst);
                thread::yield_now(); // Give other threads a chance
                counter.store(current + 1, Ordering::SeqCst);
            });
            handles.push(handle);
        }

        for handle in handles {
            handle.join().unwrap();
        }

        // No lost updates under the write lock
        assert_eq!(counter.load(Ordering::SeqCst), 5);
    }

    #[test]
    fn test_different_records_dont_block() {
        let manager = Arc::new(RecordLockManager::new());
        let id1 = Uuid::new_v4();
        let id2 = Uuid::new_v4();
        let counter = Arc::new(AtomicUsize::new(0));

        let mut handles = vec![];
        for i in 0..6 {
            let manager = manager.clone();
            let counter = counter.clone();
            let id = if i % 2 == 0 { id1 } else { id2 };
            let handle = thread::spawn(move || {
                let lock = manager.get_lock(&id);
                let _guard = lock.write();
                counter.fetch_add(1, Ordering::SeqCst);
            });
            handles.push(handle);
        }

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(counter.load(Ordering::SeqCst), 6);
    }

    #[test]
    fn test_lock_set_is_ordered_and_deduplicated() {
        let manager = RecordLockManager::new();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        let locks = manager.lock_set(&[b, a, b, a]);
        assert_eq!(locks.len(), 2);

        // Same set in any order resolves to the same locks.
        let again = manager.lock_set(&[a, b]);
        assert!(Arc::ptr_eq(&locks[0], &again[0]));
        assert!(Arc::ptr_eq(&locks[1], &again[1]));
    }

    #[test]
    fn test_overlapping_lock_sets_do_not_deadlock() {
        let manager = Arc::new(RecordLockManager::new());
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        let mut handles = vec![];
        for i in 0..8 {
            let manager = manager.clone();
            // Half the threads request (a, b), half (b, a).
            let ids = if i % 2 == 0 { [a, b] } else { [b, a] };
            let handle = thread::spawn(move || {
                let locks = manager.lock_set(&ids);
                let _guards: Vec<_> = locks.iter().map(|l| l.write()).collect();
                thread::yield_now();
            });
            handles.push(handle);
        }

        for handle in handles {
            handle.join().unwrap();
        }
    }
}
