//! In-memory node store.
//!
//! Reference backend for unit tests and the invariant suite. Mirrors the
//! contract of the sled backend without touching disk.

use crate::error::StoreError;
use crate::store::{Node, NodeStore};
use crate::types::NodeId;
use parking_lot::RwLock;
use std::collections::HashMap;

/// HashMap-backed store guarded by a read-write lock.
#[derive(Default)]
pub struct MemoryNodeStore {
    records: RwLock<HashMap<NodeId, Node>>,
}

impl MemoryNodeStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of records currently held.
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }
}

impl NodeStore for MemoryNodeStore {
    fn get(&self, id: &NodeId) -> Result<Option<Node>, StoreError> {
        Ok(self.records.read().get(id).cloned())
    }

    fn put(&self, record: &Node) -> Result<(), StoreError> {
        self.records.write().insert(record.id, record.clone());
        Ok(())
    }

    fn delete(&self, id: &NodeId) -> Result<(), StoreError> {
        match self.records.write().remove(id) {
            Some(_) => Ok(()),
            None => Err(StoreError::NotFound(*id)),
        }
    }

    fn ids_by_parent(&self, parent_id: Option<&NodeId>) -> Result<Vec<NodeId>, StoreError> {
        let records = self.records.read();
        Ok(records
            .values()
            .filter(|record| record.parent_id.as_ref() == parent_id)
            .map(|record| record.id)
            .collect())
    }

    fn scan(&self) -> Result<Vec<Node>, StoreError> {
        Ok(self.records.read().values().cloned().collect())
    }
}
