//! Sled-backed node store.
//!
//! One sled tree, keyed by the node identifier's bytes, values encoded
//! with bincode. Backend failures surface as `StoreError::Unavailable`;
//! the engine never sees a panic from this layer.

use crate::error::StoreError;
use crate::store::{Node, NodeStore};
use crate::types::NodeId;
use std::path::Path;

/// Durable node store on top of sled.
pub struct SledNodeStore {
    db: sled::Db,
}

impl SledNodeStore {
    /// Open (or create) a store at the given path.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let db = sled::open(path)
            .map_err(|e| StoreError::Unavailable(format!("failed to open {}: {}", path.display(), e)))?;
        Ok(SledNodeStore { db })
    }

    /// Open a throwaway store backed by a temporary directory.
    pub fn temporary() -> Result<Self, StoreError> {
        let db = sled::Config::new()
            .temporary(true)
            .open()
            .map_err(|e| StoreError::Unavailable(format!("failed to open temporary store: {}", e)))?;
        Ok(SledNodeStore { db })
    }

    /// Flush pending writes to disk.
    pub fn flush(&self) -> Result<(), StoreError> {
        self.db
            .flush()
            .map(|_| ())
            .map_err(|e| StoreError::Unavailable(format!("flush failed: {}", e)))
    }

    fn decode(bytes: &[u8]) -> Result<Node, StoreError> {
        bincode::deserialize(bytes).map_err(|e| StoreError::Codec(e.to_string()))
    }

    fn encode(record: &Node) -> Result<Vec<u8>, StoreError> {
        bincode::serialize(record).map_err(|e| StoreError::Codec(e.to_string()))
    }
}

impl NodeStore for SledNodeStore {
    fn get(&self, id: &NodeId) -> Result<Option<Node>, StoreError> {
        let value = self
            .db
            .get(id.as_bytes())
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        match value {
            Some(bytes) => Ok(Some(Self::decode(&bytes)?)),
            None => Ok(None),
        }
    }

    fn put(&self, record: &Node) -> Result<(), StoreError> {
        let bytes = Self::encode(record)?;
        self.db
            .insert(record.id.as_bytes(), bytes)
            .map(|_| ())
            .map_err(|e| StoreError::Unavailable(e.to_string()))
    }

    fn delete(&self, id: &NodeId) -> Result<(), StoreError> {
        let previous = self
            .db
            .remove(id.as_bytes())
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        match previous {
            Some(_) => Ok(()),
            None => Err(StoreError::NotFound(*id)),
        }
    }

    fn ids_by_parent(&self, parent_id: Option<&NodeId>) -> Result<Vec<NodeId>, StoreError> {
        let mut matches = Vec::new();
        for entry in self.db.iter() {
            let (_, bytes) = entry.map_err(|e| StoreError::Unavailable(e.to_string()))?;
            let record = Self::decode(&bytes)?;
            if record.parent_id.as_ref() == parent_id {
                matches.push(record.id);
            }
        }
        Ok(matches)
    }

    fn scan(&self) -> Result<Vec<Node>, StoreError> {
        let mut records = Vec::new();
        for entry in self.db.iter() {
            let (_, bytes) = entry.map_err(|e| StoreError::Unavailable(e.to_string()))?;
            records.push(Self::decode(&bytes)?);
        }
        Ok(records)
    }
}
