//! Node Record Store
//!
//! Flat key-value access to individual node records. The store holds no
//! tree logic and never cascades; keeping parent references and children
//! lists in agreement is the mutation engine's job.

pub mod memory;
pub mod persistence;

use crate::error::StoreError;
use crate::types::NodeId;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Node kind enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    File,
    Folder,
}

impl NodeKind {
    pub fn is_folder(&self) -> bool {
        matches!(self, NodeKind::Folder)
    }
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NodeKind::File => write!(f, "file"),
            NodeKind::Folder => write!(f, "folder"),
        }
    }
}

/// Node: A single file or folder record.
///
/// `parent_id` is the authoritative placement of the node; `children` is
/// a cached list maintained by the mutation engine and rebuildable from
/// parent references by reconciliation. A file's `children` stays empty.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub name: String,
    pub kind: NodeKind,
    pub parent_id: Option<NodeId>,
    pub children: Vec<NodeId>,
}

impl Node {
    /// Allocate a new record with a fresh identifier and no children.
    pub fn new(name: impl Into<String>, kind: NodeKind, parent_id: Option<NodeId>) -> Self {
        Node {
            id: Uuid::new_v4(),
            name: name.into(),
            kind,
            parent_id,
            children: Vec::new(),
        }
    }

    pub fn is_folder(&self) -> bool {
        self.kind.is_folder()
    }
}

/// Node record store interface
///
/// `get` distinguishes "absent" (`Ok(None)`) from backend failure;
/// `delete` fails with `NotFound` when the identifier is absent.
pub trait NodeStore: Send + Sync {
    fn get(&self, id: &NodeId) -> Result<Option<Node>, StoreError>;
    fn put(&self, record: &Node) -> Result<(), StoreError>;
    fn delete(&self, id: &NodeId) -> Result<(), StoreError>;

    /// Child references cached on a folder record. Reads the record's
    /// own `children` field; returns `NotFound` if the folder is absent.
    fn children_refs(&self, folder_id: &NodeId) -> Result<Vec<NodeId>, StoreError> {
        match self.get(folder_id)? {
            Some(record) => Ok(record.children),
            None => Err(StoreError::NotFound(*folder_id)),
        }
    }

    /// Index lookup by parent reference. `None` selects root records.
    fn ids_by_parent(&self, parent_id: Option<&NodeId>) -> Result<Vec<NodeId>, StoreError>;

    /// Full record scan. Used by reconciliation, never by mutations.
    fn scan(&self) -> Result<Vec<Node>, StoreError>;
}

pub use memory::MemoryNodeStore;
pub use persistence::SledNodeStore;
