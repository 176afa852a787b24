//! Mutation Engine
//!
//! Implements create, rename, move, and recursive delete as guarded
//! compositions of single-record store writes. The store has no
//! multi-record transactions, so every operation follows a fixed write
//! order that keeps partial failures recoverable: the moving/created
//! node is written before any parent's children list, and deletions run
//! descendants-first with parent detachment last. `parent_id` is the
//! authoritative placement; children lists are a cache reconciliation
//! can rebuild.

use crate::concurrency::RecordLockManager;
use crate::config::Limits;
use crate::error::{NamespaceError, StoreError};
use crate::guard;
use crate::store::{Node, NodeKind, NodeStore};
use crate::tree::{Materializer, TreeNode};
use crate::types::NodeId;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// How many times a mutation re-takes its lock set when the records it
/// probed moved underneath it before the locks were held.
const LOCK_RETRY_LIMIT: usize = 3;

/// The namespace mutation engine.
///
/// Writers are serialized per record through the lock manager; reads
/// (materialization, parent lookup) are lock-free and tolerate the
/// intermediate shapes a concurrent writer can expose.
pub struct Namespace {
    store: Arc<dyn NodeStore>,
    locks: RecordLockManager,
    limits: Limits,
}

impl Namespace {
    pub fn new(store: Arc<dyn NodeStore>) -> Self {
        Self::with_limits(store, Limits::default())
    }

    pub fn with_limits(store: Arc<dyn NodeStore>, limits: Limits) -> Self {
        Self {
            store,
            locks: RecordLockManager::new(),
            limits,
        }
    }

    pub fn store(&self) -> Arc<dyn NodeStore> {
        self.store.clone()
    }

    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    /// Create a file or folder, optionally under a parent folder.
    ///
    /// Writes the node first and the parent's children list second, so
    /// a crash between the two leaves an orphaned node rather than a
    /// parent referencing a record that does not exist.
    pub fn create(
        &self,
        name: &str,
        kind: NodeKind,
        parent_id: Option<NodeId>,
    ) -> Result<Node, NamespaceError> {
        let name = guard::normalize_name(name)?;

        let lock_ids: Vec<NodeId> = parent_id.into_iter().collect();
        let locks = self.locks.lock_set(&lock_ids);
        let _guards: Vec<_> = locks.iter().map(|l| l.write()).collect();

        let parent = match parent_id {
            Some(pid) => Some(guard::require_folder(self.store.as_ref(), pid)?),
            None => None,
        };

        let node = Node::new(name, kind, parent_id);
        self.store.put(&node)?;
        debug!(node_id = %node.id, "wrote new node record");

        if let Some(mut parent) = parent {
            let mut children = guard::dedupe(&parent.children);
            if !children.contains(&node.id) {
                children.push(node.id);
            }
            parent.children = children;
            self.store
                .put(&parent)
                .map_err(|e| NamespaceError::partial("create", "attach to parent", e))?;
            debug!(node_id = %node.id, parent_id = %parent.id, "attached node to parent");
        }

        info!(node_id = %node.id, kind = %node.kind, name = %node.name, "created node");
        Ok(node)
    }

    /// Rename a node. Structural fields are untouched; single-record write.
    pub fn rename(&self, id: NodeId, new_name: &str) -> Result<Node, NamespaceError> {
        let name = guard::normalize_name(new_name)?;

        let locks = self.locks.lock_set(&[id]);
        let _guards: Vec<_> = locks.iter().map(|l| l.write()).collect();

        let mut node = self
            .store
            .get(&id)?
            .ok_or(NamespaceError::NodeNotFound(id))?;
        node.name = name;
        self.store.put(&node)?;

        info!(node_id = %id, name = %node.name, "renamed node");
        Ok(node)
    }

    /// Move a node under a new parent folder.
    ///
    /// Rejects a target inside the node's own subtree. Write order:
    /// the node's `parent_id` first (authoritative), then the new
    /// parent's children, then the old parent's children, so a crash
    /// mid-sequence is repairable by a reconciliation scan.
    pub fn move_node(&self, id: NodeId, new_parent_id: NodeId) -> Result<(), NamespaceError> {
        let mut attempts = 0;
        loop {
            let probe = self
                .store
                .get(&id)?
                .ok_or(NamespaceError::NodeNotFound(id))?;

            let mut lock_ids = vec![id, new_parent_id];
            lock_ids.extend(probe.parent_id);
            let locks = self.locks.lock_set(&lock_ids);
            let _guards: Vec<_> = locks.iter().map(|l| l.write()).collect();

            // The lock set was derived from the probed placement; if a
            // concurrent move changed it before our locks were held,
            // take the locks again against the new placement.
            let node = self
                .store
                .get(&id)?
                .ok_or(NamespaceError::NodeNotFound(id))?;
            if node.parent_id != probe.parent_id && attempts < LOCK_RETRY_LIMIT {
                attempts += 1;
                continue;
            }
            return self.move_locked(node, new_parent_id);
        }
    }

    fn move_locked(&self, mut node: Node, new_parent_id: NodeId) -> Result<(), NamespaceError> {
        let id = node.id;
        let mut new_parent = guard::require_folder(self.store.as_ref(), new_parent_id)?;

        if new_parent_id == id
            || guard::is_descendant(self.store.as_ref(), new_parent_id, id, &self.limits)?
        {
            return Err(NamespaceError::CycleDetected {
                node: id,
                target: new_parent_id,
            });
        }

        let old_parent_id = node.parent_id;
        if old_parent_id == Some(new_parent_id) {
            debug!(node_id = %id, parent_id = %new_parent_id, "move into current parent is a no-op");
            return Ok(());
        }

        node.parent_id = Some(new_parent_id);
        self.store.put(&node)?;
        debug!(node_id = %id, new_parent = %new_parent_id, "rewrote node parent reference");

        let mut children = guard::dedupe(&new_parent.children);
        if !children.contains(&id) {
            children.push(id);
        }
        new_parent.children = children;
        self.store
            .put(&new_parent)
            .map_err(|e| NamespaceError::partial("move", "attach to new parent", e))?;
        debug!(node_id = %id, new_parent = %new_parent_id, "attached node to new parent");

        if let Some(old_id) = old_parent_id {
            match self.store.get(&old_id) {
                Ok(Some(mut old_parent)) => {
                    let pruned: Vec<NodeId> = guard::dedupe(&old_parent.children)
                        .into_iter()
                        .filter(|child| *child != id)
                        .collect();
                    if pruned.len() != old_parent.children.len() {
                        old_parent.children = pruned;
                        self.store.put(&old_parent).map_err(|e| {
                            NamespaceError::partial("move", "detach from old parent", e)
                        })?;
                    }
                    debug!(node_id = %id, old_parent = %old_id, "detached node from old parent");
                }
                Ok(None) => {
                    warn!(node_id = %id, old_parent = %old_id, "old parent missing during move, skipping detach");
                }
                Err(e) => {
                    return Err(NamespaceError::partial("move", "detach from old parent", e));
                }
            }
        }

        info!(node_id = %id, new_parent = %new_parent_id, "moved node");
        Ok(())
    }

    /// Delete a node; folders are deleted with their entire subtree.
    ///
    /// Descendants are removed before their ancestors and the parent's
    /// children list is updated last, so a crash mid-sequence leaves at
    /// most a dangling child reference, which every read path already
    /// skips. Child references whose record is already missing are
    /// skipped rather than failing the operation.
    pub fn delete(&self, id: NodeId) -> Result<(), NamespaceError> {
        let mut attempts = 0;
        loop {
            let probe = self
                .store
                .get(&id)?
                .ok_or(NamespaceError::NodeNotFound(id))?;

            let mut lock_ids = vec![id];
            lock_ids.extend(probe.parent_id);
            let locks = self.locks.lock_set(&lock_ids);
            let _guards: Vec<_> = locks.iter().map(|l| l.write()).collect();

            let target = self
                .store
                .get(&id)?
                .ok_or(NamespaceError::NodeNotFound(id))?;
            if target.parent_id != probe.parent_id && attempts < LOCK_RETRY_LIMIT {
                attempts += 1;
                continue;
            }
            return self.delete_locked(target);
        }
    }

    fn delete_locked(&self, target: Node) -> Result<(), NamespaceError> {
        let id = target.id;
        let parent_id = target.parent_id;

        // Expand the subtree breadth-unbounded but depth- and
        // cycle-guarded; the collected pre-order is deleted in reverse
        // so every record is gone before its ancestor.
        let mut order: Vec<NodeId> = Vec::new();
        let mut visited: HashSet<NodeId> = HashSet::new();
        let mut worklist: Vec<(NodeId, usize)> = vec![(id, 0)];
        while let Some((current, depth)) = worklist.pop() {
            if !visited.insert(current) {
                warn!(node_id = %current, "revisited node during delete walk, children list is cyclic");
                continue;
            }
            let record = match self.store.get(&current)? {
                Some(record) => record,
                None => {
                    warn!(node_id = %current, "child reference has no record, skipping");
                    continue;
                }
            };
            order.push(current);
            if depth >= self.limits.max_depth {
                warn!(node_id = %current, depth, "delete walk hit depth limit, not expanding further");
                continue;
            }
            if record.is_folder() {
                for child in guard::dedupe(&record.children) {
                    worklist.push((child, depth + 1));
                }
            }
        }

        let mut removed = 0usize;
        for node_id in order.iter().rev() {
            match self.store.delete(node_id) {
                Ok(()) => {
                    removed += 1;
                    debug!(node_id = %node_id, "removed record");
                }
                Err(StoreError::NotFound(_)) => {
                    warn!(node_id = %node_id, "record already missing during recursive delete");
                }
                Err(e) if removed == 0 => return Err(NamespaceError::Store(e)),
                Err(e) => {
                    return Err(NamespaceError::partial("delete", "remove subtree records", e))
                }
            }
        }

        if let Some(pid) = parent_id {
            match self.store.get(&pid) {
                Ok(Some(mut parent)) => {
                    let pruned: Vec<NodeId> = guard::dedupe(&parent.children)
                        .into_iter()
                        .filter(|child| *child != id)
                        .collect();
                    if pruned.len() != parent.children.len() {
                        parent.children = pruned;
                        self.store.put(&parent).map_err(|e| {
                            NamespaceError::partial("delete", "detach from parent", e)
                        })?;
                    }
                    debug!(node_id = %id, parent_id = %pid, "detached deleted node from parent");
                }
                Ok(None) => {
                    warn!(node_id = %id, parent_id = %pid, "parent missing during delete, skipping detach");
                }
                Err(e) => {
                    return Err(NamespaceError::partial("delete", "detach from parent", e));
                }
            }
        }

        info!(node_id = %id, removed, "deleted node");
        Ok(())
    }

    /// Parent lookup. `None` means the node is a root.
    pub fn parent_of(&self, id: NodeId) -> Result<Option<NodeId>, NamespaceError> {
        let node = self
            .store
            .get(&id)?
            .ok_or(NamespaceError::NodeNotFound(id))?;
        Ok(node.parent_id)
    }

    /// Materialize nested trees for the given roots, or for every root
    /// record when none are named.
    pub fn materialize(&self, roots: Option<&[NodeId]>) -> Result<Vec<TreeNode>, NamespaceError> {
        Materializer::new(self.store.clone(), self.limits.clone()).materialize(roots)
    }
}
