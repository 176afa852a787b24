//! Structural precondition checks for namespace mutations.
//!
//! Pure helpers shared by the mutation engine and the materializer:
//! parent validation, descendant detection, reference deduplication, and
//! name normalization. Every traversal here is bounded by a visited set
//! and a depth limit so it terminates even on corrupted cyclic data.

use crate::config::Limits;
use crate::error::NamespaceError;
use crate::store::{Node, NodeStore};
use crate::types::NodeId;
use std::collections::HashSet;
use tracing::warn;
use unicode_normalization::UnicodeNormalization;

/// Normalize and validate a node name.
///
/// Trims surrounding whitespace and applies Unicode NFC so two spellings
/// of the same name compare equal downstream. Empty-after-trim fails.
pub fn normalize_name(raw: &str) -> Result<String, NamespaceError> {
    let name: String = raw.trim().nfc().collect();
    if name.is_empty() {
        return Err(NamespaceError::Validation(
            "node name must not be empty".to_string(),
        ));
    }
    Ok(name)
}

/// Fetch a node and require it to be a folder.
///
/// Used before treating an identifier as a valid parent.
pub fn require_folder(store: &dyn NodeStore, id: NodeId) -> Result<Node, NamespaceError> {
    let record = store
        .get(&id)?
        .ok_or(NamespaceError::NodeNotFound(id))?;
    if !record.is_folder() {
        return Err(NamespaceError::NotAFolder(id));
    }
    Ok(record)
}

/// Report whether `candidate` appears in the subtree rooted at `root`,
/// including `root` itself.
///
/// Walks cached children lists with an explicit worklist. Child
/// references that do not resolve are skipped; revisited identifiers
/// and entries past the depth limit are dropped, so the walk terminates
/// even when the acyclicity invariant has already been violated.
pub fn is_descendant(
    store: &dyn NodeStore,
    candidate: NodeId,
    root: NodeId,
    limits: &Limits,
) -> Result<bool, NamespaceError> {
    let mut visited: HashSet<NodeId> = HashSet::new();
    let mut worklist: Vec<(NodeId, usize)> = vec![(root, 0)];

    while let Some((current, depth)) = worklist.pop() {
        if !visited.insert(current) {
            warn!(node_id = %current, "revisited node during descendant walk, children list is cyclic");
            continue;
        }
        if current == candidate {
            return Ok(true);
        }
        if depth >= limits.max_depth {
            warn!(node_id = %current, depth, "descendant walk hit depth limit, not expanding further");
            continue;
        }
        let record = match store.get(&current)? {
            Some(record) => record,
            // Dangling reference left by a prior partial failure.
            None => continue,
        };
        for child in dedupe(&record.children) {
            worklist.push((child, depth + 1));
        }
    }
    Ok(false)
}

/// Remove duplicate identifiers, preserving first-occurrence order.
///
/// Applied whenever a children list is read back, so a double-insert
/// left by prior corruption never propagates into new computations.
pub fn dedupe(ids: &[NodeId]) -> Vec<NodeId> {
    let mut seen: HashSet<NodeId> = HashSet::with_capacity(ids.len());
    ids.iter()
        .filter(|id| seen.insert(**id))
        .copied()
        .collect()
}
