//! Tree Materializer
//!
//! Read-side reconstruction of nested trees from the flat record set.
//! Expansion runs on an explicit frame stack with a visited set and a
//! depth bound, so it terminates even when the stored tree has been
//! corrupted into a cycle. Unresolved child references are skipped and
//! logged, never fatal; the rest of the tree still materializes.

use crate::config::Limits;
use crate::error::NamespaceError;
use crate::guard;
use crate::store::{Node, NodeKind, NodeStore};
use crate::types::NodeId;
use serde::Serialize;
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use tracing::warn;

/// A node with its children resolved into nested form.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TreeNode {
    pub id: NodeId,
    pub name: String,
    pub kind: NodeKind,
    pub children: Vec<TreeNode>,
}

impl TreeNode {
    fn from_record(record: &Node) -> Self {
        TreeNode {
            id: record.id,
            name: record.name.clone(),
            kind: record.kind,
            children: Vec::new(),
        }
    }

    /// Total number of nodes in this subtree, itself included.
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(TreeNode::node_count).sum::<usize>()
    }
}

/// Materializes nested trees from flat records.
pub struct Materializer {
    store: Arc<dyn NodeStore>,
    limits: Limits,
}

impl Materializer {
    pub fn new(store: Arc<dyn NodeStore>, limits: Limits) -> Self {
        Self { store, limits }
    }

    /// Materialize the requested roots, or every root record when none
    /// are named. Roots default to ascending identifier order so the
    /// result is stable across calls.
    pub fn materialize(&self, roots: Option<&[NodeId]>) -> Result<Vec<TreeNode>, NamespaceError> {
        let root_ids = match roots {
            Some(ids) => guard::dedupe(ids),
            None => {
                let mut ids = self.store.ids_by_parent(None)?;
                ids.sort();
                ids
            }
        };

        let mut trees = Vec::with_capacity(root_ids.len());
        for root in root_ids {
            if let Some(tree) = self.expand(root)? {
                trees.push(tree);
            }
        }
        Ok(trees)
    }

    /// Depth-first expansion of one root on an explicit frame stack.
    fn expand(&self, root: NodeId) -> Result<Option<TreeNode>, NamespaceError> {
        let record = match self.store.get(&root)? {
            Some(record) => record,
            None => {
                warn!(node_id = %root, "requested root does not resolve, skipping");
                return Ok(None);
            }
        };

        struct Frame {
            node: TreeNode,
            pending: VecDeque<NodeId>,
            depth: usize,
        }

        let mut visited: HashSet<NodeId> = HashSet::new();
        visited.insert(root);

        let mut stack = vec![Frame {
            node: TreeNode::from_record(&record),
            pending: guard::dedupe(&record.children).into(),
            depth: 0,
        }];
        let mut result = None;

        loop {
            let (next_child, depth) = match stack.last_mut() {
                Some(top) => (top.pending.pop_front(), top.depth),
                None => break,
            };
            match next_child {
                Some(child_id) => {
                    if !visited.insert(child_id) {
                        warn!(node_id = %child_id, "revisited node during materialization, children list is cyclic");
                        continue;
                    }
                    let child = match self.store.get(&child_id)? {
                        Some(child) => child,
                        None => {
                            warn!(node_id = %child_id, "child reference has no record, skipping");
                            continue;
                        }
                    };
                    if child.is_folder() && depth + 1 < self.limits.max_depth {
                        stack.push(Frame {
                            pending: guard::dedupe(&child.children).into(),
                            node: TreeNode::from_record(&child),
                            depth: depth + 1,
                        });
                    } else {
                        if child.is_folder() && !child.children.is_empty() {
                            warn!(node_id = %child_id, depth, "materialization hit depth limit, folder left unexpanded");
                        }
                        if let Some(top) = stack.last_mut() {
                            top.node.children.push(TreeNode::from_record(&child));
                        }
                    }
                }
                None => {
                    let done = stack.pop().expect("frame stack is non-empty");
                    match stack.last_mut() {
                        Some(parent) => parent.node.children.push(done.node),
                        None => result = Some(done.node),
                    }
                }
            }
        }

        Ok(result)
    }
}
