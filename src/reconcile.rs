//! Reconciliation
//!
//! Out-of-band repair pass for partial-failure drift. `parent_id` is
//! the single source of truth; every folder's `children` cache is
//! rebuilt from it. Dangling, duplicate, and stale references are
//! dropped, unlisted members are re-attached, and file records that
//! somehow grew children are cleared. Orphans (a `parent_id` that no
//! longer resolves to a folder) are reported, not deleted.

use crate::error::NamespaceError;
use crate::store::{Node, NodeStore};
use crate::types::NodeId;
use std::collections::{HashMap, HashSet};
use tracing::{info, warn};

/// Summary of a reconciliation sweep.
#[derive(Debug, Clone, Default)]
pub struct ReconcileReport {
    /// Records examined.
    pub records_scanned: usize,
    /// Folder records rewritten with a repaired children list.
    pub folders_rewritten: usize,
    /// References removed because they repeated an earlier entry.
    pub duplicate_refs_removed: usize,
    /// References removed because the child record no longer exists.
    pub dangling_refs_removed: usize,
    /// References removed because the child's `parent_id` names a
    /// different parent.
    pub stale_refs_removed: usize,
    /// Children re-attached because their `parent_id` claims this
    /// folder but the cached list did not include them.
    pub refs_reattached: usize,
    /// File records whose children list was cleared.
    pub files_cleared: usize,
    /// Nodes whose `parent_id` does not resolve to an existing folder.
    pub orphans: Vec<NodeId>,
}

impl ReconcileReport {
    /// True when the sweep found nothing to repair.
    pub fn is_clean(&self) -> bool {
        self.folders_rewritten == 0 && self.files_cleared == 0 && self.orphans.is_empty()
    }
}

/// Rebuild every folder's children cache from authoritative parent
/// references. Writes only records that actually changed.
pub fn reconcile(store: &dyn NodeStore) -> Result<ReconcileReport, NamespaceError> {
    let records = store.scan()?;
    let by_id: HashMap<NodeId, Node> = records.iter().map(|n| (n.id, n.clone())).collect();

    let mut report = ReconcileReport {
        records_scanned: records.len(),
        ..Default::default()
    };

    // Membership derived from parent references.
    let mut claimed: HashMap<NodeId, HashSet<NodeId>> = HashMap::new();
    for node in &records {
        if let Some(pid) = node.parent_id {
            match by_id.get(&pid) {
                Some(parent) if parent.is_folder() => {
                    claimed.entry(pid).or_default().insert(node.id);
                }
                _ => {
                    warn!(node_id = %node.id, parent_id = %pid, "orphaned node, parent reference does not resolve to a folder");
                    report.orphans.push(node.id);
                }
            }
        }
    }
    report.orphans.sort();

    for node in &records {
        if !node.is_folder() {
            if !node.children.is_empty() {
                let mut cleared = node.clone();
                cleared.children.clear();
                store.put(&cleared)?;
                report.files_cleared += 1;
                warn!(node_id = %node.id, "cleared children list found on a file record");
            }
            continue;
        }

        let mut rebuilt: Vec<NodeId> = Vec::with_capacity(node.children.len());
        let mut listed: HashSet<NodeId> = HashSet::with_capacity(node.children.len());
        let mut kept: HashSet<NodeId> = HashSet::with_capacity(node.children.len());
        for child in &node.children {
            if !listed.insert(*child) {
                report.duplicate_refs_removed += 1;
                continue;
            }
            match by_id.get(child) {
                None => report.dangling_refs_removed += 1,
                Some(record) if record.parent_id != Some(node.id) => {
                    report.stale_refs_removed += 1;
                }
                Some(_) => {
                    rebuilt.push(*child);
                    kept.insert(*child);
                }
            }
        }

        if let Some(members) = claimed.get(&node.id) {
            let mut missing: Vec<NodeId> = members
                .iter()
                .filter(|member| !kept.contains(member))
                .copied()
                .collect();
            missing.sort();
            report.refs_reattached += missing.len();
            rebuilt.extend(missing);
        }

        if rebuilt != node.children {
            let mut repaired = node.clone();
            repaired.children = rebuilt;
            store.put(&repaired)?;
            report.folders_rewritten += 1;
        }
    }

    info!(
        records = report.records_scanned,
        folders_rewritten = report.folders_rewritten,
        orphans = report.orphans.len(),
        "reconciliation sweep complete"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::namespace::Namespace;
    use crate::store::{MemoryNodeStore, NodeKind};
    use std::sync::Arc;
    use uuid::Uuid;

    fn setup() -> (Namespace, Arc<MemoryNodeStore>) {
        let store = Arc::new(MemoryNodeStore::new());
        (Namespace::new(store.clone()), store)
    }

    #[test]
    fn test_healthy_tree_is_untouched() {
        let (ns, store) = setup();
        let root = ns.create("root", NodeKind::Folder, None).unwrap();
        ns.create("a", NodeKind::File, Some(root.id)).unwrap();
        let sub = ns.create("sub", NodeKind::Folder, Some(root.id)).unwrap();
        ns.create("b", NodeKind::File, Some(sub.id)).unwrap();

        let report = reconcile(store.as_ref()).unwrap();
        assert!(report.is_clean());
        assert_eq!(report.records_scanned, 4);
    }

    #[test]
    fn test_removes_dangling_and_duplicate_refs() {
        let (ns, store) = setup();
        let folder = ns.create("docs", NodeKind::Folder, None).unwrap();
        let child = ns.create("f", NodeKind::File, Some(folder.id)).unwrap();

        let mut corrupted = store.get(&folder.id).unwrap().unwrap();
        corrupted.children.push(child.id);
        corrupted.children.push(Uuid::new_v4());
        store.put(&corrupted).unwrap();

        let report = reconcile(store.as_ref()).unwrap();
        assert_eq!(report.duplicate_refs_removed, 1);
        assert_eq!(report.dangling_refs_removed, 1);
        assert_eq!(report.folders_rewritten, 1);
        assert_eq!(
            store.get(&folder.id).unwrap().unwrap().children,
            vec![child.id]
        );
    }

    #[test]
    fn test_reattaches_unlisted_member() {
        let (ns, store) = setup();
        let folder = ns.create("docs", NodeKind::Folder, None).unwrap();
        let child = ns.create("f", NodeKind::File, Some(folder.id)).unwrap();

        // Crash between the node write and the parent write on create
        // leaves the child unlisted.
        let mut parent = store.get(&folder.id).unwrap().unwrap();
        parent.children.clear();
        store.put(&parent).unwrap();

        let report = reconcile(store.as_ref()).unwrap();
        assert_eq!(report.refs_reattached, 1);
        assert_eq!(
            store.get(&folder.id).unwrap().unwrap().children,
            vec![child.id]
        );
    }

    #[test]
    fn test_removes_stale_ref_after_interrupted_move() {
        let (ns, store) = setup();
        let a = ns.create("a", NodeKind::Folder, None).unwrap();
        let b = ns.create("b", NodeKind::Folder, None).unwrap();
        let file = ns.create("f", NodeKind::File, Some(a.id)).unwrap();

        // Simulate a move that crashed before detaching from the old
        // parent: the node and new parent are updated, a still lists it.
        let mut moved = store.get(&file.id).unwrap().unwrap();
        moved.parent_id = Some(b.id);
        store.put(&moved).unwrap();
        let mut new_parent = store.get(&b.id).unwrap().unwrap();
        new_parent.children.push(file.id);
        store.put(&new_parent).unwrap();

        let report = reconcile(store.as_ref()).unwrap();
        assert_eq!(report.stale_refs_removed, 1);
        assert!(store.get(&a.id).unwrap().unwrap().children.is_empty());
        assert_eq!(
            store.get(&b.id).unwrap().unwrap().children,
            vec![file.id]
        );
    }

    #[test]
    fn test_clears_children_on_file_record() {
        let (ns, store) = setup();
        let file = ns.create("f", NodeKind::File, None).unwrap();
        let mut corrupted = store.get(&file.id).unwrap().unwrap();
        corrupted.children.push(Uuid::new_v4());
        store.put(&corrupted).unwrap();

        let report = reconcile(store.as_ref()).unwrap();
        assert_eq!(report.files_cleared, 1);
        assert!(store.get(&file.id).unwrap().unwrap().children.is_empty());
    }

    #[test]
    fn test_reports_orphans_without_deleting() {
        let (ns, store) = setup();
        let ghost_parent = Uuid::new_v4();
        let orphan = crate::store::Node::new("lost", NodeKind::File, Some(ghost_parent));
        store.put(&orphan).unwrap();
        ns.create("healthy", NodeKind::File, None).unwrap();

        let report = reconcile(store.as_ref()).unwrap();
        assert_eq!(report.orphans, vec![orphan.id]);
        assert!(store.get(&orphan.id).unwrap().is_some());
    }
}
