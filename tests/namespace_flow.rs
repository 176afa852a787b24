//! End-to-end flows against the durable backend and the CLI surface.

use canopy::error::NamespaceError;
use canopy::namespace::Namespace;
use canopy::store::{NodeKind, NodeStore, SledNodeStore};
use canopy::tooling::cli::{Cli, CliContext, Commands, KindArg};
use clap::Parser;
use std::sync::Arc;
use tempfile::TempDir;

fn sled_namespace() -> (Namespace, TempDir) {
    let dir = TempDir::new().unwrap();
    let store = SledNodeStore::open(&dir.path().join("nodes")).unwrap();
    (Namespace::new(Arc::new(store)), dir)
}

#[test]
fn full_lifecycle_over_durable_store() {
    let (ns, _dir) = sled_namespace();

    // Create root folder A; file B and folder C under A; move B into C.
    let a = ns.create("A", NodeKind::Folder, None).unwrap();
    let b = ns.create("B", NodeKind::File, Some(a.id)).unwrap();
    let c = ns.create("C", NodeKind::Folder, Some(a.id)).unwrap();
    ns.move_node(b.id, c.id).unwrap();

    let trees = ns.materialize(None).unwrap();
    assert_eq!(trees.len(), 1);
    assert_eq!(trees[0].id, a.id);
    assert_eq!(trees[0].children.len(), 1);
    assert_eq!(trees[0].children[0].id, c.id);
    assert_eq!(trees[0].children[0].children.len(), 1);
    assert_eq!(trees[0].children[0].children[0].id, b.id);

    // Deleting A removes A, B, and C; the former root set omits A.
    ns.delete(a.id).unwrap();
    for id in [a.id, b.id, c.id] {
        assert!(ns.store().get(&id).unwrap().is_none());
    }
    assert!(ns.materialize(None).unwrap().is_empty());
}

#[test]
fn move_into_descendant_leaves_records_unchanged() {
    let (ns, _dir) = sled_namespace();

    let a = ns.create("A", NodeKind::Folder, None).unwrap();
    let c = ns.create("C", NodeKind::Folder, Some(a.id)).unwrap();

    let a_before = ns.store().get(&a.id).unwrap().unwrap();
    let c_before = ns.store().get(&c.id).unwrap().unwrap();

    assert!(matches!(
        ns.move_node(a.id, c.id),
        Err(NamespaceError::CycleDetected { .. })
    ));

    let a_after = ns.store().get(&a.id).unwrap().unwrap();
    let c_after = ns.store().get(&c.id).unwrap().unwrap();
    assert_eq!(a_after.parent_id, a_before.parent_id);
    assert_eq!(a_after.children, a_before.children);
    assert_eq!(c_after.parent_id, c_before.parent_id);
    assert_eq!(c_after.children, c_before.children);
}

#[test]
fn tree_survives_store_reopen() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nodes");

    let (root_id, file_id) = {
        let store = SledNodeStore::open(&path).unwrap();
        let ns = Namespace::new(Arc::new(store));
        let root = ns.create("root", NodeKind::Folder, None).unwrap();
        let file = ns.create("kept.txt", NodeKind::File, Some(root.id)).unwrap();
        (root.id, file.id)
    };

    let store = SledNodeStore::open(&path).unwrap();
    let ns = Namespace::new(Arc::new(store));
    let trees = ns.materialize(None).unwrap();
    assert_eq!(trees.len(), 1);
    assert_eq!(trees[0].id, root_id);
    assert_eq!(trees[0].children[0].id, file_id);
    assert_eq!(ns.parent_of(file_id).unwrap(), Some(root_id));
}

#[test]
fn cli_executes_full_flow_over_durable_store() {
    let dir = TempDir::new().unwrap();
    let cli = CliContext::new(Some(dir.path().join("nodes")), None).unwrap();

    let out = cli
        .execute(&Commands::Create {
            name: "projects".to_string(),
            kind: KindArg::Folder,
            parent: None,
        })
        .unwrap();
    let folder_id = out
        .rsplit_once("(id: ")
        .map(|(_, tail)| tail.trim_end_matches(')').to_string())
        .unwrap();

    cli.execute(&Commands::Create {
        name: "plan.md".to_string(),
        kind: KindArg::File,
        parent: Some(folder_id.clone()),
    })
    .unwrap();

    let tree = cli
        .execute(&Commands::Tree {
            root: Some(folder_id.clone()),
            format: "text".to_string(),
        })
        .unwrap();
    assert!(tree.contains("projects/"));
    assert!(tree.contains("plan.md"));

    let report = cli.execute(&Commands::Reconcile).unwrap();
    assert!(report.contains("0 orphans"));

    cli.execute(&Commands::Delete { id: folder_id }).unwrap();
    let tree = cli
        .execute(&Commands::Tree {
            root: None,
            format: "text".to_string(),
        })
        .unwrap();
    assert_eq!(tree, "(empty)\n");
}

#[test]
fn cli_argument_parsing_covers_all_commands() {
    let cases = [
        vec!["canopy", "create", "docs", "--kind", "folder"],
        vec!["canopy", "rename", "0d9c4391-3a47-4d31-bd3b-1f8eacc02a10", "new-name"],
        vec![
            "canopy",
            "move",
            "0d9c4391-3a47-4d31-bd3b-1f8eacc02a10",
            "7a2ab04e-9df1-4a73-9a6e-bd2a9f7f4a01",
        ],
        vec!["canopy", "delete", "0d9c4391-3a47-4d31-bd3b-1f8eacc02a10"],
        vec!["canopy", "parent", "0d9c4391-3a47-4d31-bd3b-1f8eacc02a10"],
        vec!["canopy", "tree", "--format", "json"],
        vec!["canopy", "ls", "0d9c4391-3a47-4d31-bd3b-1f8eacc02a10"],
        vec!["canopy", "reconcile"],
    ];
    for case in cases {
        Cli::try_parse_from(case).unwrap();
    }
}
