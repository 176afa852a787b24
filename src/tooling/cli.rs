//! CLI Tooling
//!
//! Command-line interface for namespace operations. Commands map
//! one-to-one onto engine operations and print their results; exit
//! codes and error formatting live in the binary.

use crate::config::ConfigLoader;
use crate::error::NamespaceError;
use crate::guard;
use crate::logging::init_logging;
use crate::namespace::Namespace;
use crate::reconcile::reconcile;
use crate::store::{NodeKind, SledNodeStore};
use crate::tree::TreeNode;
use crate::types::NodeId;
use clap::{Parser, Subcommand, ValueEnum};
use comfy_table::Table;
use std::path::PathBuf;
use std::sync::Arc;
use uuid::Uuid;

/// Canopy CLI - hierarchical namespace over a flat document store
#[derive(Parser)]
#[command(name = "canopy")]
#[command(about = "Hierarchical file/folder namespace over a flat document store")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Database directory (overrides configuration)
    #[arg(long)]
    pub db: Option<PathBuf>,

    /// Configuration file path
    #[arg(long)]
    pub config: Option<PathBuf>,
}

/// Node kind argument
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum KindArg {
    File,
    Folder,
}

impl From<KindArg> for NodeKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::File => NodeKind::File,
            KindArg::Folder => NodeKind::Folder,
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Create a file or folder
    Create {
        /// Name of the new node
        name: String,
        /// Node kind
        #[arg(long, value_enum, default_value = "file")]
        kind: KindArg,
        /// Parent folder identifier (omit for a root node)
        #[arg(long)]
        parent: Option<String>,
    },
    /// Rename a node
    Rename {
        /// Node identifier
        id: String,
        /// New name
        new_name: String,
    },
    /// Move a node under a new parent folder
    Move {
        /// Node identifier
        id: String,
        /// New parent folder identifier
        new_parent: String,
    },
    /// Delete a node (folders are deleted recursively)
    Delete {
        /// Node identifier
        id: String,
    },
    /// Show a node's parent identifier
    Parent {
        /// Node identifier
        id: String,
    },
    /// Materialize and print the tree
    Tree {
        /// Root identifier (omit to print every root)
        #[arg(long)]
        root: Option<String>,
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// List the direct children of a folder
    Ls {
        /// Folder identifier
        folder: String,
    },
    /// Rebuild children caches from authoritative parent references
    Reconcile,
}

/// CLI execution context holding the opened namespace.
pub struct CliContext {
    namespace: Namespace,
}

impl CliContext {
    /// Open the store and build the engine from configuration.
    pub fn new(db: Option<PathBuf>, config_path: Option<PathBuf>) -> Result<Self, NamespaceError> {
        let config = ConfigLoader::load(config_path.as_deref())
            .map_err(|e| NamespaceError::Config(e.to_string()))?;
        init_logging(&config.logging)?;

        let path = match db {
            Some(path) => path,
            None => config
                .store
                .resolve_path()
                .map_err(|e| NamespaceError::Config(e.to_string()))?,
        };
        let store = SledNodeStore::open(&path).map_err(NamespaceError::Store)?;
        Ok(Self {
            namespace: Namespace::with_limits(Arc::new(store), config.limits.clone()),
        })
    }

    /// Build a context over an already-constructed engine.
    pub fn with_namespace(namespace: Namespace) -> Self {
        Self { namespace }
    }

    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    /// Execute a command and return its printable output.
    pub fn execute(&self, command: &Commands) -> Result<String, NamespaceError> {
        match command {
            Commands::Create { name, kind, parent } => {
                let parent_id = parent.as_deref().map(parse_id).transpose()?;
                let node = self.namespace.create(name, (*kind).into(), parent_id)?;
                Ok(format!("Created {} '{}' (id: {})", node.kind, node.name, node.id))
            }
            Commands::Rename { id, new_name } => {
                let node = self.namespace.rename(parse_id(id)?, new_name)?;
                Ok(format!("Renamed {} to '{}'", node.id, node.name))
            }
            Commands::Move { id, new_parent } => {
                let id = parse_id(id)?;
                let new_parent = parse_id(new_parent)?;
                self.namespace.move_node(id, new_parent)?;
                Ok(format!("Moved {} under {}", id, new_parent))
            }
            Commands::Delete { id } => {
                let id = parse_id(id)?;
                self.namespace.delete(id)?;
                Ok(format!("Deleted {}", id))
            }
            Commands::Parent { id } => {
                match self.namespace.parent_of(parse_id(id)?)? {
                    Some(parent_id) => Ok(parent_id.to_string()),
                    None => Ok("none (root node)".to_string()),
                }
            }
            Commands::Tree { root, format } => {
                let roots = match root {
                    Some(raw) => Some(vec![parse_id(raw)?]),
                    None => None,
                };
                let trees = self.namespace.materialize(roots.as_deref())?;
                if format == "json" {
                    serde_json::to_string_pretty(&trees)
                        .map_err(|e| NamespaceError::Config(format!("json encoding failed: {}", e)))
                } else {
                    let mut out = String::new();
                    for tree in &trees {
                        render_tree(tree, 0, &mut out);
                    }
                    if out.is_empty() {
                        out.push_str("(empty)\n");
                    }
                    Ok(out)
                }
            }
            Commands::Ls { folder } => {
                let folder_id = parse_id(folder)?;
                let store = self.namespace.store();
                let record = guard::require_folder(store.as_ref(), folder_id)?;

                let mut table = Table::new();
                table.set_header(vec!["Name", "Kind", "Id", "Children"]);
                for child_id in guard::dedupe(&record.children) {
                    match store.get(&child_id).map_err(NamespaceError::Store)? {
                        Some(child) => {
                            table.add_row(vec![
                                child.name.clone(),
                                child.kind.to_string(),
                                child.id.to_string(),
                                child.children.len().to_string(),
                            ]);
                        }
                        None => {
                            table.add_row(vec![
                                "<missing>".to_string(),
                                "-".to_string(),
                                child_id.to_string(),
                                "-".to_string(),
                            ]);
                        }
                    }
                }
                Ok(table.to_string())
            }
            Commands::Reconcile => {
                let store = self.namespace.store();
                let report = reconcile(store.as_ref())?;
                Ok(format!(
                    "Scanned {} records: {} folders rewritten, {} duplicate / {} dangling / {} stale refs removed, {} re-attached, {} file records cleared, {} orphans",
                    report.records_scanned,
                    report.folders_rewritten,
                    report.duplicate_refs_removed,
                    report.dangling_refs_removed,
                    report.stale_refs_removed,
                    report.refs_reattached,
                    report.files_cleared,
                    report.orphans.len(),
                ))
            }
        }
    }
}

fn parse_id(raw: &str) -> Result<NodeId, NamespaceError> {
    Uuid::parse_str(raw.trim())
        .map_err(|_| NamespaceError::Validation(format!("invalid node id: '{}'", raw)))
}

fn render_tree(node: &TreeNode, depth: usize, out: &mut String) {
    let indent = "  ".repeat(depth);
    let suffix = match node.kind {
        NodeKind::Folder => "/",
        NodeKind::File => "",
    };
    out.push_str(&format!("{}{}{}  [{}]\n", indent, node.name, suffix, node.id));
    for child in &node.children {
        render_tree(child, depth + 1, out);
    }
}
