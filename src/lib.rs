//! Canopy: Hierarchical Namespace over a Flat Document Store
//!
//! Maintains a tree of named file and folder nodes stored as flat,
//! independently addressable records. The store offers no referential
//! integrity, so the engine owns the discipline that keeps parent
//! references and cached children lists in agreement across create,
//! rename, move, and recursive delete.

pub mod concurrency;
pub mod config;
pub mod error;
pub mod guard;
pub mod logging;
pub mod namespace;
pub mod reconcile;
pub mod store;
pub mod tooling;
pub mod tree;
pub mod types;
