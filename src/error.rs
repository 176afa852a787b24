//! Error types for the Canopy namespace engine.
//!
//! Split into two layers: `StoreError` for the record store seam and
//! `NamespaceError` for everything surfaced to callers of the engine.

use crate::types::NodeId;
use thiserror::Error;

/// Errors produced by a record store backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The identifier does not resolve to a record.
    #[error("record not found: {0}")]
    NotFound(NodeId),

    /// The backend failed the request; not attributable to the input.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A record could not be encoded or decoded.
    #[error("record codec failure: {0}")]
    Codec(String),
}

/// Errors surfaced by the mutation engine and the tree materializer.
#[derive(Debug, Error)]
pub enum NamespaceError {
    /// A referenced node does not exist.
    #[error("node not found: {0}")]
    NodeNotFound(NodeId),

    /// An identifier expected to name a folder resolves to a file.
    #[error("node {0} is not a folder")]
    NotAFolder(NodeId),

    /// An input failed validation (empty name, malformed identifier).
    #[error("validation failed: {0}")]
    Validation(String),

    /// The requested move would make a node its own ancestor.
    #[error("moving {node} under {target} would create a cycle")]
    CycleDetected { node: NodeId, target: NodeId },

    /// The store failed before any record was written.
    #[error("store request failed: {0}")]
    Store(#[source] StoreError),

    /// A later write of a multi-record operation failed, leaving the
    /// namespace in one of the recoverable intermediate shapes. The
    /// failed step is named so a reconciliation pass knows which
    /// invariant may be violated.
    #[error("{op}: step '{step}' failed, namespace partially updated: {source}")]
    PartialWrite {
        op: &'static str,
        step: &'static str,
        #[source]
        source: StoreError,
    },

    /// Configuration or logging setup failure.
    #[error("configuration error: {0}")]
    Config(String),
}

impl From<StoreError> for NamespaceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => NamespaceError::NodeNotFound(id),
            other => NamespaceError::Store(other),
        }
    }
}

impl NamespaceError {
    /// Wrap a store failure that occurred after the first write of a
    /// multi-record operation.
    pub fn partial(op: &'static str, step: &'static str, source: StoreError) -> Self {
        NamespaceError::PartialWrite { op, step, source }
    }
}
