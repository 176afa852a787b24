//! Core types for the Canopy namespace engine.

use uuid::Uuid;

/// NodeId: Opaque identifier of a namespace node, assigned at creation.
pub type NodeId = Uuid;
