//! Mesh spanning-tree topology cache
//!
//! Holds the (node, parent, layer) relationships reported by the mesh layer
//! while the local node is the gateway. The store is bounded at a
//! compile-time capacity, guarded by a single mutex, pruned against the mesh
//! routing table by the reconciler, and rendered as a nested JSON document.

pub mod node;
pub mod reconcile;
pub mod render;
pub mod store;

pub use node::{MeshNode, NodeAddr};
pub use reconcile::Reconciled;
pub use render::{TreeNode, GATEWAY_LABEL};
pub use store::{TopologyStore, UpsertOutcome};

use thiserror::Error;

use crate::mesh::MeshError;

/// Maximum number of nodes tracked by the default store.
pub const ROUTE_TABLE_SIZE: usize = 50;

/// Store sized for a full mesh routing table.
pub type MeshTreeStore = TopologyStore<ROUTE_TABLE_SIZE>;

#[derive(Error, Debug)]
pub enum TopologyError {
    #[error("Tree lock unavailable in '{0}'")]
    LockUnavailable(&'static str),

    #[error("Invalid node: {0}")]
    InvalidNode(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Mesh error: {0}")]
    Mesh(#[from] MeshError),
}
