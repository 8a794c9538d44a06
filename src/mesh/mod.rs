//! Seam to the mesh protocol stack
//!
//! The radio/mesh layer owns discovery, parent selection and layer
//! assignment. It reaches the topology cache two ways: pushed
//! [`MeshEvent`]s and the [`MeshLayer`] trait, which answers "who is
//! reachable" and "are we root".

pub mod monitor;
pub mod simulated;

pub use monitor::{MonitorConfig, TreeMonitor, TreeMonitorHandle};
pub use simulated::SimMesh;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::topology::{NodeAddr, TopologyError, TopologyStore, UpsertOutcome};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MeshError {
    #[error("Routing table unavailable: {0}")]
    SnapshotUnavailable(String),
}

/// Queries answered by the mesh stack.
pub trait MeshLayer: Send + Sync {
    /// Every node the mesh currently reports as connected (the routing table).
    fn routing_table(&self) -> Result<Vec<NodeAddr>, MeshError>;

    /// Whether the local node currently holds the gateway role.
    fn is_root(&self) -> bool;
}

/// Notifications pushed by the mesh stack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MeshEvent {
    /// A node joined, or its parent or layer changed.
    NodeUpdated {
        node: NodeAddr,
        parent: NodeAddr,
        layer: u8,
    },
    /// A node was reported gone.
    NodeLeft { node: NodeAddr },
    RoleGained,
    RoleLost,
    /// The mesh is being torn down.
    Teardown,
}

/// Apply one event to the store. Returns whether the store changed.
pub fn apply_event<const N: usize>(
    store: &TopologyStore<N>,
    event: &MeshEvent,
) -> Result<bool, TopologyError> {
    match event {
        MeshEvent::NodeUpdated {
            node,
            parent,
            layer,
        } => Ok(store.upsert(*node, *parent, *layer)? == UpsertOutcome::Changed),
        MeshEvent::NodeLeft { node } => store.remove(node),
        MeshEvent::RoleGained => Ok(false),
        MeshEvent::RoleLost | MeshEvent::Teardown => Ok(store.clear()? > 0),
    }
}
