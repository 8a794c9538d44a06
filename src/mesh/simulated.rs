//! In-process mesh stand-in
//!
//! Lets tests and the replay tool script the routing table and root role
//! without a radio.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::topology::NodeAddr;

use super::{MeshError, MeshLayer};

struct SimState {
    reachable: Vec<NodeAddr>,
    root: bool,
    fail_next: bool,
}

/// Scripted [`MeshLayer`].
pub struct SimMesh {
    state: Mutex<SimState>,
}

impl SimMesh {
    /// A mesh where only the local node is reachable.
    pub fn new(local_id: NodeAddr, root: bool) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(SimState {
                reachable: vec![local_id],
                root,
                fail_next: false,
            }),
        })
    }

    fn state(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Replace the routing table.
    pub fn set_reachable(&self, reachable: Vec<NodeAddr>) {
        self.state().reachable = reachable;
    }

    pub fn set_root(&self, root: bool) {
        self.state().root = root;
    }

    /// Make the next `routing_table` call fail.
    pub fn fail_next_snapshot(&self) {
        self.state().fail_next = true;
    }
}

impl MeshLayer for SimMesh {
    fn routing_table(&self) -> Result<Vec<NodeAddr>, MeshError> {
        let mut state = self.state();
        if state.fail_next {
            state.fail_next = false;
            return Err(MeshError::SnapshotUnavailable(
                "simulated routing table failure".into(),
            ));
        }
        Ok(state.reachable.clone())
    }

    fn is_root(&self) -> bool {
        self.state().root
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const LOCAL: NodeAddr = NodeAddr::new([0x24, 0x6f, 0x28, 0xaa, 0x00, 0x01]);

    #[test]
    fn test_defaults_to_local_only() {
        let mesh = SimMesh::new(LOCAL, true);
        assert_eq!(mesh.routing_table().unwrap(), vec![LOCAL]);
        assert!(mesh.is_root());
    }

    #[test]
    fn test_failure_is_one_shot() {
        let mesh = SimMesh::new(LOCAL, false);
        mesh.fail_next_snapshot();
        assert!(mesh.routing_table().is_err());
        assert!(mesh.routing_table().is_ok());
    }

    #[test]
    fn test_role_toggle() {
        let mesh = SimMesh::new(LOCAL, false);
        assert!(!mesh.is_root());
        mesh.set_root(true);
        assert!(mesh.is_root());
    }
}
