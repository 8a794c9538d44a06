//! Pruning the tree against the mesh routing table
//!
//! The mesh layer's routing table is authoritative for which nodes are
//! still connected. Entries missing from it are collected first and then
//! removed in a single compaction pass.
//!
//! Children of a pruned node that are still reachable are kept as-is. Their
//! parent reference dangles and they drop out of the rendered tree until the
//! mesh layer reports their new parent.

use std::collections::HashSet;

use crate::mesh::MeshLayer;

use super::node::NodeAddr;
use super::store::TopologyStore;
use super::TopologyError;

/// Outcome of a reconciliation pass.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Reconciled {
    /// Nodes evicted because the mesh no longer reports them, in table order.
    pub removed: Vec<NodeAddr>,
}

impl Reconciled {
    /// Whether the topology changed.
    pub fn changed(&self) -> bool {
        !self.removed.is_empty()
    }
}

impl<const N: usize> TopologyStore<N> {
    /// Remove every entry whose node is absent from `reachable`.
    pub fn reconcile(&self, reachable: &[NodeAddr]) -> Result<Reconciled, TopologyError> {
        let reachable: HashSet<NodeAddr> = reachable.iter().copied().collect();

        let mut table = self.lock("reconcile")?;

        let removed: Vec<NodeAddr> = table
            .nodes
            .iter()
            .filter(|n| !reachable.contains(&n.node_id))
            .map(|n| n.node_id)
            .collect();

        if !removed.is_empty() {
            table.nodes.retain(|n| reachable.contains(&n.node_id));
            table.touch();
            self.log_tree(&table);
        }

        Ok(Reconciled { removed })
    }

    /// Fetch the routing table from the mesh layer and reconcile against it.
    /// The store is left untouched if the snapshot can't be read.
    pub fn reconcile_with(&self, mesh: &dyn MeshLayer) -> Result<Reconciled, TopologyError> {
        let reachable = mesh.routing_table().map_err(|e| {
            log::warn!("Skipping reconcile, no routing table: {}", e);
            e
        })?;
        self.reconcile(&reachable)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::simulated::SimMesh;

    const LOCAL: NodeAddr = NodeAddr::new([0x24, 0x6f, 0x28, 0xaa, 0x00, 0x01]);

    fn addr(n: u8) -> NodeAddr {
        NodeAddr::new([0x24, 0x6f, 0x28, 0xbb, 0x00, n])
    }

    fn populated() -> TopologyStore<8> {
        let store = TopologyStore::<8>::new(LOCAL);
        store.upsert(addr(1), LOCAL, 2).unwrap();
        store.upsert(addr(2), LOCAL, 2).unwrap();
        store.upsert(addr(3), addr(1), 3).unwrap();
        store.upsert(addr(4), addr(3), 4).unwrap();
        store.upsert(addr(5), addr(2), 3).unwrap();
        store
    }

    #[test]
    fn test_reconcile_removes_exactly_unreachable() {
        let store = populated();
        let result = store
            .reconcile(&[LOCAL, addr(1), addr(2), addr(5)])
            .unwrap();

        assert!(result.changed());
        assert_eq!(result.removed, vec![addr(3), addr(4)]);

        let ids: Vec<NodeAddr> = store.snapshot().unwrap().iter().map(|n| n.node_id).collect();
        assert_eq!(ids, vec![addr(1), addr(2), addr(5)]);
    }

    #[test]
    fn test_reconcile_all_reachable_is_noop() {
        let store = populated();
        let stamp = store.last_updated().unwrap();
        let all: Vec<NodeAddr> = (1..=5).map(addr).collect();

        let result = store.reconcile(&all).unwrap();
        assert!(!result.changed());
        assert_eq!(store.len().unwrap(), 5);
        assert_eq!(store.last_updated().unwrap(), stamp);
    }

    #[test]
    fn test_reconcile_empty_snapshot_clears() {
        let store = populated();
        let result = store.reconcile(&[]).unwrap();
        assert_eq!(result.removed.len(), 5);
        assert!(store.is_empty().unwrap());
    }

    #[test]
    fn test_reconcile_does_not_cascade_to_children() {
        let store = populated();
        // addr(1) is gone but its child addr(3) is still reported
        store
            .reconcile(&[addr(2), addr(3), addr(4), addr(5)])
            .unwrap();

        let orphan = store.get(&addr(3)).unwrap().unwrap();
        assert_eq!(orphan.parent_id, addr(1));
        assert!(store.get(&addr(1)).unwrap().is_none());
    }

    #[test]
    fn test_reconcile_converges() {
        let store = populated();
        let reachable = [addr(2), addr(4), addr(9)];
        store.reconcile(&reachable).unwrap();
        for node in store.snapshot().unwrap() {
            assert!(reachable.contains(&node.node_id));
        }
    }

    #[test]
    fn test_reconcile_with_mesh_snapshot() {
        let store = populated();
        let mesh = SimMesh::new(LOCAL, true);
        mesh.set_reachable(vec![LOCAL, addr(1), addr(3)]);

        let result = store.reconcile_with(&*mesh).unwrap();
        assert_eq!(result.removed, vec![addr(2), addr(4), addr(5)]);
    }

    #[test]
    fn test_reconcile_with_failed_snapshot_leaves_store() {
        let store = populated();
        let mesh = SimMesh::new(LOCAL, true);
        mesh.fail_next_snapshot();

        assert!(matches!(
            store.reconcile_with(&*mesh),
            Err(TopologyError::Mesh(_))
        ));
        assert_eq!(store.len().unwrap(), 5);
    }
}
