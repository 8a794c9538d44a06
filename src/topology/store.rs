//! TopologyStore: the bounded, mutex-guarded tree table
//!
//! Every entry is a mesh node below the local node (layer >= 2). The local
//! node itself is implicit: it always sits at layer 1 under the virtual
//! gateway and is never stored.

use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};

use super::node::{MeshNode, NodeAddr};
use super::TopologyError;

/// Result of an upsert.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// A new entry was inserted, or an existing one got a new parent/layer.
    Changed,
    /// The entry already existed with the same parent and layer.
    Unchanged,
    /// The table is full and the node is not tracked.
    Rejected,
}

/// Table contents guarded by the store's lock.
pub(super) struct TreeTable {
    pub(super) nodes: Vec<MeshNode>,
    pub(super) last_updated: DateTime<Utc>,
}

impl TreeTable {
    pub(super) fn touch(&mut self) {
        self.last_updated = Utc::now();
    }
}

/// Topology cache for a gateway node, holding at most `N` entries.
pub struct TopologyStore<const N: usize> {
    local_id: NodeAddr,
    pub(super) table: Mutex<TreeTable>,
}

impl<const N: usize> TopologyStore<N> {
    /// Create an empty store for the given local (layer 1) node.
    pub fn new(local_id: NodeAddr) -> Self {
        Self {
            local_id,
            table: Mutex::new(TreeTable {
                nodes: Vec::with_capacity(N),
                last_updated: Utc::now(),
            }),
        }
    }

    pub fn local_id(&self) -> NodeAddr {
        self.local_id
    }

    pub const fn capacity(&self) -> usize {
        N
    }

    /// Take the tree lock on behalf of `op`. A poisoned lock aborts the
    /// operation and is logged with the caller's name.
    pub(super) fn lock(
        &self,
        op: &'static str,
    ) -> Result<MutexGuard<'_, TreeTable>, TopologyError> {
        self.table.lock().map_err(|_| {
            log::error!("Failed to take tree lock: '{}'", op);
            TopologyError::LockUnavailable(op)
        })
    }

    /// Dump the whole table. Called after every change.
    pub(super) fn log_tree(&self, table: &TreeTable) {
        log::info!("Tree updated, node count: {}", table.nodes.len() + 1);
        log::info!("[1] root:{}, layer:1", self.local_id.short());
        for (i, node) in table.nodes.iter().enumerate() {
            log::info!(
                "[{}] node:{}, parent:{}, layer:{}",
                i + 2,
                node.node_id.short(),
                node.parent_id.short(),
                node.layer
            );
        }
    }

    /// Insert or update a node reported by the mesh layer.
    ///
    /// Existing entries are only rewritten when the parent or layer differ.
    /// New nodes are dropped once the table holds `N` entries.
    pub fn upsert(
        &self,
        node_id: NodeAddr,
        parent_id: NodeAddr,
        layer: u8,
    ) -> Result<UpsertOutcome, TopologyError> {
        if node_id == self.local_id {
            log::warn!("Ignoring tree update for the local node {}", node_id);
            return Err(TopologyError::InvalidNode(format!(
                "{} is the local node",
                node_id
            )));
        }
        if layer < 2 {
            log::warn!("Ignoring tree update for {} at layer {}", node_id, layer);
            return Err(TopologyError::InvalidNode(format!(
                "{} reported at layer {}",
                node_id, layer
            )));
        }

        let mut table = self.lock("upsert")?;

        let outcome = match table.nodes.iter().position(|n| n.node_id == node_id) {
            Some(i) => {
                let existing = &mut table.nodes[i];
                if existing.parent_id == parent_id && existing.layer == layer {
                    UpsertOutcome::Unchanged
                } else {
                    existing.parent_id = parent_id;
                    existing.layer = layer;
                    UpsertOutcome::Changed
                }
            }
            None if table.nodes.len() < N => {
                table.nodes.push(MeshNode {
                    node_id,
                    parent_id,
                    layer,
                });
                UpsertOutcome::Changed
            }
            None => {
                log::debug!("Tree full ({} nodes), not tracking {}", N, node_id);
                UpsertOutcome::Rejected
            }
        };

        if outcome == UpsertOutcome::Changed {
            table.touch();
            self.log_tree(&table);
        }
        Ok(outcome)
    }

    /// Remove a node. Returns true if it was tracked.
    pub fn remove(&self, node_id: &NodeAddr) -> Result<bool, TopologyError> {
        let mut table = self.lock("remove")?;
        let before = table.nodes.len();
        table.nodes.retain(|n| &n.node_id != node_id);
        let removed = table.nodes.len() != before;
        if removed {
            table.touch();
            log::debug!("Removed {} from tree", node_id);
        }
        Ok(removed)
    }

    /// Drop every entry. Returns how many were dropped.
    pub fn clear(&self) -> Result<usize, TopologyError> {
        let mut table = self.lock("clear")?;
        let dropped = table.nodes.len();
        table.nodes.clear();
        if dropped > 0 {
            table.touch();
        }
        Ok(dropped)
    }

    /// Copy of all entries, in table order.
    pub fn snapshot(&self) -> Result<Vec<MeshNode>, TopologyError> {
        let table = self.lock("snapshot")?;
        Ok(table.nodes.clone())
    }

    pub fn get(&self, node_id: &NodeAddr) -> Result<Option<MeshNode>, TopologyError> {
        let table = self.lock("get")?;
        Ok(table.nodes.iter().find(|n| &n.node_id == node_id).copied())
    }

    pub fn len(&self) -> Result<usize, TopologyError> {
        Ok(self.lock("len")?.nodes.len())
    }

    pub fn is_empty(&self) -> Result<bool, TopologyError> {
        Ok(self.lock("is_empty")?.nodes.is_empty())
    }

    /// When the table last changed.
    pub fn last_updated(&self) -> Result<DateTime<Utc>, TopologyError> {
        Ok(self.lock("last_updated")?.last_updated)
    }

    /// Deterministic hash of the table for cheap change detection.
    /// SHA-256 over entries sorted by node id, truncated to u32.
    pub fn topology_hash(&self) -> Result<u32, TopologyError> {
        let mut nodes = self.snapshot()?;
        nodes.sort_by_key(|n| n.node_id);

        let mut hasher = Sha256::new();
        hasher.update(self.local_id.as_bytes());
        for node in &nodes {
            hasher.update(node.node_id.as_bytes());
            hasher.update(node.parent_id.as_bytes());
            hasher.update([node.layer]);
        }

        let hash = hasher.finalize();
        Ok(u32::from_le_bytes([hash[0], hash[1], hash[2], hash[3]]))
    }
}
