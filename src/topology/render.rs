//! Nested tree document for monitoring pages
//!
//! Layout: a virtual gateway at layer 0 whose only child is the local node
//! at layer 1. Each stored entry hangs under the node named by its
//! `parent_id`; entries whose parent isn't in the tree are left out.

use serde::{Deserialize, Serialize};

use super::node::{MeshNode, NodeAddr};
use super::store::TopologyStore;
use super::TopologyError;

/// Label of the virtual layer-0 node.
pub const GATEWAY_LABEL: &str = "WiFi Router";

/// One node of the rendered tree.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeNode {
    pub name: String,
    pub layer: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TreeNode>,
}

impl TreeNode {
    /// Total number of nodes in this subtree, including itself.
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(TreeNode::count).sum::<usize>()
    }
}

/// Children of `parent`, depth-first, in table order. `budget` is the number
/// of levels still allowed below `parent`; deeper subtrees are dropped.
fn children_of(
    nodes: &[MeshNode],
    parent: NodeAddr,
    parent_layer: u32,
    budget: usize,
) -> Vec<TreeNode> {
    nodes
        .iter()
        .filter(|n| n.parent_id == parent)
        .filter_map(|n| {
            if budget == 0 {
                log::warn!(
                    "Tree deeper than allowed below {}, dropping {}",
                    parent.short(),
                    n.node_id.short()
                );
                return None;
            }
            Some(TreeNode {
                name: n.node_id.short(),
                layer: parent_layer + 1,
                children: children_of(nodes, n.node_id, parent_layer + 1, budget - 1),
            })
        })
        .collect()
}

impl<const N: usize> TopologyStore<N> {
    /// Build the tree document. The table is read under the lock; the
    /// returned tree is owned by the caller.
    pub fn tree(&self) -> Result<TreeNode, TopologyError> {
        let table = self.lock("tree")?;

        let local = self.local_id();
        let root = TreeNode {
            name: local.short(),
            layer: 1,
            children: children_of(&table.nodes, local, 1, N),
        };
        drop(table);

        Ok(TreeNode {
            name: GATEWAY_LABEL.to_string(),
            layer: 0,
            children: vec![root],
        })
    }

    /// Render the tree as single-line JSON.
    pub fn render(&self) -> Result<String, TopologyError> {
        let tree = self.tree()?;
        serde_json::to_string(&tree).map_err(|e| TopologyError::Serialization(e.to_string()))
    }
}
