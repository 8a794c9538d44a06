// mesh-tree - Gateway topology cache for self-organizing wireless meshes

pub mod mesh;
pub mod topology;

pub use mesh::{
    apply_event, MeshError, MeshEvent, MeshLayer, MonitorConfig, TreeMonitor, TreeMonitorHandle,
};
pub use topology::{
    MeshNode, MeshTreeStore, NodeAddr, Reconciled, TopologyError, TopologyStore, TreeNode,
    UpsertOutcome, GATEWAY_LABEL, ROUTE_TABLE_SIZE,
};
