//! TreeMonitor: keeps the topology cache in step with the mesh
//!
//! Applies pushed mesh events as they arrive and, while the local node is
//! root, prunes the cache against the routing table on a fixed interval.
//! Losing the root role empties the cache; a teardown empties it and ends
//! the task.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::topology::TopologyStore;

use super::{apply_event, MeshEvent, MeshLayer};

/// Shortest reconcile interval the loop will run with.
pub const MIN_RECONCILE_INTERVAL: Duration = Duration::from_millis(10);

/// Configuration for the monitor loop.
#[derive(Clone, Debug)]
pub struct MonitorConfig {
    /// How often to reconcile against the routing table.
    pub reconcile_interval: Duration,
    /// Capacity of the mesh event queue.
    pub event_buffer: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            reconcile_interval: Duration::from_secs(1),
            event_buffer: 64,
        }
    }
}

/// Handle to a running monitor task.
pub struct TreeMonitorHandle {
    events_tx: mpsc::Sender<MeshEvent>,
    shutdown_tx: broadcast::Sender<()>,
    task: JoinHandle<()>,
}

impl TreeMonitorHandle {
    /// Sender for feeding mesh events to the monitor.
    pub fn sender(&self) -> mpsc::Sender<MeshEvent> {
        self.events_tx.clone()
    }

    pub fn stop(&self) {
        let _ = self.shutdown_tx.send(());
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the task to end.
    pub async fn join(self) {
        drop(self.events_tx);
        if let Err(e) = self.task.await {
            log::error!("Tree monitor task failed: {}", e);
        }
    }
}

/// Event and reconciliation loop over a shared store.
pub struct TreeMonitor<const N: usize> {
    store: Arc<TopologyStore<N>>,
    mesh: Arc<dyn MeshLayer>,
    config: MonitorConfig,
    /// Root role as last observed by this loop.
    is_root: bool,
}

impl<const N: usize> TreeMonitor<N> {
    /// Spawn the monitor on the current tokio runtime.
    pub fn spawn(
        store: Arc<TopologyStore<N>>,
        mesh: Arc<dyn MeshLayer>,
        config: MonitorConfig,
    ) -> TreeMonitorHandle {
        let mut config = config;
        if config.reconcile_interval < MIN_RECONCILE_INTERVAL {
            log::warn!(
                "Reconcile interval {:?} too short, using {:?}",
                config.reconcile_interval,
                MIN_RECONCILE_INTERVAL
            );
            config.reconcile_interval = MIN_RECONCILE_INTERVAL;
        }

        let (events_tx, events_rx) = mpsc::channel(config.event_buffer.max(1));
        let (shutdown_tx, _) = broadcast::channel(1);
        let shutdown = shutdown_tx.subscribe();

        let is_root = mesh.is_root();
        let monitor = Self {
            store,
            mesh,
            config,
            is_root,
        };
        let task = tokio::spawn(monitor.run(events_rx, shutdown));

        TreeMonitorHandle {
            events_tx,
            shutdown_tx,
            task,
        }
    }

    async fn run(
        mut self,
        mut events: mpsc::Receiver<MeshEvent>,
        mut shutdown: broadcast::Receiver<()>,
    ) {
        log::info!("Started tree monitor for {}", self.store.local_id().short());

        let mut ticker = tokio::time::interval(self.config.reconcile_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Some(MeshEvent::Teardown) => {
                        self.handle_event(&MeshEvent::Teardown);
                        break;
                    }
                    Some(event) => self.handle_event(&event),
                    None => break,
                },
                _ = ticker.tick() => self.tick(),
                _ = shutdown.recv() => break,
            }
        }

        log::info!("Stopped tree monitor for {}", self.store.local_id().short());
    }

    fn handle_event(&mut self, event: &MeshEvent) {
        match event {
            MeshEvent::RoleGained => self.is_root = true,
            MeshEvent::RoleLost | MeshEvent::Teardown => self.is_root = false,
            MeshEvent::NodeUpdated { node, .. } => {
                // Nothing prunes the tree while we are not root
                if !self.is_root && !self.mesh.is_root() {
                    log::debug!("Not root, ignoring update for {}", node.short());
                    return;
                }
            }
            MeshEvent::NodeLeft { .. } => {}
        }
        if let Err(e) = apply_event(&self.store, event) {
            log::warn!("Failed to apply {:?}: {}", event, e);
        }
    }

    fn tick(&mut self) {
        if self.mesh.is_root() {
            self.is_root = true;
            match self.store.reconcile_with(&*self.mesh) {
                Ok(result) if result.changed() => {
                    log::info!("Pruned {} unreachable node(s)", result.removed.len())
                }
                Ok(_) => {}
                Err(e) => log::warn!("Reconcile failed: {}", e),
            }
        } else if self.is_root {
            self.is_root = false;
            match self.store.clear() {
                Ok(dropped) => log::info!("No longer root, dropped {} node(s)", dropped),
                Err(e) => log::warn!("Failed to clear tree: {}", e),
            }
        }
    }
}
