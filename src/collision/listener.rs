//! Discovery-event wiring (spec §4.A6): translates node-joined /
//! node-left / node-failed events into `NodeTable` mutations. The
//! discovery/event bus itself is out of scope (§1) — only its event
//! contract is modeled here.

use std::sync::Arc;

use super::job_context::ClusterNode;
use super::node_table::NodeTable;

/// One event from the discovery layer.
pub enum MembershipEvent {
    Joined(Arc<dyn ClusterNode>),
    Left(Arc<dyn ClusterNode>),
    Failed(Arc<dyn ClusterNode>),
}

/// Subscribes to membership events and keeps a `NodeTable` in sync.
/// Construct once per engine instance and feed it every event the
/// discovery bus delivers, in delivery order.
pub struct MembershipListener {
    table: Arc<NodeTable>,
}

impl MembershipListener {
    pub fn new(table: Arc<NodeTable>) -> Self {
        Self { table }
    }

    /// Initial snapshot at startup: seed from the current remote-nodes
    /// set, re-checking liveness and filtering out anything that left
    /// concurrently (`NodeTable::seed` does the liveness re-check).
    pub fn seed(&self, nodes: impl IntoIterator<Item = Arc<dyn ClusterNode>>) {
        self.table.seed(nodes);
    }

    pub fn on_event(&self, event: MembershipEvent) {
        match event {
            MembershipEvent::Joined(node) => self.table.on_joined(node),
            MembershipEvent::Left(node) => self.table.on_left(node.id()),
            MembershipEvent::Failed(node) => self.table.on_left(node.id()),
        }
    }
}
