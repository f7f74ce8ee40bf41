//! The set of known peers, round-robin ordered, with per-peer inbound
//! and outbound [`MessageInfo`].

use std::collections::VecDeque;
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;

use super::job_context::{ClusterNode, NodeId};
use super::message_info::MessageInfo;

/// Round-robin peer set plus the `rcv`/`snd` `MessageInfo` maps.
///
/// Invariant: for every node present in the round-robin order a
/// matching entry exists in both `rcv` and `snd` at the time a
/// membership event handler returns. Iteration over `rcv`/`snd` is
/// weakly consistent — callers re-check liveness via [`NodeTable::node`]
/// rather than trusting a snapshot.
pub struct NodeTable {
    order: Mutex<VecDeque<NodeId>>,
    nodes: DashMap<NodeId, Arc<dyn ClusterNode>>,
    rcv: DashMap<NodeId, Arc<MessageInfo>>,
    snd: DashMap<NodeId, Arc<MessageInfo>>,
}

impl NodeTable {
    pub fn new() -> Self {
        Self {
            order: Mutex::new(VecDeque::new()),
            nodes: DashMap::new(),
            rcv: DashMap::new(),
            snd: DashMap::new(),
        }
    }

    /// Seed the table from the current remote-nodes set at startup,
    /// filtering out anything that already left.
    pub fn seed(&self, nodes: impl IntoIterator<Item = Arc<dyn ClusterNode>>) {
        for node in nodes {
            if node.is_alive() {
                self.on_joined(node);
            }
        }
    }

    /// A peer joined: append to the round-robin order, put-if-absent
    /// empty `MessageInfo` in both maps.
    pub fn on_joined(&self, node: Arc<dyn ClusterNode>) {
        let id = node.id();
        self.nodes.insert(id, node);
        self.rcv.entry(id).or_insert_with(|| Arc::new(MessageInfo::new()));
        self.snd.entry(id).or_insert_with(|| Arc::new(MessageInfo::new()));
        self.order.lock().push_back(id);
    }

    /// A peer left or failed: remove it from the order and both maps.
    pub fn on_left(&self, id: NodeId) {
        self.nodes.remove(&id);
        self.rcv.remove(&id);
        self.snd.remove(&id);
        self.order.lock().retain(|n| *n != id);
    }

    pub fn node(&self, id: NodeId) -> Option<Arc<dyn ClusterNode>> {
        self.nodes.get(&id).map(|r| r.clone())
    }

    pub fn rcv(&self, id: NodeId) -> Option<Arc<MessageInfo>> {
        self.rcv.get(&id).map(|r| r.clone())
    }

    pub fn snd(&self, id: NodeId) -> Option<Arc<MessageInfo>> {
        self.snd.get(&id).map(|r| r.clone())
    }

    /// Snapshot of `(nodeId, info)` pairs over the inbound map, for
    /// `checkBusy`'s peer scan. Weakly consistent: entries may have
    /// been pruned by the time the caller visits them.
    pub fn rcv_snapshot(&self) -> Vec<(NodeId, Arc<MessageInfo>)> {
        self.rcv
            .iter()
            .map(|e| (*e.key(), e.value().clone()))
            .collect()
    }

    /// Drop a stale peer id from the inbound map (used when a scan
    /// finds an id no longer present in the discovery set).
    pub fn prune_rcv(&self, id: NodeId) {
        self.rcv.remove(&id);
    }

    /// Number of known peers (`nodeCnt` in `checkIdle`).
    pub fn len(&self) -> usize {
        self.order.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Pop the head of the round-robin order. Callers decide whether
    /// to push the id back via [`NodeTable::push_back`].
    pub fn pop_front(&self) -> Option<NodeId> {
        self.order.lock().pop_front()
    }

    pub fn push_back(&self, id: NodeId) {
        self.order.lock().push_back(id);
    }
}

impl Default for NodeTable {
    fn default() -> Self {
        Self::new()
    }
}
