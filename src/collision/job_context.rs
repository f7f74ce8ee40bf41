//! Consumer-side contracts.
//!
//! The real job-context and cluster-membership types live in the
//! execution engine and discovery layer, both out of scope for this
//! crate (see module-level docs). We model exactly what the collision
//! controller reads and mutates on them as traits.

use std::collections::{HashMap, HashSet};

use parking_lot::Mutex;

/// A peer (or local) node identifier. The wire format and job-context
/// attributes both carry this as a UUID.
pub type NodeId = uuid::Uuid;

/// Job-context attribute key, named after the attribute constants in
/// the external interface section of the spec this module implements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AttrKey {
    ThiefNode,
    StealingAttemptCount,
    StealingPriority,
}

pub const THIEF_NODE_ATTR: &str = "gridgain.collision.thief.node";
pub const STEALING_ATTEMPT_COUNT_ATTR: &str = "gridgain.stealing.attempt.count";
pub const STEALING_PRIORITY_ATTR: &str = "gridgain.stealing.priority";

/// Value shape for the three job-context attributes this controller
/// touches. Kept as a closed enum rather than `dyn Any`: the priority
/// reader (`priority::read`) needs to tell "wrong type" apart from
/// "absent" without downcasting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttrValue {
    Node(NodeId),
    Int(i64),
}

impl AttrValue {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            AttrValue::Int(v) => Some(*v),
            AttrValue::Node(_) => None,
        }
    }

    pub fn as_node(&self) -> Option<NodeId> {
        match self {
            AttrValue::Node(id) => Some(*id),
            AttrValue::Int(_) => None,
        }
    }
}

/// The mutable attribute map backing a waiting/active job context.
pub type JobAttributes = HashMap<AttrKey, AttrValue>;

/// A waiting, active, or held job, as seen by the collision controller.
///
/// `job_context` returns the attribute map guarded by its own mutex —
/// callers synchronize on it the way the spec's `jobContext` monitor
/// is synchronized on, one job at a time.
pub trait CollisionJobContext: Send + Sync {
    /// The job's attribute map, guarded by its own lock.
    fn job_context(&self) -> &Mutex<JobAttributes>;

    /// Node ids this task is permitted to execute on.
    fn topology(&self) -> &HashSet<NodeId>;

    /// Whether the job carries the `StealingDisabled` marker.
    fn is_stealing_disabled(&self) -> bool;

    /// Move this waiting job into the active set.
    fn activate(&self);

    /// Attempt to cancel this waiting job in favor of a peer. Returns
    /// whether the cancellation took effect.
    fn cancel(&self) -> bool;
}

/// Snapshot of the active, waiting, and held job populations for one
/// collision pass.
pub struct CollisionContext {
    pub active: Vec<std::sync::Arc<dyn CollisionJobContext>>,
    pub waiting: Vec<std::sync::Arc<dyn CollisionJobContext>>,
    pub held: Vec<std::sync::Arc<dyn CollisionJobContext>>,
}

/// Per-node metrics consulted by `checkIdle` when deciding whether a
/// peer is overloaded.
#[derive(Debug, Clone, Copy, Default)]
pub struct NodeMetrics {
    pub current_waiting_jobs: i64,
}

/// Arbitrary string attributes a peer publishes at discovery time
/// (thresholds, stealing-attribute gates, and so on).
pub type NodeAttributes = HashMap<String, String>;

/// A peer (or this node) as seen through the discovery layer.
pub trait ClusterNode: Send + Sync {
    fn id(&self) -> NodeId;
    fn is_alive(&self) -> bool;
    fn attributes(&self) -> &NodeAttributes;
    fn metrics(&self) -> NodeMetrics;
}
