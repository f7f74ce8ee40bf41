//! Wire protocol: one message type on one topic. The inter-node
//! transport itself is out of scope; we only consume a `send` contract
//! and model the "add listener for topic" side as the engine's public
//! `handle_steal_request` entry point (see [`super::engine`]).

use serde::{Deserialize, Serialize};

use super::job_context::NodeId;

pub const COLLISION_TOPIC: &str = "gridgain.collision.job.stealing.topic";

/// A steal request declaring a peer's current absolute demand for
/// surplus jobs. The field is named `delta` in the original protocol
/// but is used as an absolute replacement of the sender's previously
/// advertised capacity, not an increment — preserved here as-is (see
/// `DESIGN.md`, "message semantics").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StealRequest {
    pub delta: i32,
}

#[derive(Debug, thiserror::Error)]
#[error("failed to send steal request to {node}: {reason}")]
pub struct TransportError {
    pub node: NodeId,
    pub reason: String,
}

/// The inter-node transport's `send` contract, as consumed by
/// `checkIdle`. No acknowledgement is expected.
pub trait MessageSender: Send + Sync {
    fn send(&self, node: NodeId, message: StealRequest, topic: &str) -> Result<(), TransportError>;
}
