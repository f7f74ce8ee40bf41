//! Job-stealing collision controller
//!
//! A per-node policy engine that, whenever the local job population
//! changes, decides which waiting jobs to admit, which to surrender to
//! peers that have asked for work, and how many jobs to request from
//! overloaded peers.
//!
//! Out of scope here (consumed as traits instead): the execution
//! engine, the discovery/event bus, and the inter-node transport. See
//! [`job_context`] and [`protocol`] for the contracts this module
//! expects its host platform to provide.

pub mod config;
pub mod engine;
pub mod error;
pub mod job_context;
pub mod listener;
pub mod message_info;
pub mod metrics;
pub mod node_table;
pub mod priority;
pub mod protocol;

pub use config::{
    ACTIVE_JOBS_THRESHOLD_ATTR, CollisionConfig, MAX_STEALING_ATTEMPT_ATTR, MSG_EXPIRE_TIME_ATTR,
    WAIT_JOBS_THRESHOLD_ATTR,
};
pub use engine::{CollisionEngine, CollisionListener};
pub use error::ConfigError;
pub use job_context::{
    AttrKey, AttrValue, ClusterNode, CollisionContext, CollisionJobContext, JobAttributes,
    NodeAttributes, NodeId, NodeMetrics, STEALING_ATTEMPT_COUNT_ATTR, STEALING_PRIORITY_ATTR,
    THIEF_NODE_ATTR,
};
pub use listener::{MembershipEvent, MembershipListener};
pub use message_info::MessageInfo;
pub use metrics::CollisionMetrics;
pub use node_table::NodeTable;
pub use protocol::{COLLISION_TOPIC, MessageSender, StealRequest, TransportError};
