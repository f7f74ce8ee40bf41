//! Management surface (spec §6): read-only counters an external
//! monitoring layer (JMX bean, in the original platform) would poll.
//! No mutation methods are exposed here — the engine's atomics are the
//! only writers.

/// A point-in-time snapshot of the counters the engine exposes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CollisionMetrics {
    pub running_num: i64,
    pub waiting_num: i64,
    pub held_num: i64,
    pub steal_reqs: i64,
    pub total_stolen_jobs_num: i64,
}
