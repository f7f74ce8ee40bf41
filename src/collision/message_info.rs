//! Pending-steal bookkeeping for one direction (inbound or outbound)
//! of one peer.

use std::time::{Duration, Instant};

use parking_lot::Mutex;

/// `{ jobsToSteal, ts }` guarded by its own mutex. All reads and
/// writes go through [`MessageInfo::lock`]; there is no "get" that
/// bypasses the lock, matching the spec's "all reads/writes guarded by
/// the object's own mutex" invariant.
pub struct MessageInfo {
    state: Mutex<MessageInfoState>,
}

pub struct MessageInfoState {
    pub jobs_to_steal: i64,
    pub ts: Instant,
}

impl MessageInfoState {
    /// `expired() = jobsToSteal>0 ∧ now−ts ≥ msgExpireTime`.
    pub fn expired(&self, msg_expire_time: Duration) -> bool {
        self.jobs_to_steal > 0 && self.ts.elapsed() >= msg_expire_time
    }

    pub fn reset(&mut self, jobs_to_steal: i64) {
        self.jobs_to_steal = jobs_to_steal;
        self.ts = Instant::now();
    }
}

impl MessageInfo {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MessageInfoState {
                jobs_to_steal: 0,
                ts: Instant::now(),
            }),
        }
    }

    pub fn lock(&self) -> parking_lot::MutexGuard<'_, MessageInfoState> {
        self.state.lock()
    }

    pub fn jobs_to_steal(&self) -> i64 {
        self.state.lock().jobs_to_steal
    }

    pub fn reset(&self, jobs_to_steal: i64) {
        self.state.lock().reset(jobs_to_steal);
    }

    pub fn expired(&self, msg_expire_time: Duration) -> bool {
        self.state.lock().expired(msg_expire_time)
    }
}

impl Default for MessageInfo {
    fn default() -> Self {
        Self::new()
    }
}
