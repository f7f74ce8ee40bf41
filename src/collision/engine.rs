//! The collision engine itself (spec §4.A1–§4.A6): `onCollision` and
//! the two decision passes it drives, plus the inbound message
//! listener entry point.
//!
//! Lock ordering (see `DESIGN.md`, "jobContext / MessageInfo
//! ordering"): wherever both locks are needed in the same critical
//! section, `MessageInfo` is acquired before `jobContext`, never the
//! reverse.

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use parking_lot::RwLock;

use super::config::{CollisionConfig, WAIT_JOBS_THRESHOLD_ATTR};
use super::error::ConfigError;
use super::job_context::{AttrKey, AttrValue, CollisionContext, CollisionJobContext, NodeId};
use super::metrics::CollisionMetrics;
use super::node_table::NodeTable;
use super::priority;
use super::protocol::{COLLISION_TOPIC, MessageSender, StealRequest};

/// Notified after an inbound steal request updates `steal_reqs`, so
/// the host can schedule another collision pass. Out of scope for
/// this crate beyond the callback itself — the real scheduling
/// trigger lives in the compute runtime.
pub trait CollisionListener: Send + Sync {
    fn on_external_collision(&self);
}

/// Per-node policy engine. One instance per node; peers are reached
/// only through the `NodeTable` and `MessageSender` it's built with.
pub struct CollisionEngine {
    config: CollisionConfig,
    table: Arc<NodeTable>,
    sender: Arc<dyn MessageSender>,
    listener: RwLock<Option<Arc<dyn CollisionListener>>>,

    /// Total pending inbound steal capacity. May transiently read
    /// negative during a racy decrement/rollback (§3); never assumed
    /// non-negative except at the quiescent points the spec names.
    steal_reqs: AtomicI64,
    total_stolen_jobs_num: AtomicI64,
    running_num: AtomicI64,
    waiting_num: AtomicI64,
    held_num: AtomicI64,
}

impl CollisionEngine {
    pub fn new(
        config: CollisionConfig,
        table: Arc<NodeTable>,
        sender: Arc<dyn MessageSender>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            table,
            sender,
            listener: RwLock::new(None),
            steal_reqs: AtomicI64::new(0),
            total_stolen_jobs_num: AtomicI64::new(0),
            running_num: AtomicI64::new(0),
            waiting_num: AtomicI64::new(0),
            held_num: AtomicI64::new(0),
        })
    }

    pub fn set_listener(&self, listener: Arc<dyn CollisionListener>) {
        *self.listener.write() = Some(listener);
    }

    pub fn config(&self) -> &CollisionConfig {
        &self.config
    }

    pub fn metrics(&self) -> CollisionMetrics {
        CollisionMetrics {
            running_num: self.running_num.load(Ordering::Relaxed),
            waiting_num: self.waiting_num.load(Ordering::Relaxed),
            held_num: self.held_num.load(Ordering::Relaxed),
            steal_reqs: self.steal_reqs.load(Ordering::Relaxed),
            total_stolen_jobs_num: self.total_stolen_jobs_num.load(Ordering::Relaxed),
        }
    }

    /// §4.A1: one collision pass.
    pub fn on_collision(&self, ctx: &CollisionContext) {
        self.running_num
            .store(ctx.active.len() as i64, Ordering::Relaxed);
        self.waiting_num
            .store(ctx.waiting.len() as i64, Ordering::Relaxed);
        self.held_num
            .store(ctx.held.len() as i64, Ordering::Relaxed);

        let rejected = self.check_busy(&ctx.waiting, ctx.active.len());
        if rejected > 0 {
            self.total_stolen_jobs_num
                .fetch_add(rejected as i64, Ordering::Relaxed);
            return;
        }
        if self.config.stealing_enabled {
            self.check_idle(ctx.waiting.len(), ctx.active.len());
        }
    }

    /// §4.A2: fill the activation budget, then reject surplus waiting
    /// jobs to peers that asked for work. Returns the number rejected.
    fn check_busy(&self, waiting: &[Arc<dyn CollisionJobContext>], active_count: usize) -> u32 {
        let mut wait_pri = waiting.to_vec();
        priority::sort_by_priority_desc(&mut wait_pri);

        let active_budget = self.config.active_jobs_threshold as i64;
        let wait_budget = self.config.wait_jobs_threshold as i64;
        let total = wait_pri.len() as i64;
        let mut activated: i64 = 0;
        let mut rejected: i64 = 0;

        for job in &wait_pri {
            if active_count as i64 + activated < active_budget {
                {
                    let _guard = job.job_context().lock();
                    job.activate();
                }
                activated += 1;
                continue;
            }

            if self.steal_reqs.load(Ordering::SeqCst) <= 0 {
                break;
            }

            if job.is_stealing_disabled() {
                continue;
            }

            let attempt = {
                let attrs = job.job_context().lock();
                attrs
                    .get(&AttrKey::StealingAttemptCount)
                    .and_then(AttrValue::as_int)
                    .unwrap_or(0)
            };
            if attempt >= self.config.max_stealing_attempts as i64 {
                continue;
            }

            let jobs_to_reject = total - activated - rejected - wait_budget;
            if jobs_to_reject <= 0 {
                break;
            }

            let pri = priority::read(job.as_ref());
            if self.try_reject_one(job, attempt, pri) {
                rejected += 1;
            }
            // One assignment attempt per waiting job, success or not.
        }

        rejected as u32
    }

    /// Walk the inbound peer snapshot looking for one peer to assign
    /// `job` to. Returns whether a rejection (successful cancel) took
    /// place. Lock order inside the loop body: `info` then
    /// `jobContext`, never the reverse.
    fn try_reject_one(&self, job: &Arc<dyn CollisionJobContext>, attempt: i64, pri: i64) -> bool {
        for (node_id, info) in self.table.rcv_snapshot() {
            if self.steal_reqs.load(Ordering::SeqCst) <= 0 {
                return false;
            }
            if self.table.node(node_id).is_none() {
                self.table.prune_rcv(node_id);
                continue;
            }

            let mut info_guard = info.lock();
            if info_guard.jobs_to_steal == 0 {
                continue;
            }
            if info_guard.expired(self.config.msg_expire_time) {
                self.steal_reqs
                    .fetch_sub(info_guard.jobs_to_steal, Ordering::SeqCst);
                info_guard.reset(0);
                continue;
            }
            if !job.topology().contains(&node_id) {
                continue;
            }
            if self.steal_reqs.load(Ordering::SeqCst) <= 0 {
                return false;
            }

            let mut attrs = job.job_context().lock();
            if attrs.contains_key(&AttrKey::ThiefNode) {
                // Already carries a thief assignment from a prior
                // pass; nothing to do, but this peer was still the
                // one visited for this job this pass.
                return false;
            }

            let old_attempt = attrs.get(&AttrKey::StealingAttemptCount).copied();
            let old_priority = attrs.get(&AttrKey::StealingPriority).copied();

            attrs.insert(AttrKey::ThiefNode, AttrValue::Node(node_id));
            attrs.insert(AttrKey::StealingAttemptCount, AttrValue::Int(attempt + 1));
            attrs.insert(AttrKey::StealingPriority, AttrValue::Int(pri + 1));

            let pre_decrement = self.steal_reqs.fetch_sub(1, Ordering::SeqCst);
            let cancelled = job.cancel();

            if cancelled && pre_decrement >= 0 {
                info_guard.jobs_to_steal -= 1;
                return true;
            }

            // Roll back: restore the pre-attempt attribute state and
            // give the capacity back.
            attrs.remove(&AttrKey::ThiefNode);
            match old_attempt {
                Some(v) => {
                    attrs.insert(AttrKey::StealingAttemptCount, v);
                }
                None => {
                    attrs.remove(&AttrKey::StealingAttemptCount);
                }
            }
            match old_priority {
                Some(v) => {
                    attrs.insert(AttrKey::StealingPriority, v);
                }
                None => {
                    attrs.remove(&AttrKey::StealingPriority);
                }
            }
            self.steal_reqs.fetch_add(1, Ordering::SeqCst);
            return false;
        }
        false
    }

    /// §4.A3: when local queues are short, poll peers round-robin and
    /// ask overloaded ones for work.
    fn check_idle(&self, waiting_count: usize, active_count: usize) {
        let max = (self.config.wait_jobs_threshold as i64 + self.config.active_jobs_threshold as i64)
            .min(i32::MAX as i64);
        let jobs_to_steal = max - (waiting_count as i64 + active_count as i64);
        if jobs_to_steal <= 0 {
            return;
        }

        let mut jobs_left = jobs_to_steal;
        let node_cnt = self.table.len();

        for _ in 0..node_cnt {
            if jobs_left <= 0 {
                break;
            }
            let Some(next_id) = self.table.pop_front() else {
                break;
            };
            let Some(node) = self.table.node(next_id) else {
                // Dead node pruned by a concurrent membership event;
                // do not rotate it back in.
                continue;
            };
            if !node.is_alive() {
                continue;
            }

            self.poll_one_peer(next_id, &mut jobs_left);
            self.table.push_back(next_id);
        }
    }

    fn poll_one_peer(&self, next_id: NodeId, jobs_left: &mut i64) {
        let Some(node) = self.table.node(next_id) else {
            return;
        };

        if !self.config.stealing_attributes.is_empty() {
            let attrs = node.attributes();
            let matches = self
                .config
                .stealing_attributes
                .iter()
                .all(|(k, v)| attrs.get(k) == Some(v));
            if !matches {
                tracing::debug!(node = %next_id, "peer missing required stealing attributes, skipping");
                return;
            }
        }

        let Some(snd) = self.table.snd(next_id) else {
            return;
        };

        let wait_threshold = match node.attributes().get(WAIT_JOBS_THRESHOLD_ATTR) {
            Some(raw) => match raw.parse::<i64>() {
                Ok(v) => v,
                Err(_) => {
                    tracing::error!(node = %next_id, value = %raw, "peer wait-jobs-threshold attribute is not an integer, skipping");
                    return;
                }
            },
            None => {
                tracing::error!(node = %next_id, "peer is not running a collision controller (missing wait-jobs-threshold attribute)");
                return;
            }
        };

        let delta = node.metrics().current_waiting_jobs - wait_threshold;
        if delta <= 0 {
            return;
        }

        let send_delta = {
            let mut info = snd.lock();
            if !info.expired(self.config.msg_expire_time) && info.jobs_to_steal > 0 {
                *jobs_left -= info.jobs_to_steal;
                return;
            }
            let clamped = delta.min(*jobs_left);
            *jobs_left -= clamped;
            info.reset(clamped);
            clamped
        };

        if send_delta <= 0 {
            return;
        }

        if let Err(err) = self.sender.send(
            next_id,
            StealRequest {
                delta: send_delta as i32,
            },
            COLLISION_TOPIC,
        ) {
            tracing::warn!(node = %next_id, error = %err, "steal request send failed, rolling back");
            *jobs_left += send_delta;
        }
    }

    /// §4.A5: receipt of `StealRequest{delta}` from `node_id`.
    pub fn handle_steal_request(&self, node_id: NodeId, delta: i32) {
        let Some(info) = self.table.rcv(node_id) else {
            tracing::debug!(node = %node_id, "steal request from unknown peer, ignoring");
            return;
        };

        {
            let mut guard = info.lock();
            let previous = guard.jobs_to_steal;
            self.steal_reqs
                .fetch_add(delta as i64 - previous, Ordering::SeqCst);
            guard.reset(delta as i64);
        }

        if let Some(listener) = self.listener.read().as_ref() {
            listener.on_external_collision();
        }
    }
}
