//! Configuration contract (spec §4.A7): thresholds, expiry, and the
//! node attributes a peer publishes at discovery time so others can
//! read its thresholds without asking.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::error::ConfigError;

pub const WAIT_JOBS_THRESHOLD_ATTR: &str = "gridgain.collision.wait.jobs.threshold";
pub const ACTIVE_JOBS_THRESHOLD_ATTR: &str = "gridgain.collision.active.jobs.threshold";
pub const MAX_STEALING_ATTEMPT_ATTR: &str = "gridgain.stealing.max.attempts";
pub const MSG_EXPIRE_TIME_ATTR: &str = "gridgain.stealing.msg.expire.time";

/// Enumerated options from §4.A7, plus the attribute-match gate used
/// by `checkIdle` to skip peers not running a compatible controller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollisionConfig {
    /// Activation budget per collision pass.
    pub active_jobs_threshold: u32,
    /// Target waiting-queue depth above which jobs may be surrendered.
    pub wait_jobs_threshold: u32,
    /// Inbound steal requests older than this are dropped and their
    /// capacity reclaimed.
    pub msg_expire_time: Duration,
    /// Upper bound on a job's stealing-hop count.
    pub max_stealing_attempts: u32,
    /// Gates `checkIdle`.
    pub stealing_enabled: bool,
    /// Required peer attribute matches for `checkIdle` to consider a node.
    pub stealing_attributes: HashMap<String, String>,
}

impl Default for CollisionConfig {
    fn default() -> Self {
        Self {
            active_jobs_threshold: 0,
            wait_jobs_threshold: 0,
            msg_expire_time: Duration::from_secs(1),
            max_stealing_attempts: 1,
            stealing_enabled: true,
            stealing_attributes: HashMap::new(),
        }
    }
}

impl CollisionConfig {
    /// Configuration invalid at start-up fails start rather than
    /// surfacing mid-run (§7).
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.msg_expire_time.is_zero() {
            return Err(ConfigError::OutOfRange {
                field: "msg_expire_time",
                value: 0,
            });
        }
        if self.max_stealing_attempts == 0 {
            return Err(ConfigError::OutOfRange {
                field: "max_stealing_attempts",
                value: 0,
            });
        }
        Ok(())
    }

    /// The published node attributes a peer advertises for discovery.
    pub fn published_attributes(&self) -> HashMap<String, String> {
        let mut attrs = HashMap::new();
        attrs.insert(
            WAIT_JOBS_THRESHOLD_ATTR.to_string(),
            self.wait_jobs_threshold.to_string(),
        );
        attrs.insert(
            ACTIVE_JOBS_THRESHOLD_ATTR.to_string(),
            self.active_jobs_threshold.to_string(),
        );
        attrs.insert(
            MAX_STEALING_ATTEMPT_ATTR.to_string(),
            self.max_stealing_attempts.to_string(),
        );
        attrs.insert(
            MSG_EXPIRE_TIME_ATTR.to_string(),
            self.msg_expire_time.as_millis().to_string(),
        );
        attrs
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_expiry_is_rejected() {
        let mut cfg = CollisionConfig::default();
        cfg.msg_expire_time = Duration::from_millis(0);
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::OutOfRange { field: "msg_expire_time", .. })
        ));
    }

    #[test]
    fn zero_max_attempts_is_rejected() {
        let mut cfg = CollisionConfig::default();
        cfg.max_stealing_attempts = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn default_config_is_valid() {
        assert!(CollisionConfig::default().validate().is_ok());
    }
}
