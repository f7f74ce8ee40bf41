//! Collision-controller error taxonomy. Policy races (node absent at
//! message time, transport failures, attribute type violations) are
//! absorbed inline with a log line, not represented here — only
//! start-up configuration failures are surfaced as errors (§7).

#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    #[error("{field} out of range: {value}")]
    OutOfRange { field: &'static str, value: i64 },
}
