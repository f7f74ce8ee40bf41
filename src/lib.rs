//! Two independent hard-engineering cores from a distributed compute
//! platform's node runtime:
//!
//! - [`collision`]: the job-stealing collision controller — a
//!   per-node policy engine deciding which waiting jobs to admit,
//!   which to surrender to peers, and how much work to request from
//!   overloaded peers.
//! - [`pagestore`]: a fixed-page, append-allocated single file with a
//!   typed header, atomic page allocation, and per-page CRC
//!   verification.
//!
//! Both are consumed by a host platform that owns the execution
//! engine, discovery bus, inter-node transport, and write-ahead log;
//! this crate models only the contracts it needs from those as traits.

pub mod collision;
pub mod pagestore;
