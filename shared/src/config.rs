use std::default::Default;

use chanrep_serde::MTU_SIZE_BYTES;

/// Contains Config properties used by each peer's clock translator
#[derive(Clone, Debug)]
pub struct ClockConfig {
    /// Weight of a new sample in the exponentially smoothed offset estimate
    pub gain: f64,
    /// Step by which breakpoint transitions move, in ticks. Also the grain
    /// the initial transition is rounded to.
    pub wrap_period: i64,
    /// Instead of tracking drift, steer the local clock to the remote one
    pub follow_remote: bool,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            gain: 0.1,
            wrap_period: 1 << 16,
            follow_remote: false,
        }
    }
}

/// Contains Config properties common to both replicator roles
#[derive(Clone, Debug)]
pub struct ReplicationConfig {
    /// Capacity of a data payload buffer
    pub payload_capacity: usize,
    /// Capacity of each buffer configuration messages are chunked into
    pub config_buffer_capacity: usize,
    /// Bound of each entry notice queue
    pub notice_queue_capacity: usize,
    /// Used to configure every peer's clock translator
    pub clock: ClockConfig,
}

impl Default for ReplicationConfig {
    fn default() -> Self {
        Self {
            payload_capacity: MTU_SIZE_BYTES,
            config_buffer_capacity: MTU_SIZE_BYTES,
            notice_queue_capacity: 256,
            clock: ClockConfig::default(),
        }
    }
}
