use std::default::Default;

use chanrep_shared::ReplicationConfig;

/// Contains Config properties which will be used by a Member
#[derive(Clone, Debug)]
pub struct MemberConfig {
    /// Used to configure buffers, queues and clock translation
    pub replication: ReplicationConfig,
    /// Steer the local clock to the coordinator's instead of tracking drift.
    /// Needs a `ClockSteering` in the replication context.
    pub follow_coordinator_clock: bool,
}

impl Default for MemberConfig {
    fn default() -> Self {
        Self {
            replication: ReplicationConfig::default(),
            follow_coordinator_clock: false,
        }
    }
}
