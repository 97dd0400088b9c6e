use std::default::Default;

use chanrep_shared::ReplicationConfig;

/// Contains Config properties which will be used by the Coordinator
#[derive(Clone, Debug)]
pub struct CoordinatorConfig {
    /// Used to configure buffers, queues and clock translation
    pub replication: ReplicationConfig,
    /// Names of the channels to replicate. A channel's position in this list
    /// is its wire channel id.
    pub channels: Vec<String>,
    /// Determines whether joining members must be approved through the
    /// vetting channel before they are accepted
    pub require_vetting: bool,
}

impl Default for CoordinatorConfig {
    fn default() -> Self {
        Self {
            replication: ReplicationConfig::default(),
            channels: Vec::new(),
            require_vetting: false,
        }
    }
}
