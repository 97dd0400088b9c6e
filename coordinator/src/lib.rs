//! # Chanrep Coordinator
//! The coordinator role of the channel replicator. It owns the authoritative
//! replication configuration, decides which members may join, hands every
//! accepted member a snapshot of the configuration and broadcasts each change
//! afterwards.

#![deny(
    trivial_casts,
    trivial_numeric_casts,
    unstable_features,
    unused_import_braces
)]

pub mod shared {
    pub use chanrep_shared::{
        Admission, ChannelHost, ConfigMessage, CoordinatorRole, CycleStats, DataClassRegistry,
        OutgoingConfig, Recipient, ReplicationConfig, ReplicationContext, ReplicationError,
        ReplicatorRole, VettingAuthority,
    };
}

mod coordinator;
mod coordinator_config;

pub use coordinator::{Coordinator, ObsoleteEntry};
pub use coordinator_config::CoordinatorConfig;
