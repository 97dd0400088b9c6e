//! # Chanrep Member
//! The member role of the channel replicator. A member learns which channels
//! and entries are replicated from the coordinator, mirrors the remote ones
//! into its local channels, and proposes its own entries for export.

#![deny(
    trivial_casts,
    trivial_numeric_casts,
    unstable_features,
    unused_import_braces
)]

pub mod shared {
    pub use chanrep_shared::{
        ChannelHost, ClockSteering, ConfigMessage, CycleStats, DataClassRegistry, OutgoingConfig,
        Recipient, ReplicationConfig, ReplicationContext, ReplicationError, ReplicatorRole,
    };
}

mod member;
mod member_config;

pub use member::Member;
pub use member_config::MemberConfig;
