//! # Chanrep Shared
//! Common functionality shared between the chanrep-coordinator &
//! chanrep-member crates: the entry adapters, the channel mirror table, the
//! configuration protocol and the clock translator.

#![deny(trivial_numeric_casts, unstable_features, unused_import_braces)]

pub use chanrep_serde::{
    ByteReader, ByteWrite, ByteWriter, ConstByteLength, Serde, SerdeErr, WriteMark, MTU_SIZE_BYTES,
};

mod adapters;
mod buffer_pool;
mod channels;
mod config;
mod configuration;
mod constants;
mod context;
mod data_class;
mod descriptor;
mod error;
mod mirror_table;
mod notifier;
mod peer;
mod record;
mod role;
mod time;
mod types;
mod vetting;

pub use adapters::{InboundEntry, OutboundEntry, PackOutcome, UnpackOutcome};
pub use buffer_pool::{BufferPool, BufferPoolError, PooledBuffer};
pub use channels::{ChannelHost, ChannelHostError, EntryInfo, EntryReader, EntrySpec, EntryWriter};
pub use config::{ClockConfig, ReplicationConfig};
pub use configuration::{
    verify_schema, AddChannel, AddEntry, ConfigError, ConfigMessage, ConfigOutbox, ConfigStream,
    Decoded, OutgoingConfig, Recipient, RemoveEntry, SchemaError, CONFIG_HEADER_BYTES,
};
pub use constants::{CONFIG_MARKER, MAX_WIRE_CHANNEL_ID, MAX_WIRE_ENTRY_ID, RECORD_HEADER_BYTES, SPAN_FLAG};
pub use context::{ClockSteering, ReplicationContext};
pub use data_class::{DataClassError, DataClassRegistry, SchemaLink};
pub use descriptor::EntryDescriptor;
pub use error::ReplicationError;
pub use mirror_table::{MirrorError, MirrorTable, WatchedChannel};
pub use notifier::{entry_notices, EntryNotices, EntryNotifier};
pub use peer::{Admission, AdmissionState, Peer, PeerTable};
pub use record::{at_config_marker, RecordHeader};
pub use role::{CoordinatorRole, CycleControl, CycleStats, ReplicatorRole};
pub use time::{Breakpoint, ClockTranslator, ClockUpdate, TranslateError};
pub use types::{
    Arity, ChannelId, ChannelItem, LocalEntryId, PackingMode, PeerId, ProvisionalId, TimeAspect,
    TimeSpan, TimeTick, TransportClass, WireChannelId, WireEntryId, COORDINATOR_PEER_ID,
};
pub use vetting::{vetting_channel, PeerAcknowledge, PeerVetRequest, VettingAuthority, VettingChannel};
