use log::error;
use thiserror::Error;

use crate::{
    buffer_pool::BufferPoolError,
    channels::ChannelHostError,
    configuration::{ConfigError, SchemaError},
    mirror_table::MirrorError,
    types::{PeerId, WireChannelId, WireEntryId},
};

/// Errors surfaced by the replicator roles. Recoverable conditions (overflow,
/// incomplete decode, unknown ids, untranslatable time) never show up here;
/// they are reported through outcome values instead.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReplicationError {
    /// Both sides know the data class but disagree on its layout
    #[error("Schema mismatch with peer {peer}: {source}")]
    Schema {
        peer: PeerId,
        #[source]
        source: SchemaError,
    },

    /// A data record did not consume the length it declared
    #[error("Record for channel {channel} entry {entry} declared {declared} bytes but {consumed} were consumed")]
    Desync {
        channel: WireChannelId,
        entry: WireEntryId,
        declared: u32,
        consumed: usize,
    },

    /// A data record declared more bytes than the payload holds
    #[error("Record for channel {channel} entry {entry} declared {declared} bytes but only {remaining} remain")]
    Truncated {
        channel: WireChannelId,
        entry: WireEntryId,
        declared: u32,
        remaining: usize,
    },

    /// Fewer bytes than a record header were left at the end of a payload
    #[error("Malformed record header at payload position {position}")]
    MalformedRecord { position: usize },

    /// A configuration message could not be decoded
    #[error("Malformed configuration message from peer {peer}: {source}")]
    Config {
        peer: PeerId,
        #[source]
        source: ConfigError,
    },

    /// A single configuration message is larger than an empty config buffer
    #[error("Configuration message of {length} bytes does not fit an empty buffer of {capacity} bytes")]
    ConfigTooLarge { length: usize, capacity: usize },

    #[error(transparent)]
    Mirror(#[from] MirrorError),

    #[error(transparent)]
    ChannelHost(#[from] ChannelHostError),

    #[error(transparent)]
    BufferPool(#[from] BufferPoolError),
}

impl ReplicationError {
    /// Whether the session with the peer has to be torn down. After a schema
    /// mismatch or a desynchronized stream nothing more from that peer can
    /// be trusted.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Schema { .. }
                | Self::Desync { .. }
                | Self::Truncated { .. }
                | Self::MalformedRecord { .. }
                | Self::Config { .. }
        )
    }

    /// Log the error if it ends the session with `peer`
    pub fn logged(self, peer: PeerId) -> Self {
        if self.is_fatal() {
            error!("replication with peer {} failed: {}", peer, self);
        }
        self
    }
}
