//! The slice of the host's publish/subscribe channel subsystem the replicator
//! relies on. Entry storage and the read/write semantics behind these traits
//! belong to the host; the replicator only watches channels, opens handles
//! and moves items through them. Closing a handle is dropping it.

use chanrep_serde::{ByteReader, ByteWrite, Serde, SerdeErr};
use thiserror::Error;

use crate::{
    notifier::EntryNotifier,
    types::{Arity, ChannelId, ChannelItem, LocalEntryId, PackingMode, TimeAspect, TimeSpan, TransportClass},
};

/// Everything that describes an entry apart from its identity
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntrySpec {
    pub data_class: String,
    pub label: String,
    pub time_aspect: TimeAspect,
    pub arity: Arity,
    pub packing: PackingMode,
    pub transport_class: TransportClass,
}

impl EntrySpec {
    pub fn new(data_class: &str, label: &str, time_aspect: TimeAspect) -> Self {
        Self {
            data_class: data_class.to_string(),
            label: label.to_string(),
            time_aspect,
            arity: Arity::Single,
            packing: PackingMode::Full,
            transport_class: TransportClass::Regular,
        }
    }
}

impl Serde for EntrySpec {
    fn ser(&self, writer: &mut dyn ByteWrite) {
        self.data_class.ser(writer);
        self.label.ser(writer);
        self.time_aspect.ser(writer);
        self.arity.ser(writer);
        self.packing.ser(writer);
        self.transport_class.ser(writer);
    }

    fn de(reader: &mut ByteReader) -> Result<Self, SerdeErr> {
        Ok(Self {
            data_class: String::de(reader)?,
            label: String::de(reader)?,
            time_aspect: TimeAspect::de(reader)?,
            arity: Arity::de(reader)?,
            packing: PackingMode::de(reader)?,
            transport_class: TransportClass::de(reader)?,
        })
    }

    fn byte_length(&self) -> u32 {
        self.data_class.byte_length() + self.label.byte_length() + 4
    }
}

/// An entry as announced by the channel subsystem
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntryInfo {
    pub entry: LocalEntryId,
    pub spec: EntrySpec,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChannelHostError {
    #[error("Channel `{name}` cannot be watched: {reason}")]
    WatchFailed { name: String, reason: String },

    #[error("Channel {channel} is not known to the channel subsystem")]
    UnknownChannel { channel: ChannelId },

    #[error("Entry {entry} does not exist in channel {channel}")]
    UnknownEntry { channel: ChannelId, entry: LocalEntryId },

    #[error("Channel {channel} refused a write entry for `{label}`")]
    WriteRefused { channel: ChannelId, label: String },
}

pub trait ChannelHost {
    /// Start observing entry creation and removal in the named channel.
    /// Entries that already exist are announced through `notifier` as well.
    fn watch(
        &mut self,
        channel_name: &str,
        notifier: EntryNotifier,
    ) -> Result<ChannelId, ChannelHostError>;

    fn open_read(
        &mut self,
        channel: ChannelId,
        entry: LocalEntryId,
    ) -> Result<Box<dyn EntryReader>, ChannelHostError>;

    /// Creates a new entry in the channel and returns a handle writing to it
    fn open_write(
        &mut self,
        channel: ChannelId,
        spec: &EntrySpec,
    ) -> Result<Box<dyn EntryWriter>, ChannelHostError>;
}

pub trait EntryReader {
    /// Number of items written since the last one this handle advanced past
    fn ready_count(&self) -> usize;

    fn read_ready(&self) -> bool {
        self.ready_count() > 0
    }

    /// The oldest unread item, left in place
    fn peek(&mut self) -> Option<&ChannelItem>;

    /// Mark the oldest unread item as consumed
    fn advance(&mut self);
}

pub trait EntryWriter {
    /// Local id of the entry this handle created
    fn entry_id(&self) -> LocalEntryId;

    fn write(&mut self, data: &[u8], span: TimeSpan);
}
