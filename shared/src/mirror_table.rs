use std::collections::{BTreeMap, HashSet};

use chanrep_serde::{ByteReader, ByteWriter};
use log::debug;
use thiserror::Error;

use crate::{
    adapters::{InboundEntry, OutboundEntry, PackOutcome, UnpackOutcome},
    constants::{MAX_WIRE_CHANNEL_ID, MAX_WIRE_ENTRY_ID},
    error::ReplicationError,
    notifier::EntryNotices,
    record::{at_config_marker, RecordHeader},
    role::CycleStats,
    time::ClockTranslator,
    types::{ChannelId, LocalEntryId, PeerId, WireChannelId, WireEntryId},
};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MirrorError {
    #[error("Channel {channel} has used up its wire entry ids")]
    WireIdsExhausted { channel: WireChannelId },

    #[error("Wire channel id {channel} is out of range")]
    ChannelOutOfRange { channel: usize },

    #[error("Channel {channel} is not replicated")]
    UnknownChannel { channel: WireChannelId },

    #[error("Channel {channel} is already replicated")]
    DuplicateChannel { channel: WireChannelId },

    #[error("An entry of channel {channel} was mirrored before it had a wire id")]
    Unassigned { channel: WireChannelId },

    #[error("Entry {entry} of channel {channel} is already mirrored")]
    DuplicateEntry {
        channel: WireChannelId,
        entry: WireEntryId,
    },
}

/// One replicated channel: the local entries it exports, the remote entries
/// it imports, and the counter wire entry ids are drawn from
pub struct WatchedChannel {
    channel: ChannelId,
    wire_channel: WireChannelId,
    name: String,
    next_wire_entry: u32,
    notices: EntryNotices,
    outbound: Vec<OutboundEntry>,
    inbound: BTreeMap<WireEntryId, InboundEntry>,
    imported: HashSet<LocalEntryId>,
}

impl WatchedChannel {
    pub fn new(channel: ChannelId, wire_channel: WireChannelId, name: &str, notices: EntryNotices) -> Self {
        Self {
            channel,
            wire_channel,
            name: name.to_string(),
            next_wire_entry: 0,
            notices,
            outbound: Vec::new(),
            inbound: BTreeMap::new(),
            imported: HashSet::new(),
        }
    }

    pub fn channel(&self) -> ChannelId {
        self.channel
    }

    pub fn wire_channel(&self) -> WireChannelId {
        self.wire_channel
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn notices(&self) -> &EntryNotices {
        &self.notices
    }

    /// Draw the next wire entry id. Ids only ever increase, so an id is never
    /// handed out twice for the lifetime of the channel.
    pub fn allocate_wire_entry(&mut self) -> Result<WireEntryId, MirrorError> {
        if self.next_wire_entry > u32::from(MAX_WIRE_ENTRY_ID) {
            return Err(MirrorError::WireIdsExhausted {
                channel: self.wire_channel,
            });
        }
        let id = self.next_wire_entry as WireEntryId;
        self.next_wire_entry += 1;
        Ok(id)
    }

    // Outbound

    pub fn add_outbound(&mut self, adapter: OutboundEntry) {
        self.outbound.push(adapter);
    }

    pub fn outbound(&self) -> &[OutboundEntry] {
        &self.outbound
    }

    pub fn outbound_mut(&mut self, local_entry: LocalEntryId) -> Option<&mut OutboundEntry> {
        self.outbound
            .iter_mut()
            .find(|adapter| adapter.local_entry() == local_entry)
    }

    pub fn remove_outbound(&mut self, local_entry: LocalEntryId) -> Option<OutboundEntry> {
        let index = self
            .outbound
            .iter()
            .position(|adapter| adapter.local_entry() == local_entry)?;
        Some(self.outbound.remove(index))
    }

    // Inbound

    pub fn insert_inbound(&mut self, adapter: InboundEntry) -> Result<WireEntryId, MirrorError> {
        let Some(entry) = adapter.wire_entry() else {
            return Err(MirrorError::Unassigned {
                channel: self.wire_channel,
            });
        };
        if self.inbound.contains_key(&entry) {
            return Err(MirrorError::DuplicateEntry {
                channel: self.wire_channel,
                entry,
            });
        }
        self.inbound.insert(entry, adapter);
        Ok(entry)
    }

    pub fn inbound(&self, entry: WireEntryId) -> Option<&InboundEntry> {
        self.inbound.get(&entry)
    }

    pub fn inbound_entries(&self) -> impl Iterator<Item = &InboundEntry> {
        self.inbound.values()
    }

    pub fn remove_inbound(&mut self, entry: WireEntryId) -> Option<InboundEntry> {
        self.inbound.remove(&entry)
    }

    /// Take every inbound adapter mirroring an entry of `peer`
    pub fn take_inbound_from(&mut self, peer: PeerId) -> Vec<InboundEntry> {
        let entries: Vec<WireEntryId> = self
            .inbound
            .iter()
            .filter(|(_, adapter)| adapter.origin() == peer)
            .map(|(entry, _)| *entry)
            .collect();
        entries
            .into_iter()
            .filter_map(|entry| self.inbound.remove(&entry))
            .collect()
    }

    // Entries this role created itself while importing

    pub fn mark_imported(&mut self, local_entry: LocalEntryId) {
        self.imported.insert(local_entry);
    }

    pub fn is_imported(&self, local_entry: LocalEntryId) -> bool {
        self.imported.contains(&local_entry)
    }

    pub fn forget_imported(&mut self, local_entry: LocalEntryId) -> bool {
        self.imported.remove(&local_entry)
    }

    fn pack(&mut self, writer: &mut ByteWriter, stats: &mut CycleStats) {
        for adapter in self.outbound.iter_mut().filter(|adapter| adapter.is_active()) {
            loop {
                match adapter.pack(self.wire_channel, writer) {
                    PackOutcome::Written => stats.records_written += 1,
                    PackOutcome::Empty => break,
                    PackOutcome::Deferred => {
                        stats.records_deferred += adapter.pending_items();
                        break;
                    }
                }
            }
        }
    }
}

/// All replicated channels of one role, keyed by wire channel id
#[derive(Default)]
pub struct MirrorTable {
    channels: BTreeMap<WireChannelId, WatchedChannel>,
}

impl MirrorTable {
    pub fn new() -> Self {
        Self {
            channels: BTreeMap::new(),
        }
    }

    pub fn wire_channel_id(index: usize) -> Result<WireChannelId, MirrorError> {
        if index > usize::from(MAX_WIRE_CHANNEL_ID) {
            return Err(MirrorError::ChannelOutOfRange { channel: index });
        }
        Ok(index as WireChannelId)
    }

    pub fn insert(&mut self, channel: WatchedChannel) -> Result<(), MirrorError> {
        let wire_channel = channel.wire_channel();
        if self.channels.contains_key(&wire_channel) {
            return Err(MirrorError::DuplicateChannel {
                channel: wire_channel,
            });
        }
        self.channels.insert(wire_channel, channel);
        Ok(())
    }

    pub fn contains(&self, channel: WireChannelId) -> bool {
        self.channels.contains_key(&channel)
    }

    pub fn get(&self, channel: WireChannelId) -> Option<&WatchedChannel> {
        self.channels.get(&channel)
    }

    pub fn get_mut(&mut self, channel: WireChannelId) -> Result<&mut WatchedChannel, MirrorError> {
        self.channels
            .get_mut(&channel)
            .ok_or(MirrorError::UnknownChannel { channel })
    }

    pub fn channels(&self) -> impl Iterator<Item = &WatchedChannel> {
        self.channels.values()
    }

    pub fn channels_mut(&mut self) -> impl Iterator<Item = &mut WatchedChannel> {
        self.channels.values_mut()
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Append ready data of every active outbound adapter to `writer`
    pub fn pack(&mut self, writer: &mut ByteWriter, stats: &mut CycleStats) {
        for channel in self.channels.values_mut() {
            channel.pack(writer, stats);
        }
    }

    /// Read data records from `reader` until it is exhausted or a
    /// configuration marker comes up. Records for unknown ids, or for ids
    /// mirrored from a different peer, are skipped.
    pub fn unpack(
        &mut self,
        reader: &mut ByteReader,
        peer: PeerId,
        translator: &ClockTranslator,
        stats: &mut CycleStats,
    ) -> Result<(), ReplicationError> {
        while !reader.is_empty() && !at_config_marker(reader) {
            let position = reader.position();
            let header =
                RecordHeader::de(reader).map_err(|_| ReplicationError::MalformedRecord { position })?;

            let adapter = self
                .channels
                .get_mut(&header.channel)
                .and_then(|channel| channel.inbound.get_mut(&header.entry))
                .filter(|adapter| adapter.origin() == peer);

            let outcome = match adapter {
                Some(adapter) => adapter.unpack(&header, reader, translator)?,
                None => {
                    skip_record(&header, reader)?;
                    UnpackOutcome::Skipped
                }
            };
            match outcome {
                UnpackOutcome::Written => stats.records_received += 1,
                UnpackOutcome::Discarded => stats.records_discarded += 1,
                UnpackOutcome::Skipped => stats.records_skipped += 1,
            }
        }
        Ok(())
    }
}

fn skip_record(header: &RecordHeader, reader: &mut ByteReader) -> Result<(), ReplicationError> {
    let declared = header.length as usize;
    if declared > reader.bytes_remaining() {
        return Err(ReplicationError::Truncated {
            channel: header.channel,
            entry: header.entry,
            declared: header.length,
            remaining: reader.bytes_remaining(),
        });
    }
    reader.skip(declared);
    debug!(
        "skipped {} bytes for unmirrored entry {} of channel {}",
        declared, header.entry, header.channel
    );
    Ok(())
}
