use chanrep_serde::{ByteReader, Serde};
use log::warn;

use crate::{
    adapters::UnpackOutcome,
    channels::EntryWriter,
    descriptor::EntryDescriptor,
    error::ReplicationError,
    record::RecordHeader,
    time::ClockTranslator,
    types::{LocalEntryId, PeerId, TimeSpan, WireEntryId},
};

/// Imports one remote entry: decodes its records, moves their time onto the
/// local base and writes them into a local entry created for the purpose
pub struct InboundEntry {
    descriptor: EntryDescriptor,
    writer: Box<dyn EntryWriter>,
    origin: PeerId,
}

impl InboundEntry {
    pub fn new(mut descriptor: EntryDescriptor, writer: Box<dyn EntryWriter>, origin: PeerId) -> Self {
        descriptor.local_entry = writer.entry_id();
        Self {
            descriptor,
            writer,
            origin,
        }
    }

    pub fn descriptor(&self) -> &EntryDescriptor {
        &self.descriptor
    }

    pub fn local_entry(&self) -> LocalEntryId {
        self.descriptor.local_entry
    }

    pub fn wire_entry(&self) -> Option<WireEntryId> {
        self.descriptor.wire_entry
    }

    pub fn assign(&mut self, wire_entry: WireEntryId) {
        self.descriptor.wire_entry = Some(wire_entry);
    }

    /// The peer whose entry this mirrors
    pub fn origin(&self) -> PeerId {
        self.origin
    }

    /// Read the body of the record `header` introduced. The reader is left
    /// after the record in every non-fatal case.
    pub fn unpack(
        &mut self,
        header: &RecordHeader,
        reader: &mut ByteReader,
        translator: &ClockTranslator,
    ) -> Result<UnpackOutcome, ReplicationError> {
        let declared = header.length as usize;
        if declared > reader.bytes_remaining() {
            return Err(ReplicationError::Truncated {
                channel: header.channel,
                entry: header.entry,
                declared: header.length,
                remaining: reader.bytes_remaining(),
            });
        }

        let start_position = reader.position();
        let desync = |consumed: usize| ReplicationError::Desync {
            channel: header.channel,
            entry: header.entry,
            declared: header.length,
            consumed,
        };

        // The declared body is present in full, so the only way the record
        // can disagree with its length is a body too short for its ticks.
        let tick_bytes = RecordHeader::tick_bytes(header.span_variant);
        if tick_bytes > declared {
            return Err(desync(tick_bytes));
        }
        let remote_span = if header.span_variant {
            let start = u32::de(reader).map_err(|_| desync(reader.position() - start_position))?;
            let end = u32::de(reader).map_err(|_| desync(reader.position() - start_position))?;
            TimeSpan::new(start, end)
        } else {
            let tick = u32::de(reader).map_err(|_| desync(reader.position() - start_position))?;
            TimeSpan::tick(tick)
        };
        let data = reader
            .read_bytes(declared - tick_bytes)
            .map_err(|_| desync(reader.position() - start_position))?;

        match translator.translate(remote_span) {
            Ok(local_span) => {
                self.writer.write(data, local_span);
                self.descriptor.last_tick = Some(local_span.end);
                Ok(UnpackOutcome::Written)
            }
            Err(error) => {
                warn!(
                    "discarding record for entry `{}` from peer {}: {}",
                    self.descriptor.label(),
                    self.origin,
                    error
                );
                Ok(UnpackOutcome::Discarded)
            }
        }
    }
}
